use std::path::PathBuf;

use vigil_types::{SourceEngine, Span};

/// Provides a detailed, rich description of one finding of the checker.
#[derive(Debug, Default)]
pub struct Diagnostic {
    pub reason: Option<Reason>,
    pub issue: Issue,
    pub hints: Vec<Hint>,
    pub help: Vec<String>,
}

impl Diagnostic {
    pub fn level(&self) -> Level {
        match self.issue.label_type {
            LabelType::Error => Level::Error,
            LabelType::Warning => Level::Warning,
            LabelType::Info => Level::Info,
            _ => unreachable!("The diagnostic level can be only Error, Warning, or Info, and this is enforced via the Diagnostic API.")
        }
    }

    pub fn reason(&self) -> Option<&Reason> {
        self.reason.as_ref()
    }

    pub fn issue(&self) -> &Issue {
        &self.issue
    }

    /// All the labels, potentially in different source files.
    pub fn labels(&self) -> Vec<&Label> {
        let mut labels = Vec::<&Label>::new();

        if self.issue.is_in_source() {
            labels.push(&self.issue);
        }

        for hint in self.hints.iter().filter(|hint| hint.is_in_source()) {
            labels.push(hint);
        }

        labels
    }

    pub fn help(&self) -> impl Iterator<Item = &String> + '_ {
        self.help.iter().filter(|help| !help.is_empty())
    }

    /// A help text that will never be displayed. Convenient when defining help
    /// lines that are displayed only when a condition is met.
    pub fn help_none() -> String {
        String::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Level {
    Info,
    Warning,
    #[default]
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelType {
    #[default]
    Info,
    Help,
    Warning,
    Error,
}

/// Diagnostic message related to a span of source code in a source file.
///
/// If the message in a particular situation cannot be related to a span
/// in a known source file (e.g., for a builtin declaration) the span must
/// be set to [Span::dummy]. Such messages without a valid span are ignored
/// when rendering labels.
#[derive(Debug)]
pub struct Label {
    label_type: LabelType,
    span: Span,
    text: String,
    source_path: Option<SourcePath>,
}

impl Label {
    pub fn info(source_engine: &SourceEngine, span: Span, text: String) -> Label {
        Self::new(source_engine, LabelType::Info, span, text)
    }

    pub fn help(source_engine: &SourceEngine, span: Span, text: String) -> Label {
        Self::new(source_engine, LabelType::Help, span, text)
    }

    pub fn warning(source_engine: &SourceEngine, span: Span, text: String) -> Label {
        Self::new(source_engine, LabelType::Warning, span, text)
    }

    pub fn error(source_engine: &SourceEngine, span: Span, text: String) -> Label {
        Self::new(source_engine, LabelType::Error, span, text)
    }

    fn new(source_engine: &SourceEngine, label_type: LabelType, span: Span, text: String) -> Label {
        let source_path = Self::get_source_path(source_engine, &span);
        Label {
            label_type,
            span,
            text,
            source_path,
        }
    }

    /// True if the `Label` is actually related to a span of source code in a
    /// source file.
    pub fn is_in_source(&self) -> bool {
        self.source_path.is_some() && (self.span.start() < self.span.end())
    }

    pub fn label_type(&self) -> LabelType {
        self.label_type
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn text(&self) -> &str {
        self.text.as_ref()
    }

    pub fn source_path(&self) -> Option<&SourcePath> {
        self.source_path.as_ref()
    }

    fn get_source_path(source_engine: &SourceEngine, span: &Span) -> Option<SourcePath> {
        let path_buf = span
            .source_id()
            .and_then(|id| source_engine.get_path(id));
        path_buf.map(|path_buf| {
            let path_string = path_buf.to_string_lossy().to_string();
            SourcePath {
                path_buf,
                path_string,
            }
        })
    }
}

impl Default for Label {
    fn default() -> Self {
        Self {
            label_type: LabelType::Info,
            span: Span::dummy(),
            text: "".to_string(),
            source_path: None,
        }
    }
}

#[derive(Debug)]
pub struct Issue {
    label: Label,
}

impl Issue {
    pub fn warning(source_engine: &SourceEngine, span: Span, text: String) -> Self {
        Self {
            label: Label::warning(source_engine, span, text),
        }
    }

    pub fn error(source_engine: &SourceEngine, span: Span, text: String) -> Self {
        Self {
            label: Label::error(source_engine, span, text),
        }
    }
}

impl Default for Issue {
    fn default() -> Self {
        Self {
            label: Label {
                label_type: LabelType::Error,
                ..Default::default()
            },
        }
    }
}

impl std::ops::Deref for Issue {
    type Target = Label;
    fn deref(&self) -> &Self::Target {
        &self.label
    }
}

#[derive(Debug, Default)]
pub struct Hint {
    label: Label,
}

impl Hint {
    pub fn info(source_engine: &SourceEngine, span: Span, text: String) -> Self {
        Self {
            label: Label::info(source_engine, span, text),
        }
    }

    pub fn help(source_engine: &SourceEngine, span: Span, text: String) -> Self {
        Self {
            label: Label::help(source_engine, span, text),
        }
    }

    pub fn warning(source_engine: &SourceEngine, span: Span, text: String) -> Self {
        Self {
            label: Label::warning(source_engine, span, text),
        }
    }

    pub fn error(source_engine: &SourceEngine, span: Span, text: String) -> Self {
        Self {
            label: Label::error(source_engine, span, text),
        }
    }

    /// A [Hint] that will never be displayed. Convenient when defining [Hint]s
    /// that are displayed only if a condition is met.
    pub fn none() -> Self {
        Self {
            label: Label::default(),
        }
    }
}

impl std::ops::Deref for Hint {
    type Target = Label;
    fn deref(&self) -> &Self::Target {
        &self.label
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourcePath {
    path_buf: PathBuf,
    path_string: String,
}

impl SourcePath {
    pub fn as_path_buf(&self) -> &PathBuf {
        &self.path_buf
    }

    pub fn as_str(&self) -> &str {
        self.path_string.as_ref()
    }
}

/// The areas the checker's findings fall into. Grouping codes by area keeps
/// flag names unique within each group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiagnosticArea {
    #[default]
    Scoping,
    StorageChecks,
    Warnings,
}

impl DiagnosticArea {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Scoping => "E1",
            Self::StorageChecks => "E2",
            Self::Warnings => "W0",
        }
    }
}

/// The stable flag code of a finding, e.g. `unused-decl`. Hosts key their
/// suppression and promotion tables on these, so a flag name, once released,
/// never changes meaning.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Code {
    area: DiagnosticArea,
    flag: &'static str,
}

impl Code {
    pub fn scoping(flag: &'static str) -> Code {
        Self::new(DiagnosticArea::Scoping, flag)
    }

    pub fn storage_checks(flag: &'static str) -> Code {
        Self::new(DiagnosticArea::StorageChecks, flag)
    }

    pub fn warnings(flag: &'static str) -> Code {
        Self::new(DiagnosticArea::Warnings, flag)
    }

    fn new(area: DiagnosticArea, flag: &'static str) -> Self {
        debug_assert!(
            !flag.is_empty() && flag.chars().all(|c| c.is_ascii_lowercase() || c == '-'),
            "Flag codes are lowercase words joined by '-'."
        );
        Self { area, flag }
    }

    pub fn area(&self) -> DiagnosticArea {
        self.area
    }

    pub fn as_str(&self) -> &'static str {
        self.flag
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reason {
    code: Code,
    description: String,
}

impl Reason {
    pub fn new(code: Code, description: String) -> Self {
        Self { code, description }
    }

    pub fn code(&self) -> &str {
        self.code.as_str()
    }

    pub fn description(&self) -> &str {
        self.description.as_ref()
    }
}

pub trait ToDiagnostic {
    fn to_diagnostic(&self, source_engine: &SourceEngine) -> Diagnostic;
}

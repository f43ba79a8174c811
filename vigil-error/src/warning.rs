use crate::diagnostic::{Code, Diagnostic, Hint, Issue, Reason, ToDiagnostic};

use core::fmt;

use vigil_types::{Ident, SourceEngine, SourceId, Span, Spanned};

/// Likely defects. Unlike a [crate::error::CheckError], any of these can be a
/// false alarm, so hosts route them through per-flag suppression before
/// showing them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CheckWarning {
    pub span: Span,
    pub warning_content: Warning,
}

impl Spanned for CheckWarning {
    fn span(&self) -> Span {
        self.span.clone()
    }
}

impl CheckWarning {
    pub fn to_friendly_warning_string(&self) -> String {
        self.warning_content.to_string()
    }

    pub fn source_id(&self) -> Option<SourceId> {
        self.span.source_id().cloned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Warning {
    UnusedDeclaration {
        /// Text like "variable" or "parameter", naming what kind of
        /// declaration went unused.
        decl_kind: &'static str,
        name: Ident,
    },
    StorageNeverReleased {
        name: Ident,
    },
    OutParamUndefined {
        name: Ident,
        function: Ident,
    },
    NotNullParamMayBeNull {
        name: Ident,
        function: Ident,
    },
    GlobalUndefinedOnReturn {
        name: Ident,
        function: Ident,
    },
    ShadowsOuterDeclaration {
        name: Ident,
        /// What the shadowed outer declaration is, e.g. "function".
        outer_kind: &'static str,
        outer_span: Span,
    },
}

impl fmt::Display for Warning {
    // This trait requires `fmt` with this exact signature.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Warning::*;
        match self {
            UnusedDeclaration { decl_kind, name } => {
                write!(f, "The {decl_kind} \"{name}\" is declared but never used.")
            }
            StorageNeverReleased { name } => write!(
                f,
                "The storage bound to \"{name}\" is still owned here and is never released or \
                 transferred."
            ),
            OutParamUndefined { name, function } => write!(
                f,
                "The out parameter \"{name}\" may not be assigned when \"{function}\" returns."
            ),
            NotNullParamMayBeNull { name, function } => write!(
                f,
                "The parameter \"{name}\" is declared not null but may be null when \
                 \"{function}\" returns."
            ),
            GlobalUndefinedOnReturn { name, function } => write!(
                f,
                "The global \"{name}\" must be defined when \"{function}\" returns, but may not \
                 be."
            ),
            ShadowsOuterDeclaration { name, outer_kind, .. } => write!(
                f,
                "This declaration of \"{name}\" shadows an outer {outer_kind} with the same name."
            ),
        }
    }
}

impl ToDiagnostic for CheckWarning {
    fn to_diagnostic(&self, source_engine: &SourceEngine) -> Diagnostic {
        let code = Code::warnings;
        use Warning::*;
        match &self.warning_content {
            UnusedDeclaration { decl_kind, name } => Diagnostic {
                reason: Some(Reason::new(
                    code("unused-decl"),
                    "Declaration is never used".to_string(),
                )),
                issue: Issue::warning(
                    source_engine,
                    self.span(),
                    format!("The {decl_kind} \"{name}\" is declared but never used."),
                ),
                hints: vec![],
                help: vec![format!(
                    "Consider removing the {decl_kind}, or prefixing the name with an underscore \
                     if it is kept intentionally."
                )],
            },
            StorageNeverReleased { name } => Diagnostic {
                reason: Some(Reason::new(
                    code("must-release"),
                    "Owned storage is never released".to_string(),
                )),
                issue: Issue::warning(
                    source_engine,
                    self.span(),
                    format!(
                        "\"{name}\" still owns its storage when it goes out of scope, and no \
                         other live reference can release it."
                    ),
                ),
                hints: vec![],
                help: vec![
                    "Release the storage before the end of the scope, or transfer ownership out \
                     of it."
                        .to_string(),
                ],
            },
            OutParamUndefined { name, function } => Diagnostic {
                reason: Some(Reason::new(
                    code("out-param-undef"),
                    "Out parameter may leave the function unassigned".to_string(),
                )),
                issue: Issue::warning(
                    source_engine,
                    self.span(),
                    format!(
                        "The out parameter \"{name}\" may not be assigned when \"{function}\" \
                         returns."
                    ),
                ),
                hints: vec![Hint::info(
                    source_engine,
                    name.span(),
                    format!("\"{name}\" is declared as an out parameter here."),
                )],
                help: vec![
                    "Callers are entitled to read an out parameter after the call.".to_string(),
                ],
            },
            NotNullParamMayBeNull { name, function } => Diagnostic {
                reason: Some(Reason::new(
                    code("null-return"),
                    "Null state on return contradicts the declaration".to_string(),
                )),
                issue: Issue::warning(
                    source_engine,
                    self.span(),
                    format!(
                        "The parameter \"{name}\" is declared not null but may be null when \
                         \"{function}\" returns."
                    ),
                ),
                hints: vec![],
                help: vec![],
            },
            GlobalUndefinedOnReturn { name, function } => Diagnostic {
                reason: Some(Reason::new(
                    code("global-undef"),
                    "Declared global effect is not satisfied".to_string(),
                )),
                issue: Issue::warning(
                    source_engine,
                    self.span(),
                    format!(
                        "The globals clause of \"{function}\" promises that \"{name}\" is \
                         defined on return, but it may not be."
                    ),
                ),
                hints: vec![Hint::info(
                    source_engine,
                    name.span(),
                    format!("\"{name}\" is listed in the globals clause here."),
                )],
                help: vec![],
            },
            ShadowsOuterDeclaration {
                name,
                outer_kind,
                outer_span,
            } => Diagnostic {
                reason: Some(Reason::new(
                    code("shadow-decl"),
                    "Declaration shadows an outer declaration of a different kind".to_string(),
                )),
                issue: Issue::warning(
                    source_engine,
                    self.span(),
                    format!("This declaration of \"{name}\" shadows an outer {outer_kind}."),
                ),
                hints: vec![Hint::info(
                    source_engine,
                    outer_span.clone(),
                    format!("The shadowed {outer_kind} \"{name}\" is declared here."),
                )],
                help: vec![],
            },
        }
    }
}

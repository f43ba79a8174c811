use crate::diagnostic::{Code, Diagnostic, Hint, Issue, Reason, ToDiagnostic};

use vigil_types::{Ident, SourceEngine, Span, Spanned};

use thiserror::Error;

/// Definite defects found while maintaining the symbol table. Checking
/// continues after each of these; they are collected through the handler and
/// reported together at the end of the run.
#[derive(Error, Debug, Clone, PartialEq, Eq, Hash)]
pub enum CheckError {
    #[error("The name \"{name}\" is already declared in this scope.")]
    DuplicateDeclaration {
        name: Ident,
        prior: Span,
        span: Span,
    },
    #[error("\"{name}\" was declared as a {prior_kind} and cannot be redeclared as a {new_kind}.")]
    DeclarationKindMismatch {
        name: Ident,
        prior_kind: &'static str,
        new_kind: &'static str,
        prior: Span,
        span: Span,
    },
    #[error(
        "The globals clause of \"{function}\" names \"{name}\", which is not a known global."
    )]
    UnknownGlobalInClause {
        function: Ident,
        name: Ident,
        span: Span,
    },
}

impl Spanned for CheckError {
    fn span(&self) -> Span {
        use CheckError::*;
        match self {
            DuplicateDeclaration { span, .. } => span.clone(),
            DeclarationKindMismatch { span, .. } => span.clone(),
            UnknownGlobalInClause { span, .. } => span.clone(),
        }
    }
}

impl ToDiagnostic for CheckError {
    fn to_diagnostic(&self, source_engine: &SourceEngine) -> Diagnostic {
        let code = Code::scoping;
        use CheckError::*;
        match self {
            DuplicateDeclaration { name, prior, span } => Diagnostic {
                reason: Some(Reason::new(
                    code("name-clash"),
                    "Name is declared twice in the same scope".to_string(),
                )),
                issue: Issue::error(
                    source_engine,
                    span.clone(),
                    format!("The name \"{name}\" is already declared in this scope."),
                ),
                hints: vec![Hint::info(
                    source_engine,
                    prior.clone(),
                    format!("\"{name}\" was first declared here."),
                )],
                help: vec![],
            },
            DeclarationKindMismatch {
                name,
                prior_kind,
                new_kind,
                prior,
                span,
            } => Diagnostic {
                reason: Some(Reason::new(
                    code("kind-clash"),
                    "Redeclaration changes what kind of thing the name is".to_string(),
                )),
                issue: Issue::error(
                    source_engine,
                    span.clone(),
                    format!("\"{name}\" is redeclared here as a {new_kind}."),
                ),
                hints: vec![Hint::info(
                    source_engine,
                    prior.clone(),
                    format!("\"{name}\" was declared as a {prior_kind} here."),
                )],
                help: vec![format!(
                    "A name keeps the kind of its first declaration; later declarations may only refine the same {prior_kind}."
                )],
            },
            UnknownGlobalInClause {
                function,
                name,
                span,
            } => Diagnostic {
                reason: Some(Reason::new(
                    code("unknown-global"),
                    "Globals clause names an unknown global".to_string(),
                )),
                issue: Issue::error(
                    source_engine,
                    span.clone(),
                    format!(
                        "\"{name}\" in the globals clause of \"{function}\" is not a known global."
                    ),
                ),
                hints: vec![],
                help: vec![
                    "Only file-level variables can be listed in a globals clause.".to_string(),
                ],
            },
        }
    }
}

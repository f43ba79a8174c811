//! Exit-path bookkeeping for statement sequences and branch merges.

use crate::scope::guards::GuardSet;
use std::fmt;
use vigil_types::Span;

/// Whether control can fall out of the bottom of a statement sequence.
///
/// The variants are ordered by severity, so sequencing two stretches of
/// straight-line code is [Ord::max]. Joining sibling branches is not, which
/// is what [ExitKind::combine_branches] is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ExitKind {
    /// Control always reaches the end.
    #[default]
    Never,
    /// Some path returns or aborts before the end.
    MayEscape,
    /// No path reaches the end.
    MustEscape,
}

impl ExitKind {
    /// The exit kind of two sibling paths considered together. Both must
    /// escape for the pair to escape; one escaping side makes the pair a
    /// may-escape.
    pub fn combine_branches(self, other: ExitKind) -> ExitKind {
        use ExitKind::*;
        match (self, other) {
            (MustEscape, MustEscape) => MustEscape,
            (Never, Never) => Never,
            _ => MayEscape,
        }
    }

    /// The exit kind of this stretch of code followed by another.
    pub fn then(self, next: ExitKind) -> ExitKind {
        self.max(next)
    }

    pub fn must_escape(&self) -> bool {
        *self == ExitKind::MustEscape
    }

    pub fn may_escape(&self) -> bool {
        *self != ExitKind::Never
    }
}

/// The caller's account of how one branch or scope body ended.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BranchExit {
    pub exit: ExitKind,
    /// The statement that forced the exit kind, when one did.
    pub span: Option<Span>,
}

impl BranchExit {
    pub fn new(exit: ExitKind, span: Option<Span>) -> BranchExit {
        BranchExit { exit, span }
    }

    /// A body that ran to its end on every path.
    pub fn falls_through() -> BranchExit {
        BranchExit::default()
    }

    pub fn may_escape(span: Span) -> BranchExit {
        BranchExit {
            exit: ExitKind::MayEscape,
            span: Some(span),
        }
    }

    pub fn must_escape(span: Span) -> BranchExit {
        BranchExit {
            exit: ExitKind::MustEscape,
            span: Some(span),
        }
    }
}

/// The source construct a branch merge belongs to. Only used to name the
/// construct in protocol errors and trace output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClauseKind {
    If,
    While,
    DoWhile,
    For,
    Cond,
    SwitchCase,
}

impl fmt::Display for ClauseKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            ClauseKind::If => "if",
            ClauseKind::While => "while",
            ClauseKind::DoWhile => "do-while",
            ClauseKind::For => "for",
            ClauseKind::Cond => "conditional",
            ClauseKind::SwitchCase => "switch case",
        };
        write!(f, "{s}")
    }
}

/// What the tested predicate implies about the path that did not take the
/// branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredicateInfo {
    /// Guards that hold when the predicate is false.
    pub negated_guards: GuardSet,
    pub span: Span,
}

impl PredicateInfo {
    pub fn new(negated_guards: GuardSet, span: Span) -> PredicateInfo {
        PredicateInfo {
            negated_guards,
            span,
        }
    }

    /// A predicate that settles nothing about either path.
    pub fn opaque(span: Span) -> PredicateInfo {
        PredicateInfo {
            negated_guards: GuardSet::default(),
            span,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sibling_paths_escape_only_together() {
        use ExitKind::*;
        assert_eq!(MustEscape.combine_branches(MustEscape), MustEscape);
        assert_eq!(MustEscape.combine_branches(Never), MayEscape);
        assert_eq!(Never.combine_branches(MustEscape), MayEscape);
        assert_eq!(Never.combine_branches(Never), Never);
        assert_eq!(MayEscape.combine_branches(MustEscape), MayEscape);
    }

    #[test]
    fn sequencing_keeps_the_strongest_exit() {
        use ExitKind::*;
        assert_eq!(Never.then(MayEscape), MayEscape);
        assert_eq!(MayEscape.then(MustEscape), MustEscape);
        assert_eq!(MustEscape.then(Never), MustEscape);
        assert_eq!(Never.then(Never), Never);
    }
}

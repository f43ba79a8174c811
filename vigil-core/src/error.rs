//! Fatal protocol errors.
//!
//! These are distinct from the user-facing diagnostics in `vigil-error`. A
//! [ScopeError] means the caller drove the tree through an impossible
//! sequence of operations, e.g. popping a branch pair when no branch is
//! open. The tree refuses the operation and leaves its state untouched so
//! the caller can abandon the current declaration unit cleanly.

use crate::scope::{ClauseKind, FrameKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeError {
    AltWithoutTrueBranch(FrameKind),
    CaseOutsideSwitch(FrameKind),
    CoordinateBeyondPath(usize, usize),
    EnterFileTwice,
    ExitBranchAsScope(FrameKind),
    ExitFileUnentered,
    ExitFileWithOpenScopes(usize),
    ExitPermanentScope(FrameKind),
    ExitSwitchOutsideSwitch(FrameKind),
    FunctionScopeOutsideFile(usize),
    PopWithoutBranch(ClauseKind, FrameKind),
}

impl std::error::Error for ScopeError {}

/// Logs a protocol violation at the point it is detected, then hands the
/// error back for the caller to propagate.
pub(crate) fn fatal(err: ScopeError) -> ScopeError {
    tracing::error!(%err, "scope protocol violation");
    err
}

use std::fmt;

impl fmt::Display for ScopeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ScopeError::AltWithoutTrueBranch(kind) => write!(
                f,
                "Alternative branch opened while the innermost frame is a {kind} frame, \
                not a true branch."
            ),
            ScopeError::CaseOutsideSwitch(kind) => write!(
                f,
                "Case started while the innermost frame is a {kind} frame, \
                not a switch or case frame."
            ),
            ScopeError::CoordinateBeyondPath(wanted, have) => write!(
                f,
                "Coordinate refers to lexical level {wanted} but the active path \
                only reaches level {have}."
            ),
            ScopeError::EnterFileTwice => {
                write!(f, "File scope entered while a file is already open.")
            }
            ScopeError::ExitBranchAsScope(kind) => write!(
                f,
                "Attempt to exit a {kind} frame as a plain scope; branch frames \
                are only retired by a branch merge."
            ),
            ScopeError::ExitFileUnentered => {
                write!(f, "File scope exited but no file is open.")
            }
            ScopeError::ExitFileWithOpenScopes(level) => write!(
                f,
                "File scope exited while an inner scope at level {level} is still open."
            ),
            ScopeError::ExitPermanentScope(kind) => {
                write!(f, "Attempt to exit the permanent {kind} frame.")
            }
            ScopeError::ExitSwitchOutsideSwitch(kind) => write!(
                f,
                "Switch exited while the innermost frame is a {kind} frame, \
                not a switch or case frame."
            ),
            ScopeError::FunctionScopeOutsideFile(level) => write!(
                f,
                "Function scope opened at level {level}; function bodies only open \
                directly under file scope."
            ),
            ScopeError::PopWithoutBranch(clause, kind) => write!(
                f,
                "Merge of a {clause} construct requested while the innermost frame \
                is a {kind} frame."
            ),
        }
    }
}

//! Reports owed when a scope retires its bindings.

use crate::scope::frame::ScopeFrame;
use crate::scope::symbol::{SymbolKind, SymbolRecord};
use crate::storage::Definedness;
use vigil_error::handler::Handler;
use vigil_error::warning::{CheckWarning, Warning};

/// Checks every record of a frame being retired: unused bindings and owned
/// storage that nothing released. `parent_level` bounds the alias search
/// that can excuse a would-be leak; an alias that dies with the same scope
/// excuses nothing.
pub(crate) fn check_scope_exit(handler: &Handler, frame: &ScopeFrame, parent_level: usize) {
    for record in &frame.records {
        check_unused_record(handler, record);
        check_leak(handler, record, frame, parent_level);
    }
}

pub(crate) fn check_unused<'a>(
    handler: &Handler,
    records: impl Iterator<Item = &'a SymbolRecord>,
) {
    for record in records {
        check_unused_record(handler, record);
    }
}

fn check_unused_record(handler: &Handler, record: &SymbolRecord) {
    if record.is_used() || record.decl_span().is_dummy() {
        return;
    }
    if matches!(record.kind(), SymbolKind::Unknown) {
        return;
    }
    handler.emit_warn(CheckWarning {
        span: record.decl_span().clone(),
        warning_content: Warning::UnusedDeclaration {
            decl_kind: record.kind().describe(),
            name: record.name().clone(),
        },
    });
}

fn check_leak(handler: &Handler, record: &SymbolRecord, frame: &ScopeFrame, parent_level: usize) {
    let state = record.storage().state();
    if !state.alias.is_owned_obligation() || state.is_dead() {
        return;
    }
    // Nothing was ever allocated, or a definite null is held; neither can
    // leak.
    if matches!(state.defined, Definedness::Undefined | Definedness::Unknown) || state.is_null() {
        return;
    }
    if frame
        .aliases
        .has_live_alias(record.storage().id(), parent_level)
    {
        return;
    }
    let span = record.last_use().unwrap_or(record.decl_span()).clone();
    handler.emit_warn(CheckWarning {
        span,
        warning_content: Warning::StorageNeverReleased {
            name: record.name().clone(),
        },
    });
}

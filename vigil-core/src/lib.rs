//! The flow-sensitive symbol table at the heart of the Vigil checker.
//!
//! A checker walking C-like source needs to answer two questions at every
//! use site: what does this name denote here, and what is known about the
//! storage it denotes on this path? This crate answers both with one
//! structure, a scope tree whose frames carry both bindings and per-path
//! analysis state, instead of a symbol table plus a separate dataflow pass
//! over a CFG.
//!
//! The caller drives the tree through the source in a single pass:
//!
//! - [ScopeTree::enter_scope] and [ScopeTree::exit_scope] follow the block
//!   structure; [ScopeTree::enter_file] and [ScopeTree::exit_file] bracket
//!   translation units over the two permanent frames.
//! - [ScopeTree::add_entry] registers declarations; [ScopeTree::lookup] and
//!   [ScopeTree::lookup_mut] resolve names, the latter isolating mutations
//!   inside conditional paths automatically.
//! - [ScopeTree::true_branch], [ScopeTree::alt_branch], and
//!   [ScopeTree::pop_branches] fork and merge conditional paths;
//!   [ScopeTree::switch_branch], [ScopeTree::new_case], and
//!   [ScopeTree::exit_switch] do the same for switch statements,
//!   fall-through included.
//!
//! Scope exits and branch merges are where the checking happens: retired
//! bindings are checked for uses and release obligations, and states from
//! sibling paths are joined conservatively so anything suspect on one path
//! stays visible after the merge.

pub mod error;
pub mod scope;
pub mod storage;

pub use error::ScopeError;
pub use scope::{
    AliasTable, BindingKind, BranchExit, ClauseKind, Coordinate, DatatypeInfo, ExitKind, FrameId,
    FrameKind, FunctionInfo, GlobalSpec, GuardSet, PredicateInfo, ScopeTree, SymbolKind,
    SymbolRecord, TagKind, VariableInfo,
};
pub use storage::{
    AliasKind, Definedness, Nullness, StorageId, StorageOrigin, StorageRef, StorageState,
};

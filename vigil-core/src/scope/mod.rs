pub mod alias;
mod branch;
pub mod control;
pub mod frame;
pub mod guards;
mod obligations;
pub mod symbol;
pub mod tree;

pub use alias::AliasTable;
pub use control::{BranchExit, ClauseKind, ExitKind, PredicateInfo};
pub use frame::{Coordinate, FrameId, FrameKind};
pub use guards::GuardSet;
pub use symbol::{
    BindingKind, DatatypeInfo, FunctionInfo, GlobalSpec, SymbolKind, SymbolRecord, TagKind,
    VariableInfo,
};
pub use tree::ScopeTree;

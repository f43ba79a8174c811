pub mod reference;
pub mod state;

pub use reference::{StorageId, StorageOrigin, StorageRef};
pub use state::{AliasKind, Definedness, Nullness, StorageState};

//! Identity of storage locations, separately from the bindings naming them.

use crate::storage::state::StorageState;

/// Stable identity of one storage root.
///
/// The ordinal is unique across a whole run. The level records the lexical
/// level of the frame the storage was declared in and drives level-scoped
/// pruning of alias and guard facts when that level is left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StorageId {
    pub(crate) level: usize,
    pub(crate) ordinal: u64,
}

impl StorageId {
    /// The placeholder identity of a reference not yet registered anywhere.
    pub(crate) const DETACHED: StorageId = StorageId {
        level: usize::MAX,
        ordinal: u64::MAX,
    };

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn ordinal(&self) -> u64 {
        self.ordinal
    }
}

/// Where a storage root comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageOrigin {
    /// A local declaration.
    Local,
    /// A function parameter.
    Param,
    /// A global or file-static declaration.
    Global,
    /// Anonymous storage, e.g. an intermediate result the caller tracks.
    Temporary,
}

impl StorageOrigin {
    pub fn is_local(&self) -> bool {
        matches!(self, StorageOrigin::Local)
    }
}

/// A binding's handle to a storage location and its analysis state.
///
/// Exactly one record per frame owns a reference to a given root. Copies made
/// for branch frames share the id, so they still denote the same storage,
/// while their states diverge per path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageRef {
    id: StorageId,
    origin: StorageOrigin,
    state: StorageState,
}

impl StorageRef {
    /// A reference not yet registered with a tree. The tree assigns the
    /// definitive id when the owning record is added to a frame.
    pub fn detached(origin: StorageOrigin, state: StorageState) -> StorageRef {
        StorageRef {
            id: StorageId::DETACHED,
            origin,
            state,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.id != StorageId::DETACHED
    }

    pub(crate) fn attach(&mut self, id: StorageId) {
        debug_assert!(!self.is_attached(), "storage attached twice");
        self.id = id;
    }

    pub fn id(&self) -> StorageId {
        self.id
    }

    pub fn origin(&self) -> StorageOrigin {
        self.origin
    }

    pub fn state(&self) -> &StorageState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut StorageState {
        &mut self.state
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn detached_reference_accepts_one_attachment() {
        let mut storage = StorageRef::detached(StorageOrigin::Local, StorageState::undefined());
        assert!(!storage.is_attached());
        storage.attach(StorageId {
            level: 2,
            ordinal: 7,
        });
        assert!(storage.is_attached());
        assert_eq!(storage.id().level(), 2);
        assert_eq!(storage.id().ordinal(), 7);
    }
}

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    sync::RwLock,
};

/// A compact stand-in for a file path.
///
/// Diagnostics and spans refer to files through these instead of carrying
/// paths around; the [SourceEngine] owns the mapping in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceId {
    pub(crate) id: u32,
}

/// The Source Engine hands out integer-based [SourceId]s for file paths and
/// can resolve them back again. Internal maps are behind `RwLock`s so the
/// engine can be shared by reference across the whole check of a program.
#[derive(Debug, Default)]
pub struct SourceEngine {
    next_id: RwLock<u32>,
    source_map: RwLock<FxHashMap<PathBuf, SourceId>>,
    path_map: RwLock<FxHashMap<SourceId, PathBuf>>,
}

impl SourceEngine {
    /// Returns the id registered for `path`, registering a fresh one if the
    /// path has not been seen before.
    pub fn get_source_id(&self, path: &Path) -> SourceId {
        {
            let source_map = self.source_map.read().unwrap();
            if let Some(source_id) = source_map.get(path) {
                return *source_id;
            }
        }

        let mut next_id = self.next_id.write().unwrap();
        let source_id = SourceId { id: *next_id };
        *next_id += 1;

        self.source_map
            .write()
            .unwrap()
            .insert(path.to_path_buf(), source_id);
        self.path_map
            .write()
            .unwrap()
            .insert(source_id, path.to_path_buf());

        source_id
    }

    /// The file path a [SourceId] was registered under, if any.
    pub fn get_path(&self, source_id: &SourceId) -> Option<PathBuf> {
        self.path_map.read().unwrap().get(source_id).cloned()
    }
}

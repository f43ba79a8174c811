//! Frames, the nodes of the scope tree.

use crate::scope::alias::AliasTable;
use crate::scope::control::ExitKind;
use crate::scope::guards::GuardSet;
use crate::scope::symbol::{SymbolKind, SymbolRecord};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::fmt;

/// A handle into the tree's frame arena.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct FrameId(pub(crate) slotmap::DefaultKey);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// The root frame holding exported declarations. Never popped.
    Global,
    /// Holds one translation unit's file-static declarations. Emptied
    /// between files, never popped.
    FileStatic,
    /// An ordinary lexical scope, including function bodies.
    Normal,
    /// The block scope of a switch statement. Lexical, unlike the case
    /// frames forked under it.
    Switch,
    TrueBranch,
    FalseBranch,
    CaseBranch,
}

impl FrameKind {
    /// Branch frames are the ephemeral per-path siblings of a control fork.
    pub fn is_branch(&self) -> bool {
        matches!(
            self,
            FrameKind::TrueBranch | FrameKind::FalseBranch | FrameKind::CaseBranch
        )
    }

    pub fn is_permanent(&self) -> bool {
        matches!(self, FrameKind::Global | FrameKind::FileStatic)
    }

    /// Lexical frames occupy a level of their own and own the records that
    /// coordinates address. Branch frames share their parent's level and
    /// hold only indirection copies.
    pub fn is_lexical(&self) -> bool {
        !self.is_branch()
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            FrameKind::Global => "global",
            FrameKind::FileStatic => "file",
            FrameKind::Normal => "block",
            FrameKind::Switch => "switch",
            FrameKind::TrueBranch => "true branch",
            FrameKind::FalseBranch => "false branch",
            FrameKind::CaseBranch => "case",
        };
        write!(f, "{s}")
    }
}

/// The address of a record on the active path: the lexical level of the
/// frame owning it and the record's position in that frame.
///
/// The active path holds at most one lexical frame per level, so a
/// coordinate is unambiguous for as long as that frame is alive. A
/// coordinate outlives nothing: once the level is popped, resolution
/// falls back to a pessimistic sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Coordinate {
    pub level: usize,
    pub index: usize,
}

/// A true branch or closed case waiting in its parent for the merge that
/// retires it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ParkedBranch {
    pub frame: FrameId,
    /// The path's escape behavior when it was parked.
    pub exit: ExitKind,
    /// The path ended at a break, so it rejoins after the switch.
    pub broke: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct ScopeFrame {
    pub kind: FrameKind,
    pub level: usize,
    pub parent: Option<FrameId>,
    pub records: Vec<SymbolRecord>,
    /// Name lookup for permanent frames, which grow large and live long.
    /// Inner frames stay small enough to scan.
    name_index: Option<IndexMap<String, usize>>,
    /// For branch frames, maps the coordinate of a record owned further out
    /// to this path's private copy of it.
    indirection: Option<FxHashMap<Coordinate, usize>>,
    pub aliases: AliasTable,
    pub guards: GuardSet,
    pub exit_kind: ExitKind,
    pub must_break: bool,
    pub parked: SmallVec<[ParkedBranch; 2]>,
}

impl ScopeFrame {
    pub fn new(kind: FrameKind, level: usize, parent: Option<FrameId>) -> ScopeFrame {
        ScopeFrame {
            kind,
            level,
            parent,
            records: Vec::new(),
            name_index: kind.is_permanent().then(IndexMap::new),
            indirection: kind.is_branch().then(FxHashMap::default),
            aliases: AliasTable::new(),
            guards: GuardSet::new(),
            exit_kind: ExitKind::Never,
            must_break: false,
            parked: SmallVec::new(),
        }
    }

    pub fn push_record(&mut self, record: SymbolRecord) -> usize {
        let index = self.records.len();
        if let Some(names) = self.name_index.as_mut() {
            names.insert(index_key(&record), index);
        }
        self.records.push(record);
        index
    }

    /// Finds a record in this frame by name. Tags live in a namespace of
    /// their own, as in C, so a `struct x` never collides with a variable
    /// `x`. Branch frames find the copy a name-walk installed; each name
    /// has at most one copy here, because only the innermost visible record
    /// of a name is ever copied.
    pub fn find_in_namespace(&self, name: &str, tags: bool) -> Option<usize> {
        if let Some(names) = self.name_index.as_ref() {
            return if tags {
                names.get(&format!("tag {name}")).copied()
            } else {
                names.get(name).copied()
            };
        }
        self.records.iter().rposition(|record| {
            record.name().as_str() == name
                && matches!(record.kind(), SymbolKind::Tag(_)) == tags
        })
    }

    /// This path's copy of the record at `coord`, if one was made.
    pub fn local_copy_of(&self, coord: Coordinate) -> Option<usize> {
        self.indirection.as_ref()?.get(&coord).copied()
    }

    /// The coordinate a branch-frame copy stands in for.
    pub fn origin_of_copy(&self, index: usize) -> Option<Coordinate> {
        let indirection = self.indirection.as_ref()?;
        indirection
            .iter()
            .find(|(_, copy)| **copy == index)
            .map(|(coord, _)| *coord)
    }

    /// Installs or overwrites this path's copy for `coord`.
    pub fn install_copy(&mut self, coord: Coordinate, record: SymbolRecord) -> usize {
        debug_assert!(self.kind.is_branch(), "copies only live in branch frames");
        let indirection = self
            .indirection
            .as_mut()
            .expect("branch frames always carry an indirection map");
        if let Some(index) = indirection.get(&coord).copied() {
            self.records[index] = record;
            index
        } else {
            let index = self.records.len();
            indirection.insert(coord, index);
            self.records.push(record);
            index
        }
    }

    /// The coordinates this branch frame touched, in a stable order.
    pub fn touched_coordinates(&self) -> Vec<Coordinate> {
        use itertools::Itertools;
        match self.indirection.as_ref() {
            Some(indirection) => indirection.keys().copied().sorted().collect(),
            None => Vec::new(),
        }
    }

    /// Empties a permanent frame between translation units.
    pub fn reset(&mut self) {
        self.records.clear();
        if let Some(names) = self.name_index.as_mut() {
            names.clear();
        }
        self.aliases = AliasTable::new();
        self.guards = GuardSet::new();
        self.exit_kind = ExitKind::Never;
        self.must_break = false;
        self.parked.clear();
    }
}

fn index_key(record: &SymbolRecord) -> String {
    let name = record.name().as_str();
    if matches!(record.kind(), SymbolKind::Tag(_)) {
        format!("tag {name}")
    } else {
        name.to_owned()
    }
}

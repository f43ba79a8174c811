//! Must-alias facts between storage roots.
//!
//! Each frame carries its own table so branch paths can diverge; the table
//! is copied from the parent when a frame opens and folded back on exit.
//! The copies are persistent maps, so the copy on every scope entry is
//! cheap regardless of how many facts have accumulated.
//!
//! Facts are directed. `add_must_alias(a, b)` always records that `a`
//! certainly names `b`'s storage; the mirror fact is added only when both
//! roots are locals, since a local aliasing a parameter says nothing about
//! what else the parameter might name from the caller's side.

use crate::storage::{StorageId, StorageRef};
use im::{OrdMap, OrdSet};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AliasTable {
    facts: OrdMap<StorageId, OrdSet<StorageId>>,
}

impl AliasTable {
    pub fn new() -> AliasTable {
        AliasTable::default()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// The number of directed facts in the table.
    pub fn fact_count(&self) -> usize {
        self.facts.values().map(|set| set.len()).sum()
    }

    /// Records that `a` names `b`'s storage, and the mirror fact when the
    /// relation is symmetric.
    pub fn add_must_alias(&mut self, a: &StorageRef, b: &StorageRef) {
        self.insert_fact(a.id(), b.id());
        if a.origin().is_local() && b.origin().is_local() {
            self.insert_fact(b.id(), a.id());
        }
    }

    fn insert_fact(&mut self, from: StorageId, to: StorageId) {
        let mut partners = self.facts.get(&from).cloned().unwrap_or_default();
        partners.insert(to);
        self.facts.insert(from, partners);
    }

    /// Every root `id` is known to name.
    pub fn all_aliases(&self, id: StorageId) -> OrdSet<StorageId> {
        self.facts.get(&id).cloned().unwrap_or_default()
    }

    /// Whether a fact links the two roots in either direction.
    pub fn aliases(&self, a: StorageId, b: StorageId) -> bool {
        self.facts.get(&a).is_some_and(|set| set.contains(&b))
            || self.facts.get(&b).is_some_and(|set| set.contains(&a))
    }

    /// Removes every fact mentioning `id`, in both directions. Called when
    /// the root is reassigned and its old facts stop being true.
    pub fn clear_aliases(&mut self, id: StorageId) {
        self.facts = self
            .facts
            .iter()
            .filter(|(from, _)| **from != id)
            .map(|(from, partners)| (*from, partners.without(&id)))
            .filter(|(_, partners)| !partners.is_empty())
            .collect();
    }

    /// Replaces this table with an exited child frame's table, pruned to
    /// `max_level`. The child started from a copy of this table, so its
    /// version subsumes everything recorded here, including facts it
    /// deliberately cleared.
    pub fn fold_child(&mut self, child: AliasTable, max_level: usize) {
        *self = child;
        self.retain_at_most(max_level);
    }

    /// The facts present in both tables. Used when two branch paths merge;
    /// only relations that held on both survive.
    pub fn intersect(&self, other: &AliasTable) -> AliasTable {
        let facts = self
            .facts
            .iter()
            .filter_map(|(from, partners)| {
                let theirs = other.facts.get(from)?;
                let both = partners.clone().intersection(theirs.clone());
                (!both.is_empty()).then_some((*from, both))
            })
            .collect();
        AliasTable { facts }
    }

    /// Drops every fact mentioning storage declared deeper than `level`.
    pub fn retain_at_most(&mut self, level: usize) {
        self.facts = self
            .facts
            .iter()
            .filter(|(from, _)| from.level() <= level)
            .map(|(from, partners)| {
                let kept: OrdSet<StorageId> = partners
                    .iter()
                    .filter(|to| to.level() <= level)
                    .cloned()
                    .collect();
                (*from, kept)
            })
            .filter(|(_, partners)| !partners.is_empty())
            .collect();
    }

    /// Whether any root declared at `max_level` or shallower still reaches
    /// `id`'s storage, in either direction.
    pub fn has_live_alias(&self, id: StorageId, max_level: usize) -> bool {
        if self
            .facts
            .get(&id)
            .is_some_and(|partners| partners.iter().any(|to| to.level() <= max_level))
        {
            return true;
        }
        self.facts
            .iter()
            .any(|(from, partners)| from.level() <= max_level && partners.contains(&id))
    }
}

//! Path-local null refinements.
//!
//! A guard records that a tested predicate settled the null state of a
//! storage root on the current path, without rewriting the root's stored
//! state. Guards live in the frame whose path they refine; a query walks
//! outward from the innermost frame and stops at the root's declaring level,
//! so a guard never outlives the storage it talks about.
//!
//! Killed entries are the other half of branch isolation. Assigning to a
//! guarded pointer inside a branch must not erase a guard recorded in an
//! outer frame, because the sibling branch still runs under that guard.
//! Instead the branch records a kill, which shadows every outer guard for
//! that root on this path only.

use crate::storage::StorageId;
use im::OrdSet;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GuardSet {
    not_null: OrdSet<StorageId>,
    is_null: OrdSet<StorageId>,
    killed: OrdSet<StorageId>,
}

impl GuardSet {
    pub fn new() -> GuardSet {
        GuardSet::default()
    }

    pub fn is_empty(&self) -> bool {
        self.not_null.is_empty() && self.is_null.is_empty() && self.killed.is_empty()
    }

    /// Records that the root tested not null on this path. Clears any
    /// opposite guard or kill for the same root.
    pub fn guard_not_null(&mut self, id: StorageId) {
        self.not_null.insert(id);
        self.is_null.remove(&id);
        self.killed.remove(&id);
    }

    /// Records that the root tested null on this path.
    pub fn guard_null(&mut self, id: StorageId) {
        self.is_null.insert(id);
        self.not_null.remove(&id);
        self.killed.remove(&id);
    }

    /// Withdraws any guard for the root and shadows outer guards for it.
    pub fn retract(&mut self, id: StorageId) {
        self.not_null.remove(&id);
        self.is_null.remove(&id);
        self.killed.insert(id);
    }

    /// Merges another set of guards into this one. Polarities from `other`
    /// win over this set's, and roots `other` killed without re-guarding are
    /// killed here too.
    pub fn add_guards(&mut self, other: &GuardSet) {
        for id in other.not_null.iter() {
            self.guard_not_null(*id);
        }
        for id in other.is_null.iter() {
            self.guard_null(*id);
        }
        for id in other.killed.iter() {
            if !other.not_null.contains(id) && !other.is_null.contains(id) {
                self.retract(*id);
            }
        }
    }

    /// The guards that hold when the guarded predicate is false. Kills are
    /// not polarity facts and stay as they are.
    pub fn negated(&self) -> GuardSet {
        GuardSet {
            not_null: self.is_null.clone(),
            is_null: self.not_null.clone(),
            killed: self.killed.clone(),
        }
    }

    /// The kills of this set without its polarities. This is what survives
    /// a merge against a path that carried no guards at all.
    pub fn kills_only(&self) -> GuardSet {
        GuardSet {
            not_null: OrdSet::new(),
            is_null: OrdSet::new(),
            killed: self.killed.clone(),
        }
    }

    /// The guards that survive a merge of two paths. A polarity survives
    /// only when both paths agree on it; a kill on either path survives.
    pub fn intersect(&self, other: &GuardSet) -> GuardSet {
        GuardSet {
            not_null: self.not_null.clone().intersection(other.not_null.clone()),
            is_null: self.is_null.clone().intersection(other.is_null.clone()),
            killed: self.killed.clone().union(other.killed.clone()),
        }
    }

    /// Folds the guards of an exited frame into this one, dropping every
    /// fact about storage declared deeper than `max_level`. Kills are
    /// applied before polarities so a fact re-established after a kill in
    /// the exited frame still lands.
    pub fn absorb(&mut self, child: &GuardSet, max_level: usize) {
        for id in child.killed.iter().filter(|id| id.level() <= max_level) {
            self.retract(*id);
        }
        for id in child.not_null.iter().filter(|id| id.level() <= max_level) {
            self.guard_not_null(*id);
        }
        for id in child.is_null.iter().filter(|id| id.level() <= max_level) {
            self.guard_null(*id);
        }
    }

    /// Drops every fact about storage declared deeper than `level`.
    pub fn retain_at_most(&mut self, level: usize) {
        self.not_null = keep_shallow(&self.not_null, level);
        self.is_null = keep_shallow(&self.is_null, level);
        self.killed = keep_shallow(&self.killed, level);
    }

    pub fn affirms_not_null(&self, id: StorageId) -> bool {
        self.not_null.contains(&id)
    }

    pub fn affirms_null(&self, id: StorageId) -> bool {
        self.is_null.contains(&id)
    }

    pub fn kills(&self, id: StorageId) -> bool {
        self.killed.contains(&id)
    }
}

fn keep_shallow(set: &OrdSet<StorageId>, level: usize) -> OrdSet<StorageId> {
    set.iter().filter(|id| id.level() <= level).cloned().collect()
}

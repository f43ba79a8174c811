//! Forking and merging of conditional paths.
//!
//! A conditional forks a branch frame per path off the frame that was
//! current at the test. Branch frames share the forking frame's level and
//! own no addressed records; anything mutated inside is copied in on first
//! touch instead, keyed by the coordinate of the original. The sibling path
//! and the parent keep reading the untouched originals until the merge.
//!
//! Merging is a per-coordinate join over every path that can reach the code
//! after the construct. A path that must escape, or ends at a break, stops
//! contributing state; its use marks still count, a use on a dying path is
//! a use. When no path survives at all, the true path's state is adopted so
//! later code still has something coherent to read.
//!
//! Switch statements differ in that the switch block itself is a lexical
//! frame (case labels can sit after declarations) while each case body is a
//! branch frame under it. Cases close one of three ways: break, escape, or
//! fall-through into the next case, which seeds the next case with the join
//! of the previous case's end state and a direct jump to the label.

use crate::error::{fatal, ScopeError};
use crate::scope::alias::AliasTable;
use crate::scope::control::{BranchExit, ClauseKind, ExitKind, PredicateInfo};
use crate::scope::frame::{Coordinate, FrameId, FrameKind, ParkedBranch, ScopeFrame};
use crate::scope::guards::GuardSet;
use crate::scope::obligations;
use crate::scope::symbol::SymbolRecord;
use crate::scope::tree::ScopeTree;
use itertools::Itertools;
use tracing::trace;
use vigil_error::handler::Handler;

impl ScopeTree {
    /// Forks the true path of a conditional off the current frame. `guards`
    /// carries what the tested predicate settles on this path.
    pub fn true_branch(&mut self, guards: GuardSet) {
        let parent = self.current;
        let level = self.frames[parent.0].level;
        let mut frame = ScopeFrame::new(FrameKind::TrueBranch, level, Some(parent));
        frame.aliases = self.frames[parent.0].aliases.clone();
        frame.guards = guards;
        self.current = FrameId(self.frames.insert(frame));
        trace!(level, "forked true branch");
    }

    /// Suspends the true path and forks the false path from the state the
    /// parent held before the fork.
    pub fn alt_branch(&mut self, guards: GuardSet) -> Result<(), ScopeError> {
        let kind = self.frames[self.current.0].kind;
        if kind != FrameKind::TrueBranch {
            return Err(fatal(ScopeError::AltWithoutTrueBranch(kind)));
        }
        let suspended = self.current;
        let parent = self.frames[suspended.0]
            .parent
            .expect("branch frames always have a parent");
        let exit = self.frames[suspended.0].exit_kind;
        let broke = self.frames[suspended.0].must_break;
        self.frames[parent.0].parked.push(ParkedBranch {
            frame: suspended,
            exit,
            broke,
        });
        let level = self.frames[parent.0].level;
        let mut frame = ScopeFrame::new(FrameKind::FalseBranch, level, Some(parent));
        frame.aliases = self.frames[parent.0].aliases.clone();
        frame.guards = guards;
        self.current = FrameId(self.frames.insert(frame));
        trace!(level, "forked false branch");
        Ok(())
    }

    /// Retires the branch frames of a two-path conditional and merges the
    /// surviving paths into the parent. With `optional` set there is no
    /// false frame; the false path is synthesized from the parent's own
    /// state plus the predicate's negated guards, which is how `if` without
    /// `else` and single-pass loop bodies merge.
    pub fn pop_branches(
        &mut self,
        pred: &PredicateInfo,
        true_info: &BranchExit,
        false_info: &BranchExit,
        optional: bool,
        clause: ClauseKind,
    ) -> Result<(), ScopeError> {
        let kind = self.frames[self.current.0].kind;
        if optional {
            if kind != FrameKind::TrueBranch {
                return Err(fatal(ScopeError::PopWithoutBranch(clause, kind)));
            }
            let frame = self
                .frames
                .remove(self.current.0)
                .expect("the current frame is always in the arena");
            self.current = frame.parent.expect("branch frames always have a parent");
            self.merge_single(frame, true_info, pred, clause);
            Ok(())
        } else {
            if kind != FrameKind::FalseBranch {
                return Err(fatal(ScopeError::PopWithoutBranch(clause, kind)));
            }
            let false_frame = self
                .frames
                .remove(self.current.0)
                .expect("the current frame is always in the arena");
            let parent = false_frame
                .parent
                .expect("branch frames always have a parent");
            let parked = self.frames[parent.0]
                .parked
                .pop()
                .expect("a false branch always has a parked true sibling");
            let true_frame = self
                .frames
                .remove(parked.frame.0)
                .expect("parked branches stay in the arena");
            self.current = parent;
            self.merge_pair(true_frame, false_frame, true_info, false_info, clause);
            Ok(())
        }
    }

    fn merge_pair(
        &mut self,
        true_frame: ScopeFrame,
        false_frame: ScopeFrame,
        true_info: &BranchExit,
        false_info: &BranchExit,
        clause: ClauseKind,
    ) {
        let t_exit = true_frame.exit_kind.then(true_info.exit);
        let f_exit = false_frame.exit_kind.then(false_info.exit);
        let t_live = !t_exit.must_escape() && !true_frame.must_break;
        let f_live = !f_exit.must_escape() && !false_frame.must_break;

        let coords: Vec<Coordinate> = true_frame
            .touched_coordinates()
            .into_iter()
            .chain(false_frame.touched_coordinates())
            .sorted()
            .dedup()
            .collect();
        for coord in coords {
            let t_rec = true_frame
                .local_copy_of(coord)
                .map(|i| &true_frame.records[i]);
            let f_rec = false_frame
                .local_copy_of(coord)
                .map(|i| &false_frame.records[i]);
            let Some(merged) = self.join_pair(coord, t_rec, f_rec, t_live, f_live) else {
                continue;
            };
            self.write_back(coord, merged);
        }

        let merged_guards = match (t_live, f_live) {
            (true, true) => true_frame.guards.intersect(&false_frame.guards),
            (true, false) => true_frame.guards.clone(),
            (false, true) => false_frame.guards.clone(),
            (false, false) => GuardSet::new(),
        };
        let merged_aliases = match (t_live, f_live) {
            (true, true) => true_frame.aliases.intersect(&false_frame.aliases),
            (true, false) | (false, false) => true_frame.aliases.clone(),
            (false, true) => false_frame.aliases.clone(),
        };
        let parent = self.current;
        let parent_level = self.frames[parent.0].level;
        let parent_frame = &mut self.frames[parent.0];
        parent_frame.guards.absorb(&merged_guards, parent_level);
        let mut aliases = merged_aliases;
        aliases.retain_at_most(parent_level);
        parent_frame.aliases = aliases;

        // A path ending at a break leaves the construct without escaping
        // the function.
        let t_path = if !t_exit.must_escape() && true_frame.must_break {
            ExitKind::Never
        } else {
            t_exit
        };
        let f_path = if !f_exit.must_escape() && false_frame.must_break {
            ExitKind::Never
        } else {
            f_exit
        };
        parent_frame.exit_kind = parent_frame.exit_kind.then(t_path.combine_branches(f_path));
        if !is_loop(clause) {
            parent_frame.must_break |= true_frame.must_break && false_frame.must_break;
        }
        trace!(%clause, t_live, f_live, "merged branch pair");
    }

    fn merge_single(
        &mut self,
        frame: ScopeFrame,
        info: &BranchExit,
        pred: &PredicateInfo,
        clause: ClauseKind,
    ) {
        let exit = frame.exit_kind.then(info.exit);
        let live = !exit.must_escape() && !frame.must_break;

        for coord in frame.touched_coordinates() {
            let Some(index) = frame.local_copy_of(coord) else {
                continue;
            };
            let touched = &frame.records[index];
            let Some(base) = self.resolve_on_path(coord) else {
                continue;
            };
            let mut merged = base.clone();
            if live {
                merged.merge_branch(touched);
            } else {
                merged.fold_use_from(touched);
            }
            self.write_back(coord, merged);
        }

        let parent = self.current;
        let parent_level = self.frames[parent.0].level;
        if live {
            let merged_guards = frame.guards.intersect(&pred.negated_guards);
            let mut merged_aliases = self.frames[parent.0].aliases.intersect(&frame.aliases);
            merged_aliases.retain_at_most(parent_level);
            let parent_frame = &mut self.frames[parent.0];
            parent_frame.guards.absorb(&merged_guards, parent_level);
            parent_frame.aliases = merged_aliases;
        } else {
            // The branch never rejoins, so the continuing path is exactly
            // the one where the predicate failed.
            let parent_frame = &mut self.frames[parent.0];
            parent_frame.guards.absorb(&pred.negated_guards, parent_level);
        }
        let path_exit = if !exit.must_escape() && frame.must_break {
            ExitKind::Never
        } else {
            exit
        };
        let parent_frame = &mut self.frames[parent.0];
        parent_frame.exit_kind = parent_frame
            .exit_kind
            .then(path_exit.combine_branches(ExitKind::Never));
        trace!(%clause, live, "merged optional branch");
    }

    fn join_pair(
        &self,
        coord: Coordinate,
        t_rec: Option<&SymbolRecord>,
        f_rec: Option<&SymbolRecord>,
        t_live: bool,
        f_live: bool,
    ) -> Option<SymbolRecord> {
        let base = self.resolve_on_path(coord);
        match (t_live, f_live) {
            (true, true) => {
                let mut merged = t_rec.or(base)?.clone();
                if let Some(other) = f_rec.or(base) {
                    merged.merge_branch(other);
                }
                Some(merged)
            }
            (false, true) => {
                let mut merged = f_rec.or(base)?.clone();
                if let Some(dead) = t_rec {
                    merged.fold_use_from(dead);
                }
                Some(merged)
            }
            // Both paths die; adopt the true path so later (unreachable)
            // code reads a coherent state.
            (true, false) | (false, false) => {
                let mut merged = t_rec.or(base)?.clone();
                if let Some(dead) = f_rec {
                    merged.fold_use_from(dead);
                }
                Some(merged)
            }
        }
    }

    /// Installs a merged record at the innermost place on the path that owns
    /// a view of `coord`: the nearest enclosing branch frame's copy table,
    /// or the owning lexical frame itself.
    fn write_back(&mut self, coord: Coordinate, record: SymbolRecord) {
        enum Target {
            Copy(FrameId),
            Owner(FrameId),
        }
        let mut target = None;
        for id in self.path() {
            let frame = &self.frames[id.0];
            if frame.kind.is_branch() {
                target = Some(Target::Copy(id));
                break;
            }
            if frame.level == coord.level {
                target = Some(Target::Owner(id));
                break;
            }
        }
        match target {
            Some(Target::Copy(id)) => {
                self.frames[id.0].install_copy(coord, record);
            }
            Some(Target::Owner(id)) => {
                if let Some(slot) = self.frames[id.0].records.get_mut(coord.index) {
                    *slot = record;
                }
            }
            None => {}
        }
    }

    // -------------------------------------------------------------------
    // Switch statements.
    // -------------------------------------------------------------------

    /// Opens the block scope of a switch statement. The block is lexical,
    /// so declarations before the first label live here; the case bodies
    /// fork under it.
    pub fn switch_branch(&mut self) {
        let parent = self.current;
        let level = self.frames[parent.0].level + 1;
        let mut frame = ScopeFrame::new(FrameKind::Switch, level, Some(parent));
        frame.aliases = self.frames[parent.0].aliases.clone();
        self.current = FrameId(self.frames.insert(frame));
        trace!(level, "entered switch scope");
    }

    /// Starts the next case of the innermost switch, closing the previous
    /// case first if one is open. `prev` describes how the previous case's
    /// body ended.
    pub fn new_case(&mut self, prev: &BranchExit) -> Result<(), ScopeError> {
        let kind = self.frames[self.current.0].kind;
        match kind {
            FrameKind::Switch => {
                self.open_case(self.current, None);
                Ok(())
            }
            FrameKind::CaseBranch => {
                let closing = self.current;
                let switch = self.frames[closing.0]
                    .parent
                    .expect("case frames always have a parent");
                let fall = self.park_or_fall(closing, switch, prev);
                self.current = switch;
                self.open_case(switch, fall);
                Ok(())
            }
            _ => Err(fatal(ScopeError::CaseOutsideSwitch(kind))),
        }
    }

    /// Detaches a finished case from the path. A case ending in a break or
    /// an escape parks on the switch frame for the final merge; a case that
    /// falls off its end is handed back so its state can seed whatever
    /// comes next.
    fn park_or_fall(
        &mut self,
        closing: FrameId,
        switch: FrameId,
        info: &BranchExit,
    ) -> Option<ScopeFrame> {
        let exit = self.frames[closing.0].exit_kind.then(info.exit);
        let broke = self.frames[closing.0].must_break;
        if exit.must_escape() || broke {
            self.frames[switch.0].parked.push(ParkedBranch {
                frame: closing,
                exit,
                broke: broke && !exit.must_escape(),
            });
            None
        } else {
            let mut frame = self
                .frames
                .remove(closing.0)
                .expect("the closing case is in the arena");
            frame.exit_kind = exit;
            Some(frame)
        }
    }

    fn open_case(&mut self, switch: FrameId, fall: Option<ScopeFrame>) {
        let level = self.frames[switch.0].level;
        let mut frame = ScopeFrame::new(FrameKind::CaseBranch, level, Some(switch));
        match fall {
            Some(prev) => {
                // Control reaches this label two ways: falling out of the
                // previous case, or jumping straight here. Seed the case
                // with the join of both.
                frame.exit_kind = prev.exit_kind;
                frame.aliases = prev.aliases.intersect(&self.frames[switch.0].aliases);
                frame.guards = prev.guards.kills_only();
                let id = FrameId(self.frames.insert(frame));
                self.current = id;
                for coord in prev.touched_coordinates() {
                    let Some(index) = prev.local_copy_of(coord) else {
                        continue;
                    };
                    let Some(base) = self.resolve_on_path(coord) else {
                        continue;
                    };
                    let mut merged = base.clone();
                    merged.merge_branch(&prev.records[index]);
                    self.frames[id.0].install_copy(coord, merged);
                }
                trace!("opened case after fall-through");
            }
            None => {
                frame.aliases = self.frames[switch.0].aliases.clone();
                self.current = FrameId(self.frames.insert(frame));
                trace!("opened case");
            }
        }
    }

    /// Closes the innermost switch statement. Joins every path that can
    /// reach the code after the switch, then retires the switch's block
    /// scope like any other.
    ///
    /// `last` describes how the final case body ended, and `has_default`
    /// says whether some label catches every value; without one the
    /// pre-switch state joins in as the path where no label matched.
    pub fn exit_switch(
        &mut self,
        handler: &Handler,
        last: &BranchExit,
        has_default: bool,
    ) -> Result<(), ScopeError> {
        let kind = self.frames[self.current.0].kind;
        let (switch, last_case) = match kind {
            FrameKind::Switch => (self.current, None),
            FrameKind::CaseBranch => {
                let closing = self.current;
                let switch = self.frames[closing.0]
                    .parent
                    .expect("case frames always have a parent");
                (switch, Some(closing))
            }
            _ => return Err(fatal(ScopeError::ExitSwitchOutsideSwitch(kind))),
        };

        let mut live: Vec<ScopeFrame> = Vec::new();
        let mut escaped: Vec<ScopeFrame> = Vec::new();
        let mut path_exits: Vec<ExitKind> = Vec::new();
        if let Some(closing) = last_case {
            let fall = self.park_or_fall(closing, switch, last);
            self.current = switch;
            if let Some(frame) = fall {
                // Falling off the end of the last case rejoins like a break.
                path_exits.push(frame.exit_kind);
                live.push(frame);
            }
        }
        let parked: Vec<ParkedBranch> = self.frames[switch.0].parked.drain(..).collect();
        for entry in parked {
            let frame = self
                .frames
                .remove(entry.frame.0)
                .expect("parked cases stay in the arena");
            path_exits.push(entry.exit);
            if entry.broke {
                live.push(frame);
            } else {
                escaped.push(frame);
            }
        }
        if !has_default {
            // The path where no label matched.
            path_exits.push(ExitKind::Never);
        }

        let coords: Vec<Coordinate> = live
            .iter()
            .chain(escaped.iter())
            .flat_map(|frame| frame.touched_coordinates())
            .sorted()
            .dedup()
            .collect();
        for coord in coords {
            let Some(base) = self.resolve_on_path(coord) else {
                continue;
            };
            let mut sources: Vec<&SymbolRecord> = live
                .iter()
                .map(|frame| {
                    frame
                        .local_copy_of(coord)
                        .map(|i| &frame.records[i])
                        .unwrap_or(base)
                })
                .collect();
            if !has_default {
                sources.push(base);
            }
            let mut merged = match sources.split_first() {
                Some((first, rest)) => {
                    let mut joined = (*first).clone();
                    for other in rest {
                        joined.merge_branch(other);
                    }
                    joined
                }
                None => base.clone(),
            };
            for frame in &escaped {
                if let Some(index) = frame.local_copy_of(coord) {
                    merged.fold_use_from(&frame.records[index]);
                }
            }
            self.write_back(coord, merged);
        }

        let switch_level = self.frames[switch.0].level;
        let mut merged_guards: Option<GuardSet> = None;
        let mut merged_aliases: Option<AliasTable> = None;
        for frame in &live {
            merged_guards = Some(match merged_guards {
                Some(acc) => acc.intersect(&frame.guards),
                None => frame.guards.clone(),
            });
            merged_aliases = Some(match merged_aliases {
                Some(acc) => acc.intersect(&frame.aliases),
                None => frame.aliases.clone(),
            });
        }
        if !has_default {
            merged_guards = merged_guards.map(|acc| acc.kills_only());
            merged_aliases = Some(match merged_aliases {
                Some(acc) => acc.intersect(&self.frames[switch.0].aliases),
                None => self.frames[switch.0].aliases.clone(),
            });
        }
        {
            let total = path_exits
                .iter()
                .copied()
                .reduce(ExitKind::combine_branches)
                .unwrap_or(ExitKind::Never);
            let switch_frame = &mut self.frames[switch.0];
            if let Some(guards) = merged_guards {
                switch_frame.guards.absorb(&guards, switch_level);
            }
            if let Some(mut aliases) = merged_aliases {
                aliases.retain_at_most(switch_level);
                switch_frame.aliases = aliases;
            }
            switch_frame.exit_kind = switch_frame.exit_kind.then(total);
        }

        // Retire the switch's block scope itself.
        let frame = self
            .frames
            .remove(switch.0)
            .expect("the switch frame is in the arena");
        let parent = frame
            .parent
            .expect("switch frames always have a parent");
        let parent_level = self.frames[parent.0].level;
        obligations::check_scope_exit(handler, &frame, parent_level);
        let parent_frame = &mut self.frames[parent.0];
        parent_frame.guards.absorb(&frame.guards, parent_level);
        let exit = frame.exit_kind;
        parent_frame.aliases.fold_child(frame.aliases, parent_level);
        parent_frame.exit_kind = parent_frame.exit_kind.then(exit);
        self.current = parent;
        trace!(paths = path_exits.len(), "exited switch scope");
        Ok(())
    }
}

fn is_loop(clause: ClauseKind) -> bool {
    matches!(
        clause,
        ClauseKind::While | ClauseKind::DoWhile | ClauseKind::For
    )
}

//! The scope tree and its lookup, declaration, and scope lifecycle
//! operations.
//!
//! The tree is a stack of lexical frames rooted in two permanent ones, the
//! global frame at level 0 and the file frame at level 1. Every lexical
//! frame deeper than that occupies a level of its own, so at most one
//! lexical frame per level is ever on the active path and a
//! [Coordinate] names exactly one record for as long as its frame lives.
//!
//! Conditional constructs fork branch frames which share their parent's
//! level; see the forking operations for how state stays isolated per path.
//! Everything here is flow-sensitive but single-pass: state flows forward
//! through the walk the caller drives, and meets only at branch merges.

use crate::error::{fatal, ScopeError};
use crate::scope::control::{BranchExit, ExitKind};
use crate::scope::frame::{Coordinate, FrameId, FrameKind, ScopeFrame};
use crate::scope::guards::GuardSet;
use crate::scope::obligations;
use crate::scope::symbol::{BindingKind, SymbolKind, SymbolRecord};
use crate::storage::{StorageId, StorageRef};
use im::OrdSet;
use slotmap::{DefaultKey, SlotMap};
use tracing::trace;
use vigil_error::error::CheckError;
use vigil_error::handler::Handler;
use vigil_error::warning::{CheckWarning, Warning};
use vigil_types::{Ident, Spanned};

#[derive(Debug)]
pub struct ScopeTree {
    pub(crate) frames: SlotMap<DefaultKey, ScopeFrame>,
    pub(crate) global: FrameId,
    pub(crate) file: FrameId,
    pub(crate) current: FrameId,
    /// The frame holding the parameters of the function being walked.
    function_frame: Option<FrameId>,
    /// The address of that function's own record, for its globals clause.
    current_function: Option<Coordinate>,
    function_name: Option<Ident>,
    next_ordinal: u64,
    file_open: bool,
    sentinel: SymbolRecord,
}

impl ScopeTree {
    pub fn new() -> ScopeTree {
        let mut frames = SlotMap::new();
        let global = FrameId(frames.insert(ScopeFrame::new(FrameKind::Global, 0, None)));
        let file = FrameId(frames.insert(ScopeFrame::new(FrameKind::FileStatic, 1, Some(global))));
        ScopeTree {
            frames,
            global,
            file,
            current: file,
            function_frame: None,
            current_function: None,
            function_name: None,
            next_ordinal: 0,
            file_open: false,
            sentinel: SymbolRecord::undefined_sentinel(),
        }
    }

    pub fn current_level(&self) -> usize {
        self.frames[self.current.0].level
    }

    pub fn in_branch(&self) -> bool {
        self.frames[self.current.0].kind.is_branch()
    }

    pub fn is_file_open(&self) -> bool {
        self.file_open
    }

    pub fn current_exit(&self) -> ExitKind {
        self.frames[self.current.0].exit_kind
    }

    /// Marks that the current path ends in a `break`.
    pub fn set_must_break(&mut self) {
        self.frames[self.current.0].must_break = true;
    }

    /// Accumulates an escape into the current path, e.g. after a `return`
    /// statement or a call that never returns.
    pub fn record_exit(&mut self, exit: ExitKind) {
        let frame = &mut self.frames[self.current.0];
        frame.exit_kind = frame.exit_kind.then(exit);
    }

    // -------------------------------------------------------------------
    // File and scope lifecycle.
    // -------------------------------------------------------------------

    /// Begins a translation unit. The file frame must have been emptied by
    /// the previous [ScopeTree::exit_file].
    pub fn enter_file(&mut self) -> Result<(), ScopeError> {
        if self.file_open {
            return Err(fatal(ScopeError::EnterFileTwice));
        }
        self.file_open = true;
        trace!("entered file scope");
        Ok(())
    }

    /// Ends a translation unit: reports obligations on file-static
    /// declarations, then empties the file frame. Globals survive for the
    /// next unit.
    pub fn exit_file(&mut self, handler: &Handler) -> Result<(), ScopeError> {
        if !self.file_open {
            return Err(fatal(ScopeError::ExitFileUnentered));
        }
        if self.current != self.file {
            let level = self.frames[self.current.0].level;
            return Err(fatal(ScopeError::ExitFileWithOpenScopes(level)));
        }
        obligations::check_unused(handler, self.frames[self.file.0].records.iter());
        self.frames[self.file.0].reset();
        self.file_open = false;
        trace!("exited file scope");
        Ok(())
    }

    /// Opens an ordinary block scope under the current frame.
    pub fn enter_scope(&mut self) {
        let parent = self.current;
        let level = self.frames[parent.0].level + 1;
        let mut frame = ScopeFrame::new(FrameKind::Normal, level, Some(parent));
        frame.aliases = self.frames[parent.0].aliases.clone();
        self.current = FrameId(self.frames.insert(frame));
        trace!(level, "entered block scope");
    }

    /// Opens the scope of a function body directly under the file frame.
    /// Parameters and the body's outermost declarations share this frame.
    ///
    /// If the function's record declares a globals clause, each name in it
    /// is checked against the visible globals here, once per function
    /// rather than once per use.
    pub fn enter_function_scope(
        &mut self,
        handler: &Handler,
        name: &Ident,
    ) -> Result<(), ScopeError> {
        if !self.file_open || self.current != self.file {
            let level = self.frames[self.current.0].level;
            return Err(fatal(ScopeError::FunctionScopeOutsideFile(level)));
        }
        self.current_function = None;
        for id in [self.file, self.global] {
            if let Some(index) = self.frames[id.0].find_in_namespace(name.as_str(), false) {
                let level = self.frames[id.0].level;
                self.current_function = Some(Coordinate { level, index });
                break;
            }
        }
        if let Some(coord) = self.current_function {
            let holder = if coord.level == 0 { self.global } else { self.file };
            if let SymbolKind::Function(info) = self.frames[holder.0].records[coord.index].kind() {
                for spec in &info.globals {
                    if self.lookup_global(spec.name.as_str()).is_none() {
                        handler.emit_err(CheckError::UnknownGlobalInClause {
                            function: name.clone(),
                            name: spec.name.clone(),
                            span: spec.name.span(),
                        });
                    }
                }
            }
        }
        let level = self.frames[self.file.0].level + 1;
        let mut frame = ScopeFrame::new(FrameKind::Normal, level, Some(self.file));
        frame.aliases = self.frames[self.file.0].aliases.clone();
        let id = FrameId(self.frames.insert(frame));
        self.current = id;
        self.function_frame = Some(id);
        self.function_name = Some(name.clone());
        trace!(function = %name, "entered function scope");
        Ok(())
    }

    /// Closes the current block scope: reports obligations on the bindings
    /// it retires, folds its surviving facts into the parent, and makes the
    /// parent current. `info` describes how the scope's body ended.
    ///
    /// Closing a function's own frame also checks the promises the function
    /// made for the point it returns, the same checks
    /// [ScopeTree::check_final_scope] runs at an explicit return statement.
    /// A body that cannot fall off its end skips them here.
    pub fn exit_scope(&mut self, handler: &Handler, info: &BranchExit) -> Result<(), ScopeError> {
        let kind = self.frames[self.current.0].kind;
        match kind {
            FrameKind::Global | FrameKind::FileStatic => {
                return Err(fatal(ScopeError::ExitPermanentScope(kind)));
            }
            FrameKind::Normal => {}
            _ => return Err(fatal(ScopeError::ExitBranchAsScope(kind))),
        }
        let closing = self.current;
        let is_function = self.function_frame == Some(closing);
        {
            let frame = &mut self.frames[closing.0];
            frame.exit_kind = frame.exit_kind.then(info.exit);
        }
        if is_function {
            self.check_final_scope(handler, false);
        }
        let frame = self
            .frames
            .remove(closing.0)
            .expect("the current frame is always in the arena");
        let parent = frame
            .parent
            .expect("every non-permanent frame has a parent");
        let parent_level = self.frames[parent.0].level;
        let effective = frame.exit_kind;

        obligations::check_scope_exit(handler, &frame, parent_level);

        let parent_frame = &mut self.frames[parent.0];
        parent_frame.guards.absorb(&frame.guards, parent_level);
        parent_frame.aliases.fold_child(frame.aliases, parent_level);
        parent_frame.exit_kind = parent_frame.exit_kind.then(effective);
        parent_frame.must_break |= frame.must_break;
        self.current = parent;
        if is_function {
            self.function_frame = None;
            self.current_function = None;
            self.function_name = None;
        }
        trace!(level = frame.level, exit = ?effective, "exited block scope");
        Ok(())
    }

    // -------------------------------------------------------------------
    // Declarations.
    // -------------------------------------------------------------------

    /// Registers a declaration and returns the coordinate of its record.
    ///
    /// Globals, functions, and types land in the permanent frame their
    /// binding calls for no matter how deep the walk currently is; locals
    /// and parameters land in the innermost lexical frame. A redeclaration
    /// of the same kind in the same frame is a duplicate (silently merged
    /// for permanent frames, where prototypes and externs are routine); a
    /// redeclaration as a different kind is reported and replaces the
    /// record outright.
    pub fn add_entry(&mut self, handler: &Handler, record: SymbolRecord) -> Coordinate {
        let target = self.placement_frame(&record);
        self.insert_record(handler, target, record, false)
    }

    /// Like [ScopeTree::add_entry] but never reports duplicates, for
    /// declarations the caller already knows respecify an earlier one.
    pub fn supersede_entry(&mut self, handler: &Handler, record: SymbolRecord) -> Coordinate {
        let target = self.placement_frame(&record);
        self.insert_record(handler, target, record, true)
    }

    /// Installs a record directly in the global frame, replacing any
    /// existing record of that name. Used when replaying saved library
    /// state, which is authoritative and raises no diagnostics.
    pub fn add_global_entry(&mut self, mut record: SymbolRecord) -> Coordinate {
        let is_tag = matches!(record.kind(), SymbolKind::Tag(_));
        if !record.storage().is_attached() {
            let id = self.next_storage_id(0);
            record.storage_mut().attach(id);
        }
        let frame = &mut self.frames[self.global.0];
        if let Some(index) = frame.find_in_namespace(record.name().as_str(), is_tag) {
            frame.records[index] = record;
            return Coordinate { level: 0, index };
        }
        let index = frame.push_record(record);
        Coordinate { level: 0, index }
    }

    fn placement_frame(&self, record: &SymbolRecord) -> FrameId {
        match record.kind() {
            SymbolKind::Function(info) => {
                if info.file_static {
                    self.file
                } else {
                    self.global
                }
            }
            SymbolKind::Datatype(info) => {
                if info.file_static {
                    self.file
                } else {
                    self.global
                }
            }
            SymbolKind::Variable(info) => match info.binding {
                BindingKind::Global { .. } => self.global,
                BindingKind::FileStatic => self.file,
                BindingKind::Local | BindingKind::Param { .. } => self.innermost_lexical(),
            },
            _ => self.innermost_lexical(),
        }
    }

    fn insert_record(
        &mut self,
        handler: &Handler,
        target: FrameId,
        mut record: SymbolRecord,
        quiet: bool,
    ) -> Coordinate {
        let level = self.frames[target.0].level;
        let is_tag = matches!(record.kind(), SymbolKind::Tag(_));
        let name = record.name().as_str().to_owned();
        if let Some(index) = self.frames[target.0].find_in_namespace(&name, is_tag) {
            let prior = &self.frames[target.0].records[index];
            if prior.kind().same_kind(record.kind()) {
                if !quiet && !self.frames[target.0].kind.is_permanent() {
                    handler.emit_err(CheckError::DuplicateDeclaration {
                        name: record.name().clone(),
                        prior: prior.decl_span().clone(),
                        span: record.decl_span().clone(),
                    });
                }
                self.frames[target.0].records[index].merge_respecification(record);
            } else {
                handler.emit_err(CheckError::DeclarationKindMismatch {
                    name: record.name().clone(),
                    prior_kind: prior.kind().describe(),
                    new_kind: record.kind().describe(),
                    prior: prior.decl_span().clone(),
                    span: record.decl_span().clone(),
                });
                if !record.storage().is_attached() {
                    let id = self.next_storage_id(level);
                    record.storage_mut().attach(id);
                }
                self.frames[target.0].records[index] = record;
            }
            return Coordinate { level, index };
        }
        if !self.frames[target.0].kind.is_permanent() {
            self.report_shadowing(handler, target, &record, is_tag);
        }
        if !record.storage().is_attached() {
            let id = self.next_storage_id(level);
            record.storage_mut().attach(id);
        }
        let index = self.frames[target.0].push_record(record);
        trace!(name = %name, level, index, "added declaration");
        Coordinate { level, index }
    }

    /// Reports a declaration hiding an outer one of a different kind, which
    /// is almost always a mistake. Hiding an outer binding of the same kind
    /// is ordinary block structure and stays silent.
    fn report_shadowing(
        &self,
        handler: &Handler,
        target: FrameId,
        record: &SymbolRecord,
        is_tag: bool,
    ) {
        let mut walk = self.frames[target.0].parent;
        while let Some(id) = walk {
            let frame = &self.frames[id.0];
            if let Some(index) = frame.find_in_namespace(record.name().as_str(), is_tag) {
                let outer = &frame.records[index];
                if !outer.kind().same_kind(record.kind()) {
                    handler.emit_warn(CheckWarning {
                        span: record.decl_span().clone(),
                        warning_content: Warning::ShadowsOuterDeclaration {
                            name: record.name().clone(),
                            outer_kind: outer.kind().describe(),
                            outer_span: outer.decl_span().clone(),
                        },
                    });
                }
                return;
            }
            walk = frame.parent;
        }
    }

    fn next_storage_id(&mut self, level: usize) -> StorageId {
        self.next_ordinal += 1;
        StorageId {
            level,
            ordinal: self.next_ordinal,
        }
    }

    // -------------------------------------------------------------------
    // Lookup.
    // -------------------------------------------------------------------

    /// Finds the innermost visible binding of `name`, branch-path copies
    /// included.
    pub fn lookup(&self, name: &str) -> Option<&SymbolRecord> {
        self.find_on_path(name, false)
    }

    /// Finds the innermost visible `struct`, `union`, or `enum` tag.
    pub fn lookup_tag(&self, name: &str) -> Option<&SymbolRecord> {
        self.find_on_path(name, true)
    }

    fn find_on_path(&self, name: &str, tags: bool) -> Option<&SymbolRecord> {
        self.path().find_map(|id| {
            let frame = &self.frames[id.0];
            frame
                .find_in_namespace(name, tags)
                .map(|index| &frame.records[index])
        })
    }

    /// Finds a binding among the permanent frames only, skipping whatever
    /// the walk currently has in scope.
    pub fn lookup_global(&self, name: &str) -> Option<&SymbolRecord> {
        for id in [self.file, self.global] {
            let frame = &self.frames[id.0];
            if let Some(index) = frame.find_in_namespace(name, false) {
                return Some(&frame.records[index]);
            }
        }
        None
    }

    /// Finds the innermost visible binding of `name` for mutation.
    ///
    /// If the owning record lives outside the innermost branch frame on the
    /// path, the record is first copied into that branch and the copy is
    /// returned, so the mutation stays invisible to the sibling path until
    /// the branches merge.
    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut SymbolRecord> {
        let mut crossed: Option<FrameId> = None;
        let mut found: Option<(FrameId, usize)> = None;
        let mut walk = Some(self.current);
        while let Some(id) = walk {
            let frame = &self.frames[id.0];
            if let Some(index) = frame.find_in_namespace(name, false) {
                found = Some((id, index));
                break;
            }
            if frame.kind.is_branch() && crossed.is_none() {
                crossed = Some(id);
            }
            walk = frame.parent;
        }
        let (owner, index) = found?;
        let Some(barrier) = crossed else {
            return self.frames[owner.0].records.get_mut(index);
        };
        let coord = if self.frames[owner.0].kind.is_branch() {
            self.frames[owner.0]
                .origin_of_copy(index)
                .expect("branch frame records are always indirection copies")
        } else {
            Coordinate {
                level: self.frames[owner.0].level,
                index,
            }
        };
        let copy = self.frames[owner.0].records[index].clone();
        let barrier_frame = &mut self.frames[barrier.0];
        let local = barrier_frame.install_copy(coord, copy);
        barrier_frame.records.get_mut(local)
    }

    /// Resolves a coordinate against the active path.
    ///
    /// A coordinate addressing a level beyond the innermost lexical frame is
    /// a protocol error: the caller is replaying an address from a path that
    /// no longer exists. A coordinate whose level is live but whose record
    /// is gone resolves to a pessimistic sentinel instead, since stale
    /// addresses from retired sibling frames are a normal hazard of
    /// single-pass walking.
    pub fn lookup_by_coordinate(&self, coord: Coordinate) -> Result<&SymbolRecord, ScopeError> {
        let innermost = self.frames[self.innermost_lexical().0].level;
        if coord.level > innermost {
            return Err(fatal(ScopeError::CoordinateBeyondPath(coord.level, innermost)));
        }
        Ok(self.resolve_on_path(coord).unwrap_or(&self.sentinel))
    }

    /// The record a coordinate currently denotes, preferring the copies of
    /// any branch frames on the path.
    pub(crate) fn resolve_on_path(&self, coord: Coordinate) -> Option<&SymbolRecord> {
        for id in self.path() {
            let frame = &self.frames[id.0];
            if frame.kind.is_branch() {
                if let Some(index) = frame.local_copy_of(coord) {
                    return Some(&frame.records[index]);
                }
                continue;
            }
            if frame.level == coord.level {
                return frame.records.get(coord.index);
            }
        }
        None
    }

    pub(crate) fn path(&self) -> PathIter<'_> {
        PathIter {
            frames: &self.frames,
            next: Some(self.current),
        }
    }

    pub(crate) fn innermost_lexical(&self) -> FrameId {
        self.path()
            .find(|id| self.frames[id.0].kind.is_lexical())
            .expect("the permanent frames are always on the path")
    }

    // -------------------------------------------------------------------
    // Alias and guard facades over the current frame.
    // -------------------------------------------------------------------

    /// Records that `a` certainly names `b`'s storage on the current path.
    pub fn add_must_alias(&mut self, a: &StorageRef, b: &StorageRef) {
        self.frames[self.current.0].aliases.add_must_alias(a, b);
    }

    /// Withdraws every alias fact about the storage, e.g. when it is
    /// reassigned.
    pub fn clear_aliases(&mut self, storage: &StorageRef) {
        self.frames[self.current.0].aliases.clear_aliases(storage.id());
    }

    pub fn aliased(&self, a: &StorageRef, b: &StorageRef) -> bool {
        self.frames[self.current.0].aliases.aliases(a.id(), b.id())
    }

    pub fn all_aliases(&self, storage: &StorageRef) -> OrdSet<StorageId> {
        self.frames[self.current.0].aliases.all_aliases(storage.id())
    }

    /// Adds tested-predicate guards to the current path.
    pub fn add_guards(&mut self, guards: &GuardSet) {
        self.frames[self.current.0].guards.add_guards(guards);
    }

    /// Withdraws any guard for the storage on the current path and shadows
    /// guards recorded further out.
    pub fn unguard(&mut self, storage: &StorageRef) {
        self.frames[self.current.0].guards.retract(storage.id());
    }

    /// Whether a guard on the path vouches that the storage is not null.
    /// The walk stops at the storage's declaring level, and a kill anywhere
    /// on the way in denies the outer guards.
    pub fn is_guarded(&self, storage: &StorageRef) -> bool {
        let id = storage.id();
        for fid in self.path() {
            let frame = &self.frames[fid.0];
            if frame.guards.kills(id) {
                return false;
            }
            if frame.guards.affirms_not_null(id) {
                return true;
            }
            if frame.kind.is_lexical() && frame.level <= id.level() {
                break;
            }
        }
        false
    }

    /// Whether a guard on the path vouches that the storage is null.
    pub fn must_be_null(&self, storage: &StorageRef) -> bool {
        let id = storage.id();
        for fid in self.path() {
            let frame = &self.frames[fid.0];
            if frame.guards.kills(id) {
                return false;
            }
            if frame.guards.affirms_null(id) {
                return true;
            }
            if frame.kind.is_lexical() && frame.level <= id.level() {
                break;
            }
        }
        false
    }

    // -------------------------------------------------------------------
    // Whole-scope checks.
    // -------------------------------------------------------------------

    /// Reports every unused binding still recorded in the permanent frames.
    /// Non-destructive; callable at any point, typically once per run.
    pub fn check_all_used(&self, handler: &Handler) {
        for id in [self.file, self.global] {
            obligations::check_unused(handler, self.frames[id.0].records.iter());
        }
    }

    /// Checks the promises the current function made for the moment it
    /// returns: out parameters defined, not-null parameters not null, and
    /// globals from its clause defined. Callers invoke this at each return
    /// statement with `is_return` set; [ScopeTree::exit_scope] runs the
    /// fall-off-the-end variant itself. Non-destructive.
    pub fn check_final_scope(&self, handler: &Handler, is_return: bool) {
        let Some(function) = self.function_frame else {
            return;
        };
        if !is_return && self.frames[function.0].exit_kind.must_escape() {
            // The end of the body is unreachable.
            return;
        }
        let Some(function_name) = self.function_name.as_ref() else {
            return;
        };
        let level = self.frames[function.0].level;
        for index in 0..self.frames[function.0].records.len() {
            let declared = &self.frames[function.0].records[index];
            let SymbolKind::Variable(info) = declared.kind() else {
                continue;
            };
            let BindingKind::Param { out, not_null, .. } = info.binding else {
                continue;
            };
            if !out && !not_null {
                continue;
            }
            let coord = Coordinate { level, index };
            let record = self.resolve_on_path(coord).unwrap_or(declared);
            let state = record.storage().state();
            if out && state.possibly_undefined() {
                handler.emit_warn(CheckWarning {
                    span: declared.decl_span().clone(),
                    warning_content: Warning::OutParamUndefined {
                        name: declared.name().clone(),
                        function: function_name.clone(),
                    },
                });
            }
            if not_null && state.possibly_null() && !self.is_guarded(record.storage()) {
                handler.emit_warn(CheckWarning {
                    span: declared.decl_span().clone(),
                    warning_content: Warning::NotNullParamMayBeNull {
                        name: declared.name().clone(),
                        function: function_name.clone(),
                    },
                });
            }
        }
        let Some(coord) = self.current_function else {
            return;
        };
        let holder = if coord.level == 0 { self.global } else { self.file };
        let Some(record) = self.frames[holder.0].records.get(coord.index) else {
            return;
        };
        let SymbolKind::Function(info) = record.kind() else {
            return;
        };
        for spec in info.globals.iter().filter(|spec| spec.must_define) {
            let Some(global) = self.lookup(spec.name.as_str()) else {
                continue;
            };
            if global.storage().state().possibly_undefined() {
                handler.emit_warn(CheckWarning {
                    span: spec.name.span(),
                    warning_content: Warning::GlobalUndefinedOnReturn {
                        name: spec.name.clone(),
                        function: function_name.clone(),
                    },
                });
            }
        }
    }
}

impl Default for ScopeTree {
    fn default() -> ScopeTree {
        ScopeTree::new()
    }
}

pub(crate) struct PathIter<'a> {
    frames: &'a SlotMap<DefaultKey, ScopeFrame>,
    next: Option<FrameId>,
}

impl Iterator for PathIter<'_> {
    type Item = FrameId;

    fn next(&mut self) -> Option<FrameId> {
        let id = self.next?;
        self.next = self.frames[id.0].parent;
        Some(id)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::scope::symbol::{FunctionInfo, VariableInfo};
    use crate::storage::{StorageOrigin, StorageState};
    use vigil_types::{Span, TypeRef};

    fn ident(name: &str) -> Ident {
        Ident::new(Span::from_string(name.to_owned()))
    }

    fn local(name: &str) -> SymbolRecord {
        SymbolRecord::new(
            ident(name),
            SymbolKind::Variable(VariableInfo {
                binding: BindingKind::Local,
            }),
            TypeRef::UNKNOWN,
            StorageRef::detached(StorageOrigin::Local, StorageState::undefined()),
            Span::from_string(name.to_owned()),
        )
    }

    fn function(name: &str) -> SymbolRecord {
        SymbolRecord::new(
            ident(name),
            SymbolKind::Function(FunctionInfo {
                defined: true,
                ..Default::default()
            }),
            TypeRef::UNKNOWN,
            StorageRef::detached(StorageOrigin::Global, StorageState::defined()),
            Span::from_string(name.to_owned()),
        )
    }

    fn in_function(tree: &mut ScopeTree, handler: &Handler, name: &str) {
        tree.enter_file().unwrap();
        tree.add_entry(handler, function(name));
        tree.enter_function_scope(handler, &ident(name)).unwrap();
    }

    #[test]
    fn inner_declaration_shadows_and_exit_reveals() {
        let handler = Handler::default();
        let mut tree = ScopeTree::new();
        in_function(&mut tree, &handler, "f");
        tree.add_entry(&handler, local("x"));
        let outer = tree.lookup("x").unwrap().storage().id();

        tree.enter_scope();
        tree.add_entry(&handler, local("x"));
        let inner = tree.lookup("x").unwrap().storage().id();
        assert_ne!(outer, inner);
        // Same kind, so the hiding is ordinary block structure.
        assert!(!handler.has_warnings());

        tree.lookup_mut("x").unwrap().mark_used(Span::from_string("x".into()));
        tree.exit_scope(&handler, &BranchExit::falls_through()).unwrap();
        assert_eq!(tree.lookup("x").unwrap().storage().id(), outer);
    }

    #[test]
    fn shadowing_a_different_kind_is_reported() {
        let handler = Handler::default();
        let mut tree = ScopeTree::new();
        in_function(&mut tree, &handler, "f");
        let constant = SymbolRecord::new(
            ident("limit"),
            SymbolKind::Constant,
            TypeRef::UNKNOWN,
            StorageRef::detached(StorageOrigin::Local, StorageState::defined()),
            Span::from_string("limit".to_owned()),
        );
        tree.add_entry(&handler, constant);

        tree.enter_scope();
        tree.add_entry(&handler, local("limit"));
        let (errors, warnings) = handler.consume();
        assert!(errors.is_empty());
        assert_eq!(warnings.len(), 1);
        assert!(matches!(
            &warnings[0].warning_content,
            Warning::ShadowsOuterDeclaration { outer_kind: "constant", .. }
        ));
    }

    #[test]
    fn redeclarations_are_reported_by_kind() {
        let handler = Handler::default();
        let mut tree = ScopeTree::new();
        in_function(&mut tree, &handler, "f");
        tree.add_entry(&handler, local("x"));
        tree.add_entry(&handler, local("x"));
        assert!(handler
            .find_error(|e| matches!(e, CheckError::DuplicateDeclaration { .. }))
            .is_some());

        let mismatch = SymbolRecord::new(
            ident("x"),
            SymbolKind::Constant,
            TypeRef::UNKNOWN,
            StorageRef::detached(StorageOrigin::Local, StorageState::defined()),
            Span::from_string("x".to_owned()),
        );
        tree.add_entry(&handler, mismatch);
        assert!(handler
            .find_error(|e| matches!(e, CheckError::DeclarationKindMismatch { .. }))
            .is_some());
        // The clash replaced the record outright.
        assert!(matches!(tree.lookup("x").unwrap().kind(), SymbolKind::Constant));
    }

    #[test]
    fn coordinates_go_stale_gracefully() {
        let handler = Handler::default();
        let mut tree = ScopeTree::new();
        in_function(&mut tree, &handler, "f");
        tree.enter_scope();
        let coord = tree.add_entry(&handler, local("y"));
        assert_eq!(
            tree.lookup_by_coordinate(coord).unwrap().name().as_str(),
            "y"
        );
        tree.lookup_mut("y").unwrap().mark_used(Span::from_string("y".into()));
        tree.exit_scope(&handler, &BranchExit::falls_through()).unwrap();

        // The whole level is gone from the path.
        assert_eq!(
            tree.lookup_by_coordinate(coord),
            Err(ScopeError::CoordinateBeyondPath(3, 2))
        );

        // A new frame occupies the level but the slot is empty; the lookup
        // degrades to the sentinel instead of failing.
        tree.enter_scope();
        let resolved = tree.lookup_by_coordinate(coord).unwrap();
        assert_eq!(resolved.name().as_str(), "<undefined>");
    }
}

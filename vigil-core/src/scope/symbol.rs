//! Symbol records, the per-binding payload of a frame.

use crate::storage::{AliasKind, Definedness, Nullness, StorageOrigin, StorageRef, StorageState};
use vigil_types::{Ident, Span, Spanned, TypeRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    Struct,
    Union,
    Enum,
}

/// A single entry of a function's declared globals clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalSpec {
    pub name: Ident,
    /// The function promises the global is defined whenever it returns.
    pub must_define: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FunctionInfo {
    /// A body has been seen, not just a prototype.
    pub defined: bool,
    pub file_static: bool,
    /// Globals the function declares it reads or writes.
    pub globals: Vec<GlobalSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DatatypeInfo {
    pub file_static: bool,
}

/// How a variable binding is introduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Local,
    Param {
        index: usize,
        /// The caller reads the pointed-to value after return, so the
        /// function must define it on every returning path.
        out: bool,
        /// The function promises never to leave this pointer null.
        not_null: bool,
    },
    Global {
        /// Annotated as checked, so use and definition are tracked across
        /// functions.
        checked: bool,
    },
    FileStatic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableInfo {
    pub binding: BindingKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolKind {
    Variable(VariableInfo),
    Function(FunctionInfo),
    Datatype(DatatypeInfo),
    Tag(TagKind),
    Constant,
    Iterator,
    /// A name referenced before any declaration was seen.
    Unknown,
}

impl SymbolKind {
    /// The word used for this kind of binding in diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            SymbolKind::Variable(info) => match info.binding {
                BindingKind::Local | BindingKind::FileStatic => "variable",
                BindingKind::Param { .. } => "parameter",
                BindingKind::Global { .. } => "global",
            },
            SymbolKind::Function(_) => "function",
            SymbolKind::Datatype(_) => "type",
            SymbolKind::Tag(_) => "tag",
            SymbolKind::Constant => "constant",
            SymbolKind::Iterator => "iterator",
            SymbolKind::Unknown => "name",
        }
    }

    /// Whether two kinds denote the same sort of binding, regardless of the
    /// payload details.
    pub fn same_kind(&self, other: &SymbolKind) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// One binding in one frame.
///
/// A record owns the authoritative [StorageRef] for its storage; the copies
/// branch frames hold share the storage id but carry their own diverging
/// state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolRecord {
    name: Ident,
    kind: SymbolKind,
    ty: TypeRef,
    storage: StorageRef,
    decl_span: Span,
    def_span: Option<Span>,
    last_use: Option<Span>,
}

impl SymbolRecord {
    pub fn new(
        name: Ident,
        kind: SymbolKind,
        ty: TypeRef,
        storage: StorageRef,
        decl_span: Span,
    ) -> SymbolRecord {
        SymbolRecord {
            name,
            kind,
            ty,
            storage,
            decl_span,
            def_span: None,
            last_use: None,
        }
    }

    /// The record handed out when a coordinate no longer resolves. It
    /// answers every query pessimistically and is never stored in a frame.
    pub(crate) fn undefined_sentinel() -> SymbolRecord {
        SymbolRecord {
            name: Ident::new_no_span("<undefined>".into()),
            kind: SymbolKind::Unknown,
            ty: TypeRef::UNKNOWN,
            storage: StorageRef::detached(StorageOrigin::Temporary, StorageState::unknown()),
            decl_span: Span::dummy(),
            def_span: None,
            last_use: None,
        }
    }

    pub fn name(&self) -> &Ident {
        &self.name
    }

    pub fn kind(&self) -> &SymbolKind {
        &self.kind
    }

    pub fn ty(&self) -> TypeRef {
        self.ty
    }

    pub fn storage(&self) -> &StorageRef {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut StorageRef {
        &mut self.storage
    }

    pub fn decl_span(&self) -> &Span {
        &self.decl_span
    }

    pub fn def_span(&self) -> Option<&Span> {
        self.def_span.as_ref()
    }

    pub fn last_use(&self) -> Option<&Span> {
        self.last_use.as_ref()
    }

    pub fn is_used(&self) -> bool {
        self.last_use.is_some()
    }

    /// Notes a use site. Later calls overwrite earlier ones, so the span
    /// kept is always the latest use.
    pub fn mark_used(&mut self, span: Span) {
        self.last_use = Some(span);
    }

    /// Notes a definition site and moves the storage to defined. The first
    /// definition site is the one reported.
    pub fn mark_defined(&mut self, span: Span) {
        if self.def_span.is_none() {
            self.def_span = Some(span);
        }
        self.storage.state_mut().mark_defined();
    }

    /// Folds a redeclaration of the same binding into this record, keeping
    /// this record's storage identity. Only called for kinds that already
    /// matched; a kind clash replaces the record instead.
    pub fn merge_respecification(&mut self, incoming: SymbolRecord) {
        if self.ty.is_unknown() {
            self.ty = incoming.ty;
        }
        match (&mut self.kind, incoming.kind) {
            (SymbolKind::Function(ours), SymbolKind::Function(theirs)) => {
                ours.defined |= theirs.defined;
                ours.file_static |= theirs.file_static;
                if ours.globals.is_empty() {
                    ours.globals = theirs.globals;
                }
            }
            (kind @ SymbolKind::Unknown, theirs) => *kind = theirs,
            _ => {}
        }
        let state = self.storage.state_mut();
        let incoming_state = incoming.storage.state();
        if state.defined == Definedness::Unknown || incoming_state.defined == Definedness::Defined {
            state.defined = incoming_state.defined;
        }
        if state.null == Nullness::Unknown {
            state.null = incoming_state.null;
        }
        if state.alias == AliasKind::Unknown {
            state.alias = incoming_state.alias;
        }
        if self.def_span.is_none() {
            self.def_span = incoming.def_span;
        }
        if self.last_use.is_none() {
            self.last_use = incoming.last_use;
        }
    }

    /// Joins the sibling-path version of this record into this one after a
    /// branch merge.
    pub fn merge_branch(&mut self, other: &SymbolRecord) {
        *self.storage.state_mut() = self.storage.state().join_branches(other.storage.state());
        if self.last_use.is_none() {
            self.last_use = other.last_use.clone();
        }
        if self.def_span.is_none() {
            self.def_span = other.def_span.clone();
        }
    }

    /// Adopts use marks from a path whose state contribution is discarded,
    /// e.g. a branch that escaped. A use on a dead path is still a use.
    pub fn fold_use_from(&mut self, other: &SymbolRecord) {
        if self.last_use.is_none() {
            self.last_use = other.last_use.clone();
        }
    }
}

impl Spanned for SymbolRecord {
    fn span(&self) -> Span {
        self.decl_span.clone()
    }
}

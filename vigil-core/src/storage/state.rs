//! The analysis state of a single storage location.
//!
//! The tree never computes these states from expressions. The caller drives
//! the mutators as it walks the source; what the tree owns is carrying the
//! states across scope and branch boundaries and joining them when control
//! paths meet. Every join is conservative: if either incoming path leaves the
//! location suspect, the joined state stays suspect.

/// How much of a location is known to hold a meaningful value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Definedness {
    /// Nothing is known, e.g. state imported from an unannotated library.
    #[default]
    Unknown,
    /// Declared, but no value has been stored.
    Undefined,
    /// Backing storage exists but its contents were never written.
    Allocated,
    /// Defined on some path to this point and undefined on another.
    PartiallyDefined,
    /// A value has been stored on every path.
    Defined,
    /// The storage was released; neither reads nor writes are valid.
    Dead,
}

impl Definedness {
    /// Combines the states of two merging control paths.
    pub fn join(self, other: Definedness) -> Definedness {
        use Definedness::*;
        match (self, other) {
            (a, b) if a == b => a,
            (Unknown, x) | (x, Unknown) => x,
            // Dead on one path keeps the release visible after the join so a
            // later use or a second release is still reported.
            (Dead, _) | (_, Dead) => PartiallyDefined,
            (PartiallyDefined, _) | (_, PartiallyDefined) => PartiallyDefined,
            (Undefined, Allocated) | (Allocated, Undefined) => Undefined,
            (Undefined, _) | (_, Undefined) => PartiallyDefined,
            (Allocated, Defined) | (Defined, Allocated) => PartiallyDefined,
            (a, _) => a,
        }
    }
}

/// What is known about a pointer being null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Nullness {
    #[default]
    Unknown,
    /// The null pointer on every path.
    Null,
    /// Not null on every path.
    NotNull,
    /// Null on at least one path to this point.
    PossiblyNull,
}

impl Nullness {
    pub fn join(self, other: Nullness) -> Nullness {
        use Nullness::*;
        match (self, other) {
            (a, b) if a == b => a,
            (Null, _) | (_, Null) => PossiblyNull,
            (PossiblyNull, _) | (_, PossiblyNull) => PossiblyNull,
            _ => Unknown,
        }
    }
}

/// The relationship a binding has to the storage it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AliasKind {
    #[default]
    Unknown,
    /// The sole reference; releasing the storage is this binding's job.
    Owned,
    /// Allocated through this binding and not yet passed anywhere.
    Fresh,
    /// Borrowed from storage owned elsewhere; must not be released here.
    Dependent,
    /// Ownership was accepted by someone else, e.g. returned or stored away.
    Kept,
    /// Reachable through more than one binding by contract.
    Shared,
    /// Static-duration storage that is never released.
    Static,
}

impl AliasKind {
    /// Whether the binding is on the hook for releasing the storage.
    pub fn is_owned_obligation(&self) -> bool {
        matches!(self, AliasKind::Owned | AliasKind::Fresh)
    }

    pub fn join(self, other: AliasKind) -> AliasKind {
        use AliasKind::*;
        match (self, other) {
            (a, b) if a == b => a,
            // An obligation on either path survives the join. Dropping it
            // would silence a leak report on the path that still owes the
            // release.
            (a, _) if a.is_owned_obligation() => a,
            (_, b) if b.is_owned_obligation() => b,
            (Unknown, x) | (x, Unknown) => x,
            (a, _) => a,
        }
    }
}

/// The combined analysis state of one storage location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StorageState {
    pub defined: Definedness,
    pub null: Nullness,
    pub alias: AliasKind,
}

impl StorageState {
    pub fn new(defined: Definedness, null: Nullness, alias: AliasKind) -> StorageState {
        StorageState {
            defined,
            null,
            alias,
        }
    }

    /// The state of storage nothing is known about.
    pub fn unknown() -> StorageState {
        StorageState::default()
    }

    /// The state of a fresh declaration with no initializer.
    pub fn undefined() -> StorageState {
        StorageState {
            defined: Definedness::Undefined,
            ..Default::default()
        }
    }

    /// The state of storage holding a value on every path.
    pub fn defined() -> StorageState {
        StorageState {
            defined: Definedness::Defined,
            ..Default::default()
        }
    }

    pub fn with_null(mut self, null: Nullness) -> StorageState {
        self.null = null;
        self
    }

    pub fn with_alias(mut self, alias: AliasKind) -> StorageState {
        self.alias = alias;
        self
    }

    pub fn mark_allocated(&mut self) {
        self.defined = Definedness::Allocated;
    }

    pub fn mark_defined(&mut self) {
        self.defined = Definedness::Defined;
    }

    /// Records that the storage was released.
    pub fn release(&mut self) {
        self.defined = Definedness::Dead;
    }

    /// Records that ownership moved to someone else.
    pub fn transfer(&mut self) {
        self.alias = AliasKind::Kept;
    }

    pub fn set_null(&mut self) {
        self.null = Nullness::Null;
    }

    pub fn set_not_null(&mut self) {
        self.null = Nullness::NotNull;
    }

    /// Refines the null state under a tested predicate. A definite null is
    /// not overridden; a test cannot make a null pointer valid.
    pub fn guard_not_null(&mut self) {
        if self.null != Nullness::Null {
            self.null = Nullness::NotNull;
        }
    }

    pub fn is_defined(&self) -> bool {
        self.defined == Definedness::Defined
    }

    /// Whether any path reaches this point without the location defined.
    pub fn possibly_undefined(&self) -> bool {
        matches!(
            self.defined,
            Definedness::Undefined | Definedness::Allocated | Definedness::PartiallyDefined
        )
    }

    pub fn is_dead(&self) -> bool {
        self.defined == Definedness::Dead
    }

    pub fn is_null(&self) -> bool {
        self.null == Nullness::Null
    }

    pub fn is_not_null(&self) -> bool {
        self.null == Nullness::NotNull
    }

    /// Whether any path reaches this point with the pointer null.
    pub fn possibly_null(&self) -> bool {
        matches!(self.null, Nullness::Null | Nullness::PossiblyNull)
    }

    /// Joins the states of two merging control paths component-wise.
    pub fn join_branches(&self, other: &StorageState) -> StorageState {
        StorageState {
            defined: self.defined.join(other.defined),
            null: self.null.join(other.null),
            alias: self.alias.join(other.alias),
        }
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle to a type owned by the host front end.
///
/// Scope bookkeeping never inspects types. It only stores handles, compares
/// them when a symbol is re-declared, and hands them back on lookup.
/// [TypeRef::UNKNOWN] is the conventional handle for declarations whose type
/// has not been resolved yet.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TypeRef(u32);

impl TypeRef {
    pub const UNKNOWN: TypeRef = TypeRef(0);

    pub fn new(index: u32) -> TypeRef {
        TypeRef(index)
    }

    pub fn index(&self) -> u32 {
        self.0
    }

    pub fn is_unknown(&self) -> bool {
        *self == TypeRef::UNKNOWN
    }

    /// Whether two handles could plausibly denote the same type. Unresolved
    /// handles are compatible with everything.
    pub fn compatible_with(&self, other: &TypeRef) -> bool {
        self == other || self.is_unknown() || other.is_unknown()
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        if self.is_unknown() {
            fmt.write_str("TypeRef(?)")
        } else {
            write!(fmt, "TypeRef({})", self.0)
        }
    }
}

impl Default for TypeRef {
    fn default() -> Self {
        TypeRef::UNKNOWN
    }
}

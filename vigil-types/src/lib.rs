pub mod ident;
pub mod source_engine;
pub mod span;
pub mod type_ref;

pub use ident::*;
pub use source_engine::*;
pub use span::*;
pub use type_ref::*;

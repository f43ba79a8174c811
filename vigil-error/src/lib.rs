pub mod diagnostic;
pub mod error;
pub mod handler;
pub mod warning;

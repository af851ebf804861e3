//! Abstract syntax tree for the POSIX shell command language.

pub mod print;
pub mod types;

pub use types::*;

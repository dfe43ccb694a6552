//! Core types for rulevault.

mod format;
mod node;

pub use format::ItemFormat;
pub use node::*;

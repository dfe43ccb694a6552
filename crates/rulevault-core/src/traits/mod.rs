//! Core traits for rulevault collaborators.

mod node_store;
mod version_number;

pub use node_store::*;
pub use version_number::*;

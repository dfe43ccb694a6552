//! Node store implementations shared by every backend.
//!
//! [`NodeArena`] holds the version graph logic; backends wrap it with their
//! own locking and persistence.

mod arena;
mod memory;

pub use arena::{NodeArena, StagedCheckin};
pub use memory::InMemoryNodeStore;

//! Version markers and history traversal.

mod generator;
mod iterator;

pub use generator::{DottedVersionGenerator, IncrementingVersionGenerator, VersionScheme};
pub use iterator::{IterationDirection, ItemVersionIterator};

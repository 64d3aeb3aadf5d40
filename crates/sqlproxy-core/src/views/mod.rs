//! Live views over element tables

pub mod collection;
pub mod map;

pub use collection::{SnapshotIter, SqlCollection};
pub use map::SqlMap;

//! Block access: linear search, insert, rename and relation deletion on top
//! of the block store and the catalog cache.

mod block_access;
mod scan;

pub use block_access::BlockAccess;
pub use scan::{RelationScan, SplicedBlock};

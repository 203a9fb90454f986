//! The two self-describing system relations: row types for the relation
//! and attribute catalogs, and the bootstrap that lays them down on a new disk.

mod bootstrap;
mod entries;

pub use bootstrap::*;
pub use entries::*;

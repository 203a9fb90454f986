//! In-memory catalog state for open relations.

mod catalog_cache;
mod open_rel_table;

pub use catalog_cache::{CatalogCache, RelCacheEntry};
pub use open_rel_table::OpenRelTable;

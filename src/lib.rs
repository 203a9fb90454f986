//! Cairn - a disk-resident relational record store whose catalogs describe
//! themselves.
//!
//! A disk image is a file of fixed-size blocks. Block 0 is the allocation
//! map; blocks 1 and 2 hold the relation catalog and the attribute catalog,
//! which are ordinary relations and are read and written with the same
//! record operations as user data.
//!
//! # Architecture
//!
//! - **Storage** (`storage`): disk I/O, block headers, slot maps and block
//!   allocation
//! - **Catalog** (`catalog`): the catalog row types and the bootstrap rows
//! - **Cache** (`cache`): catalog entries and search cursors of open relations
//! - **Access** (`access`): linear search, insert, rename and cascading delete
//! - **Index** (`index`): tearing down index trees of deleted relations
//! - **Schema** (`schema`): DDL guarded against catalog and open-relation misuse
//!
//! # Example
//!
//! ```rust,no_run
//! use cairn::{AttrType, Attribute, Database, DiskConfig, SearchOp};
//!
//! let mut db = Database::create("students.db", DiskConfig::default()).unwrap();
//! db.schema()
//!     .create_rel("Students", &[("name", AttrType::String), ("marks", AttrType::Number)])
//!     .unwrap();
//!
//! let rel = db.open_rel("Students").unwrap();
//! db.block_access()
//!     .insert(rel, &[Attribute::from("alice"), Attribute::from(91.0)])
//!     .unwrap();
//!
//! let record = db
//!     .block_access()
//!     .search(rel, "marks", &Attribute::from(90.0), SearchOp::Gt)
//!     .unwrap();
//! assert_eq!(record[0].as_str(), Some("alice"));
//! db.close().unwrap();
//! ```

pub mod access;
pub mod cache;
pub mod catalog;
pub mod common;
mod database;
pub mod index;
pub mod record;
pub mod schema;
pub mod storage;

// Re-export commonly used types at the crate root
pub use common::{BlockId, CairnError, DiskConfig, RecordId, RelId, Result, SearchOp};
pub use database::Database;
pub use record::{AttrType, Attribute, Record};

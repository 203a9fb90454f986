use thiserror::Error;

use super::types::BlockId;

/// Database error types
#[derive(Error, Debug)]
pub enum CairnError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No record satisfies the search condition")]
    NotFound,

    #[error("Relation {0} already exists")]
    RelationExists(String),

    #[error("Relation {0} does not exist")]
    RelationNotExists(String),

    #[error("Attribute {0} already exists")]
    AttributeExists(String),

    #[error("Attribute {0} does not exist")]
    AttributeNotExists(String),

    #[error("Operation not permitted")]
    NotPermitted,

    #[error("Relation {0} is open")]
    RelationOpen(String),

    #[error("Relation {0} is not open")]
    RelationNotOpen(String),

    #[error("Relation catalog is full")]
    MaxRelations,

    #[error("Disk is full, no free blocks available")]
    DiskFull,

    #[error("Duplicate attribute name: {0}")]
    DuplicateAttribute(String),

    #[error("Open relation table is full")]
    CacheFull,

    #[error("Block {0} is out of bounds")]
    OutOfBound(BlockId),

    #[error("Slot {slot} is out of range for block {block}")]
    InvalidSlot { block: BlockId, slot: usize },

    #[error("Block {0} does not hold the expected block type")]
    InvalidBlockType(BlockId),

    #[error("Invalid database file")]
    InvalidDatabaseFile,

    #[error("Name {0:?} exceeds the attribute size")]
    NameTooLong(String),

    #[error("A relation needs between 1 and {max} attributes, got {actual}")]
    InvalidAttributeCount { max: usize, actual: usize },

    #[error("Attribute value does not match the declared type")]
    AttributeTypeMismatch,

    #[error("Record has {actual} attributes, relation expects {expected}")]
    AttributeCountMismatch { expected: usize, actual: usize },

    #[error("Catalog corrupted: {0}")]
    CorruptCatalog(String),
}

pub type Result<T> = std::result::Result<T, CairnError>;

use super::types::{BlockId, RelId};

/// Size of a disk block in bytes (2 KB)
pub const BLOCK_SIZE: usize = 2048;

/// Maximum number of blocks on a disk. The allocation map keeps a 16-byte
/// preamble and then one byte per block inside a single block.
pub const DISK_BLOCKS: u32 = (BLOCK_SIZE - 16) as u32;

/// Size of a single attribute cell inside a record
pub const ATTR_SIZE: usize = 16;

/// Size of the common block header
pub const HEADER_SIZE: usize = 32;

/// Maximum number of relations that can be open at once (system catalogs included)
pub const MAX_OPEN: usize = 12;

/// Block holding the block allocation map
pub const BLOCK_ALLOCATION_MAP: BlockId = BlockId(0);

/// The single, fixed block of the relation catalog
pub const RELCAT_BLOCK: BlockId = BlockId(1);

/// First block of the attribute catalog
pub const ATTRCAT_BLOCK: BlockId = BlockId(2);

pub const RELCAT_RELID: RelId = RelId(0);
pub const ATTRCAT_RELID: RelId = RelId(1);

pub const RELCAT_RELNAME: &str = "RELATIONCAT";
pub const ATTRCAT_RELNAME: &str = "ATTRIBUTECAT";

/// Relation catalog attribute names, in record order
pub const RELCAT_ATTR_RELNAME: &str = "RelName";
pub const RELCAT_ATTR_NO_ATTRIBUTES: &str = "#Attributes";
pub const RELCAT_ATTR_NO_RECORDS: &str = "#Records";
pub const RELCAT_ATTR_FIRST_BLOCK: &str = "FirstBlock";
pub const RELCAT_ATTR_LAST_BLOCK: &str = "LastBlock";
pub const RELCAT_ATTR_NO_SLOTS: &str = "#Slots";

/// Attribute catalog attribute names, in record order
pub const ATTRCAT_ATTR_RELNAME: &str = "RelName";
pub const ATTRCAT_ATTR_ATTRIBUTE_NAME: &str = "AttributeName";
pub const ATTRCAT_ATTR_ATTRIBUTE_TYPE: &str = "AttributeType";
pub const ATTRCAT_ATTR_PRIMARY_FLAG: &str = "PrimaryFlag";
pub const ATTRCAT_ATTR_ROOT_BLOCK: &str = "RootBlock";
pub const ATTRCAT_ATTR_OFFSET: &str = "Offset";

pub const RELCAT_NO_ATTRS: usize = 6;
pub const ATTRCAT_NO_ATTRS: usize = 6;

/// Runtime options used when formatting a fresh disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskConfig {
    /// Number of usable blocks, including the reserved ones
    pub num_blocks: u32,
}

impl DiskConfig {
    pub fn new(num_blocks: u32) -> Self {
        Self {
            num_blocks: num_blocks.min(DISK_BLOCKS),
        }
    }
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self {
            num_blocks: DISK_BLOCKS,
        }
    }
}

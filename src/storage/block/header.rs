use crate::common::{BlockId, CairnError, Result, HEADER_SIZE};

/// Block header layout, shared by record and index blocks:
///
/// | Field        | Offset | Size |
/// |--------------|--------|------|
/// | block_type   | 0      | 4    |
/// | pblock       | 4      | 4    |
/// | lblock       | 8      | 4    |
/// | rblock       | 12     | 4    |
/// | num_entries  | 16     | 4    |
/// | num_attrs    | 20     | 4    |
/// | num_slots    | 24     | 4    |
/// | reserved     | 28     | 4    |
///
/// Links are stored as `i32` with `-1` meaning "none".
const BLOCK_TYPE_OFFSET: usize = 0;
const PBLOCK_OFFSET: usize = 4;
const LBLOCK_OFFSET: usize = 8;
const RBLOCK_OFFSET: usize = 12;
const NUM_ENTRIES_OFFSET: usize = 16;
const NUM_ATTRS_OFFSET: usize = 20;
const NUM_SLOTS_OFFSET: usize = 24;

/// What a block is used for. The same codes are stored in the block
/// allocation map and in each block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockType {
    Unused,
    Record,
    IndexInternal,
    IndexLeaf,
    AllocationMap,
    /// Past the end of the configured disk; never handed out
    Reserved,
}

impl BlockType {
    pub fn code(&self) -> u8 {
        match self {
            BlockType::Unused => 0,
            BlockType::Record => 1,
            BlockType::IndexInternal => 2,
            BlockType::IndexLeaf => 3,
            BlockType::AllocationMap => 4,
            BlockType::Reserved => 5,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(BlockType::Unused),
            1 => Some(BlockType::Record),
            2 => Some(BlockType::IndexInternal),
            3 => Some(BlockType::IndexLeaf),
            4 => Some(BlockType::AllocationMap),
            5 => Some(BlockType::Reserved),
            _ => None,
        }
    }
}

/// Decoded block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub block_type: BlockType,
    /// Parent link used by index blocks; unrelated to the record chain
    pub pblock: Option<BlockId>,
    pub lblock: Option<BlockId>,
    pub rblock: Option<BlockId>,
    pub num_entries: usize,
    pub num_attrs: usize,
    pub num_slots: usize,
}

impl BlockHeader {
    /// Header for a fresh, empty record block.
    pub fn record_block(lblock: Option<BlockId>, num_attrs: usize, num_slots: usize) -> Self {
        Self {
            block_type: BlockType::Record,
            pblock: None,
            lblock,
            rblock: None,
            num_entries: 0,
            num_attrs,
            num_slots,
        }
    }

    /// Reads the header from the start of a block buffer.
    pub fn read_from(block: BlockId, data: &[u8]) -> Result<Self> {
        let block_type = BlockType::from_code(read_i32(data, BLOCK_TYPE_OFFSET) as u8)
            .ok_or(CairnError::InvalidBlockType(block))?;

        Ok(Self {
            block_type,
            pblock: BlockId::from_raw(read_i32(data, PBLOCK_OFFSET)),
            lblock: BlockId::from_raw(read_i32(data, LBLOCK_OFFSET)),
            rblock: BlockId::from_raw(read_i32(data, RBLOCK_OFFSET)),
            num_entries: read_i32(data, NUM_ENTRIES_OFFSET).max(0) as usize,
            num_attrs: read_i32(data, NUM_ATTRS_OFFSET).max(0) as usize,
            num_slots: read_i32(data, NUM_SLOTS_OFFSET).max(0) as usize,
        })
    }

    /// Writes the header to the start of a block buffer.
    pub fn write_to(&self, data: &mut [u8]) {
        data[..HEADER_SIZE].fill(0);
        write_i32(data, BLOCK_TYPE_OFFSET, self.block_type.code() as i32);
        write_i32(data, PBLOCK_OFFSET, BlockId::to_raw(self.pblock));
        write_i32(data, LBLOCK_OFFSET, BlockId::to_raw(self.lblock));
        write_i32(data, RBLOCK_OFFSET, BlockId::to_raw(self.rblock));
        write_i32(data, NUM_ENTRIES_OFFSET, self.num_entries as i32);
        write_i32(data, NUM_ATTRS_OFFSET, self.num_attrs as i32);
        write_i32(data, NUM_SLOTS_OFFSET, self.num_slots as i32);
    }
}

pub(crate) fn read_i32(data: &[u8], offset: usize) -> i32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&data[offset..offset + 4]);
    i32::from_le_bytes(bytes)
}

pub(crate) fn write_i32(data: &mut [u8], offset: usize, value: i32) {
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

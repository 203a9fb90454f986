use crate::common::{BlockId, CairnError, Result, ATTR_SIZE, BLOCK_SIZE, HEADER_SIZE};
use crate::record::{decode_record, encode_record, AttrType, Attribute, Record};

use super::header::BlockHeader;

/// Slot map byte for a slot holding a record
pub const SLOT_OCCUPIED: u8 = 1;

/// Slot map byte for a free slot
pub const SLOT_UNOCCUPIED: u8 = 0;

/// Record block layout:
///
/// +------------------+
/// | Block Header     |  (HEADER_SIZE bytes)
/// +------------------+
/// | Slot Map         |  (num_slots bytes, one per slot)
/// +------------------+
/// | Record 0         |  (num_attrs * ATTR_SIZE bytes)
/// | Record 1         |
/// | ...              |
/// +------------------+
///
/// Every record in a block has the same width, so slot `i` lives at a fixed
/// offset computed from the header alone.
const SLOT_MAP_OFFSET: usize = HEADER_SIZE;

/// Number of record slots that fit in one block for the given arity.
pub fn slots_per_block(num_attrs: usize) -> usize {
    (BLOCK_SIZE - HEADER_SIZE) / (ATTR_SIZE * num_attrs.max(1) + 1)
}

fn record_offset(header: &BlockHeader, slot: usize) -> usize {
    SLOT_MAP_OFFSET + header.num_slots + slot * header.num_attrs * ATTR_SIZE
}

fn check_slot(block: BlockId, header: &BlockHeader, slot: usize) -> Result<()> {
    if slot >= header.num_slots {
        return Err(CairnError::InvalidSlot { block, slot });
    }
    Ok(())
}

/// Mutable view over a record block buffer.
pub struct RecordBlock<'a> {
    block: BlockId,
    data: &'a mut [u8],
}

impl<'a> RecordBlock<'a> {
    /// Creates a new view over the given block buffer.
    /// The buffer must be exactly BLOCK_SIZE bytes.
    pub fn new(block: BlockId, data: &'a mut [u8]) -> Self {
        assert_eq!(data.len(), BLOCK_SIZE);
        Self { block, data }
    }

    /// Initializes a fresh block: writes the header and marks every slot free.
    pub fn init(&mut self, header: &BlockHeader) {
        self.data.fill(0);
        header.write_to(self.data);
        let end = SLOT_MAP_OFFSET + header.num_slots;
        self.data[SLOT_MAP_OFFSET..end].fill(SLOT_UNOCCUPIED);
    }

    /// Returns the block ID.
    pub fn block_id(&self) -> BlockId {
        self.block
    }

    pub fn header(&self) -> Result<BlockHeader> {
        BlockHeader::read_from(self.block, self.data)
    }

    pub fn set_header(&mut self, header: &BlockHeader) {
        header.write_to(self.data);
    }

    /// Returns the occupancy of every slot.
    pub fn slot_map(&self) -> Result<Vec<bool>> {
        RecordBlockRef::new(self.block, self.data).slot_map()
    }

    pub fn set_slot_map(&mut self, slot_map: &[bool]) -> Result<()> {
        let header = self.header()?;
        if slot_map.len() != header.num_slots {
            return Err(CairnError::InvalidSlot {
                block: self.block,
                slot: slot_map.len(),
            });
        }
        for (i, occupied) in slot_map.iter().enumerate() {
            self.data[SLOT_MAP_OFFSET + i] = if *occupied {
                SLOT_OCCUPIED
            } else {
                SLOT_UNOCCUPIED
            };
        }
        Ok(())
    }

    /// Reads the record in `slot`, decoding cells with the given types.
    pub fn record(&self, slot: usize, types: &[AttrType]) -> Result<Record> {
        RecordBlockRef::new(self.block, self.data).record(slot, types)
    }

    /// Overwrites the record in `slot`. Does not touch the slot map.
    pub fn set_record(&mut self, slot: usize, record: &[Attribute]) -> Result<()> {
        let header = self.header()?;
        check_slot(self.block, &header, slot)?;
        if record.len() != header.num_attrs {
            return Err(CairnError::AttributeCountMismatch {
                expected: header.num_attrs,
                actual: record.len(),
            });
        }

        let bytes = encode_record(record)?;
        let offset = record_offset(&header, slot);
        self.data[offset..offset + bytes.len()].copy_from_slice(&bytes);
        Ok(())
    }
}

/// Read-only view of a record block.
pub struct RecordBlockRef<'a> {
    block: BlockId,
    data: &'a [u8],
}

impl<'a> RecordBlockRef<'a> {
    pub fn new(block: BlockId, data: &'a [u8]) -> Self {
        assert_eq!(data.len(), BLOCK_SIZE);
        Self { block, data }
    }

    pub fn block_id(&self) -> BlockId {
        self.block
    }

    pub fn header(&self) -> Result<BlockHeader> {
        BlockHeader::read_from(self.block, self.data)
    }

    pub fn slot_map(&self) -> Result<Vec<bool>> {
        let header = self.header()?;
        Ok(self.data[SLOT_MAP_OFFSET..SLOT_MAP_OFFSET + header.num_slots]
            .iter()
            .map(|&b| b == SLOT_OCCUPIED)
            .collect())
    }

    pub fn record(&self, slot: usize, types: &[AttrType]) -> Result<Record> {
        let header = self.header()?;
        check_slot(self.block, &header, slot)?;
        if types.len() != header.num_attrs {
            return Err(CairnError::AttributeCountMismatch {
                expected: header.num_attrs,
                actual: types.len(),
            });
        }

        let offset = record_offset(&header, slot);
        let width = header.num_attrs * ATTR_SIZE;
        Ok(decode_record(&self.data[offset..offset + width], types))
    }
}

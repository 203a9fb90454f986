use crate::common::{BlockId, CairnError, Result, BLOCK_SIZE, DISK_BLOCKS};

use super::header::{read_i32, write_i32, BlockType};

const MAGIC_NUMBER: u32 = 0x4341_4952; // "CAIR"
const VERSION: u32 = 1;

const MAGIC_OFFSET: usize = 0;
const VERSION_OFFSET: usize = 4;
const NUM_BLOCKS_OFFSET: usize = 8;
const ENTRIES_OFFSET: usize = 16;

/// View over the block allocation map: a small preamble followed by one
/// `BlockType` byte per block on the disk.
pub struct AllocationMap<'a> {
    data: &'a mut [u8],
}

impl<'a> AllocationMap<'a> {
    pub fn new(data: &'a mut [u8]) -> Self {
        assert_eq!(data.len(), BLOCK_SIZE);
        Self { data }
    }

    /// Formats a map for a disk of `num_blocks` usable blocks. Every usable
    /// block starts out unused; the rest are reserved.
    pub fn init(&mut self, num_blocks: u32) {
        let num_blocks = num_blocks.min(DISK_BLOCKS);
        self.data.fill(0);
        write_i32(self.data, MAGIC_OFFSET, MAGIC_NUMBER as i32);
        write_i32(self.data, VERSION_OFFSET, VERSION as i32);
        write_i32(self.data, NUM_BLOCKS_OFFSET, num_blocks as i32);

        for i in 0..DISK_BLOCKS {
            let ty = if i < num_blocks {
                BlockType::Unused
            } else {
                BlockType::Reserved
            };
            self.data[ENTRIES_OFFSET + i as usize] = ty.code();
        }
    }

    pub fn is_valid(&self) -> bool {
        self.view().is_valid()
    }

    pub fn num_blocks(&self) -> u32 {
        self.view().num_blocks()
    }

    pub fn block_type(&self, block: BlockId) -> Result<BlockType> {
        self.view().block_type(block)
    }

    pub fn set_block_type(&mut self, block: BlockId, ty: BlockType) -> Result<()> {
        let index = entry_index(block)?;
        self.data[index] = ty.code();
        Ok(())
    }

    pub fn first_free(&self) -> Option<BlockId> {
        self.view().first_free()
    }

    pub fn free_count(&self) -> usize {
        self.view().free_count()
    }

    fn view(&self) -> AllocationMapRef<'_> {
        AllocationMapRef::new(&*self.data)
    }
}

/// Read-only view of the block allocation map.
pub struct AllocationMapRef<'a> {
    data: &'a [u8],
}

impl<'a> AllocationMapRef<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        assert_eq!(data.len(), BLOCK_SIZE);
        Self { data }
    }

    pub fn is_valid(&self) -> bool {
        read_i32(self.data, MAGIC_OFFSET) as u32 == MAGIC_NUMBER
            && read_i32(self.data, VERSION_OFFSET) as u32 == VERSION
    }

    pub fn num_blocks(&self) -> u32 {
        read_i32(self.data, NUM_BLOCKS_OFFSET) as u32
    }

    pub fn block_type(&self, block: BlockId) -> Result<BlockType> {
        let index = entry_index(block)?;
        BlockType::from_code(self.data[index]).ok_or(CairnError::InvalidBlockType(block))
    }

    /// Returns the lowest-numbered unused block, if any.
    pub fn first_free(&self) -> Option<BlockId> {
        (0..self.num_blocks())
            .find(|&i| self.data[ENTRIES_OFFSET + i as usize] == BlockType::Unused.code())
            .map(BlockId::new)
    }

    pub fn free_count(&self) -> usize {
        (0..self.num_blocks())
            .filter(|&i| self.data[ENTRIES_OFFSET + i as usize] == BlockType::Unused.code())
            .count()
    }
}

fn entry_index(block: BlockId) -> Result<usize> {
    if block.as_u32() >= DISK_BLOCKS {
        return Err(CairnError::OutOfBound(block));
    }
    Ok(ENTRIES_OFFSET + block.as_usize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_and_validate() {
        let mut data = [0u8; BLOCK_SIZE];
        let mut map = AllocationMap::new(&mut data);
        assert!(!map.is_valid());

        map.init(64);
        assert!(map.is_valid());
        assert_eq!(map.num_blocks(), 64);
        assert_eq!(map.free_count(), 64);
        assert_eq!(map.block_type(BlockId::new(63)).unwrap(), BlockType::Unused);
        assert_eq!(map.block_type(BlockId::new(64)).unwrap(), BlockType::Reserved);
    }

    #[test]
    fn test_first_free() {
        let mut data = [0u8; BLOCK_SIZE];
        let mut map = AllocationMap::new(&mut data);
        map.init(4);

        map.set_block_type(BlockId::new(0), BlockType::AllocationMap).unwrap();
        map.set_block_type(BlockId::new(1), BlockType::Record).unwrap();
        assert_eq!(map.first_free(), Some(BlockId::new(2)));

        map.set_block_type(BlockId::new(2), BlockType::Record).unwrap();
        map.set_block_type(BlockId::new(3), BlockType::IndexLeaf).unwrap();
        assert_eq!(map.first_free(), None);
        assert_eq!(map.free_count(), 0);
    }

    #[test]
    fn test_read_only_view() {
        let mut data = [0u8; BLOCK_SIZE];
        {
            let mut map = AllocationMap::new(&mut data);
            map.init(8);
            map.set_block_type(BlockId::new(0), BlockType::AllocationMap).unwrap();
        }

        let map = AllocationMapRef::new(&data);
        assert!(map.is_valid());
        assert_eq!(map.free_count(), 7);
        assert_eq!(map.first_free(), Some(BlockId::new(1)));
        assert_eq!(map.block_type(BlockId::new(0)).unwrap(), BlockType::AllocationMap);
    }

    #[test]
    fn test_out_of_bound() {
        let mut data = [0u8; BLOCK_SIZE];
        let map = AllocationMap::new(&mut data);
        assert!(matches!(
            map.block_type(BlockId::new(DISK_BLOCKS)),
            Err(CairnError::OutOfBound(_))
        ));
    }
}

use std::path::Path;

use tracing::{debug, info};

use crate::common::{
    BlockId, CairnError, DiskConfig, RecordId, Result, BLOCK_ALLOCATION_MAP, BLOCK_SIZE,
};
use crate::record::{AttrType, Attribute, Record};

use super::block::{AllocationMap, AllocationMapRef, BlockHeader, BlockType, RecordBlock, RecordBlockRef};
use super::disk::DiskManager;

/// BlockStore gives block-granular access to a disk image: header, slot map
/// and record reads/writes, plus allocation and release of blocks through
/// the allocation map kept in block 0.
///
/// Every call reads the block it needs and writes it back before returning.
pub struct BlockStore {
    disk: DiskManager,
    /// In-memory copy of block 0, written through on every change
    allocation_map: Vec<u8>,
}

impl BlockStore {
    /// Formats a new disk image at `path`. Only the allocation map block is
    /// marked used; catalogs are laid down by the caller.
    pub fn create<P: AsRef<Path>>(path: P, config: DiskConfig) -> Result<Self> {
        let disk = DiskManager::new(path)?;
        let mut allocation_map = vec![0u8; BLOCK_SIZE];
        {
            let mut map = AllocationMap::new(&mut allocation_map);
            map.init(config.num_blocks);
            map.set_block_type(BLOCK_ALLOCATION_MAP, BlockType::AllocationMap)?;
        }
        disk.write_block(BLOCK_ALLOCATION_MAP, &allocation_map)?;

        info!(
            path = disk.get_disk_path(),
            num_blocks = config.num_blocks,
            "formatted disk"
        );
        Ok(Self {
            disk,
            allocation_map,
        })
    }

    /// Opens an existing disk image, validating its allocation map.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let disk = DiskManager::new(path)?;
        let mut allocation_map = vec![0u8; BLOCK_SIZE];
        disk.read_block(BLOCK_ALLOCATION_MAP, &mut allocation_map)?;

        if !AllocationMapRef::new(&allocation_map).is_valid() {
            return Err(CairnError::InvalidDatabaseFile);
        }

        info!(path = disk.get_disk_path(), "opened disk");
        Ok(Self {
            disk,
            allocation_map,
        })
    }

    /// Returns the underlying disk manager.
    pub fn disk(&self) -> &DiskManager {
        &self.disk
    }

    fn map(&self) -> AllocationMapRef<'_> {
        AllocationMapRef::new(&self.allocation_map)
    }

    fn map_mut(&mut self) -> AllocationMap<'_> {
        AllocationMap::new(&mut self.allocation_map)
    }

    fn flush_map(&self) -> Result<()> {
        self.disk
            .write_block(BLOCK_ALLOCATION_MAP, &self.allocation_map)
    }

    /// Returns what the allocation map says block `block` is used for.
    pub fn block_type(&self, block: BlockId) -> Result<BlockType> {
        self.map().block_type(block)
    }

    /// Returns true if the block is currently unallocated.
    pub fn is_free(&self, block: BlockId) -> Result<bool> {
        Ok(self.block_type(block)? == BlockType::Unused)
    }

    pub fn free_block_count(&self) -> usize {
        self.map().free_count()
    }

    /// Allocates the lowest free block for the given use.
    pub fn allocate(&mut self, ty: BlockType) -> Result<BlockId> {
        let block = self.map().first_free().ok_or(CairnError::DiskFull)?;
        self.map_mut().set_block_type(block, ty)?;
        self.flush_map()?;

        debug!(block = block.as_u32(), ?ty, "allocated block");
        Ok(block)
    }

    /// Returns a block to the free pool. Releasing a free block is a no-op,
    /// so a release step can safely be repeated.
    pub fn release(&mut self, block: BlockId) -> Result<()> {
        match self.block_type(block)? {
            BlockType::Unused => Ok(()),
            BlockType::AllocationMap | BlockType::Reserved => {
                Err(CairnError::InvalidBlockType(block))
            }
            _ => {
                self.map_mut().set_block_type(block, BlockType::Unused)?;
                self.flush_map()?;
                debug!(block = block.as_u32(), "released block");
                Ok(())
            }
        }
    }

    /// Reads a raw block. The block must be allocated.
    pub fn read_block(&mut self, block: BlockId) -> Result<Vec<u8>> {
        self.check_allocated(block)?;
        let mut data = vec![0u8; BLOCK_SIZE];
        self.disk.read_block(block, &mut data)?;
        Ok(data)
    }

    /// Writes a raw block. The block must be allocated.
    pub fn write_block(&mut self, block: BlockId, data: &[u8]) -> Result<()> {
        self.check_allocated(block)?;
        self.disk.write_block(block, data)
    }

    fn check_allocated(&self, block: BlockId) -> Result<()> {
        match self.block_type(block)? {
            BlockType::Unused | BlockType::Reserved => Err(CairnError::OutOfBound(block)),
            _ => Ok(()),
        }
    }

    /// Writes a fresh record block: header plus an all-free slot map.
    pub fn init_record_block(&mut self, block: BlockId, header: &BlockHeader) -> Result<()> {
        let mut data = vec![0u8; BLOCK_SIZE];
        RecordBlock::new(block, &mut data).init(header);
        self.write_block(block, &data)
    }

    pub fn get_header(&mut self, block: BlockId) -> Result<BlockHeader> {
        let data = self.read_block(block)?;
        BlockHeader::read_from(block, &data)
    }

    pub fn set_header(&mut self, block: BlockId, header: &BlockHeader) -> Result<()> {
        let mut data = self.read_block(block)?;
        header.write_to(&mut data);
        self.write_block(block, &data)
    }

    pub fn get_slot_map(&mut self, block: BlockId) -> Result<Vec<bool>> {
        let data = self.read_block(block)?;
        RecordBlockRef::new(block, &data).slot_map()
    }

    pub fn set_slot_map(&mut self, block: BlockId, slot_map: &[bool]) -> Result<()> {
        let mut data = self.read_block(block)?;
        RecordBlock::new(block, &mut data).set_slot_map(slot_map)?;
        self.write_block(block, &data)
    }

    pub fn get_record(&mut self, rid: RecordId, types: &[AttrType]) -> Result<Record> {
        let data = self.read_block(rid.block)?;
        RecordBlockRef::new(rid.block, &data).record(rid.slot, types)
    }

    pub fn set_record(&mut self, rid: RecordId, record: &[Attribute]) -> Result<()> {
        let mut data = self.read_block(rid.block)?;
        RecordBlock::new(rid.block, &mut data).set_record(rid.slot, record)?;
        self.write_block(rid.block, &data)
    }

    /// Flushes the disk image.
    pub fn sync(&self) -> Result<()> {
        self.disk.sync()
    }
}

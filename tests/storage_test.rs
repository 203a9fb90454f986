//! Integration tests for the disk manager and block store

use cairn::common::{BLOCK_SIZE, DISK_BLOCKS};
use cairn::record::AttrType;
use cairn::storage::block::{slots_per_block, BlockHeader, BlockType};
use cairn::storage::disk::DiskManager;
use cairn::storage::BlockStore;
use cairn::{Attribute, BlockId, CairnError, DiskConfig, RecordId};
use tempfile::NamedTempFile;

#[test]
fn test_disk_manager_read_write_block() {
    let temp_file = NamedTempFile::new().unwrap();
    let dm = DiskManager::new(temp_file.path()).unwrap();

    let mut write_data = [0u8; BLOCK_SIZE];
    for (i, byte) in write_data.iter_mut().enumerate() {
        *byte = (i % 251) as u8;
    }
    dm.write_block(BlockId::new(3), &write_data).unwrap();

    let mut read_data = [0u8; BLOCK_SIZE];
    dm.read_block(BlockId::new(3), &mut read_data).unwrap();
    assert_eq!(write_data, read_data);

    // blocks before the last write read back as zeros
    dm.read_block(BlockId::new(1), &mut read_data).unwrap();
    assert!(read_data.iter().all(|&b| b == 0));
    assert_eq!(dm.file_blocks().unwrap(), 4);
    assert_eq!(dm.get_num_writes(), 1);
    assert_eq!(dm.get_num_reads(), 2);
}

#[test]
fn test_default_disk_size() {
    let temp_file = NamedTempFile::new().unwrap();
    let mut store = BlockStore::create(temp_file.path(), DiskConfig::default()).unwrap();
    assert_eq!(store.free_block_count(), DISK_BLOCKS as usize - 1);

    // larger requests are capped to what the allocation map can describe
    assert_eq!(DiskConfig::new(u32::MAX).num_blocks, DISK_BLOCKS);
}

#[test]
fn test_record_block_round_trip() {
    let temp_file = NamedTempFile::new().unwrap();
    let mut store = BlockStore::create(temp_file.path(), DiskConfig::new(8)).unwrap();
    let types = [AttrType::String, AttrType::Number, AttrType::Number];

    let block = store.allocate(BlockType::Record).unwrap();
    let header = BlockHeader::record_block(None, types.len(), slots_per_block(types.len()));
    store.init_record_block(block, &header).unwrap();
    assert_eq!(store.get_header(block).unwrap(), header);
    assert!(store.get_slot_map(block).unwrap().iter().all(|s| !s));

    let rid = RecordId::new(block, header.num_slots - 1);
    let record = vec![
        Attribute::from("last slot"),
        Attribute::from(-2.5),
        Attribute::from(1e9),
    ];
    store.set_record(rid, &record).unwrap();
    assert_eq!(store.get_record(rid, &types).unwrap(), record);

    let past_end = RecordId::new(block, header.num_slots);
    assert!(matches!(
        store.set_record(past_end, &record),
        Err(CairnError::InvalidSlot { .. })
    ));
}

#[test]
fn test_allocation_survives_reopen() {
    let temp_file = NamedTempFile::new().unwrap();
    let (kept, released) = {
        let mut store = BlockStore::create(temp_file.path(), DiskConfig::new(8)).unwrap();
        let kept = store.allocate(BlockType::Record).unwrap();
        let released = store.allocate(BlockType::IndexLeaf).unwrap();
        store.release(released).unwrap();
        (kept, released)
    };

    let mut store = BlockStore::open(temp_file.path()).unwrap();
    assert_eq!(store.block_type(kept).unwrap(), BlockType::Record);
    assert!(store.is_free(released).unwrap());
    assert_eq!(store.free_block_count(), 6);
    assert_eq!(store.allocate(BlockType::Record).unwrap(), released);
}

#[test]
fn test_unallocated_blocks_are_inaccessible() {
    let temp_file = NamedTempFile::new().unwrap();
    let mut store = BlockStore::create(temp_file.path(), DiskConfig::new(8)).unwrap();

    assert!(matches!(
        store.get_header(BlockId::new(4)),
        Err(CairnError::OutOfBound(_))
    ));
    assert!(matches!(
        store.read_block(BlockId::new(20)),
        Err(CairnError::OutOfBound(_))
    ));
    assert!(matches!(
        store.release(BlockId::new(0)),
        Err(CairnError::InvalidBlockType(_))
    ));
}

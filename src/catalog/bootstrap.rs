use tracing::info;

use crate::common::{
    BlockId, CairnError, RecordId, Result, ATTRCAT_ATTR_ATTRIBUTE_NAME,
    ATTRCAT_ATTR_ATTRIBUTE_TYPE, ATTRCAT_ATTR_OFFSET, ATTRCAT_ATTR_PRIMARY_FLAG,
    ATTRCAT_ATTR_RELNAME, ATTRCAT_ATTR_ROOT_BLOCK, ATTRCAT_BLOCK, ATTRCAT_NO_ATTRS,
    ATTRCAT_RELNAME, RELCAT_ATTR_FIRST_BLOCK, RELCAT_ATTR_LAST_BLOCK, RELCAT_ATTR_NO_ATTRIBUTES,
    RELCAT_ATTR_NO_RECORDS, RELCAT_ATTR_NO_SLOTS, RELCAT_ATTR_RELNAME, RELCAT_BLOCK,
    RELCAT_NO_ATTRS, RELCAT_RELNAME,
};
use crate::record::Record;
use crate::storage::block::{slots_per_block, BlockHeader, BlockType};
use crate::storage::BlockStore;

use super::entries::{AttrCatEntry, RelCatEntry, ATTRCAT_TYPES, RELCAT_TYPES};

/// Slot of each system relation's row in the relation catalog block
pub const RELCAT_SLOTNUM_FOR_RELCAT: usize = 0;
pub const RELCAT_SLOTNUM_FOR_ATTRCAT: usize = 1;

const RELCAT_COLUMNS: [&str; RELCAT_NO_ATTRS] = [
    RELCAT_ATTR_RELNAME,
    RELCAT_ATTR_NO_ATTRIBUTES,
    RELCAT_ATTR_NO_RECORDS,
    RELCAT_ATTR_FIRST_BLOCK,
    RELCAT_ATTR_LAST_BLOCK,
    RELCAT_ATTR_NO_SLOTS,
];

const ATTRCAT_COLUMNS: [&str; ATTRCAT_NO_ATTRS] = [
    ATTRCAT_ATTR_RELNAME,
    ATTRCAT_ATTR_ATTRIBUTE_NAME,
    ATTRCAT_ATTR_ATTRIBUTE_TYPE,
    ATTRCAT_ATTR_PRIMARY_FLAG,
    ATTRCAT_ATTR_ROOT_BLOCK,
    ATTRCAT_ATTR_OFFSET,
];

/// Relation catalog rows describing the two catalogs themselves.
pub fn system_rel_entries() -> [RelCatEntry; 2] {
    [
        RelCatEntry {
            rel_name: RELCAT_RELNAME.to_string(),
            num_attrs: RELCAT_NO_ATTRS,
            num_recs: 2,
            first_blk: Some(RELCAT_BLOCK),
            last_blk: Some(RELCAT_BLOCK),
            num_slots_per_blk: slots_per_block(RELCAT_NO_ATTRS),
        },
        RelCatEntry {
            rel_name: ATTRCAT_RELNAME.to_string(),
            num_attrs: ATTRCAT_NO_ATTRS,
            num_recs: RELCAT_NO_ATTRS + ATTRCAT_NO_ATTRS,
            first_blk: Some(ATTRCAT_BLOCK),
            last_blk: Some(ATTRCAT_BLOCK),
            num_slots_per_blk: slots_per_block(ATTRCAT_NO_ATTRS),
        },
    ]
}

/// Attribute catalog rows for the relation catalog's columns followed by
/// the attribute catalog's columns.
pub fn system_attr_entries() -> Vec<AttrCatEntry> {
    let relcat = RELCAT_COLUMNS
        .iter()
        .zip(RELCAT_TYPES.iter())
        .enumerate()
        .map(|(i, (name, ty))| AttrCatEntry::new(RELCAT_RELNAME, name, *ty, i));
    let attrcat = ATTRCAT_COLUMNS
        .iter()
        .zip(ATTRCAT_TYPES.iter())
        .enumerate()
        .map(|(i, (name, ty))| AttrCatEntry::new(ATTRCAT_RELNAME, name, *ty, i));
    relcat.chain(attrcat).collect()
}

/// Lays down the relation and attribute catalog blocks on a freshly
/// formatted disk.
pub fn format_catalogs(store: &mut BlockStore) -> Result<()> {
    let rel_entries = system_rel_entries();
    let attr_entries = system_attr_entries();

    write_catalog_block(
        store,
        RELCAT_BLOCK,
        RELCAT_NO_ATTRS,
        rel_entries.iter().map(RelCatEntry::to_record).collect(),
    )?;
    write_catalog_block(
        store,
        ATTRCAT_BLOCK,
        ATTRCAT_NO_ATTRS,
        attr_entries.iter().map(AttrCatEntry::to_record).collect(),
    )?;

    info!(
        relations = rel_entries.len(),
        attributes = attr_entries.len(),
        "formatted system catalogs"
    );
    Ok(())
}

fn write_catalog_block(
    store: &mut BlockStore,
    expected: BlockId,
    num_attrs: usize,
    rows: Vec<Record>,
) -> Result<()> {
    let block = store.allocate(BlockType::Record)?;
    if block != expected {
        return Err(CairnError::InvalidDatabaseFile);
    }

    let mut header = BlockHeader::record_block(None, num_attrs, slots_per_block(num_attrs));
    store.init_record_block(block, &header)?;

    let mut slots = store.get_slot_map(block)?;
    for (slot, row) in rows.iter().enumerate() {
        store.set_record(RecordId::new(block, slot), row)?;
        slots[slot] = true;
    }
    store.set_slot_map(block, &slots)?;

    header.num_entries = rows.len();
    store.set_header(block, &header)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::DiskConfig;
    use tempfile::NamedTempFile;

    #[test]
    fn test_system_rows() {
        let attrs = system_attr_entries();
        assert_eq!(attrs.len(), 12);
        assert_eq!(attrs[0].rel_name, RELCAT_RELNAME);
        assert_eq!(attrs[0].attr_name, RELCAT_ATTR_RELNAME);
        assert_eq!(attrs[6].rel_name, ATTRCAT_RELNAME);
        assert_eq!(attrs[7].attr_name, ATTRCAT_ATTR_ATTRIBUTE_NAME);
        assert_eq!(attrs[11].offset, 5);
    }

    #[test]
    fn test_format_catalogs() {
        let temp_file = NamedTempFile::new().unwrap();
        let mut store = BlockStore::create(temp_file.path(), DiskConfig::new(16)).unwrap();
        format_catalogs(&mut store).unwrap();

        let header = store.get_header(RELCAT_BLOCK).unwrap();
        assert_eq!(header.num_entries, 2);
        assert_eq!(header.num_slots, 20);
        assert_eq!(header.rblock, None);

        let row = store
            .get_record(
                RecordId::new(RELCAT_BLOCK, RELCAT_SLOTNUM_FOR_ATTRCAT),
                &RELCAT_TYPES,
            )
            .unwrap();
        let entry = RelCatEntry::from_record(&row).unwrap();
        assert_eq!(entry.rel_name, ATTRCAT_RELNAME);
        assert_eq!(entry.num_recs, 12);

        assert_eq!(store.get_header(ATTRCAT_BLOCK).unwrap().num_entries, 12);
        assert_eq!(store.free_block_count(), 13);
    }
}

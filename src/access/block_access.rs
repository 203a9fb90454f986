use tracing::{debug, info, warn};

use crate::cache::CatalogCache;
use crate::catalog::{
    AttrCatEntry, RelCatEntry, ATTRCAT_REL_NAME_INDEX, ATTRCAT_TYPES, RELCAT_REL_NAME_INDEX,
    RELCAT_TYPES,
};
use crate::common::{
    BlockId, CairnError, RecordId, RelId, Result, SearchOp, ATTRCAT_ATTR_RELNAME, ATTRCAT_RELID,
    ATTRCAT_RELNAME, RELCAT_ATTR_RELNAME, RELCAT_RELID, RELCAT_RELNAME,
};
use crate::index::IndexHook;
use crate::record::{Attribute, Record};
use crate::storage::block::{BlockHeader, BlockType, RecordBlockRef};
use crate::storage::BlockStore;

use super::scan::{RelationScan, SplicedBlock};

/// Record-level operations on relations, expressed in terms of block
/// headers, slot maps and the catalog cache.
///
/// `BlockAccess` borrows the store and the cache for the duration of a
/// call sequence; every catalog change it makes is applied to the cache in
/// the same call as the physical write.
pub struct BlockAccess<'a> {
    store: &'a mut BlockStore,
    cache: &'a mut CatalogCache,
}

impl<'a> BlockAccess<'a> {
    pub fn new(store: &'a mut BlockStore, cache: &'a mut CatalogCache) -> Self {
        Self { store, cache }
    }

    pub fn store(&mut self) -> &mut BlockStore {
        &mut *self.store
    }

    pub fn cache(&self) -> &CatalogCache {
        &*self.cache
    }

    pub fn cache_mut(&mut self) -> &mut CatalogCache {
        &mut *self.cache
    }

    /// Advances `scan` to the next record of its relation whose `attr_name`
    /// satisfies `compare(record[attr], value) <op> 0`.
    ///
    /// Records are visited in block-chain order, then by ascending slot.
    /// On a match the cursor moves onto it; when the chain runs out the
    /// cursor is left where it was.
    pub fn scan(
        &mut self,
        scan: &mut RelationScan,
        attr_name: &str,
        value: &Attribute,
        op: SearchOp,
    ) -> Result<Option<RecordId>> {
        let rel = scan.rel_id();
        let attr = self.cache.attr_entry(rel, attr_name)?;
        if attr.attr_type != value.attr_type() {
            return Err(CairnError::AttributeTypeMismatch);
        }
        let offset = attr.offset;
        let types = self.cache.attr_types(rel)?;
        let (mut block, mut slot) = scan.resume_point(self.cache.rel_entry(rel)?.first_blk);

        while let Some(current) = block {
            let data = self.store.read_block(current)?;
            let view = RecordBlockRef::new(current, &data);
            let header = view.header()?;
            let slot_map = view.slot_map()?;

            while slot < header.num_slots {
                if slot_map[slot] {
                    let record = view.record(slot, &types)?;
                    let cell = record.get(offset).ok_or_else(|| {
                        CairnError::CorruptCatalog(format!("offset {} of {}", offset, attr_name))
                    })?;
                    if cell.compare(value).is_some_and(|ord| op.matches(ord)) {
                        let rid = RecordId::new(current, slot);
                        scan.advance_to(rid);
                        return Ok(Some(rid));
                    }
                }
                slot += 1;
            }

            block = header.rblock;
            slot = 0;
        }

        Ok(None)
    }

    /// Returns the next record after the cursor, whatever its contents.
    pub fn project(&mut self, scan: &mut RelationScan) -> Result<Option<(RecordId, Record)>> {
        let rel = scan.rel_id();
        let types = self.cache.attr_types(rel)?;
        let (mut block, mut slot) = scan.resume_point(self.cache.rel_entry(rel)?.first_blk);

        while let Some(current) = block {
            let data = self.store.read_block(current)?;
            let view = RecordBlockRef::new(current, &data);
            let header = view.header()?;
            let slot_map = view.slot_map()?;

            if let Some(found) = (slot..header.num_slots).find(|&s| slot_map[s]) {
                let rid = RecordId::new(current, found);
                scan.advance_to(rid);
                return Ok(Some((rid, view.record(found, &types)?)));
            }

            block = header.rblock;
            slot = 0;
        }

        Ok(None)
    }

    /// Finds the next match using the relation's cached search cursor.
    ///
    /// The cursor is not reset between calls: repeated calls enumerate
    /// successive matches, and a caller starting an unrelated scan must
    /// reset it first (see `CatalogCache::reset_search_index`).
    pub fn linear_search(
        &mut self,
        rel: RelId,
        attr_name: &str,
        value: &Attribute,
        op: SearchOp,
    ) -> Result<Option<RecordId>> {
        let mut scan = self.cache.scan(rel)?.clone();
        let found = self.scan(&mut scan, attr_name, value, op)?;
        if found.is_some() {
            *self.cache.scan_mut(rel)? = scan;
        }
        Ok(found)
    }

    /// Like `linear_search`, but returns the matching record itself.
    pub fn search(
        &mut self,
        rel: RelId,
        attr_name: &str,
        value: &Attribute,
        op: SearchOp,
    ) -> Result<Record> {
        let rid = self
            .linear_search(rel, attr_name, value, op)?
            .ok_or(CairnError::NotFound)?;
        let types = self.cache.attr_types(rel)?;
        self.store.get_record(rid, &types)
    }

    /// Stores `record` in the first free slot of the relation's chain,
    /// appending a new block when every block is full.
    ///
    /// The relation catalog lives in a single fixed block and fails with
    /// `MaxRelations` instead of growing.
    pub fn insert(&mut self, rel: RelId, record: &[Attribute]) -> Result<RecordId> {
        let types = self.cache.attr_types(rel)?;
        if record.len() != types.len() {
            return Err(CairnError::AttributeCountMismatch {
                expected: types.len(),
                actual: record.len(),
            });
        }
        for (value, ty) in record.iter().zip(types.iter()) {
            if value.attr_type() != *ty {
                return Err(CairnError::AttributeTypeMismatch);
            }
            value.encode()?;
        }

        let mut entry = self.cache.rel_entry(rel)?.clone();

        let mut free = None;
        let mut prev = None;
        let mut block = entry.first_blk;
        while let Some(current) = block {
            let data = self.store.read_block(current)?;
            let view = RecordBlockRef::new(current, &data);
            let header = view.header()?;
            if let Some(slot) = view.slot_map()?.iter().position(|occupied| !occupied) {
                free = Some(RecordId::new(current, slot));
                break;
            }
            prev = Some(current);
            block = header.rblock;
        }

        let rid = match free {
            Some(rid) => rid,
            None => {
                if rel == RELCAT_RELID {
                    warn!("relation catalog is full");
                    return Err(CairnError::MaxRelations);
                }
                let new_block = self.append_block(rel, &mut entry, prev)?;
                RecordId::new(new_block, 0)
            }
        };

        self.store.set_record(rid, record)?;

        let mut slot_map = self.store.get_slot_map(rid.block)?;
        slot_map[rid.slot] = true;
        self.store.set_slot_map(rid.block, &slot_map)?;

        let mut header = self.store.get_header(rid.block)?;
        header.num_entries += 1;
        self.store.set_header(rid.block, &header)?;

        entry.num_recs += 1;
        self.cache.set_rel_entry(rel, entry)?;

        Ok(rid)
    }

    /// Allocates an empty block and links it after `prev`, the current tail.
    fn append_block(
        &mut self,
        rel: RelId,
        entry: &mut RelCatEntry,
        prev: Option<BlockId>,
    ) -> Result<BlockId> {
        let block = self.store.allocate(BlockType::Record)?;
        self.store.init_record_block(
            block,
            &BlockHeader::record_block(prev, entry.num_attrs, entry.num_slots_per_blk),
        )?;

        match prev {
            Some(tail) => {
                let mut header = self.store.get_header(tail)?;
                header.rblock = Some(block);
                self.store.set_header(tail, &header)?;
            }
            None => entry.first_blk = Some(block),
        }
        entry.last_blk = Some(block);
        self.cache.set_rel_entry(rel, entry.clone())?;

        debug!(rel = %rel, block = block.as_u32(), "extended block chain");
        Ok(block)
    }

    /// Frees one record of an open, non-catalog relation.
    pub fn delete_record(&mut self, rel: RelId, rid: RecordId) -> Result<()> {
        if rel == RELCAT_RELID || rel == ATTRCAT_RELID {
            return Err(CairnError::NotPermitted);
        }
        self.free_record_slot(rel, rid)?;
        Ok(())
    }

    /// Marks `rid` free, keeps the entry counts in step and, when its block
    /// becomes empty, unlinks and releases the block. The relation catalog's
    /// block is never released since that chain can't grow back.
    fn free_record_slot(&mut self, rel: RelId, rid: RecordId) -> Result<Option<SplicedBlock>> {
        let mut slot_map = self.store.get_slot_map(rid.block)?;
        if !slot_map.get(rid.slot).copied().unwrap_or(false) {
            return Err(CairnError::NotFound);
        }
        slot_map[rid.slot] = false;
        self.store.set_slot_map(rid.block, &slot_map)?;

        let mut header = self.store.get_header(rid.block)?;
        header.num_entries = header.num_entries.saturating_sub(1);
        self.store.set_header(rid.block, &header)?;

        let mut entry = self.cache.rel_entry(rel)?.clone();
        entry.num_recs = entry.num_recs.saturating_sub(1);

        let spliced = if header.num_entries == 0 && rel != RELCAT_RELID {
            Some(self.splice_out(rid.block, &header, &mut entry)?)
        } else {
            None
        };

        self.cache.set_rel_entry(rel, entry)?;
        if let Some(spliced) = &spliced {
            self.cache.scan_mut(rel)?.relink(spliced);
        }
        Ok(spliced)
    }

    /// Unlinks an empty block from its chain and returns it to the free pool.
    fn splice_out(
        &mut self,
        block: BlockId,
        header: &BlockHeader,
        entry: &mut RelCatEntry,
    ) -> Result<SplicedBlock> {
        let mut left_slots = 0;
        match header.lblock {
            Some(left) => {
                let mut left_header = self.store.get_header(left)?;
                left_header.rblock = header.rblock;
                left_slots = left_header.num_slots;
                self.store.set_header(left, &left_header)?;
            }
            None => entry.first_blk = header.rblock,
        }
        match header.rblock {
            Some(right) => {
                let mut right_header = self.store.get_header(right)?;
                right_header.lblock = header.lblock;
                self.store.set_header(right, &right_header)?;
            }
            None => entry.last_blk = header.lblock,
        }

        self.store.release(block)?;
        debug!(
            relation = %entry.rel_name,
            block = block.as_u32(),
            "spliced empty block out of chain"
        );

        Ok(SplicedBlock {
            block,
            lblock: header.lblock,
            rblock: header.rblock,
            left_slots,
        })
    }

    /// Finds the relation catalog row of `rel_name` with a fresh scan.
    pub fn find_relation(&mut self, rel_name: &str) -> Result<Option<RecordId>> {
        let mut scan = RelationScan::new(RELCAT_RELID);
        self.scan(
            &mut scan,
            RELCAT_ATTR_RELNAME,
            &Attribute::from(rel_name),
            SearchOp::Eq,
        )
    }

    /// Renames a relation in the relation catalog and in each of its
    /// attribute catalog rows.
    pub fn rename_relation(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        let new_attr = Attribute::from(new_name);
        new_attr.encode()?;

        if self.find_relation(new_name)?.is_some() {
            return Err(CairnError::RelationExists(new_name.to_string()));
        }
        let rel_rid = self
            .find_relation(old_name)?
            .ok_or_else(|| CairnError::RelationNotExists(old_name.to_string()))?;

        let mut rel_record = self.store.get_record(rel_rid, &RELCAT_TYPES)?;
        rel_record[RELCAT_REL_NAME_INDEX] = new_attr.clone();
        self.store.set_record(rel_rid, &rel_record)?;
        let num_attrs = RelCatEntry::from_record(&rel_record)?.num_attrs;

        // Other relations' rows can sit between ours, so stop after exactly
        // num_attrs matches rather than scanning to the end.
        let old_attr = Attribute::from(old_name);
        let mut scan = RelationScan::new(ATTRCAT_RELID);
        for _ in 0..num_attrs {
            let rid = self
                .scan(&mut scan, ATTRCAT_ATTR_RELNAME, &old_attr, SearchOp::Eq)?
                .ok_or_else(|| {
                    CairnError::CorruptCatalog(format!(
                        "relation {} has fewer than {} attribute rows",
                        old_name, num_attrs
                    ))
                })?;
            let mut attr_record = self.store.get_record(rid, &ATTRCAT_TYPES)?;
            attr_record[ATTRCAT_REL_NAME_INDEX] = new_attr.clone();
            self.store.set_record(rid, &attr_record)?;
        }

        info!(from = old_name, to = new_name, "renamed relation");
        Ok(())
    }

    /// Renames one attribute of a relation. The whole attribute list is
    /// scanned so that a clash with `new_name` is always reported.
    pub fn rename_attribute(&mut self, rel_name: &str, old_name: &str, new_name: &str) -> Result<()> {
        Attribute::from(new_name).encode()?;

        if self.find_relation(rel_name)?.is_none() {
            return Err(CairnError::RelationNotExists(rel_name.to_string()));
        }

        let rel_attr = Attribute::from(rel_name);
        let mut scan = RelationScan::new(ATTRCAT_RELID);
        let mut target = None;
        while let Some(rid) = self.scan(&mut scan, ATTRCAT_ATTR_RELNAME, &rel_attr, SearchOp::Eq)? {
            let entry = AttrCatEntry::from_record(&self.store.get_record(rid, &ATTRCAT_TYPES)?)?;
            if entry.attr_name == new_name {
                return Err(CairnError::AttributeExists(new_name.to_string()));
            }
            if entry.attr_name == old_name {
                target = Some((rid, entry));
            }
        }

        let (rid, mut entry) =
            target.ok_or_else(|| CairnError::AttributeNotExists(old_name.to_string()))?;
        entry.attr_name = new_name.to_string();
        self.store.set_record(rid, &entry.to_record())?;

        info!(
            relation = rel_name,
            from = old_name,
            to = new_name,
            "renamed attribute"
        );
        Ok(())
    }

    /// Removes a relation: its data blocks, its attribute catalog rows
    /// (destroying any index on them through `index`) and finally its
    /// relation catalog row. The relation must not be open.
    ///
    /// The relation catalog row is detached from the data chain before any
    /// block is released, and an attribute row is only removed once its
    /// index is gone. A delete that fails part way can therefore be repeated
    /// without touching blocks that have since been handed to another
    /// relation; at worst the blocks of an interrupted release leak.
    pub fn delete_relation(&mut self, rel_name: &str, index: &mut dyn IndexHook) -> Result<()> {
        if rel_name == RELCAT_RELNAME || rel_name == ATTRCAT_RELNAME {
            warn!(relation = rel_name, "refusing to delete a system catalog");
            return Err(CairnError::NotPermitted);
        }
        if self.cache.rel_id(rel_name).is_some() {
            return Err(CairnError::RelationOpen(rel_name.to_string()));
        }

        let rel_rid = self
            .find_relation(rel_name)?
            .ok_or_else(|| CairnError::RelationNotExists(rel_name.to_string()))?;
        let mut entry = RelCatEntry::from_record(&self.store.get_record(rel_rid, &RELCAT_TYPES)?)?;

        let chain = entry.first_blk.take();
        entry.last_blk = None;
        entry.num_recs = 0;
        self.store.set_record(rel_rid, &entry.to_record())?;
        let blocks_released = self.release_chain(chain)?;

        let rel_attr = Attribute::from(rel_name);
        let mut scan = RelationScan::new(ATTRCAT_RELID);
        let mut attrs_deleted = 0;
        while let Some(rid) = self.scan(&mut scan, ATTRCAT_ATTR_RELNAME, &rel_attr, SearchOp::Eq)? {
            let attr = AttrCatEntry::from_record(&self.store.get_record(rid, &ATTRCAT_TYPES)?)?;
            if let Some(root) = attr.root_block {
                index.destroy(&mut *self.store, root)?;
            }
            if let Some(spliced) = self.free_record_slot(ATTRCAT_RELID, rid)? {
                scan.relink(&spliced);
            }
            attrs_deleted += 1;
        }
        if attrs_deleted != entry.num_attrs {
            warn!(
                relation = rel_name,
                expected = entry.num_attrs,
                found = attrs_deleted,
                "attribute rows did not match the catalog"
            );
        }

        self.free_record_slot(RELCAT_RELID, rel_rid)?;

        info!(
            relation = rel_name,
            blocks_released, attrs_deleted, "deleted relation"
        );
        Ok(())
    }

    /// Releases every block of a chain, head to tail.
    fn release_chain(&mut self, first: Option<BlockId>) -> Result<usize> {
        let mut released = 0;
        let mut block = first;
        while let Some(current) = block {
            let header = self.store.get_header(current)?;
            self.store.release(current)?;
            block = header.rblock;
            released += 1;
        }
        Ok(released)
    }
}

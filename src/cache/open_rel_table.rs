use tracing::debug;

use crate::access::{BlockAccess, RelationScan};
use crate::catalog::{
    system_attr_entries, AttrCatEntry, RelCatEntry, ATTRCAT_TYPES, RELCAT_SLOTNUM_FOR_ATTRCAT,
    RELCAT_SLOTNUM_FOR_RELCAT, RELCAT_TYPES,
};
use crate::common::{
    CairnError, RecordId, RelId, Result, SearchOp, ATTRCAT_ATTR_RELNAME, ATTRCAT_BLOCK,
    ATTRCAT_RELID, RELCAT_ATTR_RELNAME, RELCAT_BLOCK, RELCAT_RELID,
};
use crate::record::Attribute;
use crate::storage::BlockStore;

use super::catalog_cache::{CatalogCache, RelCacheEntry};

/// Moves catalog rows between disk and the cache as relations are opened
/// and closed.
pub struct OpenRelTable;

impl OpenRelTable {
    /// Loads both catalogs under their fixed relation ids. Their rows sit at
    /// fixed positions, so no search is needed.
    pub fn load_system_catalogs(store: &mut BlockStore, cache: &mut CatalogCache) -> Result<()> {
        let num_system_attrs = system_attr_entries().len();
        let mut attrs = Vec::with_capacity(num_system_attrs);
        for slot in 0..num_system_attrs {
            let record = store.get_record(RecordId::new(ATTRCAT_BLOCK, slot), &ATTRCAT_TYPES)?;
            attrs.push(AttrCatEntry::from_record(&record)?);
        }

        for (rel, slot) in [
            (RELCAT_RELID, RELCAT_SLOTNUM_FOR_RELCAT),
            (ATTRCAT_RELID, RELCAT_SLOTNUM_FOR_ATTRCAT),
        ] {
            let rec_id = RecordId::new(RELCAT_BLOCK, slot);
            let entry = RelCatEntry::from_record(&store.get_record(rec_id, &RELCAT_TYPES)?)?;
            let rel_attrs: Vec<_> = attrs
                .iter()
                .filter(|a| a.rel_name == entry.rel_name)
                .cloned()
                .collect();
            if rel_attrs.len() != entry.num_attrs {
                return Err(CairnError::CorruptCatalog(entry.rel_name));
            }
            cache.load(rel, RelCacheEntry::new(rel, entry, rec_id, rel_attrs))?;
        }
        Ok(())
    }

    /// Opens `rel_name`, returning its id. Opening an open relation returns
    /// the id it already has.
    pub fn open_rel(
        store: &mut BlockStore,
        cache: &mut CatalogCache,
        rel_name: &str,
    ) -> Result<RelId> {
        if let Some(rel) = cache.rel_id(rel_name) {
            return Ok(rel);
        }
        let rel = cache.free_rel_id().ok_or(CairnError::CacheFull)?;

        let name = Attribute::from(rel_name);
        let mut access = BlockAccess::new(&mut *store, &mut *cache);

        let mut scan = RelationScan::new(RELCAT_RELID);
        let rec_id = access
            .scan(&mut scan, RELCAT_ATTR_RELNAME, &name, SearchOp::Eq)?
            .ok_or_else(|| CairnError::RelationNotExists(rel_name.to_string()))?;
        let entry = RelCatEntry::from_record(&access.store().get_record(rec_id, &RELCAT_TYPES)?)?;

        let mut attrs = Vec::with_capacity(entry.num_attrs);
        let mut scan = RelationScan::new(ATTRCAT_RELID);
        while let Some(rid) = access.scan(&mut scan, ATTRCAT_ATTR_RELNAME, &name, SearchOp::Eq)? {
            let record = access.store().get_record(rid, &ATTRCAT_TYPES)?;
            attrs.push(AttrCatEntry::from_record(&record)?);
        }
        if attrs.len() != entry.num_attrs {
            return Err(CairnError::CorruptCatalog(rel_name.to_string()));
        }

        cache.load(rel, RelCacheEntry::new(rel, entry, rec_id, attrs))?;
        debug!(relation = rel_name, rel = %rel, "opened relation");
        Ok(rel)
    }

    /// Writes the relation's catalog row back if it changed while cached.
    pub fn write_back(store: &mut BlockStore, cache: &mut CatalogCache, rel: RelId) -> Result<()> {
        if let Some((rec_id, entry)) = cache.take_dirty(rel)? {
            store.set_record(rec_id, &entry.to_record())?;
            debug!(relation = %entry.rel_name, "wrote back relation catalog entry");
        }
        Ok(())
    }

    pub fn close_rel(store: &mut BlockStore, cache: &mut CatalogCache, rel: RelId) -> Result<()> {
        Self::write_back(store, cache, rel)?;
        cache.unload(rel)?;
        Ok(())
    }

    /// Writes back every open relation without closing any.
    pub fn flush(store: &mut BlockStore, cache: &mut CatalogCache) -> Result<()> {
        for rel in cache.open_rel_ids() {
            Self::write_back(store, cache, rel)?;
        }
        store.sync()
    }

    pub fn rel_id(cache: &CatalogCache, rel_name: &str) -> Result<RelId> {
        cache
            .rel_id(rel_name)
            .ok_or_else(|| CairnError::RelationNotOpen(rel_name.to_string()))
    }
}

//! Relation-level DDL. Each operation checks that it does not touch a
//! system catalog or an open relation, then hands off to block access.

use std::collections::HashSet;

use tracing::{info, warn};

use crate::access::BlockAccess;
use crate::cache::{CatalogCache, OpenRelTable};
use crate::catalog::{AttrCatEntry, RelCatEntry};
use crate::common::{
    CairnError, RelId, Result, ATTRCAT_RELID, ATTRCAT_RELNAME, ATTR_SIZE, BLOCK_SIZE, HEADER_SIZE,
    RELCAT_RELID, RELCAT_RELNAME,
};
use crate::index::IndexHook;
use crate::record::{AttrType, Attribute};
use crate::storage::block::slots_per_block;
use crate::storage::BlockStore;

/// Widest relation that still fits one record per block.
pub const MAX_ATTRS: usize = (BLOCK_SIZE - HEADER_SIZE - 1) / ATTR_SIZE;

fn is_system_relation(rel_name: &str) -> bool {
    rel_name == RELCAT_RELNAME || rel_name == ATTRCAT_RELNAME
}

pub struct Schema<'a> {
    store: &'a mut BlockStore,
    cache: &'a mut CatalogCache,
    index: &'a mut dyn IndexHook,
}

impl<'a> Schema<'a> {
    pub fn new(
        store: &'a mut BlockStore,
        cache: &'a mut CatalogCache,
        index: &'a mut dyn IndexHook,
    ) -> Self {
        Self {
            store,
            cache,
            index,
        }
    }

    fn access(&mut self) -> BlockAccess<'_> {
        BlockAccess::new(&mut *self.store, &mut *self.cache)
    }

    fn ensure_closed(&self, rel_name: &str) -> Result<()> {
        if self.cache.rel_id(rel_name).is_some() {
            return Err(CairnError::RelationOpen(rel_name.to_string()));
        }
        Ok(())
    }

    /// Creates an empty relation with the given columns, in order.
    ///
    /// If the attribute catalog runs out of room half way, the partly
    /// created relation is deleted again and `DiskFull` is returned.
    pub fn create_rel(&mut self, rel_name: &str, attrs: &[(&str, AttrType)]) -> Result<()> {
        if is_system_relation(rel_name) {
            return Err(CairnError::NotPermitted);
        }
        if attrs.is_empty() || attrs.len() > MAX_ATTRS {
            return Err(CairnError::InvalidAttributeCount {
                max: MAX_ATTRS,
                actual: attrs.len(),
            });
        }
        Attribute::from(rel_name).encode()?;
        let mut seen = HashSet::with_capacity(attrs.len());
        for (name, _) in attrs {
            Attribute::from(*name).encode()?;
            if !seen.insert(*name) {
                return Err(CairnError::DuplicateAttribute(name.to_string()));
            }
        }

        let mut access = BlockAccess::new(&mut *self.store, &mut *self.cache);
        if access.find_relation(rel_name)?.is_some() {
            return Err(CairnError::RelationExists(rel_name.to_string()));
        }

        let entry = RelCatEntry {
            rel_name: rel_name.to_string(),
            num_attrs: attrs.len(),
            num_recs: 0,
            first_blk: None,
            last_blk: None,
            num_slots_per_blk: slots_per_block(attrs.len()),
        };
        access.insert(RELCAT_RELID, &entry.to_record())?;

        for (offset, (name, ty)) in attrs.iter().enumerate() {
            let attr = AttrCatEntry::new(rel_name, name, *ty, offset);
            if let Err(e) = access.insert(ATTRCAT_RELID, &attr.to_record()) {
                warn!(relation = rel_name, error = %e, "attribute catalog insert failed, rolling back");
                if let Err(e) = access.delete_relation(rel_name, &mut *self.index) {
                    warn!(relation = rel_name, error = %e, "rollback of partial relation failed");
                }
                return Err(CairnError::DiskFull);
            }
        }

        info!(relation = rel_name, attributes = attrs.len(), "created relation");
        Ok(())
    }

    pub fn delete_rel(&mut self, rel_name: &str) -> Result<()> {
        if is_system_relation(rel_name) {
            return Err(CairnError::NotPermitted);
        }
        self.ensure_closed(rel_name)?;
        BlockAccess::new(&mut *self.store, &mut *self.cache)
            .delete_relation(rel_name, &mut *self.index)
    }

    pub fn rename_rel(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        if is_system_relation(old_name) || is_system_relation(new_name) {
            return Err(CairnError::NotPermitted);
        }
        self.ensure_closed(old_name)?;
        self.access().rename_relation(old_name, new_name)
    }

    pub fn rename_attr(&mut self, rel_name: &str, old_name: &str, new_name: &str) -> Result<()> {
        if is_system_relation(rel_name) {
            return Err(CairnError::NotPermitted);
        }
        self.ensure_closed(rel_name)?;
        self.access().rename_attribute(rel_name, old_name, new_name)
    }

    pub fn open_rel(&mut self, rel_name: &str) -> Result<RelId> {
        OpenRelTable::open_rel(&mut *self.store, &mut *self.cache, rel_name)
    }

    /// Closes a user relation; the catalogs stay open for the lifetime of
    /// the database.
    pub fn close_rel(&mut self, rel_name: &str) -> Result<()> {
        if is_system_relation(rel_name) {
            return Err(CairnError::NotPermitted);
        }
        let rel = OpenRelTable::rel_id(&*self.cache, rel_name)?;
        OpenRelTable::close_rel(&mut *self.store, &mut *self.cache, rel)
    }
}

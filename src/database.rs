use std::path::Path;

use tracing::{info, warn};

use crate::access::BlockAccess;
use crate::cache::{CatalogCache, OpenRelTable};
use crate::catalog::format_catalogs;
use crate::common::{DiskConfig, RelId, Result, ATTRCAT_RELID, RELCAT_RELID};
use crate::index::{BlockIndexReclaimer, IndexHook};
use crate::schema::Schema;
use crate::storage::BlockStore;

/// A disk image together with the catalog cache of its open relations.
///
/// Both catalogs are opened when the database is created or opened and stay
/// open until it is closed. Dropping a `Database` writes cached catalog
/// changes back; call `close` to see any error from doing so.
pub struct Database {
    store: BlockStore,
    cache: CatalogCache,
    index: Box<dyn IndexHook>,
}

impl Database {
    /// Formats a new disk image at `path` and lays down the system catalogs.
    pub fn create<P: AsRef<Path>>(path: P, config: DiskConfig) -> Result<Self> {
        let mut store = BlockStore::create(path, config)?;
        format_catalogs(&mut store)?;
        Self::load(store)
    }

    /// Opens an existing disk image.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load(BlockStore::open(path)?)
    }

    fn load(mut store: BlockStore) -> Result<Self> {
        let mut cache = CatalogCache::new();
        OpenRelTable::load_system_catalogs(&mut store, &mut cache)?;
        let free_blocks = store.free_block_count();
        info!(
            path = store.disk().get_disk_path(),
            free_blocks,
            "database ready"
        );
        Ok(Self {
            store,
            cache,
            index: Box::new(BlockIndexReclaimer::new()),
        })
    }

    /// Replaces the hook used to tear down indexes of deleted relations.
    pub fn with_index_hook(mut self, index: Box<dyn IndexHook>) -> Self {
        self.index = index;
        self
    }

    pub fn block_access(&mut self) -> BlockAccess<'_> {
        BlockAccess::new(&mut self.store, &mut self.cache)
    }

    pub fn schema(&mut self) -> Schema<'_> {
        Schema::new(&mut self.store, &mut self.cache, self.index.as_mut())
    }

    pub fn store(&mut self) -> &mut BlockStore {
        &mut self.store
    }

    pub fn cache(&self) -> &CatalogCache {
        &self.cache
    }

    pub fn open_rel(&mut self, rel_name: &str) -> Result<RelId> {
        self.schema().open_rel(rel_name)
    }

    pub fn close_rel(&mut self, rel_name: &str) -> Result<()> {
        self.schema().close_rel(rel_name)
    }

    /// Writes every changed catalog entry back to disk and syncs the image.
    pub fn flush(&mut self) -> Result<()> {
        OpenRelTable::flush(&mut self.store, &mut self.cache)
    }

    /// Closes every user relation, then writes back the catalogs' own entries.
    pub fn close(mut self) -> Result<()> {
        for rel in self.cache.open_rel_ids() {
            if rel != RELCAT_RELID && rel != ATTRCAT_RELID {
                OpenRelTable::close_rel(&mut self.store, &mut self.cache, rel)?;
            }
        }
        self.flush()
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!(error = %e, "failed to write back catalog cache");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{CairnError, ATTRCAT_RELNAME, RELCAT_RELNAME};
    use crate::record::AttrType;
    use tempfile::NamedTempFile;

    #[test]
    fn test_create_loads_catalogs() {
        let temp_file = NamedTempFile::new().unwrap();
        let db = Database::create(temp_file.path(), DiskConfig::new(32)).unwrap();

        assert_eq!(db.cache().rel_id(RELCAT_RELNAME), Some(RELCAT_RELID));
        assert_eq!(db.cache().rel_id(ATTRCAT_RELNAME), Some(ATTRCAT_RELID));
        assert_eq!(db.cache().rel_entry(RELCAT_RELID).unwrap().num_recs, 2);
        assert_eq!(db.cache().rel_entry(ATTRCAT_RELID).unwrap().num_recs, 12);
    }

    #[test]
    fn test_catalog_counts_survive_reopen() {
        let temp_file = NamedTempFile::new().unwrap();
        {
            let mut db = Database::create(temp_file.path(), DiskConfig::new(32)).unwrap();
            db.schema()
                .create_rel("Students", &[("name", AttrType::String), ("marks", AttrType::Number)])
                .unwrap();
            db.close().unwrap();
        }

        let mut db = Database::open(temp_file.path()).unwrap();
        assert_eq!(db.cache().rel_entry(RELCAT_RELID).unwrap().num_recs, 3);
        assert_eq!(db.cache().rel_entry(ATTRCAT_RELID).unwrap().num_recs, 14);

        let rel = db.open_rel("Students").unwrap();
        assert_eq!(db.cache().attr_entries(rel).unwrap().len(), 2);
    }

    #[test]
    fn test_open_rejects_garbage() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), vec![0xAB; 4096]).unwrap();
        assert!(matches!(
            Database::open(temp_file.path()),
            Err(CairnError::InvalidDatabaseFile)
        ));
    }
}

use crate::access::RelationScan;
use crate::catalog::{AttrCatEntry, RelCatEntry};
use crate::common::{CairnError, RecordId, RelId, Result, MAX_OPEN};
use crate::record::AttrType;

/// Cached state of one open relation.
#[derive(Debug, Clone)]
pub struct RelCacheEntry {
    entry: RelCatEntry,
    /// Location of the relation's row in the relation catalog
    rec_id: RecordId,
    /// Set when `entry` differs from the row on disk
    dirty: bool,
    /// Attribute descriptors, ordered by offset
    attrs: Vec<AttrCatEntry>,
    /// Cursor used by `BlockAccess::linear_search`
    scan: RelationScan,
}

impl RelCacheEntry {
    pub fn new(
        rel: RelId,
        entry: RelCatEntry,
        rec_id: RecordId,
        mut attrs: Vec<AttrCatEntry>,
    ) -> Self {
        attrs.sort_by_key(|a| a.offset);
        Self {
            entry,
            rec_id,
            dirty: false,
            attrs,
            scan: RelationScan::new(rel),
        }
    }
}

/// In-memory mirror of the catalog rows of every open relation, indexed by
/// relation id, plus each relation's search cursor.
///
/// The cache is authoritative while a relation is open: block access
/// updates it synchronously and the relation catalog row is rewritten from
/// it when the relation is closed.
pub struct CatalogCache {
    slots: Vec<Option<RelCacheEntry>>,
}

impl CatalogCache {
    pub fn new() -> Self {
        Self {
            slots: vec![None; MAX_OPEN],
        }
    }

    fn slot(&self, rel: RelId) -> Result<&RelCacheEntry> {
        self.slots
            .get(rel.as_usize())
            .and_then(Option::as_ref)
            .ok_or_else(|| CairnError::RelationNotOpen(rel.to_string()))
    }

    fn slot_mut(&mut self, rel: RelId) -> Result<&mut RelCacheEntry> {
        self.slots
            .get_mut(rel.as_usize())
            .and_then(Option::as_mut)
            .ok_or_else(|| CairnError::RelationNotOpen(rel.to_string()))
    }

    pub fn is_open(&self, rel: RelId) -> bool {
        self.slot(rel).is_ok()
    }

    /// Returns the id of the open relation with this name.
    pub fn rel_id(&self, rel_name: &str) -> Option<RelId> {
        self.slots
            .iter()
            .position(|s| matches!(s, Some(e) if e.entry.rel_name == rel_name))
            .map(RelId::new)
    }

    /// Returns the lowest unused relation id.
    pub fn free_rel_id(&self) -> Option<RelId> {
        self.slots.iter().position(Option::is_none).map(RelId::new)
    }

    pub fn open_rel_ids(&self) -> Vec<RelId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_some())
            .map(|(i, _)| RelId::new(i))
            .collect()
    }

    pub(crate) fn load(&mut self, rel: RelId, entry: RelCacheEntry) -> Result<()> {
        let slot = self
            .slots
            .get_mut(rel.as_usize())
            .ok_or(CairnError::CacheFull)?;
        if slot.is_some() {
            return Err(CairnError::RelationOpen(rel.to_string()));
        }
        *slot = Some(entry);
        Ok(())
    }

    pub(crate) fn unload(&mut self, rel: RelId) -> Result<RelCacheEntry> {
        self.slots
            .get_mut(rel.as_usize())
            .and_then(Option::take)
            .ok_or_else(|| CairnError::RelationNotOpen(rel.to_string()))
    }

    pub fn rel_entry(&self, rel: RelId) -> Result<&RelCatEntry> {
        Ok(&self.slot(rel)?.entry)
    }

    pub fn set_rel_entry(&mut self, rel: RelId, entry: RelCatEntry) -> Result<()> {
        let slot = self.slot_mut(rel)?;
        if slot.entry != entry {
            slot.entry = entry;
            slot.dirty = true;
        }
        Ok(())
    }

    /// Returns the relation's catalog row location and entry if it needs to
    /// be written back, clearing the dirty flag.
    pub(crate) fn take_dirty(&mut self, rel: RelId) -> Result<Option<(RecordId, RelCatEntry)>> {
        let slot = self.slot_mut(rel)?;
        if !slot.dirty {
            return Ok(None);
        }
        slot.dirty = false;
        Ok(Some((slot.rec_id, slot.entry.clone())))
    }

    pub fn attr_entries(&self, rel: RelId) -> Result<&[AttrCatEntry]> {
        Ok(&self.slot(rel)?.attrs)
    }

    pub fn attr_entry(&self, rel: RelId, attr_name: &str) -> Result<&AttrCatEntry> {
        self.slot(rel)?
            .attrs
            .iter()
            .find(|a| a.attr_name == attr_name)
            .ok_or_else(|| CairnError::AttributeNotExists(attr_name.to_string()))
    }

    /// Column types in record order.
    pub fn attr_types(&self, rel: RelId) -> Result<Vec<AttrType>> {
        Ok(self.slot(rel)?.attrs.iter().map(|a| a.attr_type).collect())
    }

    /// Last record matched by `linear_search`. `None` also covers a cursor
    /// parked at the head of a block after its own block was released; see
    /// `search_at_start` for whether the next search restarts the relation.
    pub fn search_index(&self, rel: RelId) -> Result<Option<RecordId>> {
        Ok(self.slot(rel)?.scan.position())
    }

    pub fn search_at_start(&self, rel: RelId) -> Result<bool> {
        Ok(self.slot(rel)?.scan.is_at_start())
    }

    pub fn set_search_index(&mut self, rel: RelId, rid: RecordId) -> Result<()> {
        self.slot_mut(rel)?.scan.advance_to(rid);
        Ok(())
    }

    pub fn reset_search_index(&mut self, rel: RelId) -> Result<()> {
        self.slot_mut(rel)?.scan.reset();
        Ok(())
    }

    pub(crate) fn scan(&self, rel: RelId) -> Result<&RelationScan> {
        Ok(&self.slot(rel)?.scan)
    }

    pub(crate) fn scan_mut(&mut self, rel: RelId) -> Result<&mut RelationScan> {
        Ok(&mut self.slot_mut(rel)?.scan)
    }
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::BlockId;

    fn students() -> RelCacheEntry {
        let rel = RelId::new(2);
        RelCacheEntry::new(
            rel,
            RelCatEntry {
                rel_name: "Students".to_string(),
                num_attrs: 2,
                num_recs: 0,
                first_blk: None,
                last_blk: None,
                num_slots_per_blk: 61,
            },
            RecordId::new(BlockId::new(1), 2),
            vec![
                AttrCatEntry::new("Students", "marks", AttrType::Number, 1),
                AttrCatEntry::new("Students", "name", AttrType::String, 0),
            ],
        )
    }

    #[test]
    fn test_load_and_lookup() {
        let mut cache = CatalogCache::new();
        let rel = RelId::new(2);
        cache.load(rel, students()).unwrap();

        assert_eq!(cache.rel_id("Students"), Some(rel));
        assert_eq!(cache.rel_id("Courses"), None);
        assert_eq!(cache.free_rel_id(), Some(RelId::new(0)));
        assert_eq!(
            cache.attr_types(rel).unwrap(),
            vec![AttrType::String, AttrType::Number]
        );
        assert_eq!(cache.attr_entry(rel, "marks").unwrap().offset, 1);
        assert!(matches!(
            cache.attr_entry(rel, "age"),
            Err(CairnError::AttributeNotExists(_))
        ));
    }

    #[test]
    fn test_dirty_tracking() {
        let mut cache = CatalogCache::new();
        let rel = RelId::new(2);
        cache.load(rel, students()).unwrap();
        assert!(cache.take_dirty(rel).unwrap().is_none());

        let mut entry = cache.rel_entry(rel).unwrap().clone();
        cache.set_rel_entry(rel, entry.clone()).unwrap();
        assert!(cache.take_dirty(rel).unwrap().is_none());

        entry.num_recs = 5;
        cache.set_rel_entry(rel, entry).unwrap();
        let (rec_id, written) = cache.take_dirty(rel).unwrap().unwrap();
        assert_eq!(rec_id, RecordId::new(BlockId::new(1), 2));
        assert_eq!(written.num_recs, 5);
        assert!(cache.take_dirty(rel).unwrap().is_none());
    }

    #[test]
    fn test_search_index() {
        let mut cache = CatalogCache::new();
        let rel = RelId::new(2);
        cache.load(rel, students()).unwrap();

        let rid = RecordId::new(BlockId::new(7), 3);
        cache.set_search_index(rel, rid).unwrap();
        assert_eq!(cache.search_index(rel).unwrap(), Some(rid));
        cache.reset_search_index(rel).unwrap();
        assert_eq!(cache.search_index(rel).unwrap(), None);
    }

    #[test]
    fn test_unopened_relation() {
        let mut cache = CatalogCache::new();
        assert!(matches!(
            cache.rel_entry(RelId::new(4)),
            Err(CairnError::RelationNotOpen(_))
        ));
        assert!(matches!(
            cache.unload(RelId::new(4)),
            Err(CairnError::RelationNotOpen(_))
        ));
        assert!(matches!(
            cache.load(RelId::new(MAX_OPEN), students()),
            Err(CairnError::CacheFull)
        ));
    }
}

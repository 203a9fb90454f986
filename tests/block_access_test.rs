//! Integration tests for record-level block access

use cairn::access::RelationScan;
use cairn::catalog::RelCatEntry;
use cairn::common::{ATTRCAT_RELID, RELCAT_RELID};
use cairn::{
    AttrType, Attribute, BlockId, CairnError, Database, DiskConfig, RecordId, RelId, SearchOp,
};
use rand::Rng;
use tempfile::NamedTempFile;

fn new_db(temp_file: &NamedTempFile, num_blocks: u32) -> Database {
    Database::create(temp_file.path(), DiskConfig::new(num_blocks)).unwrap()
}

/// Creates and opens `name(key NUM, label STR)`, 61 records per block.
fn create_pairs(db: &mut Database, name: &str) -> RelId {
    db.schema()
        .create_rel(name, &[("key", AttrType::Number), ("label", AttrType::String)])
        .unwrap();
    db.open_rel(name).unwrap()
}

fn pair(key: f64) -> Vec<Attribute> {
    vec![Attribute::from(key), Attribute::from(format!("r{}", key as i64))]
}

/// Walks the relation's chain checking links, counts and allocation.
/// Returns the blocks in chain order.
fn check_chain(db: &mut Database, rel: RelId) -> Vec<BlockId> {
    let entry: RelCatEntry = db.cache().rel_entry(rel).unwrap().clone();
    let mut blocks = Vec::new();
    let mut total = 0;
    let mut prev = None;
    let mut block = entry.first_blk;

    while let Some(current) = block {
        assert!(!db.store().is_free(current).unwrap());
        let header = db.store().get_header(current).unwrap();
        assert_eq!(header.lblock, prev);
        let occupied = db
            .store()
            .get_slot_map(current)
            .unwrap()
            .iter()
            .filter(|s| **s)
            .count();
        assert_eq!(occupied, header.num_entries);
        assert!(header.num_entries > 0 || rel == RELCAT_RELID);
        total += header.num_entries;
        blocks.push(current);
        prev = Some(current);
        block = header.rblock;
    }

    assert_eq!(entry.last_blk, prev);
    assert_eq!(entry.num_recs, total);
    blocks
}

#[test]
fn test_scan_visits_chain_then_slot_order() {
    let temp_file = NamedTempFile::new().unwrap();
    let mut db = new_db(&temp_file, 32);
    let rel = create_pairs(&mut db, "Pairs");

    let rids: Vec<RecordId> = (0..70)
        .map(|i| db.block_access().insert(rel, &pair(i as f64)).unwrap())
        .collect();
    assert_eq!(rids[60].block, rids[0].block);
    assert_ne!(rids[61].block, rids[0].block);
    assert_eq!(rids[61].slot, 0);

    let mut seen = Vec::new();
    while let Some(rid) = db
        .block_access()
        .linear_search(rel, "key", &Attribute::from(0.0), SearchOp::Ge)
        .unwrap()
    {
        seen.push(rid);
    }
    assert_eq!(seen, rids);
    assert_eq!(check_chain(&mut db, rel).len(), 2);
}

#[test]
fn test_linear_search_resumes_from_cursor() {
    let temp_file = NamedTempFile::new().unwrap();
    let mut db = new_db(&temp_file, 32);
    let rel = create_pairs(&mut db, "Pairs");
    for key in [5.0, 1.0, 7.0, 3.0, 9.0] {
        db.block_access().insert(rel, &pair(key)).unwrap();
    }

    let mut access = db.block_access();
    let four = Attribute::from(4.0);
    let slots: Vec<usize> = (0..3)
        .map(|_| {
            access
                .linear_search(rel, "key", &four, SearchOp::Gt)
                .unwrap()
                .unwrap()
                .slot
        })
        .collect();
    assert_eq!(slots, vec![0, 2, 4]);

    // exhausted: the cursor stays on the last match
    let last = access.cache().search_index(rel).unwrap();
    assert_eq!(access.linear_search(rel, "key", &four, SearchOp::Gt).unwrap(), None);
    assert_eq!(access.cache().search_index(rel).unwrap(), last);

    // r3 sits before the cursor until it is reset
    let label = Attribute::from("r3");
    assert!(matches!(
        access.search(rel, "label", &label, SearchOp::Eq),
        Err(CairnError::NotFound)
    ));
    access.cache_mut().reset_search_index(rel).unwrap();
    let record = access.search(rel, "label", &label, SearchOp::Eq).unwrap();
    assert_eq!(record[0].as_number(), Some(3.0));
}

#[test]
fn test_explicit_scan_leaves_cached_cursor() {
    let temp_file = NamedTempFile::new().unwrap();
    let mut db = new_db(&temp_file, 32);
    let rel = create_pairs(&mut db, "Pairs");
    for key in [1.0, 2.0, 3.0] {
        db.block_access().insert(rel, &pair(key)).unwrap();
    }

    let mut access = db.block_access();
    let mut scan = RelationScan::new(rel);
    let mut keys = Vec::new();
    while let Some((_, record)) = access.project(&mut scan).unwrap() {
        keys.push(record[0].as_number().unwrap());
    }
    assert_eq!(keys, vec![1.0, 2.0, 3.0]);
    assert_eq!(access.cache().search_index(rel).unwrap(), None);
}

#[test]
fn test_type_checks() {
    let temp_file = NamedTempFile::new().unwrap();
    let mut db = new_db(&temp_file, 32);
    let rel = create_pairs(&mut db, "Pairs");
    let mut access = db.block_access();

    assert!(matches!(
        access.insert(rel, &[Attribute::from(1.0)]),
        Err(CairnError::AttributeCountMismatch { expected: 2, actual: 1 })
    ));
    assert!(matches!(
        access.insert(rel, &[Attribute::from("one"), Attribute::from("two")]),
        Err(CairnError::AttributeTypeMismatch)
    ));
    assert!(matches!(
        access.insert(rel, &[Attribute::from(1.0), Attribute::from("a label far too long")]),
        Err(CairnError::NameTooLong(_))
    ));
    assert!(matches!(
        access.linear_search(rel, "key", &Attribute::from("1"), SearchOp::Eq),
        Err(CairnError::AttributeTypeMismatch)
    ));
    assert!(matches!(
        access.linear_search(rel, "missing", &Attribute::from(1.0), SearchOp::Eq),
        Err(CairnError::AttributeNotExists(_))
    ));

    // nothing was allocated by the rejected inserts
    assert_eq!(access.cache().rel_entry(rel).unwrap().first_blk, None);
}

#[test]
fn test_freed_slot_is_reused() {
    let temp_file = NamedTempFile::new().unwrap();
    let mut db = new_db(&temp_file, 32);
    let rel = create_pairs(&mut db, "Pairs");

    let mut access = db.block_access();
    let rids: Vec<RecordId> = (0..3)
        .map(|i| access.insert(rel, &pair(i as f64)).unwrap())
        .collect();
    access.delete_record(rel, rids[1]).unwrap();
    assert!(matches!(
        access.delete_record(rel, rids[1]),
        Err(CairnError::NotFound)
    ));

    let reused = access.insert(rel, &pair(10.0)).unwrap();
    assert_eq!(reused, rids[1]);
    assert_eq!(access.cache().rel_entry(rel).unwrap().num_recs, 3);
}

#[test]
fn test_emptied_blocks_leave_the_chain() {
    let temp_file = NamedTempFile::new().unwrap();
    let mut db = new_db(&temp_file, 32);
    let rel = create_pairs(&mut db, "Pairs");
    let free_before = db.store().free_block_count();

    let rids: Vec<RecordId> = (0..62)
        .map(|i| db.block_access().insert(rel, &pair(i as f64)).unwrap())
        .collect();
    let tail = rids[61].block;
    assert_eq!(db.store().free_block_count(), free_before - 2);

    db.block_access().delete_record(rel, rids[61]).unwrap();
    assert!(db.store().is_free(tail).unwrap());
    assert_eq!(check_chain(&mut db, rel), vec![rids[0].block]);

    for rid in &rids[..61] {
        db.block_access().delete_record(rel, *rid).unwrap();
    }
    let entry = db.cache().rel_entry(rel).unwrap().clone();
    assert_eq!((entry.first_blk, entry.last_blk, entry.num_recs), (None, None, 0));
    assert_eq!(db.store().free_block_count(), free_before);

    let rid = db.block_access().insert(rel, &pair(1.0)).unwrap();
    assert_eq!(check_chain(&mut db, rel), vec![rid.block]);
}

#[test]
fn test_cursor_survives_block_release() {
    let temp_file = NamedTempFile::new().unwrap();
    let mut db = new_db(&temp_file, 32);
    let rel = create_pairs(&mut db, "Pairs");
    let rids: Vec<RecordId> = (0..62)
        .map(|i| db.block_access().insert(rel, &pair(i as f64)).unwrap())
        .collect();

    let mut access = db.block_access();
    let found = access
        .linear_search(rel, "key", &Attribute::from(61.0), SearchOp::Eq)
        .unwrap();
    assert_eq!(found, Some(rids[61]));

    // the cursor's block is released; later appends are still found
    access.delete_record(rel, rids[61]).unwrap();
    access.delete_record(rel, rids[0]).unwrap();
    access.insert(rel, &pair(100.0)).unwrap();
    let appended = access.insert(rel, &pair(200.0)).unwrap();
    assert_ne!(appended.block, rids[0].block);

    let found = access
        .linear_search(rel, "key", &Attribute::from(150.0), SearchOp::Gt)
        .unwrap();
    assert_eq!(found, Some(appended));
}

#[test]
fn test_cursor_moved_to_next_block_head() {
    let temp_file = NamedTempFile::new().unwrap();
    let mut db = new_db(&temp_file, 32);
    let rel = create_pairs(&mut db, "Pairs");
    let rids: Vec<RecordId> = (0..62)
        .map(|i| db.block_access().insert(rel, &pair(i as f64)).unwrap())
        .collect();

    let mut access = db.block_access();
    let found = access
        .linear_search(rel, "key", &Attribute::from(0.0), SearchOp::Eq)
        .unwrap();
    assert_eq!(found, Some(rids[0]));
    for rid in &rids[..61] {
        access.delete_record(rel, *rid).unwrap();
    }

    // no last match, yet the next search continues from the second block
    assert_eq!(db.cache().search_index(rel).unwrap(), None);
    assert!(!db.cache().search_at_start(rel).unwrap());
    let found = db
        .block_access()
        .linear_search(rel, "key", &Attribute::from(0.0), SearchOp::Ge)
        .unwrap();
    assert_eq!(found, Some(rids[61]));

    db.block_access().cache_mut().reset_search_index(rel).unwrap();
    assert!(db.cache().search_at_start(rel).unwrap());
}

#[test]
fn test_random_inserts_and_deletes_keep_chain_consistent() {
    let temp_file = NamedTempFile::new().unwrap();
    let mut db = new_db(&temp_file, 128);

    // 40 columns leaves room for 3 records per block
    let names: Vec<String> = (0..40).map(|i| format!("c{}", i)).collect();
    let attrs: Vec<(&str, AttrType)> = names
        .iter()
        .map(|n| (n.as_str(), AttrType::Number))
        .collect();
    db.schema().create_rel("Wide", &attrs).unwrap();
    let rel = db.open_rel("Wide").unwrap();
    assert_eq!(db.cache().rel_entry(rel).unwrap().num_slots_per_blk, 3);

    let mut rng = rand::thread_rng();
    let mut live: Vec<RecordId> = Vec::new();
    for i in 0..400 {
        if live.is_empty() || rng.gen_bool(0.6) {
            let record = vec![Attribute::from(i as f64); 40];
            let rid = db.block_access().insert(rel, &record).unwrap();
            assert!(!live.contains(&rid));
            live.push(rid);
        } else {
            let victim = live.swap_remove(rng.gen_range(0..live.len()));
            db.block_access().delete_record(rel, victim).unwrap();
        }

        if i % 20 == 0 {
            check_chain(&mut db, rel);
        }
    }

    check_chain(&mut db, rel);
    assert_eq!(db.cache().rel_entry(rel).unwrap().num_recs, live.len());
    check_chain(&mut db, ATTRCAT_RELID);
}

#[test]
fn test_disk_full_leaves_relation_unchanged() {
    let temp_file = NamedTempFile::new().unwrap();
    // only the map and the two catalog blocks
    let mut db = new_db(&temp_file, 3);
    let rel = create_pairs(&mut db, "Pairs");

    assert!(matches!(
        db.block_access().insert(rel, &pair(1.0)),
        Err(CairnError::DiskFull)
    ));
    let entry = db.cache().rel_entry(rel).unwrap();
    assert_eq!((entry.first_blk, entry.num_recs), (None, 0));
}

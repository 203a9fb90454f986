use cairn::access::RelationScan;
use cairn::{AttrType, Attribute, Database, DiskConfig, SearchOp};
use tracing_subscriber::EnvFilter;

fn run(db_path: &str) -> cairn::Result<()> {
    let mut db = Database::create(db_path, DiskConfig::new(64))?;
    println!("Formatted {} with 64 blocks\n", db_path);

    db.schema().create_rel(
        "Students",
        &[
            ("name", AttrType::String),
            ("batch", AttrType::String),
            ("marks", AttrType::Number),
        ],
    )?;
    let rel = db.open_rel("Students")?;

    let students = [("alice", "A", 91.0), ("bob", "B", 67.5), ("carol", "A", 78.0)];
    for (name, batch, marks) in students {
        let rid = db
            .block_access()
            .insert(rel, &[Attribute::from(name), Attribute::from(batch), Attribute::from(marks)])?;
        println!("Inserted {} at {}", name, rid);
    }

    println!("\nStudents with marks >= 75:");
    let threshold = Attribute::from(75.0);
    let mut access = db.block_access();
    let mut scan = RelationScan::new(rel);
    while let Some(rid) = access.scan(&mut scan, "marks", &threshold, SearchOp::Ge)? {
        let types = access.cache().attr_types(rel)?;
        let record = access.store().get_record(rid, &types)?;
        println!("  - {:?}", record);
    }

    db.close_rel("Students")?;
    db.schema().rename_rel("Students", "Alumni")?;
    db.schema().rename_attr("Alumni", "batch", "year")?;
    println!("\nRenamed Students to Alumni, batch to year");

    let rel = db.open_rel("Alumni")?;
    let mut scan = RelationScan::new(rel);
    let mut count = 0;
    while db.block_access().project(&mut scan)?.is_some() {
        count += 1;
    }
    println!("Alumni holds {} records", count);
    db.close_rel("Alumni")?;

    let free_before = db.store().free_block_count();
    db.schema().delete_rel("Alumni")?;
    println!(
        "Deleted Alumni, free blocks {} -> {}",
        free_before,
        db.store().free_block_count()
    );

    db.close()
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("Cairn - a self-describing record store");
    println!("======================================\n");

    let db_path = "demo.db";
    let result = run(db_path);
    std::fs::remove_file(db_path).ok();

    match result {
        Ok(()) => println!("\nDemo completed successfully!"),
        Err(e) => {
            eprintln!("demo failed: {}", e);
            std::process::exit(1);
        }
    }
}

//! Example: a sensor store moving from V1 to V2 and back.
//!
//! Run with `RUST_LOG=debug cargo run --example sensors` to see every key.

use dsv_migrate::{
    record, BoxError, CancelToken, MigrationBuilder, RecordAccess, RecordStore, StoredRecord,
    VersionedMigrationList, VersionedStore,
};
use dsv_store::{MemoryStore, SharedStore};
use serde::{Deserialize, Serialize};

#[record(kind = "sensor.v1")]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SensorV1 {
    val: i64,
}

#[record(kind = "sensor.v2")]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SensorV2 {
    val: i64,
}

fn main() -> Result<(), dsv_migrate::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("=== Sensor readings, schema V1 ===\n");
    let shared = SharedStore::new(MemoryStore::new());
    let mut seed = RecordStore::<_, SensorV1>::new(shared.clone(), "1");
    for (key, val) in [("a", 1), ("b", 2), ("c", 3)] {
        seed.begin(key, &SensorV1 { val })?;
        println!("{key}: {:?}", SensorV1 { val });
    }

    // V2 stores tenths of a degree.
    let scale = || {
        MigrationBuilder::new(|s: SensorV1| Ok::<_, BoxError>(SensorV2 { val: s.val * 10 }))
            .reversible(|s: SensorV2| Ok::<_, BoxError>(SensorV1 { val: s.val / 10 }))
            .build()
    };

    let mut v2: VersionedStore<_, SensorV2> = VersionedStore::open(
        shared.clone(),
        VersionedMigrationList::new("1").step("2", scale()?),
        "2",
    )?;

    println!("\n--- Before migrating ---");
    match v2.list() {
        Ok(_) => println!("unexpectedly readable"),
        Err(e) => println!("list: {e}"),
    }

    let cancel = CancelToken::new();
    v2.migrate(&cancel)?;

    println!("\n--- Migrated to V2 ---");
    for key in ["a", "b", "c"] {
        println!("{key}: {:?}", v2.get(key).read()?);
    }

    v2.get("b").mutate(|s: &mut SensorV2| {
        s.val += 5;
        Ok(())
    })?;
    println!("b after adjustment: {:?}", v2.get("b").read()?);

    println!("\n--- Back to V1 ---");
    let v1: VersionedStore<_, SensorV1> = VersionedStore::open(
        shared,
        VersionedMigrationList::new("1").step("2", scale()?),
        "1",
    )?;
    v1.migrate(&cancel)?;
    for record in v1.list()? {
        println!("{record:?}");
    }
    println!("state: {:?}", v1.runner().state());

    Ok(())
}

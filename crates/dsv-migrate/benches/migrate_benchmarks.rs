use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use dsv_migrate::{
    record, BoxError, CancelToken, KeyFilter, Migration, MigrationBuilder, Runner,
    VersionedMigrationList,
};
use dsv_store::{MemoryStore, StateStore};
use serde::{Deserialize, Serialize};

#[record(kind = "bench.v1")]
#[derive(Serialize, Deserialize)]
struct ReadingV1 {
    device: String,
    celsius: f64,
}

#[record(kind = "bench.v2")]
#[derive(Serialize, Deserialize)]
struct ReadingV2 {
    device: String,
    celsius: f64,
    humidity: Option<f64>,
}

fn add_humidity() -> Migration {
    MigrationBuilder::new(|r: ReadingV1| {
        Ok::<_, BoxError>(ReadingV2 {
            device: r.device,
            celsius: r.celsius,
            humidity: None,
        })
    })
    .reversible(|r: ReadingV2| {
        Ok::<_, BoxError>(ReadingV1 {
            device: r.device,
            celsius: r.celsius,
        })
    })
    .build()
    .expect("migration builds")
}

fn seeded(n: usize) -> MemoryStore {
    use dsv_migrate::Record;

    let mut store = MemoryStore::new();
    for i in 0..n {
        let reading = ReadingV1 {
            device: format!("sensor-{i}"),
            celsius: i as f64 * 0.5,
        };
        store
            .put("1", &format!("k{i:05}"), &reading.encode().unwrap())
            .unwrap();
    }
    store
}

fn bench_up(c: &mut Criterion) {
    let migration = add_humidity();
    c.bench_function("Migration::up 1000 records", |b| {
        b.iter_batched(
            || seeded(1000),
            |mut store| {
                let touched = migration
                    .up(&CancelToken::new(), &mut store, "1", "2")
                    .unwrap();
                black_box(touched.len())
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_filter(c: &mut Criterion) {
    let filter = KeyFilter::new()
        .only((0..500).map(|i| format!("k{i:05}")))
        .exclude((0..50).map(|i| format!("k{i:05}")));
    let keys: Vec<String> = (0..1000).map(|i| format!("k{i:05}")).collect();

    c.bench_function("KeyFilter::matches 1000 keys", |b| {
        b.iter(|| black_box(keys.iter().filter(|k| filter.matches(k)).count()))
    });
}

fn bench_runner_round_trip(c: &mut Criterion) {
    c.bench_function("Runner forward+back 1000 records", |b| {
        b.iter_batched(
            || seeded(1000),
            |mut store| {
                let list = VersionedMigrationList::new("1").step("2", add_humidity());
                let runner = Runner::new(list, "2").unwrap();
                runner.migrate(&CancelToken::new(), &mut store).unwrap();
                runner.set_target("1");
                runner.migrate(&CancelToken::new(), &mut store).unwrap();
                black_box(store.state_count())
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_up, bench_filter, bench_runner_round_trip);
criterion_main!(benches);

#![allow(missing_docs)]
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lnstore_core::{Changes, Key, Query, Record, Store, StoreConfig};
use tempfile::TempDir;

fn node_record(i: u32) -> Record {
    Record::new()
        .with("_rev", 0i64)
        .with("alias", format!("node-{i}"))
        .with("color", "#3399ff")
        .with("features", vec![5u32, 7, 9, 12, 14, 17])
        .with("sockets", vec![format!("10.0.{}.{}:9735", i / 256, i % 256)])
}

fn open(dir: &TempDir) -> Store {
    Store::open(dir.path(), StoreConfig::desktop()).unwrap()
}

/// Put, get and update of single records
fn record_ops(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    let keys: Vec<_> = (0..1000u32).map(|i| Key::derive("node", &i.to_string()).unwrap()).collect();
    for (i, key) in keys.iter().enumerate() {
        store.put("nodes", key, &node_record(i as u32), None).unwrap();
    }

    let mut group = c.benchmark_group("record ops");

    group.bench_function("put replace", |b| {
        let record = node_record(7);
        b.iter(|| store.put("nodes", black_box(&keys[7]), &record, None).unwrap())
    });

    group.bench_function("get", |b| {
        let mut i = 0;
        b.iter(|| {
            i = (i + 1) % keys.len();
            black_box(store.get("nodes", &keys[i]).unwrap())
        })
    });

    group.bench_function("update set", |b| {
        let changes = Changes::new().set("alias", "renamed");
        b.iter(|| store.update("nodes", black_box(&keys[11]), &changes, None).unwrap())
    });

    group.finish();
}

/// Full-table and filtered scans
fn scans(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    for i in 0..5000u32 {
        let key = Key::derive("node", &i.to_string()).unwrap();
        store.put("nodes", &key, &node_record(i), None).unwrap();
    }

    let mut group = c.benchmark_group("scans");
    group.bench_function("scan all", |b| b.iter(|| black_box(store.query("nodes", &Query::new()).unwrap())));
    group.bench_function("scan where", |b| {
        let query = Query::new().where_starts_with("alias", "node-49");
        b.iter(|| black_box(store.query("nodes", &query).unwrap()))
    });
    group.finish();
}

criterion_group!(benches, record_ops, scans);
criterion_main!(benches);

//! Storage adapter benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use keyvaluestorage::prelude::*;
use serde_json::json;

fn benchmark_browser(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let storage = BrowserStorage::new();
    let value = json!({ "name": "john doe", "topics": ["a", "b", "c"] });

    c.bench_function("browser_set_get", |b| {
        b.iter(|| {
            rt.block_on(async {
                storage.set_item("yolo", &value).await.unwrap();
                let _item: Option<serde_json::Value> = black_box(storage.get_item("yolo").await.unwrap());
            })
        })
    });
}

fn benchmark_persistent(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("bench.db").to_string_lossy().into_owned();
    let storage = PersistentStorage::open_path(path).unwrap();
    let value = json!({ "name": "john doe", "topics": ["a", "b", "c"] });

    c.bench_function("persistent_set_get", |b| {
        b.iter(|| {
            rt.block_on(async {
                storage.set_item("yolo", &value).await.unwrap();
                let _item: Option<serde_json::Value> = black_box(storage.get_item("yolo").await.unwrap());
            })
        })
    });
}

criterion_group!(benches, benchmark_browser, benchmark_persistent);
criterion_main!(benches);

//! Performance benchmarks for charge-map-lib
//!
//! Run with: cargo bench --package charge-map-lib

use charge_map_lib::{Config, RawStation, StationCollection, Viewport};
use criterion::{Criterion, Throughput, criterion_group, criterion_main};

/// Generate stations scattered over a metro area around a base coordinate.
fn generate_stations(count: usize, base_lat: f64, base_lon: f64) -> Vec<RawStation> {
    (0..count)
        .map(|i| {
            let t = i as f64 / count as f64;
            RawStation {
                id: Some(format!("st-{i}")),
                name: Some(format!("Station {i}")),
                latitude: Some(base_lat + t * 0.5 + (i as f64 * 0.7).sin() * 0.05),
                longitude: Some(base_lon + t * 0.5 + (i as f64 * 1.3).cos() * 0.05),
                ..Default::default()
            }
        })
        .collect()
}

fn loaded_collection(count: usize) -> StationCollection {
    let mut collection = StationCollection::new(Config::default());
    collection.replace_stations(generate_stations(count, 28.4, 76.9));
    collection
}

fn bench_query_performance(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");

    let collection = loaded_collection(50_000);

    // City view at a zoom where most markers are clusters
    let city = Viewport::new(76.9, 28.4, 77.5, 29.0, 11.0);
    group.bench_function("city_viewport_50k", |b| {
        b.iter(|| collection.visible_markers(&city));
    });

    // Street view past the clustering maximum, individual pins only
    let street = Viewport::new(77.19, 28.59, 77.22, 28.62, 18.0);
    group.bench_function("street_viewport_50k", |b| {
        b.iter(|| collection.visible_markers(&street));
    });

    // Country-scale overview
    let overview = Viewport::new(68.0, 8.0, 97.0, 37.0, 5.0);
    group.bench_function("overview_viewport_50k", |b| {
        b.iter(|| collection.visible_markers(&overview));
    });

    group.finish();
}

fn bench_index_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("construction");
    group.sample_size(20);

    for count in [10_000usize, 50_000] {
        let raw = generate_stations(count, 28.4, 76.9);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_function(format!("replace_stations_{count}"), |b| {
            b.iter(|| {
                let mut collection = StationCollection::new(Config::default());
                collection.replace_stations(raw.clone());
            });
        });
    }

    group.finish();
}

fn bench_collection_info(c: &mut Criterion) {
    let mut group = c.benchmark_group("info");

    let collection = loaded_collection(50_000);

    group.bench_function("get_info", |b| {
        b.iter(|| collection.get_info());
    });

    group.bench_function("bounding_box", |b| {
        b.iter(|| collection.bounding_box_wgs84());
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_query_performance,
    bench_index_construction,
    bench_collection_info,
);

criterion_main!(benches);

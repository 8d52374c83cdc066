//! Search and replace benchmarks over a 10^6-registration index
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use locix::index::{LocationIndex, Platform};
use locix::records::parse_records;
use std::io::Cursor;

/// 1000 platforms, each registered in 1000 cities of one of 100 regions
fn large_dataset() -> Vec<Platform> {
    (0..1_000)
        .map(|i| {
            let locations = (0..1_000).map(|city| format!("/region{}/city{}", i % 100, city));
            Platform::new(format!("Platform_{i}"), locations).expect("valid platform")
        })
        .collect()
}

fn bench_search(c: &mut Criterion) {
    let index = LocationIndex::new();
    index.replace(large_dataset());

    let mut group = c.benchmark_group("search");
    for location in [
        "/region7",
        "/region7/city42",
        "/region7/city42/street/house",
        "/unknown/place",
        "region7/city42/",
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(location), location, |b, loc| {
            b.iter(|| index.search(black_box(loc)).expect("non-empty location"))
        });
    }
    group.finish();
}

fn bench_replace(c: &mut Criterion) {
    let mut group = c.benchmark_group("replace");
    group.sample_size(10);

    let index = LocationIndex::new();
    group.bench_function("1m_registrations", |b| {
        b.iter_batched(
            large_dataset,
            |platforms| index.replace(platforms),
            criterion::BatchSize::LargeInput,
        )
    });
    group.finish();
}

/// A single platform registered in 200k cities
fn wide_platform() -> Platform {
    Platform::new(
        "Wide",
        (0..200_000).map(|city| format!("/ru/region{}/city{}", city % 100, city)),
    )
    .expect("valid platform")
}

fn bench_wide_platform(c: &mut Criterion) {
    let mut group = c.benchmark_group("wide_platform");
    group.sample_size(10);

    let index = LocationIndex::new();
    group.bench_function("replace", |b| {
        b.iter_batched(
            || vec![wide_platform()],
            |platforms| index.replace(platforms),
            criterion::BatchSize::LargeInput,
        )
    });

    group.bench_function("search", |b| {
        b.iter(|| {
            index
                .search(black_box("/ru/region7/city107"))
                .expect("non-empty location")
        })
    });
    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let mut input = String::new();
    for i in 0..10_000 {
        input.push_str(&format!(
            "Platform_{}:/ru/region{}/city{},/ru/region{}\n",
            i % 2_500,
            i % 80,
            i,
            i % 80
        ));
    }

    c.bench_function("parse_10k_lines", |b| {
        b.iter(|| parse_records(Cursor::new(black_box(input.as_bytes()))).expect("in-memory read"))
    });
}

criterion_group!(
    benches,
    bench_search,
    bench_replace,
    bench_wide_platform,
    bench_parse
);
criterion_main!(benches);

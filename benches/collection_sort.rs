//! Benchmark for catalog ordering and the cached port
//!
//! Sorting a 10K-product catalog by rank, price and score, plus
//! cached versus uncached list reads.

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use product_catalog::domain::service;
use product_catalog::{
    CacheHints, CachingProductPort, InMemoryProductPort, Product, ProductCollection, ProductData,
    ProductPort,
};

fn catalog(size: usize) -> Vec<ProductData> {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    (0..size)
        .map(|i| {
            let stamp = base + Duration::hours((i % 500) as i64);
            ProductData {
                id: format!("p-{:05}", i),
                name: format!("Product {}", i),
                rank: ((i * 7919) % 100) as i64,
                description: "Benchmark product".to_string(),
                price: ((i * 31) % 1000) as f64 + 0.99,
                category_id: format!("cat-{}", i % 12),
                image_url: format!("https://cdn.example.com/{}.jpg", i),
                stock: (i % 5) as i64,
                created_at: stamp,
                updated_at: stamp,
            }
        })
        .collect()
}

fn bench_sorting(c: &mut Criterion) {
    let mut group = c.benchmark_group("collection_sort");

    for size in [100usize, 1_000, 10_000] {
        let products = ProductCollection::from_trusted(catalog(size));
        let slice: Vec<Product> = products.as_slice().to_vec();
        let now = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("by_rank", size), &products, |b, p| {
            b.iter(|| black_box(p.sort_by_rank()));
        });

        group.bench_with_input(BenchmarkId::new("by_price", size), &products, |b, p| {
            b.iter(|| black_box(p.sort_by_price(false)));
        });

        group.bench_with_input(BenchmarkId::new("by_score", size), &slice, |b, p| {
            b.iter(|| black_box(service::sort_by_score_at(p, now)));
        });
    }

    group.finish();
}

fn bench_cached_reads(c: &mut Criterion) {
    let mut group = c.benchmark_group("cached_port");
    group.throughput(Throughput::Elements(1));

    let rt = tokio::runtime::Runtime::new().unwrap();
    let plain = InMemoryProductPort::with_products(catalog(1_000));
    let cached = CachingProductPort::new(
        InMemoryProductPort::with_products(catalog(1_000)),
        CacheHints::default(),
    );

    group.bench_function("find_all_uncached", |b| {
        b.iter(|| rt.block_on(async { black_box(plain.find_all().await.unwrap()) }));
    });

    group.bench_function("find_all_cached", |b| {
        b.iter(|| rt.block_on(async { black_box(cached.find_all().await.unwrap()) }));
    });

    group.finish();
}

criterion_group!(benches, bench_sorting, bench_cached_reads);
criterion_main!(benches);

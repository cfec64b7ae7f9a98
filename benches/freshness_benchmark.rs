use chrono::{Duration, Utc};
use criterion::{criterion_group, criterion_main, Criterion};
use freshtrack::models::{Freshness, Product};
use freshtrack::services::freshness::{self, InventoryFilter};
use std::hint::black_box;

fn inventory(n: usize) -> Vec<Product> {
    let now = Utc::now();
    (0..n)
        .map(|i| {
            // Spread expiry dates from a week ago to a month out
            let offset = (i % 40) as i64 - 7;
            Product {
                id: format!("p{}", i),
                product_name: format!("item {}", i),
                product_image: String::new(),
                expiry_date: now + Duration::days(offset),
                freshness: if i % 5 == 0 {
                    Freshness::Rotten
                } else {
                    Freshness::Fresh
                },
                confidence: "N/A".to_string(),
                is_expired: offset < 0,
                added_date: now,
                transaction_hash: None,
            }
        })
        .collect()
}

fn benchmark_inventory(c: &mut Criterion) {
    let products = inventory(1_000);
    let now = Utc::now();

    let mut group = c.benchmark_group("inventory");

    group.bench_function("classify_all", |b| {
        b.iter(|| {
            products
                .iter()
                .map(|p| freshness::classify(p.expiry_date, black_box(now)))
                .count()
        })
    });

    group.bench_function("filter_expiring", |b| {
        b.iter(|| {
            freshness::filter_inventory(
                black_box(&products),
                Some(InventoryFilter::Expiring),
                now,
            )
        })
    });

    group.bench_function("expiring_soon", |b| {
        b.iter(|| freshness::expiring_soon(black_box(&products), now))
    });

    group.finish();
}

criterion_group!(benches, benchmark_inventory);
criterion_main!(benches);

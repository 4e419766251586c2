use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use int_collections::Dict;
use std::time::Duration;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn bench_insert_fresh_100k(c: &mut Criterion) {
    c.bench_function("dict::insert_fresh_100k", |b| {
        b.iter_batched(
            Dict::new,
            |mut d| {
                for (i, x) in lcg(1).take(100_000).enumerate() {
                    let _ = d.insert(x as i64, i as i64).unwrap();
                }
                black_box(d)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_insert_presized_100k(c: &mut Criterion) {
    c.bench_function("dict::insert_presized_100k", |b| {
        b.iter_batched(
            || Dict::presized(100_000).unwrap(),
            |mut d| {
                for (i, x) in lcg(1).take(100_000).enumerate() {
                    let _ = d.insert(x as i64, i as i64).unwrap();
                }
                black_box(d)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_insert_sequential_100k(c: &mut Criterion) {
    c.bench_function("dict::insert_sequential_100k", |b| {
        b.iter_batched(
            Dict::new,
            |mut d| {
                for k in 0..100_000i64 {
                    let _ = d.insert(k, k).unwrap();
                }
                black_box(d)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_get_hit_10k(c: &mut Criterion) {
    c.bench_function("dict::get_hit_10k_on_100k", |b| {
        let mut d = Dict::new();
        let keys: Vec<i64> = lcg(7).take(100_000).map(|x| x as i64).collect();
        for (i, &k) in keys.iter().enumerate() {
            let _ = d.insert(k, i as i64).unwrap();
        }
        let queries: Vec<i64> = keys.iter().step_by(10).copied().collect();
        b.iter(|| {
            for &k in &queries {
                black_box(d.get(k));
            }
        })
    });
}

fn bench_get_miss_10k(c: &mut Criterion) {
    c.bench_function("dict::get_miss_10k_on_100k", |b| {
        let mut d = Dict::new();
        for (i, x) in lcg(11).take(100_000).enumerate() {
            let _ = d.insert(x as i64, i as i64).unwrap();
        }
        let mut miss = lcg(0xdead_beef);
        b.iter(|| {
            for _ in 0..10_000 {
                let k = miss.next().unwrap() as i64;
                black_box(d.get(k));
            }
        })
    });
}

fn bench_churn_10k(c: &mut Criterion) {
    c.bench_function("dict::insert_remove_churn_10k", |b| {
        b.iter_batched(
            Dict::new,
            |mut d| {
                for (i, x) in lcg(13).take(10_000).enumerate() {
                    let _ = d.insert(x as i64, i as i64).unwrap();
                    black_box(d.remove(x as i64));
                }
                black_box(d)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(50)
        .measurement_time(Duration::from_secs(8))
        .warm_up_time(Duration::from_secs(2))
}

criterion_group! {
    name = benches;
    config = bench_config();
    targets = bench_insert_fresh_100k, bench_insert_presized_100k,
        bench_insert_sequential_100k, bench_get_hit_10k, bench_get_miss_10k,
        bench_churn_10k
}
criterion_main!(benches);

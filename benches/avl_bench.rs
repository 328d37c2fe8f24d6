use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use std::time::Duration;
use treehash::{AvlTree, TraversalOrder, Visit};

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn bench_insert_random(c: &mut Criterion) {
    let values: Vec<u64> = lcg(1).take(10_000).collect();
    c.bench_function("avl_insert_random_10k", |b| {
        b.iter_batched(
            AvlTree::<u64>::new,
            |mut t| {
                for v in &values {
                    t.insert(*v);
                }
                black_box(t)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_insert_sequential(c: &mut Criterion) {
    c.bench_function("avl_insert_sequential_10k", |b| {
        b.iter_batched(
            AvlTree::<u64>::new,
            |mut t| {
                for v in 0..10_000u64 {
                    t.insert(v);
                }
                black_box(t)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_find_hit(c: &mut Criterion) {
    let values: Vec<u64> = lcg(7).take(20_000).collect();
    c.bench_function("avl_find_hit", |b| {
        let mut t = AvlTree::new();
        for v in &values {
            t.insert(*v);
        }
        let mut it = values.iter().cycle();
        b.iter(|| {
            let v = it.next().unwrap();
            black_box(t.find_equal(v));
        })
    });
}

fn bench_remove_all(c: &mut Criterion) {
    let values: Vec<u64> = lcg(11).take(10_000).collect();
    c.bench_function("avl_remove_all_10k", |b| {
        b.iter_batched(
            || {
                let mut t = AvlTree::new();
                for v in &values {
                    t.insert(*v);
                }
                t
            },
            |mut t| {
                for v in &values {
                    black_box(t.remove(v));
                }
                black_box(t)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_traverse(c: &mut Criterion) {
    let values: Vec<u64> = lcg(13).take(10_000).collect();
    let mut t = AvlTree::new();
    for v in &values {
        t.insert(*v);
    }
    for (name, order) in [
        ("avl_traverse_in_order_10k", TraversalOrder::InOrder),
        ("avl_traverse_breadth_first_10k", TraversalOrder::BreadthFirst),
    ] {
        c.bench_function(name, |b| {
            b.iter(|| {
                let mut sum = 0u64;
                t.traverse(order, |_, v, _| {
                    sum = sum.wrapping_add(*v);
                    Visit::Continue
                })
                .unwrap();
                black_box(sum)
            })
        });
    }
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
    targets = bench_insert_random, bench_insert_sequential, bench_find_hit, bench_remove_all,
        bench_traverse
}
criterion_main!(benches);

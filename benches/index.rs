use criterion::{criterion_group, criterion_main, Criterion};
use rand::{Rng, SeedableRng};
use rb_index::{AbstractIndex, AnyIndex, OrderedIndex, RbTree, Strategy};
use std::sync::Arc;

const ITEM_COUNT: i64 = 100_000;

const STRATEGIES: [Strategy; 4] = [
    Strategy::RwLock,
    Strategy::Mutex,
    Strategy::LockFree,
    Strategy::Sharded,
];

fn filled(strategy: Strategy) -> AnyIndex<u64> {
    let index = AnyIndex::new(strategy, 0);
    for key in 0..ITEM_COUNT {
        index.insert(key, key.unsigned_abs());
    }
    index
}

fn tree_insert_delete(c: &mut Criterion) {
    c.bench_function("tree insert+delete", |b| {
        let mut tree = RbTree::default();
        let mut rng = rand::rngs::StdRng::seed_from_u64(0);

        b.iter(|| {
            let key = rng.random_range(0..ITEM_COUNT);
            tree.insert(key, key);
            tree.delete(rng.random_range(0..ITEM_COUNT));
        });
    });
}

fn point_read(c: &mut Criterion) {
    for strategy in STRATEGIES {
        let index = filled(strategy);
        let mut rng = rand::rngs::StdRng::seed_from_u64(0);

        c.bench_function(&format!("{strategy} get"), |b| {
            b.iter(|| {
                let key = rng.random_range(0..ITEM_COUNT);
                assert!(index.get(key).is_some());
            });
        });
    }
}

fn range_scan(c: &mut Criterion) {
    for strategy in STRATEGIES {
        let index = filled(strategy);

        c.bench_function(&format!("{strategy} range 1000"), |b| {
            b.iter(|| {
                let mut count = 0;
                index.range(5_000, 5_999, &mut |_, _| {
                    count += 1;
                    true
                });
                assert_eq!(1_000, count);
            });
        });
    }
}

fn concurrent_insert(c: &mut Criterion) {
    const THREADS: i64 = 4;
    const PER_THREAD: i64 = 10_000;

    for strategy in STRATEGIES {
        c.bench_function(&format!("{strategy} insert {THREADS} threads"), |b| {
            b.iter_with_large_drop(|| {
                let index = Arc::new(AnyIndex::<u64>::new(strategy, 0));

                let handles = (0..THREADS)
                    .map(|t| {
                        let index = index.clone();
                        std::thread::spawn(move || {
                            for i in 0..PER_THREAD {
                                let key = i * THREADS + t;
                                index.insert(key, key.unsigned_abs());
                            }
                        })
                    })
                    .collect::<Vec<_>>();

                for handle in handles {
                    handle.join().expect("thread should not panic");
                }

                index
            });
        });
    }
}

criterion_group!(
    benches,
    tree_insert_delete,
    point_read,
    range_scan,
    concurrent_insert
);
criterion_main!(benches);

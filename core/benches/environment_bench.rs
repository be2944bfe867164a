use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use lazyctx::{Environment, Name, PersistentMap, Value};

fn populated(n: usize) -> Environment {
    let env = Environment::new_root();
    for i in 0..n {
        env.set(format!("var{i}").as_str(), Value::int(i as i64)).unwrap();
    }
    env
}

// ============================================================================
// Environment Benchmarks
// ============================================================================

fn bench_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("environment set");
    for size in [10, 100, 1000] {
        let names: Vec<Name> = (0..size).map(|i| Name::new(&format!("var{i}"))).collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &names, |b, names| {
            b.iter(|| {
                let env = Environment::new_root();
                for (i, name) in names.iter().enumerate() {
                    env.set(*name, Value::int(i as i64)).unwrap();
                }
                black_box(env)
            })
        });
    }
    group.finish();
}

fn bench_get_after_rebinding(c: &mut Criterion) {
    // The same name rebound many times: lookup hits the newest layer
    let env = Environment::new_root();
    for i in 0..1000 {
        env.set("a", Value::int(i)).unwrap();
    }
    let oldest = populated(1000);
    let first = Name::new("var0");

    c.bench_function("get newest of 1000 rebindings", |b| {
        b.iter(|| black_box(env.get("a").unwrap()))
    });
    c.bench_function("get oldest of 1000 bindings", |b| {
        b.iter(|| black_box(oldest.get(first).unwrap()))
    });
}

fn bench_branch(c: &mut Criterion) {
    let mut group = c.benchmark_group("environment branch");
    for size in [10, 100, 1000] {
        let env = populated(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &env, |b, env| {
            b.iter(|| black_box(env.branch()))
        });
    }
    group.finish();
}

fn bench_lock(c: &mut Criterion) {
    let env = populated(1000).branch().branch();
    c.bench_function("lock three-level chain of 1000", |b| {
        b.iter(|| black_box(env.lock()))
    });
}

fn bench_persistent_merge(c: &mut Criterion) {
    let pairs: Vec<(Name, Value)> = (0..100)
        .map(|i| (Name::new(&format!("k{i}")), Value::int(i)))
        .collect();
    c.bench_function("persistent map merge 100 pairs", |b| {
        b.iter(|| black_box(PersistentMap::empty().merge_into(pairs.clone())))
    });
}

criterion_group!(
    benches,
    bench_set,
    bench_get_after_rebinding,
    bench_branch,
    bench_lock,
    bench_persistent_merge
);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use keyway_engine::{CallArguments, CoercionRules, EngineConfig, LibraryHandle};
use keyway_sdk::{KwResult, KwValue, LibraryInstance, ParamDecl, TypeKind};

fn noop(_: &[KwValue]) -> KwResult<KwValue> {
    Ok(KwValue::Null)
}

fn overloaded(count: usize) -> LibraryInstance {
    let mut library = LibraryInstance::new("Bench");
    for arity in 1..=count {
        let params = (0..arity)
            .map(|i| {
                let ty = if i % 2 == 0 { TypeKind::Text } else { TypeKind::INT };
                ParamDecl::new(format!("p{}", i), ty)
            })
            .collect();
        library = library.keyword("call", params, noop);
    }
    library
}

fn arguments(count: usize) -> CallArguments {
    CallArguments::new((0..count).map(|i| KwValue::text(i.to_string())).collect())
}

fn bench_coercion(c: &mut Criterion) {
    let rules = CoercionRules::new();
    let mut group = c.benchmark_group("coercion");

    group.bench_function("text_to_int", |b| {
        let value = KwValue::text("12345");
        b.iter(|| rules.coerce(black_box(&value), &TypeKind::INT).unwrap());
    });

    group.bench_function("text_to_bool", |b| {
        let value = KwValue::text("True");
        b.iter(|| rules.coerce(black_box(&value), &TypeKind::Boolean).unwrap());
    });

    group.bench_function("exact", |b| {
        let value = KwValue::Int(7);
        b.iter(|| rules.coerce(black_box(&value), &TypeKind::INT).unwrap());
    });

    group.finish();
}

fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution");

    for overloads in [1usize, 4, 16] {
        let library = overloaded(overloads);
        let cached = LibraryHandle::new(&library).unwrap();
        let uncached = LibraryHandle::with_config(
            &library,
            &EngineConfig::from_str("[resolution]\ncache = false\n").unwrap(),
        )
        .unwrap();
        let args = arguments(overloads);

        group.bench_with_input(BenchmarkId::new("cached", overloads), &args, |b, args| {
            b.iter(|| cached.resolve("call", black_box(args)).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("uncached", overloads), &args, |b, args| {
            b.iter(|| uncached.resolve("call", black_box(args)).unwrap());
        });
    }

    group.finish();
}

fn bench_run(c: &mut Criterion) {
    let handle = LibraryHandle::new(&overloaded(4)).unwrap();
    let args = arguments(3);

    c.bench_function("run_overloaded", |b| {
        b.iter(|| handle.run(black_box("Call"), black_box(&args)).unwrap());
    });
}

criterion_group!(benches, bench_coercion, bench_resolution, bench_run);
criterion_main!(benches);

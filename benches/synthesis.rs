//! Benchmarks for synthetic body construction.
//!
//! Compares building a body from scratch against fetching it from the interpreter
//! cache, for a single exact type and for a cone of growing size.

extern crate reflectir;

use std::{hint::black_box, sync::Arc};

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use reflectir::prelude::*;

/// An interface `Lplugins/Plugin` with `count` concrete implementors.
fn plugins(count: usize) -> TypeHierarchy {
    let plugin = TypeRef::application("Lplugins/Plugin");
    let mut builder = TypeHierarchy::builder()
        .core_library()
        .unwrap()
        .declare(ClassBuilder::interface(plugin.clone()))
        .unwrap();
    for i in 0..count {
        builder = builder
            .declare(
                ClassBuilder::new(TypeRef::application(&format!("Lplugins/Impl{i}")))
                    .implements(plugin.clone())
                    .constructor("()V", MemberFlags::PUBLIC),
            )
            .unwrap();
    }
    builder.build()
}

fn engine(hierarchy: &Arc<TypeHierarchy>) -> ReflectionEngine {
    ReflectionEngine::new(
        hierarchy.clone(),
        Arc::new(MethodSummaries::new()),
        ReflectionConfig::precise(),
    )
}

fn new_instance(abstraction: TypeAbstraction) -> CgNode {
    CgNode::new(well_known::class_new_instance(), Context::JavaType(abstraction))
}

/// Benchmark a `newInstance` body on a single known class, uncached and cached.
fn bench_exact_new_instance(c: &mut Criterion) {
    let hierarchy = Arc::new(plugins(1));
    let node = new_instance(TypeAbstraction::exact(TypeRef::application("Lplugins/Impl0")));

    c.bench_function("new_instance_exact_uncached", |b| {
        b.iter(|| {
            let engine = engine(&hierarchy);
            black_box(engine.body(black_box(&node)).unwrap())
        });
    });

    let warm = engine(&hierarchy);
    warm.body(&node).unwrap();
    c.bench_function("new_instance_exact_cached", |b| {
        b.iter(|| black_box(warm.body(black_box(&node)).unwrap()));
    });
}

/// Benchmark cone expansion over interfaces with growing numbers of implementors.
fn bench_cone_new_instance(c: &mut Criterion) {
    let mut group = c.benchmark_group("new_instance_cone");
    for size in [4_usize, 16, 64] {
        let hierarchy = Arc::new(plugins(size));
        let node = new_instance(TypeAbstraction::cone(TypeRef::application("Lplugins/Plugin")));

        group.bench_with_input(BenchmarkId::new("uncached", size), &node, |b, node| {
            b.iter(|| {
                let engine = engine(&hierarchy);
                black_box(engine.body(node).unwrap())
            });
        });

        let warm = engine(&hierarchy);
        warm.body(&node).unwrap();
        group.bench_with_input(BenchmarkId::new("cached", size), &node, |b, node| {
            b.iter(|| black_box(warm.body(node).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_exact_new_instance, bench_cone_new_instance);
criterion_main!(benches);

#![allow(clippy::uninlined_format_args)]
//! 容器解析性能基准测试

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use futures_util::future;
use gitai_di::{add, create, definitions, defs, get, Container, ContainerBuilder, Definition};
use tokio::runtime::Runtime;

/// 测试用的简单服务
struct SimpleService;

fn chain_container(depth: usize) -> Container {
    let mut layer: Vec<(String, Definition)> = (0..depth)
        .map(|i| (format!("link{}", i), get(format!("link{}", i + 1))))
        .collect();
    layer.push((format!("link{}", depth), create("SimpleService").into()));

    ContainerBuilder::new()
        .register_type("SimpleService", |_| Ok(SimpleService))
        .add_definitions(layer)
        .unwrap()
        .build()
}

/// 基准测试：单例缓存命中
fn bench_cached_singleton(c: &mut Criterion) {
    let container = chain_container(0);
    container.get("link0").unwrap();

    c.bench_function("cached_singleton", |b| {
        b.iter(|| black_box(container.get(black_box("link0")).unwrap()))
    });
}

/// 基准测试：不同深度的首次解析（每次使用 make 绕过缓存）
fn bench_reference_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("reference_chain");

    for depth in [1, 8, 32].iter() {
        let container = chain_container(*depth);
        group.bench_with_input(BenchmarkId::from_parameter(depth), depth, |b, _| {
            b.iter(|| black_box(container.make("link0").unwrap()))
        });
    }

    group.finish();
}

/// 基准测试：多层 add() 合并后的数组解析
fn bench_array_merge(c: &mut Criterion) {
    c.bench_function("array_merge_and_resolve", |b| {
        b.iter(|| {
            let mut builder = ContainerBuilder::new()
                .register_type("SimpleService", |_| Ok(SimpleService))
                .add_definitions(definitions! {
                    "service" => create("SimpleService"),
                    "values" => defs!["base"],
                })
                .unwrap();
            for i in 0..10 {
                builder = builder
                    .add_definitions(definitions! {
                        "values" => add(defs![format!("value {}", i), get("service")]),
                    })
                    .unwrap();
            }
            black_box(builder.build().get("values").unwrap())
        })
    });
}

/// 基准测试：并发解析
fn bench_concurrent_resolution(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let container = chain_container(4);

    c.bench_function("concurrent_resolution", |b| {
        b.to_async(&runtime).iter(|| {
            let container = container.clone();
            async move {
                let handles: Vec<_> = (0..10)
                    .map(|_| {
                        let container = container.clone();
                        tokio::task::spawn_blocking(move || container.get("link0").unwrap())
                    })
                    .collect();
                black_box(future::join_all(handles).await)
            }
        })
    });
}

criterion_group!(
    benches,
    bench_cached_singleton,
    bench_reference_chain,
    bench_array_merge,
    bench_concurrent_resolution
);
criterion_main!(benches);

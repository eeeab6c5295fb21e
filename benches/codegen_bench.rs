//! Benchmarks for the codegen pipeline

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use dependency_codegen::prelude::*;
use std::hint::black_box;

/// A linear chain of injectable types: `Service0` depends on `Service1`,
/// which depends on `Service2`, and so on.
fn chain_input(depth: usize, scoped: bool) -> ProcessingInput {
    let scope = Scope::new(ClassName::new("bench", "BenchScope"));
    let ty = |index: usize| TypeRef::declared(ClassName::new("bench", format!("Service{index}")));

    let mut model = TypeModel::new();
    for index in 0..depth {
        let mut builder = InjectableConstructor::new(DeclaredType::new(
            ClassName::new("bench", format!("Service{index}")),
            Visibility::Public,
        ));
        if scoped && index % 3 == 0 {
            builder = builder.scoped(scope.clone());
        }
        if index + 1 < depth {
            builder = builder.dependency(DependencyRequest::new(
                Key::of(ty(index + 1)),
                RequestKind::Instance,
            ));
        }
        model = model.injectable(builder);
    }

    let component = ComponentDescriptor::new(ClassName::new("bench", "BenchComponent"))
        .scope(scope)
        .entry_point(EntryPoint::new("root", ty(0)));
    ProcessingInput {
        components: vec![component],
        model,
    }
}

/// A wide component: many independent entry points over provision methods.
fn wide_input(width: usize) -> ProcessingInput {
    let ty = |index: usize| TypeRef::declared(ClassName::new("bench", format!("Service{index}")));

    let mut module = ModuleDescriptor::new(ClassName::new("bench", "WideModule"));
    let mut component = ComponentDescriptor::new(ClassName::new("bench", "WideComponent"))
        .module(ClassName::new("bench", "WideModule"));
    for index in 0..width {
        module = module.binding(ModuleBindingDecl::Provides {
            method: format!("provide{index}"),
            key: Key::of(ty(index)),
            scope: None,
            dependencies: vec![],
            is_static: true,
            nullable: false,
            multibinding: None,
            is_production: false,
        });
        component = component.entry_point(EntryPoint::new(format!("service{index}"), ty(index)));
    }
    ProcessingInput {
        components: vec![component],
        model: TypeModel::new().module(module),
    }
}

fn bench_graph_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_build");

    for depth in [8, 32, 128] {
        let input = chain_input(depth, false);
        group.throughput(Throughput::Elements(depth as u64));
        group.bench_function(format!("chain_{depth}"), |b| {
            b.iter(|| {
                let graph = BindingGraphBuilder::build(
                    &input.components[0],
                    black_box(&input.model),
                )
                .unwrap();
                black_box(graph)
            })
        });
    }

    let input = wide_input(64);
    group.bench_function("wide_64", |b| {
        b.iter(|| {
            let graph =
                BindingGraphBuilder::build(&input.components[0], black_box(&input.model))
                    .unwrap();
            black_box(graph)
        })
    });

    group.finish();
}

fn bench_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("validation");

    let input = chain_input(64, true);
    let graph = BindingGraphBuilder::build(&input.components[0], &input.model).unwrap();
    group.bench_function("chain_64", |b| {
        b.iter(|| {
            let messager = CollectingMessager::new();
            black_box(validate(&graph, &messager))
        })
    });

    group.finish();
}

fn bench_emission(c: &mut Criterion) {
    let mut group = c.benchmark_group("emission");

    for (name, fast_init) in [("default_mode", false), ("fast_init", true)] {
        let input = chain_input(32, true);
        let options = CompilerOptions::builder().fast_init(fast_init).build();
        group.bench_function(name, |b| {
            b.iter(|| {
                let messager = CollectingMessager::new();
                let result =
                    process_to_memory(black_box(input.clone()), options, &messager).unwrap();
                black_box(result)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_graph_build, bench_validation, bench_emission);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use modgraph::module::build::{BuildOrderGenerator, LoadPolicy, Manifest, ManifestEntry};
use modgraph::module::{Exports, ModuleContainer, ModuleDefinition};

/// Layered manifest: module `i` depends on up to three earlier modules
fn layered_manifest(size: usize) -> Manifest {
    (0..size)
        .rev()
        .map(|i| {
            let deps: Vec<String> = [i / 2, i / 3, i.saturating_sub(1)]
                .iter()
                .filter(|&&d| d < i)
                .map(|d| format!("App.Module{}", d))
                .collect();
            ManifestEntry::new(
                format!("App.Module{}", i),
                format!("src/{:04}_module.js", i),
                deps,
            )
        })
        .collect()
}

fn benchmark_generate(c: &mut Criterion) {
    let generator = BuildOrderGenerator::new().with_policy(
        LoadPolicy::from_patterns(&["99_*", "*/99_*"]).unwrap(),
    );
    let prior: Vec<String> = vec!["src/99_triggers.js".to_string(), "src/legacy.js".to_string()];

    let mut group = c.benchmark_group("build_order_generate");
    for size in [10usize, 100, 1000] {
        let manifest = layered_manifest(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &manifest, |b, manifest| {
            b.iter(|| black_box(generator.generate(black_box(manifest), &prior)).unwrap());
        });
    }
    group.finish();
}

fn benchmark_resolve(c: &mut Criterion) {
    let container = ModuleContainer::new();
    container
        .define_module(
            ModuleDefinition::new("System.Config")
                .depends_on(["Utils"])
                .factory(|_| Ok(Exports::new())),
        )
        .unwrap();

    c.bench_function("container_get_ready_and_placeholder", |b| {
        b.iter(|| black_box(container.get(black_box(&["Config", "Utils", "Telemetry"]))).unwrap());
    });
}

criterion_group!(benches, benchmark_generate, benchmark_resolve);
criterion_main!(benches);

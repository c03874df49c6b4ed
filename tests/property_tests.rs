//! Property tests for ordering and resolution invariants

use modgraph::module::build::{BuildOrderGenerator, Manifest, ManifestEntry};
use modgraph::module::{Exports, ModuleContainer, ModuleDefinition};
use proptest::prelude::*;
use std::collections::HashMap;

/// Random DAG: module `i` may depend on any `j < i`; entries shuffled
fn dag_manifest() -> impl Strategy<Value = Manifest> {
    (1usize..25)
        .prop_flat_map(|n| {
            let edges = (0..n)
                .map(|i| proptest::collection::vec(0..i.max(1), 0..=i.min(4)))
                .collect::<Vec<_>>();
            (Just(n), edges)
        })
        .prop_map(|(n, edges)| {
            (0..n)
                .map(|i| {
                    let deps: Vec<String> = edges[i]
                        .iter()
                        .filter(|&&d| d < i)
                        .map(|d| format!("App.M{}", d))
                        .collect();
                    ManifestEntry::new(format!("App.M{}", i), format!("m{}.js", i), deps)
                })
                .collect::<Vec<_>>()
        })
        .prop_shuffle()
        .prop_map(Manifest::new)
}

proptest! {
    #[test]
    fn test_order_respects_every_edge(manifest in dag_manifest()) {
        let order = BuildOrderGenerator::new().generate(&manifest, &[] as &[&str]).unwrap();
        prop_assert_eq!(order.modules.len(), manifest.len());

        let position: HashMap<&str, usize> = order
            .modules
            .iter()
            .enumerate()
            .map(|(i, m)| (m.as_str(), i))
            .collect();
        for entry in &manifest.modules {
            for dep in &entry.dependencies {
                prop_assert!(
                    position[dep.as_str()] < position[entry.module.as_str()],
                    "{} must load before {}", dep, entry.module
                );
            }
        }
    }

    #[test]
    fn test_order_is_stable_across_runs(manifest in dag_manifest()) {
        let generator = BuildOrderGenerator::new();
        let first = generator.generate(&manifest, &[] as &[&str]).unwrap();
        let second = generator.generate(&manifest, &[] as &[&str]).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_resolving_chain_empty_after_get(
        deps in proptest::collection::vec(proptest::collection::vec(0usize..8, 0..4), 8),
        requests in proptest::collection::vec(0usize..10, 1..12),
    ) {
        // Declared modules may form cycles; every get must still unwind
        let container = ModuleContainer::new();
        for (i, targets) in deps.iter().enumerate() {
            let names: Vec<String> = targets.iter().map(|t| format!("App.M{}", t)).collect();
            container
                .declare_module(
                    ModuleDefinition::new(format!("App.M{}", i))
                        .depends_on(names)
                        .factory(|_| Ok(Exports::new())),
                )
                .unwrap();
        }

        for request in requests {
            let _ = container.get(&[format!("App.M{}", request)]);
            prop_assert!(container.resolving().is_empty());
        }
    }
}

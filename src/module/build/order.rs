//! Build order generation
//!
//! Kahn's topological sort over the manifest's module graph. Ties are broken
//! FIFO by manifest order, so an unchanged manifest always yields the same
//! order. Dependencies naming modules outside the manifest are dropped with a
//! warning rather than treated as edges. A cycle aborts the run without
//! producing any order. Load-first files are pinned ahead of the sorted
//! files regardless of their dependencies.

use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, info, warn};

use crate::module::alias::AliasTable;
use crate::module::build::manifest::{Manifest, ManifestEntry};
use crate::module::build::policy::LoadPolicy;
use crate::module::traits::ModuleError;

/// A manifest dependency that did not match any manifest module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedDependency {
    pub module: String,
    pub dependency: String,
}

/// Manifest graph after deduplication and dependency canonicalization
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Entries in manifest order; dependencies are canonical and unique
    pub entries: Vec<ManifestEntry>,
    /// Dependencies removed because their target is not in the manifest
    pub dropped: Vec<DroppedDependency>,
}

impl DependencyGraph {
    /// `(module, dependency)` edges in manifest order
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().flat_map(|e| {
            e.dependencies
                .iter()
                .map(move |d| (e.module.as_str(), d.as_str()))
        })
    }

    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.module.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Generated order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOrder {
    /// Modules, dependencies first
    pub modules: Vec<String>,
    /// Final file order (pinned files, manifest files, then carried-over files)
    pub files: Vec<String>,
    /// Load-first files pinned ahead of the ordered manifest files
    pub load_first: Vec<String>,
    /// Prior-order files appended after the manifest files
    pub carried_over: Vec<String>,
    /// Dependencies dropped while building the graph
    pub dropped: Vec<DroppedDependency>,
}

/// Build order generator
#[derive(Debug, Clone, Default)]
pub struct BuildOrderGenerator {
    aliases: AliasTable,
    default_namespace: Option<String>,
    policy: LoadPolicy,
}

impl BuildOrderGenerator {
    /// Generator that matches dependency names exactly
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve short dependency names through `aliases`
    pub fn with_aliases(mut self, aliases: AliasTable) -> Self {
        self.aliases = aliases;
        self
    }

    /// Try `<namespace>.<name>` for dependencies that match nothing else
    pub fn with_default_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.default_namespace = Some(namespace.into());
        self
    }

    pub fn with_policy(mut self, policy: LoadPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &LoadPolicy {
        &self.policy
    }

    /// Deduplicate entries and resolve dependency names against the manifest
    pub fn graph(&self, manifest: &Manifest) -> DependencyGraph {
        let mut entries: Vec<ManifestEntry> = Vec::with_capacity(manifest.len());
        let mut index: HashMap<&str, usize> = HashMap::new();

        for entry in &manifest.modules {
            match index.get(entry.module.as_str()) {
                Some(&pos) => {
                    warn!(
                        "Module {} listed more than once; using the entry from {}",
                        entry.module, entry.file
                    );
                    entries[pos] = entry.clone();
                }
                None => {
                    index.insert(entry.module.as_str(), entries.len());
                    entries.push(entry.clone());
                }
            }
        }

        let known: HashSet<String> = entries.iter().map(|e| e.module.clone()).collect();
        let mut dropped = Vec::new();

        for entry in &mut entries {
            let mut seen = HashSet::new();
            let mut resolved = Vec::with_capacity(entry.dependencies.len());
            for dep in &entry.dependencies {
                match self.resolve_name(dep, &known) {
                    Some(name) => {
                        if seen.insert(name.clone()) {
                            resolved.push(name);
                        }
                    }
                    None => {
                        warn!(
                            "Module {} depends on {}, which is not in the manifest; dependency dropped",
                            entry.module, dep
                        );
                        dropped.push(DroppedDependency {
                            module: entry.module.clone(),
                            dependency: dep.clone(),
                        });
                    }
                }
            }
            entry.dependencies = resolved;
        }

        DependencyGraph { entries, dropped }
    }

    fn resolve_name(&self, dep: &str, known: &HashSet<String>) -> Option<String> {
        if known.contains(dep) {
            return Some(dep.to_string());
        }
        let canonical = self.aliases.canonicalize(dep);
        if known.contains(canonical) {
            return Some(canonical.to_string());
        }
        self.default_namespace
            .as_ref()
            .map(|ns| format!("{}.{}", ns, dep))
            .filter(|name| known.contains(name))
    }

    /// Topologically sort the graph's modules (dependencies first)
    pub fn sort(&self, graph: &DependencyGraph) -> Result<Vec<String>, ModuleError> {
        let n = graph.entries.len();
        let position: HashMap<&str, usize> = graph
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.module.as_str(), i))
            .collect();

        let mut in_degree = vec![0usize; n];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (i, entry) in graph.entries.iter().enumerate() {
            for dep in &entry.dependencies {
                if let Some(&d) = position.get(dep.as_str()) {
                    dependents[d].push(i);
                    in_degree[i] += 1;
                }
            }
        }

        let mut queue: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);

        while let Some(i) = queue.pop_front() {
            order.push(i);
            for &dependent in &dependents[i] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    queue.push_back(dependent);
                }
            }
        }

        if order.len() < n {
            let unsorted: Vec<String> = (0..n)
                .filter(|&i| in_degree[i] > 0)
                .map(|i| graph.entries[i].module.clone())
                .collect();
            return Err(ModuleError::ManifestCycle { modules: unsorted });
        }

        Ok(order
            .into_iter()
            .map(|i| graph.entries[i].module.clone())
            .collect())
    }

    /// Full run: graph, sort, file mapping, load-first pins and carry-over of
    /// `prior` files
    pub fn generate<S: AsRef<str>>(
        &self,
        manifest: &Manifest,
        prior: &[S],
    ) -> Result<BuildOrder, ModuleError> {
        let graph = self.graph(manifest);
        let modules = self.sort(&graph)?;
        debug!("Sorted {} modules: {:?}", modules.len(), modules);

        let file_of: HashMap<&str, &str> = graph
            .entries
            .iter()
            .map(|e| (e.module.as_str(), e.file.as_str()))
            .collect();

        let mut ordered: Vec<String> = Vec::with_capacity(modules.len());
        let mut in_manifest = HashSet::new();
        for module in &modules {
            if let Some(file) = file_of.get(module.as_str()) {
                let file = normalize_path(file);
                if in_manifest.insert(file.clone()) {
                    ordered.push(file);
                }
            }
        }

        let mut previous: Vec<String> = Vec::with_capacity(prior.len());
        for file in prior {
            let file = normalize_path(file.as_ref());
            if !previous.contains(&file) {
                previous.push(file);
            }
        }

        let candidates: Vec<String> = ordered
            .iter()
            .chain(previous.iter().filter(|f| !in_manifest.contains(*f)))
            .cloned()
            .collect();
        let load_first = self.policy.pin_first(&candidates);
        self.warn_pinned_before_dependencies(&graph, &load_first);

        let mut seen: HashSet<String> = load_first.iter().cloned().collect();
        let mut files = load_first.clone();
        for file in ordered {
            if seen.insert(file.clone()) {
                files.push(file);
            }
        }

        let leftover: Vec<String> = previous
            .into_iter()
            .filter(|f| !seen.contains(f))
            .collect();
        let carried_over = self.policy.arrange(leftover);
        for file in &carried_over {
            if seen.insert(file.clone()) {
                files.push(file.clone());
            }
        }

        info!(
            "Build order generated: {} modules, {} files ({} pinned first, {} carried over, {} dependencies dropped)",
            modules.len(),
            files.len(),
            load_first.len(),
            carried_over.len(),
            graph.dropped.len()
        );

        Ok(BuildOrder {
            modules,
            files,
            load_first,
            carried_over,
            dropped: graph.dropped,
        })
    }

    /// Warn for pinned modules whose dependencies are not pinned before them
    fn warn_pinned_before_dependencies(&self, graph: &DependencyGraph, pinned: &[String]) {
        if pinned.is_empty() {
            return;
        }
        let pin_position: HashMap<&str, usize> = pinned
            .iter()
            .enumerate()
            .map(|(i, f)| (f.as_str(), i))
            .collect();
        let file_of: HashMap<&str, String> = graph
            .entries
            .iter()
            .map(|e| (e.module.as_str(), normalize_path(&e.file)))
            .collect();

        for entry in &graph.entries {
            let file = normalize_path(&entry.file);
            let Some(&position) = pin_position.get(file.as_str()) else {
                continue;
            };
            for dep in &entry.dependencies {
                let Some(dep_file) = file_of.get(dep.as_str()) else {
                    continue;
                };
                let pinned_earlier = pin_position
                    .get(dep_file.as_str())
                    .is_some_and(|&p| p <= position);
                if !pinned_earlier {
                    warn!(
                        "Load-first file {} ({}) is pinned ahead of its dependency {} ({})",
                        file, entry.module, dep, dep_file
                    );
                }
            }
        }
    }
}

/// Forward slashes only
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(module: &str, deps: &[&str]) -> ManifestEntry {
        ManifestEntry::new(module, format!("{}.js", module), deps.iter().copied())
    }

    #[test]
    fn test_chain_order() {
        let manifest = Manifest::new(vec![entry("C", &["B"]), entry("A", &[]), entry("B", &["A"])]);
        let order = BuildOrderGenerator::new().generate(&manifest, &[] as &[&str]).unwrap();
        assert_eq!(order.modules, vec!["A", "B", "C"]);
        assert_eq!(order.files, vec!["A.js", "B.js", "C.js"]);
    }

    #[test]
    fn test_fifo_tie_break_follows_manifest_order() {
        let manifest = Manifest::new(vec![entry("Z", &[]), entry("M", &[]), entry("A", &["Z"])]);
        let generator = BuildOrderGenerator::new();
        let graph = generator.graph(&manifest);
        assert_eq!(generator.sort(&graph).unwrap(), vec!["Z", "M", "A"]);
    }

    #[test]
    fn test_cycle_lists_unsorted_modules() {
        let manifest = Manifest::new(vec![entry("Root", &[]), entry("A", &["B"]), entry("B", &["A"])]);
        let err = BuildOrderGenerator::new()
            .generate(&manifest, &[] as &[&str])
            .unwrap_err();
        match err {
            ModuleError::ManifestCycle { modules } => assert_eq!(modules, vec!["A", "B"]),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_self_dependency_is_cycle() {
        let manifest = Manifest::new(vec![entry("A", &["A"])]);
        assert!(matches!(
            BuildOrderGenerator::new().generate(&manifest, &[] as &[&str]),
            Err(ModuleError::ManifestCycle { .. })
        ));
    }

    #[test]
    fn test_alias_and_namespace_resolution() {
        let manifest = Manifest::new(vec![
            entry("System.Config", &["Utils", "Telemetry"]),
            entry("System.Utils", &[]),
            entry("System.Telemetry", &[]),
        ]);
        let generator = BuildOrderGenerator::new()
            .with_aliases(AliasTable::new().with_alias("Utils", "System.Utils"))
            .with_default_namespace("System");
        let graph = generator.graph(&manifest);
        assert_eq!(
            graph.entries[0].dependencies,
            vec!["System.Utils", "System.Telemetry"]
        );
        assert!(graph.dropped.is_empty());
    }

    #[test]
    fn test_duplicate_entry_last_wins_in_first_position() {
        let manifest = Manifest::new(vec![
            entry("A", &["B"]),
            entry("B", &[]),
            ManifestEntry::new("A", "a_v2.js", Vec::<String>::new()),
        ]);
        let order = BuildOrderGenerator::new().generate(&manifest, &[] as &[&str]).unwrap();
        assert_eq!(order.modules, vec!["A", "B"]);
        assert_eq!(order.files, vec!["a_v2.js", "B.js"]);
    }

    #[test]
    fn test_shared_file_and_backslashes() {
        let manifest = Manifest::new(vec![
            ManifestEntry::new("A", "lib\\core.js", Vec::<String>::new()),
            ManifestEntry::new("B", "lib/core.js", ["A"]),
        ]);
        let order = BuildOrderGenerator::new()
            .generate(&manifest, &["lib\\core.js", "extra\\x.js"])
            .unwrap();
        assert_eq!(order.files, vec!["lib/core.js", "extra/x.js"]);
        assert_eq!(order.carried_over, vec!["extra/x.js"]);
    }

    #[test]
    fn test_pinned_file_is_not_repeated() {
        let manifest = Manifest::new(vec![entry("B", &["A"]), entry("A", &[])]);
        let generator = BuildOrderGenerator::new()
            .with_policy(LoadPolicy::new().with_load_first(&["B.js"]).unwrap());
        let order = generator.generate(&manifest, &["B.js"]).unwrap();
        assert_eq!(order.load_first, vec!["B.js"]);
        assert_eq!(order.files, vec!["B.js", "A.js"]);
        assert!(order.carried_over.is_empty());
    }
}

//! Dependency resolution
//!
//! Resolves a list of aliases against the registry as currently populated.
//! Each alias is mapped through the alias table and looked up by canonical
//! name. Pending modules are constructed on first request, inside the same
//! resolution chain, so a module that transitively requests itself is
//! reported as a [`ModuleError::DependencyCycle`].
//!
//! Unresolved dependencies are not errors: their slot is empty, a warning is
//! logged and a `dependency.unresolved` telemetry event is forwarded
//! best-effort. Callers decide how to degrade via [`Dependencies::get`] or
//! insist via [`Dependencies::require`].

use serde_json::json;
use std::collections::HashMap;
use std::sync::{Condvar, Mutex, PoisonError};
use std::thread::{self, ThreadId};
use tracing::{debug, warn};

use crate::module::container::ModuleContainer;
use crate::module::exports::Exports;
use crate::module::registrar;
use crate::module::registry::record::ModuleRecord;
use crate::module::traits::{ModuleError, ModuleState};

/// Aliases currently mid-resolution, outermost first, one chain per thread
///
/// A thread's chain is empty before and after every top-level `get` it
/// makes. Entries are released by [`ResolvingGuard`] on every exit path.
#[derive(Debug, Default)]
pub struct ResolvingSet {
    chains: Mutex<HashMap<ThreadId, Vec<String>>>,
}

impl ResolvingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `alias` onto this thread's chain, or fail with that chain if it
    /// is already resolving there
    pub fn enter(&self, alias: &str) -> Result<ResolvingGuard<'_>, ModuleError> {
        let thread = thread::current().id();
        let mut chains = self.chains.lock().unwrap_or_else(PoisonError::into_inner);
        let chain = chains.entry(thread).or_default();
        if chain.iter().any(|a| a == alias) {
            let mut cycle = chain.clone();
            cycle.push(alias.to_string());
            return Err(ModuleError::DependencyCycle { chain: cycle });
        }
        let depth = chain.len();
        chain.push(alias.to_string());
        Ok(ResolvingGuard {
            set: self,
            thread,
            depth,
        })
    }

    /// Snapshot of the calling thread's chain
    pub fn chain(&self) -> Vec<String> {
        self.chains
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&thread::current().id())
            .cloned()
            .unwrap_or_default()
    }

    /// True when no thread is mid-resolution
    pub fn is_empty(&self) -> bool {
        self.chains
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    /// Length of the calling thread's chain
    pub fn depth(&self) -> usize {
        self.chains
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&thread::current().id())
            .map_or(0, Vec::len)
    }
}

/// Releases one [`ResolvingSet`] entry when dropped
#[must_use = "the alias is released as soon as the guard is dropped"]
pub struct ResolvingGuard<'a> {
    set: &'a ResolvingSet,
    thread: ThreadId,
    depth: usize,
}

impl Drop for ResolvingGuard<'_> {
    fn drop(&mut self) {
        let mut chains = self
            .set
            .chains
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(chain) = chains.get_mut(&self.thread) {
            chain.truncate(self.depth);
            if chain.is_empty() {
                chains.remove(&self.thread);
            }
        }
    }
}

/// Reentrant lock held while factories run
///
/// One thread constructs modules at a time. A module seen as `Building` by
/// the thread holding the lock is part of that thread's own chain; any other
/// thread waits for the lock and then sees the finished record.
#[derive(Debug, Default)]
pub(crate) struct BuildLock {
    owner: Mutex<Option<(ThreadId, usize)>>,
    released: Condvar,
}

impl BuildLock {
    pub(crate) fn acquire(&self) -> BuildLockGuard<'_> {
        let me = thread::current().id();
        let mut owner = self.owner.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            match *owner {
                None => {
                    *owner = Some((me, 1));
                    break;
                }
                Some((thread, depth)) if thread == me => {
                    *owner = Some((me, depth + 1));
                    break;
                }
                Some(_) => {
                    owner = self
                        .released
                        .wait(owner)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
        BuildLockGuard { lock: self }
    }
}

#[must_use = "the build lock is released as soon as the guard is dropped"]
pub(crate) struct BuildLockGuard<'a> {
    lock: &'a BuildLock,
}

impl Drop for BuildLockGuard<'_> {
    fn drop(&mut self) {
        let mut owner = self
            .lock
            .owner
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match *owner {
            Some((thread, depth)) if depth > 1 => *owner = Some((thread, depth - 1)),
            _ => {
                *owner = None;
                self.lock.released.notify_all();
            }
        }
    }
}

/// A successfully resolved dependency
#[derive(Debug, Clone)]
pub struct Resolved {
    /// Canonical name the alias mapped to
    pub canonical: String,
    /// The module's exports
    pub exports: Exports,
    /// True while the module is still a bootstrap placeholder
    pub placeholder: bool,
}

#[derive(Debug, Clone)]
struct Slot {
    alias: String,
    canonical: String,
    resolved: Option<Resolved>,
}

/// Resolution result, one slot per requested alias in request order
#[derive(Debug, Clone, Default)]
pub struct Dependencies {
    slots: Vec<Slot>,
}

impl Dependencies {
    /// Resolved dependency for `alias`, `None` if unresolved or not requested
    pub fn get(&self, alias: &str) -> Option<&Resolved> {
        self.slot(alias).and_then(|s| s.resolved.as_ref())
    }

    /// Exports for `alias`, `None` if unresolved or not requested
    pub fn exports(&self, alias: &str) -> Option<&Exports> {
        self.get(alias).map(|r| &r.exports)
    }

    /// Exports for `alias`, or [`ModuleError::UnresolvedDependency`]
    pub fn require(&self, alias: &str) -> Result<&Exports, ModuleError> {
        match self.slot(alias) {
            Some(Slot {
                resolved: Some(resolved),
                ..
            }) => Ok(&resolved.exports),
            Some(slot) => Err(ModuleError::UnresolvedDependency {
                alias: slot.alias.clone(),
                canonical: slot.canonical.clone(),
            }),
            None => Err(ModuleError::UnresolvedDependency {
                alias: alias.to_string(),
                canonical: alias.to_string(),
            }),
        }
    }

    pub fn is_resolved(&self, alias: &str) -> bool {
        self.get(alias).is_some()
    }

    /// Aliases that did not resolve, in request order
    pub fn unresolved(&self) -> Vec<&str> {
        self.slots
            .iter()
            .filter(|s| s.resolved.is_none())
            .map(|s| s.alias.as_str())
            .collect()
    }

    /// `(alias, resolution)` pairs in request order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Resolved>)> {
        self.slots
            .iter()
            .map(|s| (s.alias.as_str(), s.resolved.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn slot(&self, alias: &str) -> Option<&Slot> {
        self.slots.iter().find(|s| s.alias == alias)
    }
}

/// Resolve `aliases` against the container's registry
pub(crate) fn resolve<S: AsRef<str>>(
    container: &ModuleContainer,
    aliases: &[S],
) -> Result<Dependencies, ModuleError> {
    let mut slots = Vec::with_capacity(aliases.len());
    for alias in aliases {
        let alias = alias.as_ref();
        let resolved = resolve_one(container, alias)?;
        slots.push(Slot {
            alias: alias.to_string(),
            canonical: container.aliases().canonicalize(alias).to_string(),
            resolved,
        });
    }
    Ok(Dependencies { slots })
}

fn resolve_one(container: &ModuleContainer, alias: &str) -> Result<Option<Resolved>, ModuleError> {
    let _guard = container.resolving().enter(alias)?;
    let canonical = container.aliases().canonicalize(alias);
    let registry = container.registry();

    let exports = match registry.record(canonical) {
        Some(record) if record.is_unsettled() => {
            let _build = container.build_lock().acquire();
            match registry.record(canonical) {
                Some(record) if record.state() == ModuleState::Pending => {
                    debug!("Constructing pending module {} for '{}'", canonical, alias);
                    match registrar::construct(container, record.clone(), Some(record)) {
                        Ok(exports) => Some((exports, false)),
                        Err(e @ ModuleError::DependencyCycle { .. }) => return Err(e),
                        Err(e) => {
                            debug!("Pending module {} did not build: {}", canonical, e);
                            None
                        }
                    }
                }
                // This thread holds the build lock, so the build is its own
                Some(record) if record.state() == ModuleState::Building => {
                    return Err(ModuleError::DependencyCycle {
                        chain: container.resolving().chain(),
                    });
                }
                Some(record) => settled_exports(&record),
                None => None,
            }
        }
        Some(record) => settled_exports(&record),
        None => None,
    };

    match exports {
        Some((exports, placeholder)) => Ok(Some(Resolved {
            canonical: canonical.to_string(),
            exports,
            placeholder,
        })),
        None => {
            warn!(
                "Unresolved dependency '{}' (tried canonical path '{}')",
                alias, canonical
            );
            container.forward_telemetry(
                "dependency.unresolved",
                &json!({
                    "alias": alias,
                    "canonical": canonical,
                    "chain": container.resolving().chain(),
                }),
            );
            Ok(None)
        }
    }
}

fn settled_exports(record: &ModuleRecord) -> Option<(Exports, bool)> {
    record
        .slot
        .exports()
        .map(|exports| (exports.clone(), record.is_placeholder()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_releases_on_drop() {
        let set = ResolvingSet::new();
        {
            let _a = set.enter("A").unwrap();
            let _b = set.enter("B").unwrap();
            assert_eq!(set.chain(), vec!["A", "B"]);
        }
        assert!(set.is_empty());
    }

    #[test]
    fn test_reentry_reports_full_chain() {
        let set = ResolvingSet::new();
        let _a = set.enter("A").unwrap();
        let _b = set.enter("B").unwrap();
        match set.enter("A") {
            Err(ModuleError::DependencyCycle { chain }) => assert_eq!(chain, vec!["A", "B", "A"]),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("re-entry should fail"),
        }
        assert_eq!(set.depth(), 2);
    }

    #[test]
    fn test_guard_released_after_error_path() {
        fn failing(set: &ResolvingSet) -> Result<(), ModuleError> {
            let _g = set.enter("X")?;
            Err(ModuleError::OperationError("boom".into()))
        }
        let set = ResolvingSet::new();
        assert!(failing(&set).is_err());
        assert!(set.is_empty());
    }

    #[test]
    fn test_require_on_unrequested_alias() {
        let deps = Dependencies::default();
        assert!(matches!(
            deps.require("Config"),
            Err(ModuleError::UnresolvedDependency { alias, .. }) if alias == "Config"
        ));
        assert!(deps.is_empty());
    }

    #[test]
    fn test_chains_are_per_thread() {
        let set = ResolvingSet::new();
        let _a = set.enter("App.Slow").unwrap();
        thread::scope(|scope| {
            scope.spawn(|| {
                let _b = set.enter("App.Slow").unwrap();
                assert_eq!(set.chain(), vec!["App.Slow"]);
            });
        });
        assert_eq!(set.chain(), vec!["App.Slow"]);
        assert_eq!(set.depth(), 1);
    }

    #[test]
    fn test_build_lock_is_reentrant() {
        let lock = BuildLock::default();
        let outer = lock.acquire();
        let inner = lock.acquire();
        drop(inner);
        drop(outer);
        thread::scope(|scope| {
            scope.spawn(|| drop(lock.acquire()));
        });
        assert!(lock.owner.lock().unwrap().is_none());
    }
}

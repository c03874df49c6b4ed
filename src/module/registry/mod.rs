//! Module registry and resolution
//!
//! The registry is the single store of canonical name → record. Mutation is
//! crate-private: only the registrar, the bootstrap installer and the
//! resolver (when constructing pending modules) change it. Everything else
//! gets read-only snapshots.

pub mod record;
pub mod resolver;

pub use record::{Factory, ModuleRecord, ModuleSlot};
pub use resolver::{Dependencies, Resolved, ResolvingSet};

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::module::exports::Exports;
use crate::module::name::CanonicalName;
use crate::module::traits::ModuleState;

/// Canonical name → record store
#[derive(Debug, Default)]
pub struct Registry {
    records: RwLock<HashMap<CanonicalName, ModuleRecord>>,
    sequence: AtomicU64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<CanonicalName, ModuleRecord>> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<CanonicalName, ModuleRecord>> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }

    /// Snapshot of a record
    pub fn record(&self, name: &str) -> Option<ModuleRecord> {
        self.read().get(name).cloned()
    }

    /// Lifecycle state of a record
    pub fn state(&self, name: &str) -> Option<ModuleState> {
        self.read().get(name).map(ModuleRecord::state)
    }

    /// Resolvable exports and the placeholder flag
    pub fn exports(&self, name: &str) -> Option<(Exports, bool)> {
        let records = self.read();
        let record = records.get(name)?;
        record
            .slot
            .exports()
            .map(|exports| (exports.clone(), record.is_placeholder()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    pub fn is_placeholder(&self, name: &str) -> bool {
        self.read().get(name).map_or(false, ModuleRecord::is_placeholder)
    }

    /// All registered names, sorted
    pub fn names(&self) -> Vec<CanonicalName> {
        let mut names: Vec<CanonicalName> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Names at or beneath `prefix` in the namespace, sorted
    pub fn modules_under(&self, prefix: &str) -> Vec<CanonicalName> {
        let mut names: Vec<CanonicalName> = self
            .read()
            .keys()
            .filter(|name| name.is_under(prefix))
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Names of records in `state`, in registration order
    pub fn names_in_state(&self, state: ModuleState) -> Vec<CanonicalName> {
        let records = self.read();
        let mut matching: Vec<&ModuleRecord> =
            records.values().filter(|r| r.state() == state).collect();
        matching.sort_by_key(|r| r.sequence);
        matching.into_iter().map(|r| r.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Insert a record, returning the one it replaced
    pub(crate) fn insert(&self, record: ModuleRecord) -> Option<ModuleRecord> {
        self.write().insert(record.name.clone(), record)
    }

    /// Insert only if no record exists under the name
    pub(crate) fn insert_if_absent(&self, record: ModuleRecord) -> bool {
        let mut records = self.write();
        if records.contains_key(&record.name) {
            return false;
        }
        records.insert(record.name.clone(), record);
        true
    }

    /// Replace the slot of an existing record, returning the previous slot
    pub(crate) fn replace_slot(&self, name: &str, slot: ModuleSlot) -> Option<ModuleSlot> {
        self.write()
            .get_mut(name)
            .map(|record| std::mem::replace(&mut record.slot, slot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn name(s: &str) -> CanonicalName {
        CanonicalName::parse(s).unwrap()
    }

    #[test]
    fn test_insert_and_snapshot() {
        let registry = Registry::new();
        let seq = registry.next_sequence();
        registry.insert(ModuleRecord::placeholder(name("System.Telemetry"), Exports::new(), seq));

        assert!(registry.contains("System.Telemetry"));
        assert!(registry.is_placeholder("System.Telemetry"));
        assert_eq!(registry.state("System.Telemetry"), Some(ModuleState::Placeholder));
        assert!(registry.exports("System.Telemetry").unwrap().1);
    }

    #[test]
    fn test_insert_if_absent_does_not_overwrite() {
        let registry = Registry::new();
        let factory: Factory = Arc::new(|_: &Dependencies| Ok::<_, crate::module::traits::ModuleError>(Exports::new()));
        registry.insert(ModuleRecord::declared(name("A"), vec![], factory, 0));
        assert!(!registry.insert_if_absent(ModuleRecord::placeholder(name("A"), Exports::new(), 1)));
        assert_eq!(registry.state("A"), Some(ModuleState::Pending));
    }

    #[test]
    fn test_modules_under_and_state_order() {
        let registry = Registry::new();
        for (i, n) in ["System.AI.Context", "System.AI", "System.UI", "System.AIx"].iter().enumerate() {
            registry.insert(ModuleRecord::placeholder(name(n), Exports::new(), i as u64));
        }
        let under: Vec<String> = registry
            .modules_under("System.AI")
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(under, vec!["System.AI", "System.AI.Context"]);

        let placeholders = registry.names_in_state(ModuleState::Placeholder);
        assert_eq!(placeholders[0], "System.AI.Context");
        assert_eq!(placeholders.len(), 4);
    }

    #[test]
    fn test_replace_slot() {
        let registry = Registry::new();
        registry.insert(ModuleRecord::placeholder(name("A"), Exports::new(), 0));
        let previous = registry.replace_slot("A", ModuleSlot::Building).unwrap();
        assert_eq!(previous.state(), ModuleState::Placeholder);
        assert_eq!(registry.state("A"), Some(ModuleState::Building));
        assert!(registry.exports("A").is_none());
        assert!(registry.replace_slot("missing", ModuleSlot::Pending).is_none());
    }
}

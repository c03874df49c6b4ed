//! Module container
//!
//! Owns the alias table, the registry and the resolving chain, and exposes
//! the public entry points: `get`, `define_module`, `declare_module`,
//! `build_pending` and the verifier.

use serde_json::json;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

use crate::config::ModgraphConfig;
use crate::module::alias::AliasTable;
use crate::module::bootstrap;
use crate::module::exports::Exports;
use crate::module::registrar::{self, BuildOutcome, ModuleDefinition};
use crate::module::registry::resolver::{self, BuildLock, Dependencies, ResolvingSet};
use crate::module::registry::Registry;
use crate::module::traits::{ModuleError, ModuleState, TelemetrySink};
use crate::module::verifier::{CriticalModule, ModuleVerifier};
use crate::utils::{best_effort, log_error};

static GLOBAL: OnceLock<ModuleContainer> = OnceLock::new();

/// Dependency-injection container for one process (or one test)
pub struct ModuleContainer {
    aliases: AliasTable,
    registry: Registry,
    resolving: ResolvingSet,
    building: BuildLock,
    telemetry: Option<Arc<dyn TelemetrySink>>,
    critical: Vec<CriticalModule>,
    bootstrapped: AtomicBool,
    placeholder_calls: Arc<AtomicUsize>,
}

impl ModuleContainer {
    /// Container with the built-in aliases and bootstrap placeholders installed
    pub fn new() -> Self {
        let container = Self::with_aliases(AliasTable::builtin());
        container.install_placeholders();
        container
    }

    /// Empty container using `aliases`; placeholders are not installed
    pub fn with_aliases(aliases: AliasTable) -> Self {
        Self {
            aliases,
            registry: Registry::new(),
            resolving: ResolvingSet::new(),
            building: BuildLock::default(),
            telemetry: None,
            critical: crate::config::VerifierConfig::default().critical_modules(),
            bootstrapped: AtomicBool::new(false),
            placeholder_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Container configured from a [`ModgraphConfig`]
    pub fn from_config(config: &ModgraphConfig) -> Self {
        let mut container = Self::with_aliases(config.aliases.to_table());
        container.critical = config.verifier.critical_modules();
        if config.bootstrap.enabled {
            container.install_placeholders();
        }
        container
    }

    /// Forward unresolved-dependency events to `sink`
    pub fn with_telemetry(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = Some(sink);
        self
    }

    /// Replace the critical module list used by [`ModuleContainer::verifier`]
    pub fn with_critical_modules(mut self, critical: Vec<CriticalModule>) -> Self {
        self.critical = critical;
        self
    }

    /// Process-wide container, created with defaults on first use
    pub fn global() -> &'static ModuleContainer {
        GLOBAL.get_or_init(|| {
            debug!("Initializing global module container");
            ModuleContainer::new()
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn resolving(&self) -> &ResolvingSet {
        &self.resolving
    }

    pub(crate) fn build_lock(&self) -> &BuildLock {
        &self.building
    }

    /// Resolve dependency aliases
    ///
    /// Fails only on a dependency cycle. Unresolved aliases yield empty slots.
    pub fn get<S: AsRef<str>>(&self, aliases: &[S]) -> Result<Dependencies, ModuleError> {
        resolver::resolve(self, aliases)
    }

    /// Resolve a single alias to its exports, if any
    pub fn get_one(&self, alias: &str) -> Result<Option<Exports>, ModuleError> {
        let deps = self.get(&[alias])?;
        Ok(deps.exports(alias).cloned())
    }

    /// Register and construct a module now
    pub fn define_module(&self, definition: ModuleDefinition) -> Result<Exports, ModuleError> {
        registrar::define(self, definition)
    }

    /// Register a module for construction on first request
    pub fn declare_module(&self, definition: ModuleDefinition) -> Result<(), ModuleError> {
        registrar::declare(self, definition)
    }

    /// Construct every pending module in declaration order
    pub fn build_pending(&self) -> Vec<BuildOutcome> {
        let outcomes = registrar::build_pending(self);
        let ready = outcomes.iter().filter(|o| o.is_ready()).count();
        info!("Built {}/{} pending module(s)", ready, outcomes.len());
        outcomes
    }

    /// Install bootstrap placeholders (once per container)
    ///
    /// Returns the number of placeholders installed by this call.
    pub fn install_placeholders(&self) -> usize {
        if self.bootstrapped.swap(true, Ordering::SeqCst) {
            debug!("Bootstrap placeholders already installed");
            return 0;
        }
        log_error(
            || bootstrap::install(&self.registry, &self.placeholder_calls),
            "Failed to install bootstrap placeholders",
        )
        .unwrap_or(0)
    }

    /// Number of placeholder members invoked so far
    pub fn placeholder_invocations(&self) -> usize {
        self.placeholder_calls.load(Ordering::Relaxed)
    }

    /// Read-only verifier over this container
    pub fn verifier(&self) -> ModuleVerifier<'_> {
        ModuleVerifier::new(self, self.critical.clone())
    }

    /// Send an event to the telemetry sink, best-effort
    ///
    /// Without a configured sink the event goes to the registered
    /// `Telemetry` module's `track`, but only once the real module is loaded.
    /// Errors and panics raised on either path are logged and dropped.
    pub(crate) fn forward_telemetry(&self, event: &str, payload: &serde_json::Value) {
        if let Some(sink) = &self.telemetry {
            best_effort(|| sink.track(event, payload), "Telemetry sink failed");
            return;
        }

        let canonical = self.aliases.canonicalize("Telemetry");
        if self.registry.state(canonical) != Some(ModuleState::Ready) {
            return;
        }
        if let Some((exports, _)) = self.registry.exports(canonical) {
            if exports.has_function("track") {
                best_effort(
                    || exports.call("track", &[json!(event), payload.clone()]),
                    "Telemetry module track failed",
                );
            }
        }
    }
}

impl Default for ModuleContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ModuleContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleContainer")
            .field("modules", &self.registry.len())
            .field("aliases", &self.aliases.len())
            .field("has_telemetry", &self.telemetry.is_some())
            .field("bootstrapped", &self.bootstrapped.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_installs_placeholders_once() {
        let container = ModuleContainer::new();
        assert!(container.registry().is_placeholder("System.Telemetry"));
        assert_eq!(container.install_placeholders(), 0);
    }

    #[test]
    fn test_with_aliases_starts_empty() {
        let container = ModuleContainer::with_aliases(AliasTable::new());
        assert!(container.registry().is_empty());
        assert_eq!(container.install_placeholders(), 3);
    }

    #[test]
    fn test_from_config_respects_bootstrap_flag() {
        let mut config = ModgraphConfig::default();
        config.bootstrap.enabled = false;
        let container = ModuleContainer::from_config(&config);
        assert!(container.registry().is_empty());
    }

    #[test]
    fn test_container_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ModuleContainer>();
    }
}

//! Module registration
//!
//! Turns a [`ModuleDefinition`] into a registry record. `define` builds the
//! module immediately against the registry as currently populated; `declare`
//! stores the factory as pending so that it is built on first request or by
//! [`build_pending`].

use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::module::container::ModuleContainer;
use crate::module::exports::Exports;
use crate::module::name::CanonicalName;
use crate::module::registry::record::{Factory, ModuleRecord, ModuleSlot};
use crate::module::registry::resolver::Dependencies;
use crate::module::traits::{ModuleError, ModuleState};

/// Registration request: canonical name, explicit dependency aliases, factory
#[derive(Clone)]
pub struct ModuleDefinition {
    name: String,
    dependencies: Vec<String>,
    factory: Option<Factory>,
}

impl ModuleDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            factory: None,
        }
    }

    /// Append dependency aliases, in the order the factory expects them
    pub fn depends_on<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(aliases.into_iter().map(Into::into));
        self
    }

    /// Set the factory
    pub fn factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&Dependencies) -> Result<Exports, ModuleError> + Send + Sync + 'static,
    {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Set an already shared factory
    pub fn shared_factory(mut self, factory: Factory) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Validate into a record ready for the registry
    fn into_record(self, sequence: u64) -> Result<ModuleRecord, ModuleError> {
        let invalid = |reason: String| ModuleError::InvalidRegistration {
            module: self.name.clone(),
            reason,
        };

        let name = CanonicalName::parse(&self.name).map_err(|e| invalid(e.to_string()))?;
        let factory = self
            .factory
            .clone()
            .ok_or_else(|| invalid("no factory provided".to_string()))?;
        if let Some(pos) = self.dependencies.iter().position(|d| d.trim().is_empty()) {
            return Err(invalid(format!("dependency #{} is empty", pos)));
        }

        Ok(ModuleRecord::declared(
            name,
            self.dependencies,
            factory,
            sequence,
        ))
    }
}

impl fmt::Debug for ModuleDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDefinition")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("has_factory", &self.factory.is_some())
            .finish()
    }
}

/// Result of building one pending module
#[derive(Debug)]
pub struct BuildOutcome {
    pub module: CanonicalName,
    /// State after the attempt
    pub state: ModuleState,
    pub error: Option<ModuleError>,
}

impl BuildOutcome {
    pub fn is_ready(&self) -> bool {
        self.state == ModuleState::Ready
    }
}

/// Validate, resolve and construct a module now
pub(crate) fn define(
    container: &ModuleContainer,
    definition: ModuleDefinition,
) -> Result<Exports, ModuleError> {
    let registry = container.registry();
    let record = definition.into_record(registry.next_sequence())?;
    let _build = container.build_lock().acquire();
    let _guard = container.resolving().enter(record.name.as_str())?;
    let previous = registry.record(record.name.as_str());
    construct(container, record, previous)
}

/// Validate and store a module as pending
pub(crate) fn declare(
    container: &ModuleContainer,
    definition: ModuleDefinition,
) -> Result<(), ModuleError> {
    let registry = container.registry();
    let record = definition.into_record(registry.next_sequence())?;
    let name = record.name.clone();

    let _build = container.build_lock().acquire();
    if let Some(previous) = registry.insert(record) {
        if previous.state() == ModuleState::Building {
            warn!("Module {} re-declared while its factory was running", name);
        }
        info!("Module {} declared (replaces previous {} record)", name, previous.state());
    } else {
        debug!("Module {} declared", name);
    }
    Ok(())
}

/// Build every pending module in declaration order
pub(crate) fn build_pending(container: &ModuleContainer) -> Vec<BuildOutcome> {
    let registry = container.registry();
    let pending = registry.names_in_state(ModuleState::Pending);
    let mut outcomes = Vec::with_capacity(pending.len());

    for name in pending {
        let _build = container.build_lock().acquire();
        let error = match registry.record(name.as_str()) {
            // Still pending: nothing built it as a dependency
            Some(record) if record.state() == ModuleState::Pending => {
                let attempt = container
                    .resolving()
                    .enter(name.as_str())
                    .and_then(|_guard| construct(container, record.clone(), Some(record)));
                attempt.err()
            }
            Some(record) => match record.slot {
                ModuleSlot::Failed(reason) => Some(ModuleError::FactoryFailed {
                    module: name.to_string(),
                    reason,
                }),
                _ => None,
            },
            None => None,
        };

        let state = registry.state(name.as_str()).unwrap_or(ModuleState::Pending);
        outcomes.push(BuildOutcome {
            module: name,
            state,
            error,
        });
    }

    outcomes
}

/// Run `record`'s factory and store the result
///
/// The caller holds the build lock and a resolving guard for the module. `previous` is the
/// record that was under the same name before this attempt; it is restored
/// when the attempt fails and it still holds usable exports, or when a
/// pending module is caught in a cycle.
pub(crate) fn construct(
    container: &ModuleContainer,
    mut record: ModuleRecord,
    previous: Option<ModuleRecord>,
) -> Result<Exports, ModuleError> {
    let registry = container.registry();
    let name = record.name.clone();
    let factory = record
        .factory
        .clone()
        .ok_or_else(|| ModuleError::InvalidRegistration {
            module: name.to_string(),
            reason: "no factory provided".to_string(),
        })?;

    record.slot = ModuleSlot::Building;
    let dependencies = record.dependencies.clone();
    registry.insert(record);

    let result = container.get(&dependencies).and_then(|deps| {
        factory(&deps).map_err(|e| match e {
            ModuleError::DependencyCycle { .. } | ModuleError::FactoryFailed { .. } => e,
            other => ModuleError::FactoryFailed {
                module: name.to_string(),
                reason: other.to_string(),
            },
        })
    });

    match result {
        Ok(exports) => {
            registry.replace_slot(name.as_str(), ModuleSlot::Ready(exports.clone()));
            match previous.as_ref().map(ModuleRecord::state) {
                Some(ModuleState::Placeholder) => {
                    info!("Module {} registered (replaced bootstrap placeholder)", name)
                }
                Some(ModuleState::Ready) | Some(ModuleState::Failed) => {
                    info!("Module {} re-registered (previous registration superseded)", name)
                }
                _ => info!("Module {} registered", name),
            }
            Ok(exports)
        }
        Err(e) => {
            let is_cycle = matches!(e, ModuleError::DependencyCycle { .. });
            match previous {
                Some(prev) if prev.slot.is_established() => {
                    warn!("Module {} failed to build, keeping previous {} record: {}", name, prev.state(), e);
                    registry.insert(prev);
                }
                Some(prev) if is_cycle && prev.state() == ModuleState::Pending => {
                    registry.insert(prev);
                }
                _ => {
                    warn!("Module {} failed to build: {}", name, e);
                    registry.replace_slot(name.as_str(), ModuleSlot::Failed(e.to_string()));
                }
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_requires_factory() {
        let err = ModuleDefinition::new("System.Config").into_record(0).unwrap_err();
        assert!(matches!(err, ModuleError::InvalidRegistration { module, .. } if module == "System.Config"));
    }

    #[test]
    fn test_definition_rejects_bad_name() {
        let err = ModuleDefinition::new("System..Config")
            .factory(|_| Ok(Exports::new()))
            .into_record(0)
            .unwrap_err();
        assert!(matches!(err, ModuleError::InvalidRegistration { .. }));
    }

    #[test]
    fn test_definition_rejects_empty_dependency() {
        let err = ModuleDefinition::new("System.Config")
            .depends_on(["Utils", " "])
            .factory(|_| Ok(Exports::new()))
            .into_record(0)
            .unwrap_err();
        assert!(err.to_string().contains("dependency #1"));
    }

    #[test]
    fn test_definition_into_record() {
        let record = ModuleDefinition::new("System.Config")
            .depends_on(["Utils"])
            .depends_on(vec!["Telemetry".to_string()])
            .factory(|_| Ok(Exports::new()))
            .into_record(7)
            .unwrap();
        assert_eq!(record.name, "System.Config");
        assert_eq!(record.dependencies, vec!["Utils", "Telemetry"]);
        assert_eq!(record.sequence, 7);
        assert_eq!(record.state(), ModuleState::Pending);
        assert!(record.has_factory());
    }
}

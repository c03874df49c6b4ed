//! Bootstrap placeholders
//!
//! Before any file registers a module, a fixed set of core modules gets a
//! stand-in so that early dependents resolve to something callable. Every
//! stand-in member is a no-op that returns `null` and logs a warning naming
//! the member; `System.Utils` additionally forwards its message to the
//! matching log level. The first real `define_module` for the name replaces
//! the placeholder wholesale.

use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::module::exports::Exports;
use crate::module::name::CanonicalName;
use crate::module::registry::record::ModuleRecord;
use crate::module::registry::Registry;
use crate::module::traits::ModuleError;

/// Modules that receive a placeholder, with their members
pub const PLACEHOLDER_MODULES: &[(&str, &[&str])] = &[
    ("System.Utils", &["log", "warn", "error"]),
    ("System.Telemetry", &["track", "logError"]),
    ("System.DocsManager", &["registerModuleDocs", "registerConfigDocs"]),
];

/// Install every placeholder that is not already registered
///
/// Returns the number of records created. Existing records, placeholder or
/// real, are left alone.
pub(crate) fn install(registry: &Registry, calls: &Arc<AtomicUsize>) -> Result<usize, ModuleError> {
    let mut installed = 0;
    for &(module, members) in PLACEHOLDER_MODULES {
        let name = CanonicalName::parse(module)?;
        let exports = placeholder_exports(module, members, calls);
        let record = ModuleRecord::placeholder(name, exports, registry.next_sequence());
        if registry.insert_if_absent(record) {
            debug!("Installed placeholder for {}", module);
            installed += 1;
        } else {
            debug!("{} already registered, no placeholder installed", module);
        }
    }
    info!("Bootstrap installed {} placeholder module(s)", installed);
    Ok(installed)
}

fn placeholder_exports(module: &'static str, members: &[&'static str], calls: &Arc<AtomicUsize>) -> Exports {
    members.iter().fold(Exports::new(), |exports, &member| {
        let calls = Arc::clone(calls);
        exports.with_function(member, move |args: &[Value]| {
            calls.fetch_add(1, Ordering::Relaxed);
            warn!(
                "[placeholder] {}.{} called before the real module loaded",
                module, member
            );
            if module == "System.Utils" {
                forward_to_log(member, args);
            }
            Ok(Value::Null)
        })
    })
}

fn forward_to_log(level: &str, args: &[Value]) {
    let message = args
        .iter()
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ");
    match level {
        "error" => error!("{}", message),
        "warn" => warn!("{}", message),
        _ => info!("{}", message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::traits::ModuleState;
    use serde_json::json;

    #[test]
    fn test_install_creates_placeholders() {
        let registry = Registry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        assert_eq!(install(&registry, &calls).unwrap(), PLACEHOLDER_MODULES.len());

        for (module, members) in PLACEHOLDER_MODULES {
            assert_eq!(registry.state(module), Some(ModuleState::Placeholder));
            let (exports, placeholder) = registry.exports(module).unwrap();
            assert!(placeholder);
            for member in members.iter() {
                assert!(exports.has_function(member), "{}.{}", module, member);
            }
        }
    }

    #[test]
    fn test_install_twice_is_noop() {
        let registry = Registry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        install(&registry, &calls).unwrap();
        assert_eq!(install(&registry, &calls).unwrap(), 0);
        assert_eq!(registry.len(), PLACEHOLDER_MODULES.len());
    }

    #[test]
    fn test_members_are_counted_noops() {
        let calls = Arc::new(AtomicUsize::new(0));
        let exports = placeholder_exports("System.Telemetry", &["track"], &calls);
        assert_eq!(exports.call("track", &[json!("event")]).unwrap(), Value::Null);
        assert_eq!(exports.call("track", &[]).unwrap(), Value::Null);
        assert_eq!(calls.load(Ordering::Relaxed), 2);
    }
}

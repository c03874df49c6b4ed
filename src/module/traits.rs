//! Module system traits and errors
//!
//! Defines the error taxonomy shared by the runtime container and the
//! build-order generator, plus the collaborator traits the container talks to.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Lifecycle state of a registry record, without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleState {
    /// Stand-in installed by the bootstrap installer
    Placeholder,
    /// Declared with a factory, not constructed yet
    Pending,
    /// Factory currently running
    Building,
    /// Constructed by the registrar (authoritative)
    Ready,
    /// Factory returned an error
    Failed,
}

impl fmt::Display for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ModuleState::Placeholder => "placeholder",
            ModuleState::Pending => "pending",
            ModuleState::Building => "building",
            ModuleState::Ready => "ready",
            ModuleState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Telemetry collaborator
///
/// Receives a named event plus a structured payload. Calls are best-effort:
/// the container logs and swallows any error returned here.
pub trait TelemetrySink: Send + Sync {
    /// Record an event
    fn track(&self, event: &str, payload: &serde_json::Value) -> Result<(), ModuleError>;
}

/// Module system errors
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("Invalid registration for module '{module}': {reason}")]
    InvalidRegistration { module: String, reason: String },

    #[error("Dependency cycle detected: {}", .chain.join(" -> "))]
    DependencyCycle { chain: Vec<String> },

    #[error("Unresolved dependency '{alias}' (tried canonical path '{canonical}')")]
    UnresolvedDependency { alias: String, canonical: String },

    #[error("Manifest contains a dependency cycle among: {}", .modules.join(", "))]
    ManifestCycle { modules: Vec<String> },

    #[error("Factory for module '{module}' failed: {reason}")]
    FactoryFailed { module: String, reason: String },

    #[error("Invalid module name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("Telemetry error: {0}")]
    Telemetry(String),

    #[error("Module operation failed: {0}")]
    OperationError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl ModuleError {
    /// True for errors that abort a build-order run
    pub fn is_build_fatal(&self) -> bool {
        matches!(
            self,
            ModuleError::ManifestCycle { .. }
                | ModuleError::InvalidManifest(_)
                | ModuleError::Io(_)
                | ModuleError::SerializationError(_)
        )
    }
}

impl From<serde_json::Error> for ModuleError {
    fn from(e: serde_json::Error) -> Self {
        ModuleError::SerializationError(e.to_string())
    }
}

impl From<toml::de::Error> for ModuleError {
    fn from(e: toml::de::Error) -> Self {
        ModuleError::SerializationError(e.to_string())
    }
}

impl From<anyhow::Error> for ModuleError {
    fn from(e: anyhow::Error) -> Self {
        ModuleError::OperationError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_contains_chain() {
        let err = ModuleError::DependencyCycle {
            chain: vec!["A".into(), "B".into(), "A".into()],
        };
        assert_eq!(err.to_string(), "Dependency cycle detected: A -> B -> A");
    }

    #[test]
    fn test_build_fatal_classification() {
        assert!(ModuleError::ManifestCycle { modules: vec!["A".into()] }.is_build_fatal());
        assert!(!ModuleError::UnresolvedDependency {
            alias: "Config".into(),
            canonical: "System.Config".into(),
        }
        .is_build_fatal());
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: ModuleError = json_err.into();
        assert!(matches!(err, ModuleError::SerializationError(_)));
    }
}

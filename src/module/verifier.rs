//! Module verifier
//!
//! Read-only diagnostics over the registry: whether a module is
//! authoritatively ready, whether it exposes the members a caller needs, and
//! a consolidated health report over the critical modules. The verifier
//! never constructs pending modules and never mutates the registry.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::module::container::ModuleContainer;
use crate::module::exports::{Exports, Member};
use crate::module::registry::record::ModuleSlot;
use crate::utils::current_timestamp;

/// A member a module must expose, addressed by dot-path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Requirement {
    /// Path must resolve to a callable member
    Callable(String),
    /// Path must resolve to anything
    Defined(String),
}

impl Requirement {
    pub fn callable(path: impl Into<String>) -> Self {
        Requirement::Callable(path.into())
    }

    pub fn defined(path: impl Into<String>) -> Self {
        Requirement::Defined(path.into())
    }

    /// Parse the string form: `"path()"` is callable, anything else defined
    ///
    /// A bare `"path"` is met by any non-null member, plain values included.
    /// A member that must be a function has to be written `"path()"`.
    pub fn parse(s: &str) -> Self {
        match s.strip_suffix("()") {
            Some(path) => Requirement::Callable(path.to_string()),
            None => Requirement::Defined(s.to_string()),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Requirement::Callable(p) | Requirement::Defined(p) => p,
        }
    }

    /// True if `exports` satisfies this requirement
    pub fn is_met_by(&self, exports: &Exports) -> bool {
        match (self, exports.lookup(self.path())) {
            (Requirement::Callable(_), Some(member)) => member.is_callable(),
            (Requirement::Defined(_), Some(Member::Value(v))) => !v.is_null(),
            (Requirement::Defined(_), Some(_)) => true,
            (_, None) => false,
        }
    }
}

impl From<&str> for Requirement {
    fn from(s: &str) -> Self {
        Requirement::parse(s)
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Callable(p) => write!(f, "{}()", p),
            Requirement::Defined(p) => f.write_str(p),
        }
    }
}

/// A module the health check must find ready, with its requirements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriticalModule {
    pub alias: String,
    pub requirements: Vec<Requirement>,
}

impl CriticalModule {
    pub fn new<I, R>(alias: impl Into<String>, requirements: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Requirement>,
    {
        Self {
            alias: alias.into(),
            requirements: requirements.into_iter().map(Into::into).collect(),
        }
    }
}

/// Per-module health status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum HealthStatus {
    /// Registered and all requirements met
    Ready,
    /// Still the bootstrap stand-in
    Placeholder,
    /// Declared but never constructed
    Pending,
    /// Factory failed (or is still running)
    Failed,
    /// Not registered
    Missing,
    /// Registered but missing required members
    Incomplete,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HealthStatus::Ready => "Ready",
            HealthStatus::Placeholder => "Placeholder",
            HealthStatus::Pending => "Pending",
            HealthStatus::Failed => "Failed",
            HealthStatus::Missing => "Missing",
            HealthStatus::Incomplete => "Incomplete",
        };
        f.write_str(s)
    }
}

/// One row of the health report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleHealth {
    /// Alias as listed in the critical set
    pub module: String,
    /// Canonical name it mapped to
    pub canonical: String,
    pub status: HealthStatus,
    /// Why the module is not ready
    pub reason: Option<String>,
}

/// Consolidated health report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub is_healthy: bool,
    pub rows: Vec<ModuleHealth>,
    /// Timestamp of report generation
    pub timestamp: u64,
}

impl HealthReport {
    /// Rows that are not ready
    pub fn failures(&self) -> impl Iterator<Item = &ModuleHealth> {
        self.rows.iter().filter(|r| r.status != HealthStatus::Ready)
    }
}

impl fmt::Display for HealthReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .rows
            .iter()
            .map(|r| r.module.len())
            .max()
            .unwrap_or(0)
            .max("MODULE".len());
        writeln!(f, "{:<width$}  {:<11}  REASON", "MODULE", "STATUS", width = width)?;
        for row in &self.rows {
            writeln!(
                f,
                "{:<width$}  {:<11}  {}",
                row.module,
                row.status.to_string(),
                row.reason.as_deref().unwrap_or("-"),
                width = width
            )?;
        }
        write!(
            f,
            "{}",
            if self.is_healthy {
                "System healthy"
            } else {
                "System unhealthy"
            }
        )
    }
}

/// Read-only verifier borrowed from a container
pub struct ModuleVerifier<'a> {
    container: &'a ModuleContainer,
    critical: Vec<CriticalModule>,
}

impl<'a> ModuleVerifier<'a> {
    pub fn new(container: &'a ModuleContainer, critical: Vec<CriticalModule>) -> Self {
        Self {
            container,
            critical,
        }
    }

    pub fn critical_modules(&self) -> &[CriticalModule] {
        &self.critical
    }

    /// True only for modules registered by the registrar (not placeholders)
    pub fn is_ready(&self, alias: &str) -> bool {
        matches!(self.slot(alias), Some(ModuleSlot::Ready(_)))
    }

    /// True if every alias is ready
    pub fn all_ready<S: AsRef<str>>(&self, aliases: &[S]) -> bool {
        aliases.iter().all(|a| self.is_ready(a.as_ref()))
    }

    /// True if `alias` is ready and exposes every requirement
    pub fn check_ready<R>(&self, alias: &str, requirements: &[R]) -> bool
    where
        R: Clone + Into<Requirement>,
    {
        let (status, _) = self.inspect(
            alias,
            &requirements
                .iter()
                .cloned()
                .map(Into::into)
                .collect::<Vec<_>>(),
        );
        status == HealthStatus::Ready
    }

    /// Check every critical module; never fails, one row per module
    pub fn health_check(&self) -> HealthReport {
        let rows: Vec<ModuleHealth> = self
            .critical
            .iter()
            .map(|critical| {
                let (status, reason) = self.inspect(&critical.alias, &critical.requirements);
                ModuleHealth {
                    module: critical.alias.clone(),
                    canonical: self.container.aliases().canonicalize(&critical.alias).to_string(),
                    status,
                    reason,
                }
            })
            .collect();

        HealthReport {
            is_healthy: rows.iter().all(|r| r.status == HealthStatus::Ready),
            rows,
            timestamp: current_timestamp(),
        }
    }

    fn slot(&self, alias: &str) -> Option<ModuleSlot> {
        let canonical = self.container.aliases().canonicalize(alias);
        self.container.registry().record(canonical).map(|r| r.slot)
    }

    fn inspect(&self, alias: &str, requirements: &[Requirement]) -> (HealthStatus, Option<String>) {
        let canonical = self.container.aliases().canonicalize(alias);
        let exports = match self.slot(alias) {
            None => {
                return (
                    HealthStatus::Missing,
                    Some(format!("'{}' is not registered", canonical)),
                )
            }
            Some(ModuleSlot::Placeholder(_)) => {
                return (
                    HealthStatus::Placeholder,
                    Some("bootstrap placeholder, real module never loaded".to_string()),
                )
            }
            Some(ModuleSlot::Pending) => {
                return (
                    HealthStatus::Pending,
                    Some("declared but never built".to_string()),
                )
            }
            Some(ModuleSlot::Building) => {
                return (
                    HealthStatus::Failed,
                    Some("factory still running".to_string()),
                )
            }
            Some(ModuleSlot::Failed(reason)) => return (HealthStatus::Failed, Some(reason)),
            Some(ModuleSlot::Ready(exports)) => exports,
        };

        let missing: Vec<String> = requirements
            .iter()
            .filter(|r| !r.is_met_by(&exports))
            .map(Requirement::to_string)
            .collect();

        if missing.is_empty() {
            (HealthStatus::Ready, None)
        } else {
            (
                HealthStatus::Incomplete,
                Some(format!("missing {}", missing.join(", "))),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_requirement_parse() {
        assert_eq!(Requirement::parse("get()"), Requirement::callable("get"));
        assert_eq!(Requirement::parse("bar.baz"), Requirement::defined("bar.baz"));
        assert_eq!(Requirement::callable("a.b").to_string(), "a.b()");
    }

    #[test]
    fn test_requirement_is_met_by() {
        let exports = Exports::new()
            .with_function("foo", |_| Ok(json!(null)))
            .with_value("bar", json!({ "baz": 1, "nothing": null }));
        assert!(Requirement::callable("foo").is_met_by(&exports));
        assert!(Requirement::defined("foo").is_met_by(&exports));
        assert!(Requirement::defined("bar.baz").is_met_by(&exports));
        assert!(!Requirement::callable("bar.baz").is_met_by(&exports));
        assert!(!Requirement::defined("bar.nothing").is_met_by(&exports));
        assert!(!Requirement::defined("qux").is_met_by(&exports));
    }

    #[test]
    fn test_report_display() {
        let report = HealthReport {
            is_healthy: false,
            rows: vec![ModuleHealth {
                module: "Config".into(),
                canonical: "System.Config".into(),
                status: HealthStatus::Missing,
                reason: Some("'System.Config' is not registered".into()),
            }],
            timestamp: 0,
        };
        let text = report.to_string();
        assert!(text.contains("Config"));
        assert!(text.contains("Missing"));
        assert!(text.ends_with("System unhealthy"));
        assert_eq!(report.failures().count(), 1);
    }
}

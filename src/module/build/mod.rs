//! Build-time load ordering
//!
//! Offline counterpart of the runtime container: reads a manifest (or scans
//! sources into one), validates it, orders modules so every dependency loads
//! before its dependents, and writes the file order into the deployment
//! document.

pub mod dot;
pub mod manifest;
pub mod order;
pub mod policy;
pub mod push_order;
pub mod scanner;
pub mod validator;

pub use dot::to_dot;
pub use manifest::{Manifest, ManifestEntry};
pub use order::{BuildOrder, BuildOrderGenerator, DependencyGraph, DroppedDependency};
pub use policy::LoadPolicy;
pub use push_order::{DeploymentDocument, PUSH_ORDER_KEY};
pub use scanner::{parse_source, ScannedModule, SourceScanner};
pub use validator::{ManifestValidator, ValidationResult};

use crate::config::BuildConfig;
use crate::module::alias::AliasTable;
use crate::module::traits::ModuleError;

impl BuildOrderGenerator {
    /// Generator configured from the `[build]` section
    pub fn from_config(config: &BuildConfig, aliases: AliasTable) -> Result<Self, ModuleError> {
        let policy =
            LoadPolicy::from_patterns(&config.load_last)?.with_load_first(&config.load_first)?;
        let mut generator = Self::new().with_policy(policy);
        if config.canonicalize_dependencies {
            generator = generator.with_aliases(aliases);
        }
        if let Some(ns) = &config.default_namespace {
            generator = generator.with_default_namespace(ns.clone());
        }
        Ok(generator)
    }
}

//! modgraph - module registration, dependency injection and load ordering
//!
//! For hosts without a native module system: independently authored source
//! files are executed one after another into a shared space, each registering
//! a module that may depend on modules registered by earlier files.
//!
//! ## Two halves
//!
//! 1. **Runtime container** ([`module::ModuleContainer`]): alias table,
//!    registry, resolver with cycle detection, registrar, bootstrap
//!    placeholders and a read-only verifier.
//! 2. **Build-time generator** ([`module::build`]): orders the files of a
//!    manifest so that every module loads after its dependencies, failing
//!    hard on cycles.
//!
//! ## Example
//!
//! ```rust
//! use modgraph::module::{Exports, ModuleContainer, ModuleDefinition};
//! use serde_json::json;
//!
//! let container = ModuleContainer::new();
//! container
//!     .define_module(
//!         ModuleDefinition::new("System.Config")
//!             .depends_on(["Utils"])
//!             .factory(|_deps| Ok(Exports::new().with_function("get", |_| Ok(json!("value"))))),
//!     )
//!     .unwrap();
//!
//! let config = container.get_one("Config").unwrap().unwrap();
//! assert_eq!(config.call("get", &[]).unwrap(), json!("value"));
//! assert!(container.verifier().is_ready("Config"));
//! ```

pub mod config;
pub mod module;
pub mod utils;

pub use config::{ModgraphConfig, CONFIG_ENV_VAR};
pub use module::{
    AliasTable, CanonicalName, Dependencies, Exports, ModuleContainer, ModuleDefinition,
    ModuleError, ModuleState,
};

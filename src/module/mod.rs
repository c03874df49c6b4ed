//! Module system for modgraph
//!
//! Runtime registration and dependency resolution for modules that are
//! loaded one file at a time into a shared space, plus the build-time
//! generator that decides the file order.
//!
//! ## Architecture
//!
//! - **Alias table**: short dependency names map onto canonical dotted names
//! - **Registry**: one tagged record per canonical name (placeholder, pending, building, ready, failed)
//! - **Resolver**: `get` resolves aliases, builds pending modules on demand and detects cycles
//! - **Registrar**: `define_module` / `declare_module` store factories and their exports
//! - **Bootstrap**: no-op placeholders for core modules until the real ones load
//! - **Verifier**: read-only readiness checks and a consolidated health report
//! - **Build**: manifest → deterministic file order for the packaging step

pub mod alias;
pub mod bootstrap;
pub mod build;
pub mod container;
pub mod exports;
pub mod name;
pub mod registrar;
pub mod registry;
pub mod traits;
pub mod verifier;

pub use alias::AliasTable;
pub use container::ModuleContainer;
pub use exports::{Export, Exports, Function, Member};
pub use name::CanonicalName;
pub use registrar::{BuildOutcome, ModuleDefinition};
pub use registry::{Dependencies, ModuleRecord, ModuleSlot, Registry, Resolved, ResolvingSet};
pub use traits::{ModuleError, ModuleState, TelemetrySink};
pub use verifier::{
    CriticalModule, HealthReport, HealthStatus, ModuleHealth, ModuleVerifier, Requirement,
};

//! Registry records
//!
//! One record per canonical name. The slot is a tagged union over the
//! lifecycle: placeholder, pending, building, ready, failed.

use std::fmt;
use std::sync::Arc;

use crate::module::exports::Exports;
use crate::module::name::CanonicalName;
use crate::module::registry::resolver::Dependencies;
use crate::module::traits::{ModuleError, ModuleState};

/// Module factory: builds exports from resolved dependencies
pub type Factory = Arc<dyn Fn(&Dependencies) -> Result<Exports, ModuleError> + Send + Sync>;

/// Record payload by lifecycle state
#[derive(Clone)]
pub enum ModuleSlot {
    /// Bootstrap stand-in; resolvable but not ready
    Placeholder(Exports),
    /// Declared, waiting to be constructed
    Pending,
    /// Factory running
    Building,
    /// Authoritative exports
    Ready(Exports),
    /// Factory failed with the given reason
    Failed(String),
}

impl ModuleSlot {
    pub fn state(&self) -> ModuleState {
        match self {
            ModuleSlot::Placeholder(_) => ModuleState::Placeholder,
            ModuleSlot::Pending => ModuleState::Pending,
            ModuleSlot::Building => ModuleState::Building,
            ModuleSlot::Ready(_) => ModuleState::Ready,
            ModuleSlot::Failed(_) => ModuleState::Failed,
        }
    }

    /// Exports visible to the resolver, if any
    pub fn exports(&self) -> Option<&Exports> {
        match self {
            ModuleSlot::Placeholder(exports) | ModuleSlot::Ready(exports) => Some(exports),
            _ => None,
        }
    }

    /// True for slots that must survive a failed re-registration
    pub(crate) fn is_established(&self) -> bool {
        matches!(self, ModuleSlot::Placeholder(_) | ModuleSlot::Ready(_))
    }
}

impl fmt::Debug for ModuleSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleSlot::Placeholder(e) => f.debug_tuple("Placeholder").field(e).finish(),
            ModuleSlot::Pending => f.write_str("Pending"),
            ModuleSlot::Building => f.write_str("Building"),
            ModuleSlot::Ready(e) => f.debug_tuple("Ready").field(e).finish(),
            ModuleSlot::Failed(reason) => f.debug_tuple("Failed").field(reason).finish(),
        }
    }
}

/// A registered module
#[derive(Clone)]
pub struct ModuleRecord {
    /// Canonical name
    pub name: CanonicalName,
    /// Declared dependency aliases, in declaration order
    pub dependencies: Vec<String>,
    /// Lifecycle slot
    pub slot: ModuleSlot,
    /// Registration sequence number (monotonic per registry)
    pub sequence: u64,
    pub(crate) factory: Option<Factory>,
}

impl ModuleRecord {
    pub(crate) fn placeholder(name: CanonicalName, exports: Exports, sequence: u64) -> Self {
        Self {
            name,
            dependencies: Vec::new(),
            slot: ModuleSlot::Placeholder(exports),
            sequence,
            factory: None,
        }
    }

    pub(crate) fn declared(
        name: CanonicalName,
        dependencies: Vec<String>,
        factory: Factory,
        sequence: u64,
    ) -> Self {
        Self {
            name,
            dependencies,
            slot: ModuleSlot::Pending,
            sequence,
            factory: Some(factory),
        }
    }

    pub fn state(&self) -> ModuleState {
        self.slot.state()
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.slot, ModuleSlot::Placeholder(_))
    }

    pub fn has_factory(&self) -> bool {
        self.factory.is_some()
    }

    /// Pending or mid-construction
    pub fn is_unsettled(&self) -> bool {
        matches!(self.slot, ModuleSlot::Pending | ModuleSlot::Building)
    }
}

impl fmt::Debug for ModuleRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRecord")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("slot", &self.slot)
            .field("sequence", &self.sequence)
            .field("has_factory", &self.factory.is_some())
            .finish()
    }
}

//! Shared test helpers

#![allow(dead_code)]

use modgraph::module::{Exports, ModuleError, TelemetrySink};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Telemetry sink that records every event
#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<(String, Value)>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<(String, Value)> {
        self.events.lock().unwrap().clone()
    }
}

impl TelemetrySink for RecordingSink {
    fn track(&self, event: &str, payload: &Value) -> Result<(), ModuleError> {
        self.events
            .lock()
            .unwrap()
            .push((event.to_string(), payload.clone()));
        Ok(())
    }
}

/// Telemetry sink that always fails
pub struct FailingSink;

impl TelemetrySink for FailingSink {
    fn track(&self, _event: &str, _payload: &Value) -> Result<(), ModuleError> {
        Err(ModuleError::Telemetry("sink unavailable".to_string()))
    }
}

/// Telemetry sink that panics on every event
pub struct PanickingSink;

impl TelemetrySink for PanickingSink {
    fn track(&self, event: &str, _payload: &Value) -> Result<(), ModuleError> {
        panic!("sink exploded on {}", event)
    }
}

/// Shared invocation counter for factories
#[derive(Clone, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Exports with a single `id()` function returning `id`
pub fn tagged_exports(id: &str) -> Exports {
    let id = id.to_string();
    Exports::new().with_function("id", move |_| Ok(json!(id)))
}

/// Value returned by the `id()` function of `exports`
pub fn tag_of(exports: &Exports) -> String {
    exports
        .call("id", &[])
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

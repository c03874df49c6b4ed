//! Deployment document I/O
//!
//! The generated order is persisted as the `filePushOrder` array of a JSON
//! deployment document consumed by the packaging step. The same document
//! supplies the prior order used for carry-over. All other keys are kept.

use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::module::traits::ModuleError;

/// Key holding the file order
pub const PUSH_ORDER_KEY: &str = "filePushOrder";

/// JSON deployment document
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentDocument {
    path: PathBuf,
    fields: Map<String, Value>,
}

impl DeploymentDocument {
    /// Load from `path`, or start from the default document if it is absent
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ModuleError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            warn!(
                "Deployment document {} not found, starting from defaults",
                path.display()
            );
            return Ok(Self {
                path,
                fields: default_fields(),
            });
        }

        let contents = std::fs::read_to_string(&path)?;
        let fields = match serde_json::from_str::<Value>(&contents)? {
            Value::Object(map) => map,
            other => {
                return Err(ModuleError::InvalidManifest(format!(
                    "Deployment document {} must be a JSON object, found {}",
                    path.display(),
                    type_name(&other)
                )))
            }
        };
        debug!("Loaded deployment document {}", path.display());
        Ok(Self { path, fields })
    }

    /// Default document at `path` (not written until saved)
    pub fn with_defaults<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            fields: default_fields(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current push order; non-string entries are skipped
    pub fn push_order(&self) -> Vec<String> {
        match self.fields.get(PUSH_ORDER_KEY) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            Some(other) => {
                warn!(
                    "{} is not an array ({}), ignoring prior order",
                    PUSH_ORDER_KEY,
                    type_name(other)
                );
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    pub fn set_push_order<S: AsRef<str>>(&mut self, files: &[S]) {
        let items = files
            .iter()
            .map(|f| Value::String(f.as_ref().to_string()))
            .collect();
        self.fields
            .insert(PUSH_ORDER_KEY.to_string(), Value::Array(items));
    }

    /// Other top-level field
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn to_json_string(&self) -> Result<String, ModuleError> {
        Ok(serde_json::to_string_pretty(&self.fields)?)
    }

    /// Write back to the path it was loaded from
    pub fn save(&self) -> Result<(), ModuleError> {
        self.save_to(&self.path)
    }

    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), ModuleError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json_string()?)?;
        debug!("Wrote deployment document {}", path.display());
        Ok(())
    }
}

fn default_fields() -> Map<String, Value> {
    match json!({
        "timeZone": "Asia/Riyadh",
        "dependencies": { "enabledAdvancedServices": [] },
        "exceptionLogging": "STACKDRIVER",
        "runtimeVersion": "V8"
    }) {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

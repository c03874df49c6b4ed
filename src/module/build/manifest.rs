//! Build manifest parsing
//!
//! A manifest lists every module with the file that defines it and the
//! modules it depends on. Order of entries is significant only as the
//! tie-break for the build order.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::module::traits::ModuleError;

/// One `{module, file, dependencies}` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Canonical module name
    pub module: String,
    /// Source file defining the module
    pub file: String,
    /// Dependency names (canonical names or aliases)
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl ManifestEntry {
    pub fn new<I, S>(module: impl Into<String>, file: impl Into<String>, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            module: module.into(),
            file: file.into(),
            dependencies: dependencies.into_iter().map(Into::into).collect(),
        }
    }
}

/// Build manifest (`{"modules": [...]}`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub modules: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn new(modules: Vec<ManifestEntry>) -> Self {
        Self { modules }
    }

    /// Load manifest from a JSON or TOML file (by extension)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ModuleError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ModuleError::InvalidManifest(format!(
                "Failed to read manifest file {}: {}",
                path.display(),
                e
            ))
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&contents),
            _ => Self::from_json_str(&contents),
        }
    }

    pub fn from_json_str(contents: &str) -> Result<Self, ModuleError> {
        serde_json::from_str(contents).map_err(|e| {
            ModuleError::InvalidManifest(format!("Failed to parse manifest JSON: {}", e))
        })
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ModuleError> {
        toml::from_str(contents).map_err(|e| {
            ModuleError::InvalidManifest(format!("Failed to parse manifest TOML: {}", e))
        })
    }

    /// Save manifest as pretty JSON
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ModuleError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Entry for `module`
    pub fn entry(&self, module: &str) -> Option<&ManifestEntry> {
        self.modules.iter().find(|e| e.module == module)
    }
}

impl FromIterator<ManifestEntry> for Manifest {
    fn from_iter<I: IntoIterator<Item = ManifestEntry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

//! Configuration management for modgraph
//!
//! Handles configuration loading (JSON or TOML), defaults and validation for
//! the runtime container and the build-order generator.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::module::alias::AliasTable;
use crate::module::verifier::{CriticalModule, Requirement};

/// Environment variable naming the configuration file
pub const CONFIG_ENV_VAR: &str = "MODGRAPH_CONFIG";

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log filter (e.g. "info", "modgraph=debug"); RUST_LOG takes precedence
    #[serde(default)]
    pub filter: Option<String>,

    /// Emit JSON lines (requires the `json-logging` feature)
    #[serde(default)]
    pub json_format: bool,
}

/// Alias table configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AliasConfig {
    /// Start from the built-in alias set
    #[serde(default = "default_true")]
    pub use_builtin: bool,

    /// Extra aliases (alias -> canonical name); these win over built-ins
    #[serde(default)]
    pub extra: HashMap<String, String>,
}

fn default_true() -> bool {
    true
}

impl Default for AliasConfig {
    fn default() -> Self {
        Self {
            use_builtin: true,
            extra: HashMap::new(),
        }
    }
}

impl AliasConfig {
    /// Build the alias table described by this section
    pub fn to_table(&self) -> AliasTable {
        let base = if self.use_builtin {
            AliasTable::builtin()
        } else {
            AliasTable::new()
        };
        base.extend(self.extra.iter().map(|(k, v)| (k.clone(), v.clone())))
    }
}

/// Bootstrap placeholder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    /// Install placeholders when the container is created
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// One critical module entry as written in config
///
/// Requirements use the string form: `"get()"` must be callable, `"bar.baz"`
/// must merely be defined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticalModuleConfig {
    pub module: String,
    #[serde(default)]
    pub requires: Vec<String>,
}

impl From<&CriticalModuleConfig> for CriticalModule {
    fn from(entry: &CriticalModuleConfig) -> Self {
        CriticalModule::new(
            entry.module.clone(),
            entry.requires.iter().map(|r| Requirement::parse(r)),
        )
    }
}

/// Verifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// Modules checked by the health report
    #[serde(default = "default_critical_modules")]
    pub critical: Vec<CriticalModuleConfig>,
}

fn default_critical_modules() -> Vec<CriticalModuleConfig> {
    [
        ("Utils", "log()"),
        ("Config", "get()"),
        ("Telemetry", "track()"),
        ("DocsManager", "registerModuleDocs()"),
    ]
    .iter()
    .map(|(module, req)| CriticalModuleConfig {
        module: module.to_string(),
        requires: vec![req.to_string()],
    })
    .collect()
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            critical: default_critical_modules(),
        }
    }
}

impl VerifierConfig {
    pub fn critical_modules(&self) -> Vec<CriticalModule> {
        self.critical.iter().map(CriticalModule::from).collect()
    }
}

/// Build-order generator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Manifest file (JSON or TOML)
    #[serde(default)]
    pub manifest: Option<String>,

    /// Source directory to scan when no manifest is given
    #[serde(default)]
    pub scan_dir: Option<String>,

    /// File extensions considered by the source scanner
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Deployment document receiving `filePushOrder`
    #[serde(default = "default_deployment_file")]
    pub deployment_file: String,

    /// Glob patterns for files pinned ahead of every ordered file, in pin order
    #[serde(default = "default_load_first")]
    pub load_first: Vec<String>,

    /// Glob patterns for non-manifest files that must load last
    #[serde(default = "default_load_last")]
    pub load_last: Vec<String>,

    /// Resolve manifest dependency names through the alias table
    #[serde(default = "default_true")]
    pub canonicalize_dependencies: bool,

    /// Namespace tried as `<namespace>.<name>` for unmatched dependency names
    #[serde(default = "default_namespace")]
    pub default_namespace: Option<String>,
}

fn default_namespace() -> Option<String> {
    Some("System".to_string())
}

fn default_extensions() -> Vec<String> {
    vec!["js".to_string(), "gs".to_string()]
}

fn default_deployment_file() -> String {
    "appsscript.json".to_string()
}

fn default_load_first() -> Vec<String> {
    ["00_utils.js", "90_System/05_Types.js", "01_config.js", "02_intro.js"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_load_last() -> Vec<String> {
    ["99_*", "*/99_*", "*EditorTriggers*", "*ui_entry*"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            manifest: None,
            scan_dir: None,
            extensions: default_extensions(),
            deployment_file: default_deployment_file(),
            load_first: default_load_first(),
            load_last: default_load_last(),
            canonicalize_dependencies: true,
            default_namespace: default_namespace(),
        }
    }
}

impl BuildConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.deployment_file.trim().is_empty() {
            return Err(anyhow::anyhow!("build.deployment_file must not be empty"));
        }
        if self.extensions.iter().any(|e| e.is_empty() || e.starts_with('.')) {
            return Err(anyhow::anyhow!(
                "build.extensions entries must be non-empty and given without a leading dot"
            ));
        }
        for (field, patterns) in [("load_first", &self.load_first), ("load_last", &self.load_last)] {
            for pattern in patterns {
                glob::Pattern::new(pattern).map_err(|e| {
                    anyhow::anyhow!("Invalid {} pattern '{}': {}", field, pattern, e)
                })?;
            }
        }
        Ok(())
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModgraphConfig {
    #[serde(default)]
    pub logging: Option<LoggingConfig>,

    #[serde(default)]
    pub aliases: AliasConfig,

    #[serde(default)]
    pub bootstrap: BootstrapConfig,

    #[serde(default)]
    pub verifier: VerifierConfig,

    #[serde(default)]
    pub build: BuildConfig,
}

impl ModgraphConfig {
    /// Load configuration from JSON file
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ModgraphConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ModgraphConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration, picking the format from the file extension
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_file(path)?,
            Some("json") | None => Self::from_json_file(path)?,
            Some(other) => {
                return Err(anyhow::anyhow!(
                    "Unsupported config format '.{}' (expected .json or .toml)",
                    other
                ))
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to JSON file
    pub fn to_json_file(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        for (alias, canonical) in &self.aliases.extra {
            if alias.trim().is_empty() {
                return Err(anyhow::anyhow!("aliases.extra contains an empty alias"));
            }
            crate::module::name::CanonicalName::parse(canonical)
                .map_err(|e| anyhow::anyhow!("alias '{}': {}", alias, e))?;
        }

        for entry in &self.verifier.critical {
            if entry.module.trim().is_empty() {
                return Err(anyhow::anyhow!("verifier.critical contains an empty module name"));
            }
            if entry.requires.iter().any(|r| r.trim_end_matches("()").is_empty()) {
                return Err(anyhow::anyhow!(
                    "verifier.critical entry '{}' has an empty requirement",
                    entry.module
                ));
            }
        }

        self.build.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ModgraphConfig::default();
        assert!(config.bootstrap.enabled);
        assert!(config.aliases.use_builtin);
        assert_eq!(config.verifier.critical.len(), 4);
        assert_eq!(config.build.deployment_file, "appsscript.json");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ModgraphConfig =
            serde_json::from_str(r#"{ "bootstrap": { "enabled": false } }"#).unwrap();
        assert!(!config.bootstrap.enabled);
        assert_eq!(config.build.extensions, vec!["js", "gs"]);
    }

    #[test]
    fn test_toml_section_parsing() {
        let config: ModgraphConfig = toml::from_str(
            r#"
            [aliases]
            use_builtin = false
            extra = { Cfg = "App.Config" }

            [[verifier.critical]]
            module = "Cfg"
            requires = ["get()", "defaults.locale"]
            "#,
        )
        .unwrap();
        let table = config.aliases.to_table();
        assert_eq!(table.len(), 1);
        assert_eq!(table.canonicalize("Cfg"), "App.Config");
        assert_eq!(config.verifier.critical[0].requires.len(), 2);
    }

    #[test]
    fn test_validate_rejects_bad_glob() {
        let mut config = ModgraphConfig::default();
        config.build.load_last = vec!["[".to_string()];
        assert!(config.validate().is_err());

        let mut config = ModgraphConfig::default();
        config.build.load_first = vec!["src/[".to_string()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("load_first"));
    }

    #[test]
    fn test_validate_rejects_bad_alias_target() {
        let mut config = ModgraphConfig::default();
        config.aliases.extra.insert("X".into(), "Bad..Name".into());
        assert!(config.validate().is_err());
    }
}

//! Manifest validation
//!
//! Structural checks on a build manifest before ordering. Hard errors make
//! the manifest unusable; lint findings are reported but the generator can
//! still proceed (duplicate modules resolve last-wins, duplicate
//! dependencies collapse).

use std::collections::HashSet;
use tracing::{debug, warn};

use crate::module::build::manifest::Manifest;
use crate::module::name::CanonicalName;
use crate::module::traits::ModuleError;

/// Validation result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// Manifest is valid
    Valid,
    /// Manifest is invalid with specific errors
    Invalid(Vec<String>),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    /// Convert into a `Result`, joining all errors
    pub fn into_result(self) -> Result<(), ModuleError> {
        match self {
            ValidationResult::Valid => Ok(()),
            ValidationResult::Invalid(errors) => {
                Err(ModuleError::InvalidManifest(errors.join("; ")))
            }
        }
    }
}

/// Manifest validator
#[derive(Debug, Clone, Default)]
pub struct ManifestValidator {
    /// Accept module names that are not valid canonical names
    allow_free_names: bool,
}

impl ManifestValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip canonical-name syntax checks (names only need to be non-empty)
    pub fn allow_free_names(mut self) -> Self {
        self.allow_free_names = true;
        self
    }

    /// Validate a build manifest
    pub fn validate(&self, manifest: &Manifest) -> ValidationResult {
        let mut errors = Vec::new();

        for (idx, entry) in manifest.modules.iter().enumerate() {
            if entry.module.trim().is_empty() {
                errors.push(format!("Entry #{}: module name cannot be empty", idx));
            } else if !self.allow_free_names {
                if let Err(e) = CanonicalName::parse(&entry.module) {
                    errors.push(format!("Entry #{}: {}", idx, e));
                }
            }

            if entry.file.trim().is_empty() {
                errors.push(format!(
                    "Entry #{} ({}): file path cannot be empty",
                    idx, entry.module
                ));
            }

            if entry.dependencies.iter().any(|d| d.trim().is_empty()) {
                errors.push(format!(
                    "Entry #{} ({}): dependency names cannot be empty",
                    idx, entry.module
                ));
            }
        }

        if errors.is_empty() {
            debug!("Manifest validation passed ({} modules)", manifest.len());
            ValidationResult::Valid
        } else {
            warn!("Manifest validation failed: {:?}", errors);
            ValidationResult::Invalid(errors)
        }
    }

    /// Non-fatal findings: duplicate modules, duplicate or self dependencies
    pub fn lint(&self, manifest: &Manifest) -> Vec<String> {
        let mut findings = Vec::new();
        let mut seen_modules = HashSet::new();

        for entry in &manifest.modules {
            if !seen_modules.insert(entry.module.as_str()) {
                findings.push(format!(
                    "Module {} listed more than once (last entry wins)",
                    entry.module
                ));
            }

            let mut seen_deps = HashSet::new();
            for dep in &entry.dependencies {
                if !seen_deps.insert(dep.as_str()) {
                    findings.push(format!("Module {} lists dependency {} twice", entry.module, dep));
                }
                if *dep == entry.module {
                    findings.push(format!("Module {} depends on itself", entry.module));
                }
            }
        }

        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::build::manifest::ManifestEntry;

    #[test]
    fn test_valid_manifest() {
        let manifest = Manifest::new(vec![
            ManifestEntry::new("System.Utils", "00_utils.js", Vec::<String>::new()),
            ManifestEntry::new("System.Config", "01_config.js", ["Utils"]),
        ]);
        assert_eq!(ManifestValidator::new().validate(&manifest), ValidationResult::Valid);
    }

    #[test]
    fn test_invalid_entries_collected() {
        let manifest = Manifest::new(vec![
            ManifestEntry::new("", "a.js", Vec::<String>::new()),
            ManifestEntry::new("System..X", "", [""]),
        ]);
        match ManifestValidator::new().validate(&manifest) {
            ValidationResult::Invalid(errors) => assert_eq!(errors.len(), 4),
            ValidationResult::Valid => panic!("manifest should be invalid"),
        }
    }

    #[test]
    fn test_free_names() {
        let manifest = Manifest::new(vec![ManifestEntry::new("9-lives", "a.js", Vec::<String>::new())]);
        assert!(!ManifestValidator::new().validate(&manifest).is_valid());
        assert!(ManifestValidator::new().allow_free_names().validate(&manifest).is_valid());
    }

    #[test]
    fn test_lint_findings() {
        let manifest = Manifest::new(vec![
            ManifestEntry::new("A", "a.js", ["A", "B", "B"]),
            ManifestEntry::new("A", "a2.js", Vec::<String>::new()),
        ]);
        let findings = ManifestValidator::new().lint(&manifest);
        assert_eq!(findings.len(), 3);
        assert!(findings.iter().any(|f| f.contains("last entry wins")));
    }

    #[test]
    fn test_into_result() {
        let err = ValidationResult::Invalid(vec!["a".into(), "b".into()])
            .into_result()
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid manifest: a; b");
    }
}

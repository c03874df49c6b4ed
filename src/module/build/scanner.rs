//! Source scanning
//!
//! Builds a manifest by walking a source tree and extracting `defineModule`
//! calls. Three declaration shapes are recognized:
//!
//! - `defineModule('Name', ['Dep1', 'Dep2'], factory)`
//! - `defineModule('Name', ({ Dep1, Dep2 }) => ...)`
//! - `defineModule('Name', (Dep1, Dep2) => ...)` (and `function (...)`)
//!
//! Files are visited in sorted path order so the resulting manifest, and
//! therefore the build order tie-break, is reproducible.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::module::build::manifest::{Manifest, ManifestEntry};
use crate::module::build::order::normalize_path;
use crate::module::traits::ModuleError;

static DEFINE_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"defineModule\s*\(\s*['"]([^'"]+)['"]\s*,\s*"#).expect("Invalid defineModule regex")
});

static DESTRUCTURED_PARAMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:async\s+)?(?:function\s*\w*\s*)?\(\s*\{([^}]*)\}").expect("Invalid destructuring regex")
});

static POSITIONAL_PARAMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:async\s+)?(?:function\s*\w*\s*)?\(([^)]*)\)").expect("Invalid parameter regex")
});

static LINE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"//[^\n]*").expect("Invalid comment regex"));

/// One `defineModule` call found in a source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedModule {
    pub module: String,
    pub dependencies: Vec<String>,
}

/// Extract every `defineModule` declaration from `source`, in order
pub fn parse_source(source: &str) -> Vec<ScannedModule> {
    DEFINE_CALL
        .captures_iter(source)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str().to_string();
            let rest = &source[caps.get(0)?.end()..];
            Some(ScannedModule {
                module: name,
                dependencies: parse_dependencies(rest),
            })
        })
        .collect()
}

fn parse_dependencies(rest: &str) -> Vec<String> {
    let list = if let Some(stripped) = rest.strip_prefix('[') {
        stripped.split(']').next().unwrap_or("")
    } else if let Some(caps) = DESTRUCTURED_PARAMS.captures(rest) {
        caps.get(1).map_or("", |m| m.as_str())
    } else if let Some(caps) = POSITIONAL_PARAMS.captures(rest) {
        caps.get(1).map_or("", |m| m.as_str())
    } else {
        ""
    };

    LINE_COMMENT
        .replace_all(list, "")
        .split(',')
        .filter_map(|item| {
            let item = item.trim().trim_matches(|c| c == '\'' || c == '"' || c == '`');
            // `Dep: local` renames and `Dep = default` values keep only the key
            let item = item.split(':').next()?.split('=').next()?.trim();
            let valid = !item.is_empty()
                && !item.starts_with("...")
                && !item.contains(|c: char| c.is_whitespace() || c == '(' || c == ')');
            valid.then(|| item.to_string())
        })
        .collect()
}

/// Walks a directory and builds a manifest from `defineModule` calls
#[derive(Debug, Clone)]
pub struct SourceScanner {
    root: PathBuf,
    extensions: Vec<String>,
}

impl SourceScanner {
    /// Scanner over `.js` and `.gs` files beneath `root`
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            extensions: vec!["js".to_string(), "gs".to_string()],
        }
    }

    /// Replace the file extensions considered (without leading dot)
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Source files beneath the root, relative and sorted
    pub fn source_files(&self) -> Result<Vec<String>, ModuleError> {
        if !self.root.is_dir() {
            return Err(ModuleError::InvalidManifest(format!(
                "Source directory {} does not exist",
                self.root.display()
            )));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry under {}: {}", self.root.display(), e);
                    continue;
                }
            };
            if !entry.file_type().is_file() || !self.has_source_extension(entry.path()) {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .unwrap_or(entry.path());
            files.push(normalize_path(&relative.to_string_lossy()));
        }
        Ok(files)
    }

    fn has_source_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map_or(false, |ext| self.extensions.iter().any(|e| e == ext))
    }

    /// Scan every source file into a manifest
    pub fn scan(&self) -> Result<Manifest, ModuleError> {
        info!("Scanning {} for module definitions", self.root.display());
        let mut modules = Vec::new();

        for file in self.source_files()? {
            let contents = match std::fs::read_to_string(self.root.join(&file)) {
                Ok(contents) => contents,
                Err(e) => {
                    warn!("Failed to read {}: {}", file, e);
                    continue;
                }
            };
            for found in parse_source(&contents) {
                debug!(
                    "Found module {} in {} with deps {:?}",
                    found.module, file, found.dependencies
                );
                modules.push(ManifestEntry {
                    module: found.module,
                    file: file.clone(),
                    dependencies: found.dependencies,
                });
            }
        }

        info!("Discovered {} module definitions", modules.len());
        Ok(Manifest::new(modules))
    }
}

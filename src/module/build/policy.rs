//! Load policy: naming-convention buckets around the ordered files
//!
//! Files matching a load-first pattern, whether defined by the manifest or
//! only listed in the previous push order, are pinned ahead of the ordered
//! manifest files, ranked by the pattern they match. Files that appeared in
//! the previous push order but are not defined by any manifest module are
//! carried over behind the ordered manifest files, split into files matching
//! a load-last pattern followed by the rest in their previous relative
//! order.

use glob::{MatchOptions, Pattern};

use crate::module::traits::ModuleError;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Naming-convention buckets for pinned and carried-over files
#[derive(Debug, Clone, Default)]
pub struct LoadPolicy {
    load_first: Vec<Pattern>,
    load_last: Vec<Pattern>,
}

fn compile<S: AsRef<str>>(patterns: &[S], bucket: &str) -> Result<Vec<Pattern>, ModuleError> {
    patterns
        .iter()
        .map(|p| {
            Pattern::new(p.as_ref()).map_err(|e| {
                ModuleError::InvalidManifest(format!(
                    "Invalid {} pattern '{}': {}",
                    bucket,
                    p.as_ref(),
                    e
                ))
            })
        })
        .collect()
}

impl LoadPolicy {
    /// Policy with no patterns (nothing pinned, prior order kept as-is)
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile load-last glob patterns
    pub fn from_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ModuleError> {
        Ok(Self {
            load_first: Vec::new(),
            load_last: compile(patterns, "load-last")?,
        })
    }

    /// Add load-first glob patterns; earlier patterns pin earlier
    pub fn with_load_first<S: AsRef<str>>(mut self, patterns: &[S]) -> Result<Self, ModuleError> {
        self.load_first.extend(compile(patterns, "load-first")?);
        Ok(self)
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.load_last.iter().map(Pattern::as_str)
    }

    pub fn load_first_patterns(&self) -> impl Iterator<Item = &str> {
        self.load_first.iter().map(Pattern::as_str)
    }

    /// Index of the first load-first pattern matching `file`
    pub fn load_first_rank(&self, file: &str) -> Option<usize> {
        self.load_first
            .iter()
            .position(|p| p.matches_with(file, MATCH_OPTIONS))
    }

    /// True if `file` matches a load-last pattern
    pub fn is_load_last(&self, file: &str) -> bool {
        self.load_last
            .iter()
            .any(|p| p.matches_with(file, MATCH_OPTIONS))
    }

    /// Files matching a load-first pattern, ranked by pattern
    ///
    /// `candidates` should already be unique; ties keep candidate order.
    pub fn pin_first(&self, candidates: &[String]) -> Vec<String> {
        let mut pinned: Vec<(usize, &String)> = candidates
            .iter()
            .filter_map(|f| self.load_first_rank(f).map(|rank| (rank, f)))
            .collect();
        pinned.sort_by_key(|&(rank, _)| rank);
        pinned.into_iter().map(|(_, f)| f.clone()).collect()
    }

    /// Order carried-over files: load-last bucket, then the rest
    ///
    /// Relative order inside each bucket is preserved.
    pub fn arrange(&self, files: Vec<String>) -> Vec<String> {
        let (mut last, rest): (Vec<String>, Vec<String>) =
            files.into_iter().partition(|f| self.is_load_last(f));
        last.extend(rest);
        last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patterns_match_across_directories() {
        let policy = LoadPolicy::from_patterns(&["99_*", "*/99_*", "*EditorTriggers*"]).unwrap();
        assert!(policy.is_load_last("99_Initializer.js"));
        assert!(policy.is_load_last("90_System/99_Code.js"));
        assert!(policy.is_load_last("90_System/02_EditorTriggers.js"));
        assert!(!policy.is_load_last("10_ui/1_ui_entry.js"));
    }

    #[test]
    fn test_arrange_buckets_preserve_order() {
        let policy = LoadPolicy::from_patterns(&["99_*"]).unwrap();
        let files = vec![
            "b.js".to_string(),
            "99_z.js".to_string(),
            "a.js".to_string(),
            "99_a.js".to_string(),
        ];
        assert_eq!(policy.arrange(files), vec!["99_z.js", "99_a.js", "b.js", "a.js"]);
    }

    #[test]
    fn test_pin_first_ranks_by_pattern() {
        let policy = LoadPolicy::new()
            .with_load_first(&["00_utils.js", "90_System/05_Types.js", "01_*"])
            .unwrap();
        let files: Vec<String> = ["01_config.js", "b.js", "90_System/05_Types.js", "01_a.js", "00_utils.js"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            policy.pin_first(&files),
            vec!["00_utils.js", "90_System/05_Types.js", "01_config.js", "01_a.js"]
        );
        assert_eq!(policy.load_first_rank("b.js"), None);
        assert!(!policy.is_load_last("00_utils.js"));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(matches!(
            LoadPolicy::from_patterns(&["[unclosed"]),
            Err(ModuleError::InvalidManifest(_))
        ));
        let err = LoadPolicy::new().with_load_first(&["[x"]).unwrap_err();
        assert!(err.to_string().contains("load-first"));
    }
}

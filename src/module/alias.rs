//! Alias table
//!
//! Static mapping from short dependency names to canonical module names.
//! Lookup is a pure function of the table; names without a mapping are
//! treated as already canonical.

use std::collections::HashMap;

/// Built-in aliases for the standard module layout
const BUILTIN_ALIASES: &[(&str, &str)] = &[
    // Core system & UI
    ("API", "System.API.Endpoints"),
    ("Config", "System.Config"),
    ("Dialogue", "System.UI.Dialogue"),
    ("DocsManager", "System.DocsManager"),
    ("Orchestrator", "System.Dev.Orchestrator"),
    ("ModuleVerifier", "System.Dev.ModuleVerifier"),
    ("Security", "System.Security"),
    ("Telemetry", "System.Telemetry"),
    ("Tests", "System.Tests"),
    ("Utils", "System.Utils"),
    // AI
    ("AI", "System.AI"),
    ("GeminiAdapter", "System.AI.GeminiAdapter"),
    ("IntentAnalyzer", "System.AI.IntentAnalyzer"),
    ("JsonQuery", "System.AI.JsonQuery"),
    ("Context", "System.AI.Context"),
    ("CodeAssistance", "System.AI.CodeAssistance"),
    ("LongTermMemory", "System.AI.LongTermMemory"),
    ("ToolExecutor", "System.AI.ToolExecutor"),
    // Agents
    ("AgentsCatalog", "System.Agents.Catalog"),
    ("CFOAgent", "System.AgentCFO"),
    ("DevAgent", "System.AgentDeveloper"),
    ("Dispatcher", "System.AgentDispatcher.Core"),
    ("Router", "System.Agents.Router"),
    ("GeneralAgent", "System.AgentGeneral"),
    // Tools & metrics
    ("MetricsLogger", "System.MetricsLogger"),
    ("Tools", "System.Tools"),
    ("Tools.Catalog", "System.Tools.Catalog"),
    ("ContentParser", "System.Tools.ContentParser"),
];

/// Short name → canonical name mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    entries: HashMap<String, String>,
}

impl AliasTable {
    /// Empty table (every name is canonical)
    pub fn new() -> Self {
        Self::default()
    }

    /// Table pre-populated with the built-in aliases
    pub fn builtin() -> Self {
        BUILTIN_ALIASES.iter().copied().collect()
    }

    /// Add or replace an alias
    pub fn with_alias(mut self, alias: impl Into<String>, canonical: impl Into<String>) -> Self {
        self.entries.insert(alias.into(), canonical.into());
        self
    }

    /// Merge extra aliases; entries in `extra` win
    pub fn extend<I, K, V>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.entries
            .extend(extra.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Map an alias to its canonical name (identity if unmapped)
    pub fn canonicalize<'a>(&'a self, alias: &'a str) -> &'a str {
        self.entries.get(alias).map(String::as_str).unwrap_or(alias)
    }

    /// True if `alias` has an explicit mapping
    pub fn contains(&self, alias: &str) -> bool {
        self.entries.contains_key(alias)
    }

    /// All aliases mapping onto `canonical`, sorted
    pub fn aliases_of(&self, canonical: &str) -> Vec<&str> {
        let mut aliases: Vec<&str> = self
            .entries
            .iter()
            .filter(|(_, target)| target.as_str() == canonical)
            .map(|(alias, _)| alias.as_str())
            .collect();
        aliases.sort_unstable();
        aliases
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AliasTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new().extend(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_mapping() {
        let table = AliasTable::builtin();
        assert_eq!(table.canonicalize("Telemetry"), "System.Telemetry");
        assert_eq!(table.canonicalize("Dispatcher"), "System.AgentDispatcher.Core");
    }

    #[test]
    fn test_unmapped_alias_is_canonical() {
        let table = AliasTable::builtin();
        assert_eq!(table.canonicalize("System.Custom.Thing"), "System.Custom.Thing");
        assert!(!table.contains("System.Custom.Thing"));
    }

    #[test]
    fn test_many_to_one() {
        let table = AliasTable::new()
            .with_alias("Cfg", "System.Config")
            .with_alias("Config", "System.Config");
        assert_eq!(table.aliases_of("System.Config"), vec!["Cfg", "Config"]);
    }

    #[test]
    fn test_extend_overrides() {
        let table = AliasTable::builtin().extend([("Config", "App.Config")]);
        assert_eq!(table.canonicalize("Config"), "App.Config");
        assert_eq!(table.len(), AliasTable::builtin().len());
    }
}

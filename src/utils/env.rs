//! Environment variable helpers

use std::path::PathBuf;

/// Environment variable as Option (unset or empty → `None`)
pub fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Environment variable as a path
pub fn env_path(key: &str) -> Option<PathBuf> {
    env_opt(key).map(PathBuf::from)
}

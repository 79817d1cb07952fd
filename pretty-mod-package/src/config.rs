//! Package acquisition configuration

use crate::{PackageError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Settings for registry access and the download cache
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackageConfig {
    /// Base URL of the JSON API (`{index_url}/{name}/json`)
    #[serde(default = "default_index_url")]
    pub index_url: String,

    /// Where extracted distributions are kept
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// HTTP timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Never touch the network; only cached distributions are used
    #[serde(default)]
    pub offline: bool,

    /// Whether to verify published sha256 digests
    #[serde(default = "default_verify_checksums")]
    pub verify_checksums: bool,
}

fn default_index_url() -> String {
    "https://pypi.org/pypi".to_string()
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("pretty-mod")
        .join("packages")
}

fn default_timeout() -> u64 {
    30
}

fn default_verify_checksums() -> bool {
    true
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            index_url: default_index_url(),
            cache_dir: default_cache_dir(),
            timeout: default_timeout(),
            offline: false,
            verify_checksums: default_verify_checksums(),
        }
    }
}

impl PackageConfig {
    /// Apply `PRETTY_MOD_*` overrides read through `get`
    pub fn apply_overrides(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(url) = get("PRETTY_MOD_INDEX_URL").filter(|s| !s.is_empty()) {
            self.index_url = url.trim_end_matches('/').to_string();
        }
        if let Some(dir) = get("PRETTY_MOD_CACHE_DIR").filter(|s| !s.is_empty()) {
            self.cache_dir = PathBuf::from(dir);
        }
        if let Some(flag) = get("PRETTY_MOD_OFFLINE") {
            self.offline = is_truthy(&flag);
        }
        if let Some(timeout) = get("PRETTY_MOD_TIMEOUT").and_then(|s| s.trim().parse().ok()) {
            self.timeout = timeout;
        }
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.max(1))
    }

    /// Create the cache directory if needed
    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.cache_dir)
            .map_err(|e| PackageError::io(&self.cache_dir, e))
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

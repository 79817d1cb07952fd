//! Configuration handling for the pretty-mod CLI

use crate::display::DisplayConfig;
use anyhow::{Context, Result};
use pretty_mod_modules::ModuleConfig;
use pretty_mod_package::PackageConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub package: PackageConfig,

    #[serde(default)]
    pub modules: ModuleConfig,

    #[serde(default)]
    pub display: DisplayConfig,
}

impl Config {
    /// Apply `PRETTY_MOD_*` and `NO_COLOR` overrides read through `get`
    pub fn apply_overrides(&mut self, get: impl Fn(&str) -> Option<String>) {
        self.package.apply_overrides(&get);
        self.modules.apply_overrides(&get);
        self.display.apply_overrides(&get);
    }

    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }
}

/// `{config_dir}/pretty-mod/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("pretty-mod").join("config.toml"))
}

/// Load configuration from file or use defaults
pub fn load_config(path: Option<PathBuf>) -> Result<Config> {
    match path {
        Some(path) => read_config(&path),
        None => match default_config_path() {
            Some(default_path) if default_path.exists() => read_config(&default_path),
            _ => Ok(Config::default()),
        },
    }
}

fn read_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("invalid config file {}", path.display()))?;
    Ok(config)
}

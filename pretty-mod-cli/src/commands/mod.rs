//! Command implementations

pub mod sig;
pub mod tree;

use crate::config::Config;
use crate::display::DisplayConfig;
use anyhow::Result;
use pretty_mod_core::{TracingWarnings, WarningSink};
use pretty_mod_modules::ModuleEnvironment;
use pretty_mod_package::PackageAcquirer;
use std::sync::Arc;

/// What every command needs: the module environment and display settings
pub struct Session {
    pub env: Arc<ModuleEnvironment>,
    pub display: DisplayConfig,
}

impl Session {
    /// Wire up the environment described by `config`; `quiet` demotes
    /// warnings to debug-level log records
    pub fn new(config: Config, quiet: bool) -> Result<Self> {
        let warnings: Arc<dyn WarningSink> = Arc::new(TracingWarnings::new(quiet));
        let acquirer = PackageAcquirer::from_config(config.package, warnings.clone())?;
        let env = ModuleEnvironment::from_config(config.modules, warnings)
            .with_acquirer(Arc::new(acquirer));
        Ok(Self {
            env: Arc::new(env),
            display: config.display,
        })
    }
}

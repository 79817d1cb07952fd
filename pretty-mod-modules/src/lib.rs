//! pretty-mod module system
//!
//! This crate turns an import path into an explored module tree or a
//! resolved signature:
//! - Module location on a search path, with package acquisition as fallback
//! - Parsed-source caching
//! - Static and dynamic (interpreter) surface strategies
//! - Signature resolution through ordered indirection rules

pub mod cache;
pub mod environment;
pub mod error;
pub mod explorer;
pub mod introspect;
pub mod loader;
pub mod rules;
pub mod signature;
pub mod stdlib;
pub mod strategy;

pub use cache::ModuleCache;
pub use environment::{ModuleEnvironment, SearchScope};
pub use error::{ErrorKind, ModuleError, Result};
pub use explorer::ModuleTreeExplorer;
pub use introspect::{Introspector, LiveSurface, NoInterpreter, ObjectFacts, PythonInterpreter};
pub use loader::{LocationKind, ModuleLocation, ModuleLocator};
pub use rules::{IndirectionRule, Symbol, Target};
pub use signature::{Resolution, SignatureResolver};
pub use strategy::{static_then_dynamic, DynamicStrategy, StaticStrategy, Surface, SurfaceStrategy};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Module system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Extra directories searched before the interpreter's path
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,

    /// Interpreter used for `sys.path` and dynamic introspection
    #[serde(default = "default_python")]
    pub python: String,

    /// Whether to search the interpreter's `sys.path`
    #[serde(default = "default_true")]
    pub use_interpreter_path: bool,

    /// Whether to import modules that have no source text
    #[serde(default = "default_true")]
    pub dynamic_fallback: bool,

    /// Whether to cache parsed modules
    #[serde(default = "default_true")]
    pub enable_cache: bool,

    /// Maximum number of parsed modules kept
    #[serde(default = "default_max_cache_size")]
    pub max_cache_size: usize,

    /// Seconds an interpreter request may run before it is killed
    #[serde(default = "default_introspection_timeout")]
    pub introspection_timeout: u64,
}

fn default_python() -> String {
    "python3".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_cache_size() -> usize {
    512
}

fn default_introspection_timeout() -> u64 {
    introspect::DEFAULT_TIMEOUT.as_secs()
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            search_paths: Vec::new(),
            python: default_python(),
            use_interpreter_path: true,
            dynamic_fallback: true,
            enable_cache: true,
            max_cache_size: default_max_cache_size(),
            introspection_timeout: default_introspection_timeout(),
        }
    }
}

impl ModuleConfig {
    /// Apply `PRETTY_MOD_PYTHON` and `PRETTY_MOD_INTROSPECT_TIMEOUT` read through `get`
    pub fn apply_overrides(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(python) = get("PRETTY_MOD_PYTHON").filter(|s| !s.trim().is_empty()) {
            self.python = python;
        }
        if let Some(seconds) = get("PRETTY_MOD_INTROSPECT_TIMEOUT").and_then(|s| s.trim().parse().ok()) {
            self.introspection_timeout = seconds;
        }
    }

    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }
}

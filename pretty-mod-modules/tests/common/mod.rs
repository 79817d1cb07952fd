//! Fixture packages on disk

#![allow(dead_code)]

use pretty_mod_core::CollectingWarnings;
use pretty_mod_modules::{ModuleConfig, ModuleEnvironment, NoInterpreter};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// A temporary search path root
pub struct Fixture {
    pub dir: TempDir,
    pub warnings: Arc<CollectingWarnings>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            warnings: Arc::new(CollectingWarnings::new()),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write `content` to `relative`, creating parent directories
    pub fn file(self, relative: &str, content: &str) -> Self {
        let path = self.dir.path().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
        self
    }

    /// Static-only environment searching just the fixture root
    pub fn environment(&self) -> ModuleEnvironment {
        let config = ModuleConfig {
            search_paths: vec![self.root().to_path_buf()],
            use_interpreter_path: false,
            dynamic_fallback: false,
            ..ModuleConfig::default()
        };
        ModuleEnvironment::new(config, Arc::new(NoInterpreter), self.warnings.clone())
    }
}

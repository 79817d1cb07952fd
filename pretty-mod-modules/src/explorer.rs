//! Module tree exploration

use crate::environment::{ModuleEnvironment, SearchScope};
use crate::strategy::{static_then_dynamic, SurfaceStrategy};
use crate::{ModuleError, Result};
use pretty_mod_core::{DiscoveryMode, ImportSpecifier, ModuleNode, SyntaxError, Warning};
use std::sync::Arc;
use tracing::debug;

/// Builds the tree of a module and its submodules up to a depth
pub struct ModuleTreeExplorer {
    env: Arc<ModuleEnvironment>,
    strategies: Vec<Box<dyn SurfaceStrategy>>,
}

impl ModuleTreeExplorer {
    /// Create an explorer using the static strategy, then the dynamic one
    pub fn new(env: Arc<ModuleEnvironment>) -> Self {
        let strategies = static_then_dynamic(
            env.cache().clone(),
            env.introspector().clone(),
            env.dynamic_enabled(),
        );
        Self { env, strategies }
    }

    /// Create an explorer with an explicit strategy list, tried in order
    pub fn with_strategies(env: Arc<ModuleEnvironment>, strategies: Vec<Box<dyn SurfaceStrategy>>) -> Self {
        Self { env, strategies }
    }

    /// Parse `raw` and explore it
    pub fn explore_str(&self, raw: &str, max_depth: usize) -> Result<ModuleNode> {
        let spec = ImportSpecifier::parse(raw)?;
        self.explore(&spec, max_depth)
    }

    /// Explore the module named by `spec`
    ///
    /// Depth 0 is the root; children are explored while `depth < max_depth`.
    /// Submodules that fail are reported as warnings and left out.
    pub fn explore(&self, spec: &ImportSpecifier, max_depth: usize) -> Result<ModuleNode> {
        if spec.has_attribute() {
            return Err(SyntaxError::AttributeNotAllowed {
                input: spec.to_string(),
            }
            .into());
        }

        let scope = self.env.scope_for(spec)?;
        let module = spec.module_path();
        debug!("exploring {} to depth {}", module, max_depth);

        let root = self.explore_module(&module, 0, max_depth, &scope)?;
        if root.mode == DiscoveryMode::Dynamic {
            self.env
                .warnings()
                .emit(Warning::DynamicFallback { module: module.clone() });
        }
        Ok(root)
    }

    fn explore_module(
        &self,
        module: &str,
        depth: usize,
        max_depth: usize,
        scope: &SearchScope,
    ) -> Result<ModuleNode> {
        let location = scope.locate(module)?;

        let mut discovered = None;
        for strategy in &self.strategies {
            if let Some(surface) = strategy.discover(module, location.as_ref(), scope)? {
                debug!("{} discovered by the {} strategy", module, strategy.name());
                discovered = Some(surface);
                break;
            }
        }
        let surface = discovered.ok_or_else(|| ModuleError::ModuleNotFound {
            module: module.to_string(),
        })?;

        let mut node = ModuleNode::new(module, surface.filesystem_path, surface.api, depth, surface.mode);
        if depth >= max_depth {
            return Ok(node);
        }

        for child in surface.submodules {
            let child_module = format!("{}.{}", module, child);
            match self.explore_module(&child_module, depth + 1, max_depth, scope) {
                Ok(child_node) => {
                    node.submodules.insert(child, child_node);
                }
                Err(e) => self.env.warnings().emit(Warning::SubmoduleSkipped {
                    module: child_module,
                    reason: e.to_string(),
                }),
            }
        }
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspect::NoInterpreter;
    use crate::ModuleConfig;
    use pretty_mod_core::CollectingWarnings;
    use std::fs;

    fn explorer(root: &std::path::Path) -> (ModuleTreeExplorer, Arc<CollectingWarnings>) {
        let warnings = Arc::new(CollectingWarnings::new());
        let config = ModuleConfig {
            search_paths: vec![root.to_path_buf()],
            use_interpreter_path: false,
            dynamic_fallback: false,
            ..ModuleConfig::default()
        };
        let env = ModuleEnvironment::new(config, Arc::new(NoInterpreter), warnings.clone());
        (ModuleTreeExplorer::new(Arc::new(env)), warnings)
    }

    #[test]
    fn test_attribute_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (explorer, _) = explorer(dir.path());
        let err = explorer.explore_str("json:loads", 1).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Syntax);
    }

    #[test]
    fn test_missing_root_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let (explorer, _) = explorer(dir.path());
        let err = explorer.explore_str("nowhere_to_be_found", 1).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::ModuleNotFound);
        assert_eq!(err.to_string(), "No module named 'nowhere_to_be_found'");
    }

    #[test]
    fn test_broken_submodule_becomes_warning() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("pkg")).unwrap();
        fs::write(dir.path().join("pkg/__init__.py"), "").unwrap();
        fs::write(dir.path().join("pkg/good.py"), "def ok(): pass\n").unwrap();
        fs::write(dir.path().join("pkg/bad.py"), "def broken(:\n").unwrap();

        let (explorer, warnings) = explorer(dir.path());
        let tree = explorer.explore_str("pkg", 1).unwrap();
        assert!(tree.submodules.contains_key("good"));
        assert!(!tree.submodules.contains_key("bad"));

        let warnings = warnings.take();
        assert_eq!(warnings.len(), 1);
        assert!(matches!(&warnings[0], Warning::SubmoduleSkipped { module, .. } if module == "pkg.bad"));
    }
}

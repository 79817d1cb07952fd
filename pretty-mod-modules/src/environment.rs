//! Shared state for exploration and signature resolution

use crate::cache::ModuleCache;
use crate::introspect::{Introspector, NoInterpreter, PythonInterpreter};
use crate::loader::{ModuleLocation, ModuleLocator};
use crate::stdlib::is_stdlib_module;
use crate::{ModuleConfig, Result};
use pretty_mod_core::{AcquisitionSource, ImportSpecifier, WarningSink};
use pretty_mod_package::{ErrorKind as PackageKind, PackageAcquirer, PackageError};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Where modules are looked up for one request
///
/// A scope is the environment's search path, plus the import root of a
/// package acquired for the request.
#[derive(Debug, Clone)]
pub struct SearchScope {
    pub locator: ModuleLocator,
    /// Directories the interpreter must see in addition to its own path
    pub extra_paths: Vec<PathBuf>,
}

impl SearchScope {
    pub fn new(locator: ModuleLocator, extra_paths: Vec<PathBuf>) -> Self {
        Self {
            locator,
            extra_paths,
        }
    }

    /// A scope searching `root` before everything else
    pub fn with_root(&self, root: PathBuf) -> Self {
        let mut extra_paths = vec![root.clone()];
        extra_paths.extend(self.extra_paths.iter().filter(|p| **p != root).cloned());
        Self {
            locator: self.locator.with_root(root),
            extra_paths,
        }
    }

    pub fn locate(&self, module: &str) -> Result<Option<ModuleLocation>> {
        self.locator.locate(module)
    }
}

/// Everything a request needs: search path, caches, interpreter and acquirer
pub struct ModuleEnvironment {
    config: ModuleConfig,
    locator: ModuleLocator,
    cache: ModuleCache,
    introspector: Arc<dyn Introspector>,
    acquirer: Option<Arc<PackageAcquirer>>,
    warnings: Arc<dyn WarningSink>,
}

impl ModuleEnvironment {
    /// Create an environment; the search path is read from `introspector`
    pub fn new(
        config: ModuleConfig,
        introspector: Arc<dyn Introspector>,
        warnings: Arc<dyn WarningSink>,
    ) -> Self {
        let locator = ModuleLocator::from_config(&config, introspector.as_ref());
        let cache_size = if config.enable_cache {
            config.max_cache_size
        } else {
            0
        };
        Self {
            cache: ModuleCache::new(cache_size),
            locator,
            config,
            introspector,
            acquirer: None,
            warnings,
        }
    }

    /// Environment backed by the configured interpreter
    pub fn from_config(config: ModuleConfig, warnings: Arc<dyn WarningSink>) -> Self {
        let introspector: Arc<dyn Introspector> =
            if config.dynamic_fallback || config.use_interpreter_path {
                Arc::new(
                    PythonInterpreter::new(config.python.clone())
                        .with_timeout(Duration::from_secs(config.introspection_timeout)),
                )
            } else {
                Arc::new(NoInterpreter)
            };
        Self::new(config, introspector, warnings)
    }

    /// Replace the search path
    pub fn with_locator(mut self, locator: ModuleLocator) -> Self {
        self.locator = locator;
        self
    }

    /// Allow missing packages to be fetched through `acquirer`
    pub fn with_acquirer(mut self, acquirer: Arc<PackageAcquirer>) -> Self {
        self.acquirer = Some(acquirer);
        self
    }

    pub fn config(&self) -> &ModuleConfig {
        &self.config
    }

    pub fn locator(&self) -> &ModuleLocator {
        &self.locator
    }

    pub fn cache(&self) -> &ModuleCache {
        &self.cache
    }

    pub fn introspector(&self) -> &Arc<dyn Introspector> {
        &self.introspector
    }

    /// Whether modules without source may be imported to inspect them
    pub fn dynamic_enabled(&self) -> bool {
        self.config.dynamic_fallback
    }

    pub fn acquirer(&self) -> Option<&Arc<PackageAcquirer>> {
        self.acquirer.as_ref()
    }

    pub fn warnings(&self) -> &Arc<dyn WarningSink> {
        &self.warnings
    }

    /// The plain search path, without acquisition
    pub fn scope(&self) -> SearchScope {
        SearchScope::new(self.locator.clone(), self.config.search_paths.clone())
    }

    /// The search scope in which `spec` should be looked up
    ///
    /// A package is acquired when a version is requested or when its
    /// top-level module is not on the search path. Standard library modules
    /// are never acquired. A distribution that the registry does not know is
    /// not an error here when no version was asked for, and neither is an
    /// offline cache miss; the lookup that follows reports the missing
    /// module instead.
    pub fn scope_for(&self, spec: &ImportSpecifier) -> Result<SearchScope> {
        let base = self.scope();
        let top = spec.top_level_module();

        if is_stdlib_module(&top) {
            if spec.version_constraint.is_some() {
                debug!("ignoring version constraint on standard library module {}", top);
            }
            return Ok(base);
        }

        let constraint = spec.version_constraint.as_deref();
        if constraint.is_none() && base.locate(&top)?.is_some() {
            return Ok(base);
        }

        let Some(acquirer) = &self.acquirer else {
            debug!("{} is not on the search path and acquisition is disabled", top);
            return Ok(base);
        };

        match acquirer.acquire_providing(spec.distribution(), constraint, &top, &base.locator) {
            Ok(acquired) => match acquired.source {
                AcquisitionSource::AlreadyPresent => Ok(base),
                AcquisitionSource::Downloaded => {
                    debug!(
                        "{} {} available at {}",
                        acquired.name,
                        acquired.resolved_version.as_deref().unwrap_or("?"),
                        acquired.import_root.display()
                    );
                    Ok(base.with_root(acquired.import_root))
                }
            },
            Err(e)
                if constraint.is_none()
                    && (e.kind() == PackageKind::NotFound
                        || matches!(e, PackageError::Offline { .. })) =>
            {
                debug!("no distribution provides {}: {}", top, e);
                Ok(base)
            }
            Err(e) => Err(e.into()),
        }
    }
}

//! Parsed-module caching

use crate::{ModuleError, Result};
use parking_lot::RwLock;
use pretty_mod_parser::{parse_module, ParsedModule};
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, trace};

/// Thread-safe LRU cache of parsed source files.
/// Entries remember the file's modification time; `load` reparses a file
/// whose mtime has changed since it was cached.
#[derive(Debug, Clone)]
pub struct ModuleCache {
    inner: Arc<RwLock<ModuleCacheInner>>,
}

#[derive(Debug)]
struct CachedModule {
    /// `None` when inserted directly or the filesystem reports no mtime
    modified: Option<SystemTime>,
    module: Arc<ParsedModule>,
}

#[derive(Debug)]
struct ModuleCacheInner {
    modules: FxHashMap<PathBuf, CachedModule>,
    max_size: usize,
    access_order: Vec<PathBuf>,
}

impl ModuleCache {
    /// Create a cache holding at most `max_size` modules (0 disables caching)
    pub fn new(max_size: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ModuleCacheInner {
                modules: FxHashMap::default(),
                max_size,
                access_order: Vec::new(),
            })),
        }
    }

    /// Get a parsed module from the cache, whatever its age
    pub fn get(&self, path: &Path) -> Option<Arc<ParsedModule>> {
        self.lookup(path, None)
    }

    /// Get a cached entry; with `modified` set, only one parsed at that mtime
    fn lookup(&self, path: &Path, modified: Option<SystemTime>) -> Option<Arc<ParsedModule>> {
        let mut cache = self.inner.write();

        let module = match cache.modules.get(path) {
            Some(entry) if modified.is_none() || entry.modified == modified => entry.module.clone(),
            Some(_) => {
                trace!("Stale cache entry for module source: {}", path.display());
                return None;
            }
            None => {
                trace!("Cache miss for module source: {}", path.display());
                return None;
            }
        };
        cache.access_order.retain(|p| p != path);
        cache.access_order.push(path.to_path_buf());
        trace!("Cache hit for module source: {}", path.display());
        Some(module)
    }

    /// Insert a parsed module, evicting the least recently used entry when full
    pub fn insert(&self, path: PathBuf, module: ParsedModule) -> Arc<ParsedModule> {
        self.store(path, None, module)
    }

    fn store(&self, path: PathBuf, modified: Option<SystemTime>, module: ParsedModule) -> Arc<ParsedModule> {
        let module = Arc::new(module);
        let mut cache = self.inner.write();
        if cache.max_size == 0 {
            return module;
        }
        match cache.modules.get(&path).map(|e| (e.modified == modified, e.module.clone())) {
            // a concurrent load of the same version got there first
            Some((true, existing)) => return existing,
            Some((false, _)) => {
                cache.access_order.retain(|p| p != &path);
            }
            None => {
                if cache.modules.len() >= cache.max_size && !cache.access_order.is_empty() {
                    let oldest = cache.access_order.remove(0);
                    cache.modules.remove(&oldest);
                    debug!("Evicted module source from cache: {}", oldest.display());
                }
            }
        }

        cache.modules.insert(
            path.clone(),
            CachedModule {
                modified,
                module: module.clone(),
            },
        );
        cache.access_order.push(path);
        module
    }

    /// Read and parse `path`, going through the cache
    pub fn load(&self, path: &Path) -> Result<Arc<ParsedModule>> {
        let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok();
        if modified.is_some() {
            if let Some(module) = self.lookup(path, modified) {
                return Ok(module);
            }
        } else if let Some(module) = self.get(path) {
            return Ok(module);
        }

        let source = std::fs::read(path).map_err(|e| ModuleError::io(path, e))?;
        let source = String::from_utf8_lossy(&source);
        let parsed = parse_module(&source, &path.display().to_string()).map_err(|error| {
            ModuleError::Parse {
                path: path.to_path_buf(),
                error,
            }
        })?;
        Ok(self.store(path.to_path_buf(), modified, parsed))
    }

    pub fn clear(&self) {
        let mut cache = self.inner.write();
        cache.modules.clear();
        cache.access_order.clear();
        debug!("Cleared module cache");
    }

    pub fn size(&self) -> usize {
        self.inner.read().modules.len()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.inner.read().modules.contains_key(path)
    }
}

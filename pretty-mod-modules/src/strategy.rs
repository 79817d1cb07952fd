//! Surface discovery strategies
//!
//! Static parsing is used whenever a module has source text. Names pulled
//! in by `from m import *` are merged from the parsed source of `m`. When
//! that source cannot be read, or the module has no source at all
//! (extension modules, builtins), it is imported in an interpreter instead.

use crate::cache::ModuleCache;
use crate::environment::SearchScope;
use crate::introspect::{Introspector, LiveSurface};
use crate::loader::{LocationKind, ModuleLocation};
use crate::{ModuleError, Result};
use pretty_mod_core::{ApiSurface, DiscoveryMode};
use pretty_mod_parser::ImportRef;
use rustc_hash::FxHashSet;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// What a strategy learned about one module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    pub api: ApiSurface,
    /// Submodule names, sorted
    pub submodules: Vec<String>,
    pub filesystem_path: Option<PathBuf>,
    pub mode: DiscoveryMode,
}

/// A way of discovering a module's surface
pub trait SurfaceStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Ok(None)` when this strategy does not apply to the module
    fn discover(
        &self,
        module: &str,
        location: Option<&ModuleLocation>,
        scope: &SearchScope,
    ) -> Result<Option<Surface>>;
}

/// Parses source text or stubs
pub struct StaticStrategy {
    cache: ModuleCache,
    /// Imports modules whose star imports cannot be read statically
    fallback: Option<Arc<dyn Introspector>>,
}

impl StaticStrategy {
    pub fn new(cache: ModuleCache) -> Self {
        Self { cache, fallback: None }
    }

    pub fn with_fallback(mut self, introspector: Arc<dyn Introspector>) -> Self {
        self.fallback = Some(introspector);
        self
    }

    /// Merge the names bound by `imports` into `api`.
    /// Returns false when some star-imported module could not be parsed.
    fn merge_star_imports(
        &self,
        importer: &str,
        importer_is_package: bool,
        imports: &[ImportRef],
        scope: &SearchScope,
        api: &mut ApiSurface,
        seen: &mut FxHashSet<String>,
    ) -> bool {
        let mut complete = true;
        for import in imports {
            let Some(target) = import.resolve(importer, importer_is_package) else {
                debug!("{}: star import beyond the top-level package", importer);
                complete = false;
                continue;
            };
            if !seen.insert(target.clone()) {
                continue;
            }

            let Some(location) = scope.locate(&target).ok().flatten() else {
                debug!("{}: cannot locate star-imported {}", importer, target);
                complete = false;
                continue;
            };
            if location.kind == LocationKind::Namespace {
                continue;
            }
            let Some(file) = location.source_file() else {
                debug!("{}: star-imported {} has no source", importer, target);
                complete = false;
                continue;
            };
            let parsed = match self.cache.load(file) {
                Ok(parsed) => parsed,
                Err(e) => {
                    debug!("{}: cannot parse star-imported {}: {}", importer, target, e);
                    complete = false;
                    continue;
                }
            };

            let mut reexported = parsed.surface.clone();
            complete &= self.merge_star_imports(
                &target,
                location.is_package(),
                &parsed.star_imports,
                scope,
                &mut reexported,
                seen,
            );
            merge_star_names(api, &reexported);
        }
        complete
    }

    fn import_instead(&self, module: &str, location: &ModuleLocation, scope: &SearchScope) -> Option<Surface> {
        let introspector = self.fallback.as_ref()?;
        match introspector.module_surface(module, &scope.extra_paths) {
            Ok(live) => Some(Surface {
                api: live_api(live),
                submodules: location.submodules(),
                filesystem_path: Some(location.filesystem_path()),
                mode: DiscoveryMode::Dynamic,
            }),
            Err(e) => {
                debug!("{} could not be imported, keeping the parsed surface: {}", module, e);
                None
            }
        }
    }
}

/// Add the names `from m import *` binds: `m.__all__` when declared,
/// otherwise every name without a leading underscore. Names the importer
/// defines itself are left alone.
fn merge_star_names(api: &mut ApiSurface, source: &ApiSurface) {
    let visible = |name: &str| match &source.exported {
        Some(exported) => exported.contains(name),
        None => !name.starts_with('_'),
    };
    let defined: BTreeSet<String> = api
        .functions
        .iter()
        .chain(&api.classes)
        .chain(&api.constants)
        .cloned()
        .collect();

    let categories = [
        (&mut api.functions, &source.functions),
        (&mut api.classes, &source.classes),
        (&mut api.constants, &source.constants),
    ];
    for (into, from) in categories {
        into.extend(
            from.iter()
                .filter(|name| visible(name.as_str()) && !defined.contains(name.as_str()))
                .cloned(),
        );
    }
}

impl SurfaceStrategy for StaticStrategy {
    fn name(&self) -> &'static str {
        "static"
    }

    fn discover(
        &self,
        module: &str,
        location: Option<&ModuleLocation>,
        scope: &SearchScope,
    ) -> Result<Option<Surface>> {
        let Some(location) = location else {
            return Ok(None);
        };

        let api = match location.kind {
            LocationKind::Source | LocationKind::Stub => {
                let Some(file) = location.source_file() else {
                    return Ok(None);
                };
                let parsed = self.cache.load(file)?;
                let mut api = parsed.surface.clone();
                let mut seen = FxHashSet::default();
                seen.insert(module.to_string());
                let complete = self.merge_star_imports(
                    module,
                    location.is_package(),
                    &parsed.star_imports,
                    scope,
                    &mut api,
                    &mut seen,
                );
                if !complete {
                    if let Some(surface) = self.import_instead(module, location, scope) {
                        return Ok(Some(surface));
                    }
                }
                api
            }
            // only the directory listing is known
            LocationKind::Namespace => ApiSurface::new(),
            LocationKind::Compiled => return Ok(None),
        };

        debug!("parsed {} statically", module);
        Ok(Some(Surface {
            api,
            submodules: location.submodules(),
            filesystem_path: Some(location.filesystem_path()),
            mode: DiscoveryMode::Static,
        }))
    }
}

/// Imports the module in a Python interpreter
pub struct DynamicStrategy {
    introspector: Arc<dyn Introspector>,
}

impl DynamicStrategy {
    pub fn new(introspector: Arc<dyn Introspector>) -> Self {
        Self { introspector }
    }
}

impl SurfaceStrategy for DynamicStrategy {
    fn name(&self) -> &'static str {
        "dynamic"
    }

    fn discover(
        &self,
        module: &str,
        location: Option<&ModuleLocation>,
        scope: &SearchScope,
    ) -> Result<Option<Surface>> {
        if location.map_or(false, |l| l.kind != LocationKind::Compiled) {
            return Ok(None);
        }

        let live = match self.introspector.module_surface(module, &scope.extra_paths) {
            Ok(live) => live,
            Err(ModuleError::ModuleNotFound { .. }) => return Ok(None),
            Err(e @ ModuleError::Introspection { .. }) if location.is_none() => {
                debug!("{} could not be imported: {}", module, e);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let filesystem_path = location
            .map(ModuleLocation::filesystem_path)
            .or_else(|| live.file.as_ref().map(PathBuf::from));
        let submodules = match location {
            Some(location) if location.is_package() => location.submodules(),
            _ => live.submodules.clone(),
        };
        Ok(Some(Surface {
            api: live_api(live),
            submodules,
            filesystem_path,
            mode: DiscoveryMode::Dynamic,
        }))
    }
}

fn live_api(live: LiveSurface) -> ApiSurface {
    ApiSurface {
        functions: live.functions.into_iter().collect(),
        classes: live.classes.into_iter().collect(),
        constants: live.constants.into_iter().collect(),
        exported: live.exported.map(|names| names.into_iter().collect()),
    }
}

/// Static parsing first, then the interpreter when `dynamic` is set
pub fn static_then_dynamic(
    cache: ModuleCache,
    introspector: Arc<dyn Introspector>,
    dynamic: bool,
) -> Vec<Box<dyn SurfaceStrategy>> {
    if !dynamic {
        return vec![Box::new(StaticStrategy::new(cache))];
    }
    vec![
        Box::new(StaticStrategy::new(cache).with_fallback(introspector.clone())),
        Box::new(DynamicStrategy::new(introspector)),
    ]
}

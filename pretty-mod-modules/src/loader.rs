//! Locating modules on a search path

use crate::introspect::Introspector;
use crate::{ModuleConfig, ModuleError, Result};
use pretty_mod_package::LocalResolver;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{trace, warn};

/// What kind of file backs a located module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationKind {
    /// `.py` source, or a package's `__init__.py`
    Source,
    /// `.pyi` stub without a `.py` next to it
    Stub,
    /// Extension module (`.so` / `.pyd`)
    Compiled,
    /// Directory without `__init__`
    Namespace,
}

/// A module found on the search path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleLocation {
    /// Dotted module name
    pub name: String,
    /// Search path entry the module was found under
    pub root: PathBuf,
    pub kind: LocationKind,
    /// Backing file; `None` for namespace packages
    pub file: Option<PathBuf>,
    /// Package directory for packages
    pub package_dir: Option<PathBuf>,
}

impl ModuleLocation {
    pub fn is_package(&self) -> bool {
        self.package_dir.is_some()
    }

    /// File with parseable text (source or stub)
    pub fn source_file(&self) -> Option<&Path> {
        match self.kind {
            LocationKind::Source | LocationKind::Stub => self.file.as_deref(),
            LocationKind::Compiled | LocationKind::Namespace => None,
        }
    }

    /// Package directory for packages, the module file otherwise
    pub fn filesystem_path(&self) -> PathBuf {
        self.package_dir
            .clone()
            .or_else(|| self.file.clone())
            .unwrap_or_else(|| self.root.clone())
    }

    /// Names of the submodules in a package directory, sorted
    pub fn submodules(&self) -> Vec<String> {
        let Some(dir) = &self.package_dir else {
            return Vec::new();
        };
        let Ok(entries) = fs::read_dir(dir) else {
            return Vec::new();
        };

        let mut names = BTreeSet::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            let name = if path.is_dir() {
                let is_package = path.join("__init__.py").is_file()
                    || path.join("__init__.pyi").is_file()
                    || compiled_module(&path, "__init__").is_some();
                is_package.then_some(file_name)
            } else if let Some(stem) = file_name
                .strip_suffix(".py")
                .or_else(|| file_name.strip_suffix(".pyi"))
            {
                Some(stem)
            } else if file_name.ends_with(".so") || file_name.ends_with(".pyd") {
                file_name.split('.').next()
            } else {
                None
            };

            if let Some(name) = name {
                if !matches!(name, "__init__" | "__main__" | "__pycache__") && is_identifier(name) {
                    names.insert(name.to_string());
                }
            }
        }
        names.into_iter().collect()
    }
}

/// Finds modules on an ordered list of search path entries
#[derive(Debug, Clone, Default)]
pub struct ModuleLocator {
    roots: Vec<PathBuf>,
}

impl ModuleLocator {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        let mut seen = BTreeSet::new();
        let roots = roots
            .into_iter()
            .filter(|root| seen.insert(root.clone()))
            .collect();
        Self { roots }
    }

    /// Configured search paths followed by the interpreter's `sys.path`
    pub fn from_config(config: &ModuleConfig, introspector: &dyn Introspector) -> Self {
        let mut roots = config.search_paths.clone();
        if config.use_interpreter_path {
            match introspector.sys_path() {
                Ok(paths) => roots.extend(paths.into_iter().filter(|p| p.is_dir())),
                Err(e) => warn!("could not read the interpreter's search path: {}", e),
            }
        }
        if roots.is_empty() {
            roots.push(PathBuf::from("."));
        }
        Self::new(roots)
    }

    /// A locator that searches `root` first
    pub fn with_root(&self, root: PathBuf) -> Self {
        let mut roots = vec![root];
        roots.extend(self.roots.iter().cloned());
        Self::new(roots)
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Find `module`; `Ok(None)` when it is not on the search path
    pub fn locate(&self, module: &str) -> Result<Option<ModuleLocation>> {
        let segments = validate_module_ref(module)?;

        let mut namespace = None;
        for root in &self.roots {
            match locate_in(root, module, &segments) {
                Some(location) if location.kind == LocationKind::Namespace => {
                    namespace.get_or_insert(location);
                }
                Some(location) => {
                    trace!("Found module {} at {:?}", module, location.file);
                    return Ok(Some(location));
                }
                None => {}
            }
        }
        Ok(namespace)
    }
}

impl LocalResolver for ModuleLocator {
    fn resolve_local(&self, module: &str) -> Option<(PathBuf, PathBuf)> {
        let location = self.locate(module).ok().flatten()?;
        Some((location.filesystem_path(), location.root))
    }
}

/// Reject anything that is not a dotted sequence of identifiers
fn validate_module_ref(module: &str) -> Result<Vec<&str>> {
    if module.is_empty() {
        return Err(ModuleError::InvalidPath {
            path: "<empty>".to_string(),
        });
    }
    let segments: Vec<&str> = module.split('.').collect();
    if !segments.iter().all(|s| is_identifier(s)) {
        warn!("Rejected module reference: {:?}", module);
        return Err(ModuleError::InvalidPath {
            path: module.to_string(),
        });
    }
    Ok(segments)
}

pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_alphabetic() => chars.all(|c| c == '_' || c.is_alphanumeric()),
        _ => false,
    }
}

fn locate_in(root: &Path, module: &str, segments: &[&str]) -> Option<ModuleLocation> {
    let (last, parents) = segments.split_last()?;
    let mut dir = root.to_path_buf();
    for segment in parents {
        dir = dir.join(segment);
        if !dir.is_dir() {
            return None;
        }
    }

    let location = |kind: LocationKind, file: Option<PathBuf>, package_dir: Option<PathBuf>| ModuleLocation {
        name: module.to_string(),
        root: root.to_path_buf(),
        kind,
        file,
        package_dir,
    };

    let package = dir.join(last);
    if package.is_dir() {
        let init = package.join("__init__.py");
        if init.is_file() {
            return Some(location(LocationKind::Source, Some(init), Some(package)));
        }
        let stub = package.join("__init__.pyi");
        if stub.is_file() {
            return Some(location(LocationKind::Stub, Some(stub), Some(package)));
        }
        if let Some(compiled) = compiled_module(&package, "__init__") {
            return Some(location(LocationKind::Compiled, Some(compiled), Some(package)));
        }
    }

    let source = dir.join(format!("{}.py", last));
    if source.is_file() {
        return Some(location(LocationKind::Source, Some(source), None));
    }
    let stub = dir.join(format!("{}.pyi", last));
    if stub.is_file() {
        return Some(location(LocationKind::Stub, Some(stub), None));
    }
    if let Some(compiled) = compiled_module(&dir, last) {
        return Some(location(LocationKind::Compiled, Some(compiled), None));
    }

    if package.is_dir() {
        return Some(location(LocationKind::Namespace, None, Some(package)));
    }
    None
}

/// `name.so`, `name.pyd`, or a tagged `name.cpython-311-x86_64-linux-gnu.so`
fn compiled_module(dir: &Path, name: &str) -> Option<PathBuf> {
    let prefix = format!("{}.", name);
    fs::read_dir(dir)
        .ok()?
        .flatten()
        .map(|entry| entry.path())
        .find(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map_or(false, |n| {
                    n.starts_with(&prefix) && (n.ends_with(".so") || n.ends_with(".pyd"))
                })
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_validate_module_ref() {
        assert!(validate_module_ref("a.b_c.d1").is_ok());
        assert!(validate_module_ref("").is_err());
        assert!(validate_module_ref("a..b").is_err());
        assert!(validate_module_ref("../etc").is_err());
        assert!(validate_module_ref("a/b").is_err());
        assert!(validate_module_ref("1abc").is_err());
    }

    #[test]
    fn test_locate_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("pkg/__init__.py"));
        touch(&root.join("pkg/mod.py"));
        touch(&root.join("pkg/_fast.cpython-311-x86_64-linux-gnu.so"));
        touch(&root.join("pkg/typed.pyi"));
        touch(&root.join("ns/inner.py"));
        touch(&root.join("ext/__init__.cpython-311-x86_64-linux-gnu.so"));

        let locator = ModuleLocator::new(vec![root.to_path_buf()]);

        let pkg = locator.locate("pkg").unwrap().unwrap();
        assert_eq!(pkg.kind, LocationKind::Source);
        assert!(pkg.is_package());
        assert_eq!(pkg.filesystem_path(), root.join("pkg"));

        let module = locator.locate("pkg.mod").unwrap().unwrap();
        assert_eq!(module.source_file(), Some(root.join("pkg/mod.py").as_path()));
        assert!(!module.is_package());

        assert_eq!(locator.locate("pkg._fast").unwrap().unwrap().kind, LocationKind::Compiled);
        assert_eq!(locator.locate("pkg.typed").unwrap().unwrap().kind, LocationKind::Stub);
        assert_eq!(locator.locate("ns").unwrap().unwrap().kind, LocationKind::Namespace);
        assert_eq!(locator.locate("ns.inner").unwrap().unwrap().kind, LocationKind::Source);
        let ext = locator.locate("ext").unwrap().unwrap();
        assert_eq!(ext.kind, LocationKind::Compiled);
        assert!(ext.is_package());
        assert!(locator.locate("missing").unwrap().is_none());
        assert!(locator.locate("pkg.mod.deeper").unwrap().is_none());
    }

    #[test]
    fn test_regular_package_beats_namespace_in_earlier_root() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        fs::create_dir_all(first.path().join("shared")).unwrap();
        touch(&second.path().join("shared/__init__.py"));

        let locator = ModuleLocator::new(vec![first.path().to_path_buf(), second.path().to_path_buf()]);
        let found = locator.locate("shared").unwrap().unwrap();
        assert_eq!(found.kind, LocationKind::Source);
        assert_eq!(found.root, second.path());
    }

    #[test]
    fn test_submodule_listing() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("pkg/__init__.py"));
        touch(&root.join("pkg/zeta.py"));
        touch(&root.join("pkg/alpha.py"));
        touch(&root.join("pkg/alpha.pyi"));
        touch(&root.join("pkg/__main__.py"));
        touch(&root.join("pkg/_speedups.cpython-311-x86_64-linux-gnu.so"));
        touch(&root.join("pkg/sub/__init__.py"));
        touch(&root.join("pkg/__pycache__/alpha.cpython-311.pyc"));
        touch(&root.join("pkg/data/readme.txt"));
        touch(&root.join("pkg/not-a-module.py"));

        let locator = ModuleLocator::new(vec![root.to_path_buf()]);
        let pkg = locator.locate("pkg").unwrap().unwrap();
        assert_eq!(pkg.submodules(), vec!["_speedups", "alpha", "sub", "zeta"]);
    }

    #[test]
    fn test_with_root_searches_first() {
        let local = tempfile::tempdir().unwrap();
        let acquired = tempfile::tempdir().unwrap();
        touch(&local.path().join("dup.py"));
        touch(&acquired.path().join("dup/__init__.py"));

        let locator = ModuleLocator::new(vec![local.path().to_path_buf()]);
        let preferred = locator.with_root(acquired.path().to_path_buf());
        assert_eq!(preferred.roots()[0], acquired.path());
        assert!(preferred.locate("dup").unwrap().unwrap().is_package());

        let (path, root) = preferred.resolve_local("dup").unwrap();
        assert_eq!(path, acquired.path().join("dup"));
        assert_eq!(root, acquired.path());
    }
}

//! Making a distribution available locally
//!
//! The acquirer tries, in order: its in-process memo, the caller's local
//! search path, the disk cache, and finally the registry.

use crate::cache::{normalize_name, CacheEntry, CachedPackage, PackageCache};
use crate::extract::{extract_archive, locate_import_root, ArchiveFormat};
use crate::registry::{ProjectMetadata, PypiRegistry, Registry, ReleaseFile};
use crate::version::{select_best, Version, VersionConstraint};
use crate::{PackageConfig, PackageError, Result};
use parking_lot::Mutex;
use pretty_mod_core::{AcquiredPackage, AcquisitionSource, Warning, WarningSink};
use rustc_hash::FxHashMap;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Lookup of already-importable modules on the caller's search path
pub trait LocalResolver {
    /// `(package path, import root)` when `module` is importable locally
    fn resolve_local(&self, module: &str) -> Option<(PathBuf, PathBuf)>;
}

/// A resolver that finds nothing, forcing registry acquisition
pub struct NoLocalPackages;

impl LocalResolver for NoLocalPackages {
    fn resolve_local(&self, _module: &str) -> Option<(PathBuf, PathBuf)> {
        None
    }
}

type MemoKey = (String, String, String);

/// Locates or downloads distributions
pub struct PackageAcquirer {
    config: PackageConfig,
    registry: Arc<dyn Registry>,
    cache: PackageCache,
    warnings: Arc<dyn WarningSink>,
    acquired: Mutex<FxHashMap<MemoKey, AcquiredPackage>>,
}

impl PackageAcquirer {
    pub fn new(
        config: PackageConfig,
        registry: Arc<dyn Registry>,
        cache: PackageCache,
        warnings: Arc<dyn WarningSink>,
    ) -> Self {
        Self {
            config,
            registry,
            cache,
            warnings,
            acquired: Mutex::new(FxHashMap::default()),
        }
    }

    /// Acquirer talking to the configured index with the configured cache
    pub fn from_config(config: PackageConfig, warnings: Arc<dyn WarningSink>) -> Result<Self> {
        let registry = Arc::new(PypiRegistry::from_config(&config)?);
        let cache = PackageCache::new(config.cache_dir.clone());
        Ok(Self::new(config, registry, cache, warnings))
    }

    pub fn config(&self) -> &PackageConfig {
        &self.config
    }

    pub fn cache(&self) -> &PackageCache {
        &self.cache
    }

    /// Acquire `name`, whose import name is its normalized distribution name
    pub fn acquire(
        &self,
        name: &str,
        constraint: Option<&str>,
        local: &dyn LocalResolver,
    ) -> Result<AcquiredPackage> {
        self.acquire_providing(name, constraint, &normalize_name(name), local)
    }

    /// Acquire the distribution `name` and locate `module` inside it
    ///
    /// `module` differs from `name` for distributions like `pillow`, which
    /// ships `PIL`.
    pub fn acquire_providing(
        &self,
        name: &str,
        constraint: Option<&str>,
        module: &str,
        local: &dyn LocalResolver,
    ) -> Result<AcquiredPackage> {
        let constraint_text = constraint.map(str::trim).unwrap_or_default();
        let key = (
            normalize_name(name),
            constraint_text.to_string(),
            module.to_string(),
        );
        if let Some(hit) = self.acquired.lock().get(&key) {
            debug!("acquisition memo hit for {}", name);
            return Ok(hit.clone());
        }

        let acquired = self.acquire_uncached(name, constraint_text, module, local)?;
        self.acquired.lock().insert(key, acquired.clone());
        Ok(acquired)
    }

    fn acquire_uncached(
        &self,
        name: &str,
        constraint_text: &str,
        module: &str,
        local: &dyn LocalResolver,
    ) -> Result<AcquiredPackage> {
        let constraint = VersionConstraint::parse(constraint_text)?;

        if constraint.is_any() {
            if let Some((local_path, import_root)) = local.resolve_local(module) {
                debug!("{} is importable from {}", module, import_root.display());
                return Ok(AcquiredPackage {
                    name: name.to_string(),
                    resolved_version: None,
                    local_path,
                    import_root,
                    source: AcquisitionSource::AlreadyPresent,
                });
            }
        }

        if let Some(version) = constraint.exact().map(ToString::to_string) {
            if let Some(cached) = self.cache.lookup(name, &version) {
                debug!("cache hit for {}=={}", name, version);
                return Ok(self.record(name, cached));
            }
        }

        if self.config.offline {
            return self.acquire_offline(name, &constraint);
        }

        let metadata = self.registry.project(name)?;
        let (version, files) = select_release(name, &metadata, &constraint)?;

        if let Some(cached) = self.cache.lookup(name, &version) {
            debug!("cache hit for {}=={}", name, version);
            return Ok(self.record(name, cached));
        }

        let pinned = constraint.exact().is_some();
        let Some(artifact) = choose_artifact(files, pinned) else {
            if pinned {
                return Err(PackageError::VersionNotFound {
                    name: name.to_string(),
                    constraint: constraint.to_string(),
                    latest: Some(metadata.info.version.clone()).filter(|v| !v.is_empty()),
                });
            }
            return Err(PackageError::extraction(
                format!("{}-{}", name, version),
                "release has no wheel or source archive",
            ));
        };

        self.warnings.emit(Warning::Downloading {
            package: name.to_string(),
            version: version.clone(),
        });
        info!("downloading {}", artifact.url);
        let bytes = self.registry.download(&artifact.url)?;
        self.verify(artifact, &bytes)?;

        let cached = self.install(name, &version, module, artifact, &bytes)?;
        Ok(self.record(name, cached))
    }

    fn acquire_offline(&self, name: &str, constraint: &VersionConstraint) -> Result<AcquiredPackage> {
        let versions = self.cache.versions(name);
        let best = select_best(&versions, constraint)
            .and_then(|v| self.cache.lookup(name, v.as_str()));
        match best {
            Some(cached) => Ok(self.record(name, cached)),
            None => Err(PackageError::Offline {
                name: name.to_string(),
            }),
        }
    }

    fn verify(&self, artifact: &ReleaseFile, bytes: &[u8]) -> Result<()> {
        if !self.config.verify_checksums {
            return Ok(());
        }
        let Some(expected) = artifact.digests.sha256.as_deref() else {
            debug!("{} has no published sha256", artifact.filename);
            return Ok(());
        };
        let actual = hex::encode(Sha256::digest(bytes));
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(PackageError::ChecksumMismatch {
                archive: artifact.filename.clone(),
                expected: expected.to_string(),
                actual,
            });
        }
        Ok(())
    }

    fn install(
        &self,
        name: &str,
        version: &str,
        module: &str,
        artifact: &ReleaseFile,
        bytes: &[u8],
    ) -> Result<CachedPackage> {
        let staging = self.cache.staging()?;
        extract_archive(&artifact.filename, bytes, staging.path())?;
        let layout = locate_import_root(staging.path(), module)?;

        let entry = CacheEntry {
            name: name.to_string(),
            version: version.to_string(),
            artifact: artifact.filename.clone(),
            import_root: relative_to(&layout.import_root, staging.path()),
            package_path: relative_to(&layout.package_path, staging.path()),
        };
        let cached = self.cache.publish(staging, entry)?;
        info!("cached {}=={} at {}", name, version, cached.dir.display());
        Ok(cached)
    }

    fn record(&self, name: &str, cached: CachedPackage) -> AcquiredPackage {
        AcquiredPackage {
            name: name.to_string(),
            resolved_version: Some(cached.entry.version.clone()),
            local_path: cached.package_path(),
            import_root: cached.import_root(),
            source: AcquisitionSource::Downloaded,
        }
    }
}

fn relative_to(path: &Path, base: &Path) -> PathBuf {
    path.strip_prefix(base)
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

/// Pick the release satisfying `constraint`
fn select_release<'a>(
    name: &str,
    metadata: &'a ProjectMetadata,
    constraint: &VersionConstraint,
) -> Result<(String, &'a [ReleaseFile])> {
    if let Some(exact) = constraint.exact() {
        let pinned = metadata
            .releases
            .iter()
            .find(|(text, _)| Version::parse(text).is_ok_and(|v| v.pep440() == exact));
        if let Some((text, files)) = pinned {
            return Ok((text.clone(), files));
        }
    }

    let candidates: Vec<Version> = metadata
        .releases
        .iter()
        .filter(|(_, files)| files.iter().any(|f| !f.yanked))
        .filter_map(|(text, _)| Version::parse(text).ok())
        .collect();

    match select_best(&candidates, constraint) {
        Some(best) => {
            let files = metadata
                .releases
                .get(best.as_str())
                .map(Vec::as_slice)
                .unwrap_or_default();
            Ok((best.to_string(), files))
        }
        None => Err(PackageError::VersionNotFound {
            name: name.to_string(),
            constraint: constraint.to_string(),
            latest: Some(metadata.info.version.clone()).filter(|v| !v.is_empty()),
        }),
    }
}

/// Pure wheel, then any wheel, then a source archive; yanked files only
/// count when the release was pinned exactly
fn choose_artifact(files: &[ReleaseFile], allow_yanked: bool) -> Option<&ReleaseFile> {
    let usable = || {
        files.iter().filter(|f| {
            (allow_yanked || !f.yanked) && ArchiveFormat::from_filename(&f.filename).is_some()
        })
    };
    usable()
        .find(|f| f.is_pure_wheel())
        .or_else(|| usable().find(|f| f.is_wheel()))
        .or_else(|| usable().next())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Digests, MockRegistry, ProjectInfo};
    use mockall::predicate::eq;
    use pretty_mod_core::CollectingWarnings;
    use std::collections::BTreeMap;
    use std::io::{Cursor, Write};

    fn wheel(files: &[(&str, &str)]) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            for (name, content) in files {
                writer
                    .start_file(*name, zip::write::FileOptions::default())
                    .unwrap();
                writer.write_all(content.as_bytes()).unwrap();
            }
            writer.finish().unwrap();
        }
        buffer.into_inner()
    }

    fn file(filename: &str, sha256: Option<String>) -> ReleaseFile {
        ReleaseFile {
            filename: filename.to_string(),
            url: format!("https://files.example/{}", filename),
            packagetype: if filename.ends_with(".whl") {
                "bdist_wheel".to_string()
            } else {
                "sdist".to_string()
            },
            digests: Digests { sha256 },
            yanked: false,
            size: 0,
        }
    }

    fn metadata(latest: &str, releases: Vec<(&str, Vec<ReleaseFile>)>) -> ProjectMetadata {
        ProjectMetadata {
            info: ProjectInfo {
                name: "demo".to_string(),
                version: latest.to_string(),
                summary: None,
            },
            releases: releases
                .into_iter()
                .map(|(v, files)| (v.to_string(), files))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    fn acquirer(
        registry: MockRegistry,
        cache_dir: &Path,
        warnings: Arc<CollectingWarnings>,
    ) -> PackageAcquirer {
        let config = PackageConfig {
            cache_dir: cache_dir.to_path_buf(),
            ..Default::default()
        };
        PackageAcquirer::new(
            config,
            Arc::new(registry),
            PackageCache::new(cache_dir),
            warnings,
        )
    }

    struct Present(PathBuf);

    impl LocalResolver for Present {
        fn resolve_local(&self, module: &str) -> Option<(PathBuf, PathBuf)> {
            Some((self.0.join(module), self.0.clone()))
        }
    }

    #[test]
    fn test_download_then_memo() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = wheel(&[("demo/__init__.py", "def hello(name): pass\n")]);
        let digest = hex::encode(Sha256::digest(&bytes));

        let mut registry = MockRegistry::new();
        registry.expect_project().with(eq("demo")).times(1).returning(move |_| {
            Ok(metadata(
                "1.1",
                vec![
                    ("1.0", vec![file("demo-1.0.tar.gz", None)]),
                    (
                        "1.1",
                        vec![
                            file("demo-1.1.tar.gz", None),
                            file("demo-1.1-py3-none-any.whl", Some(digest.clone())),
                        ],
                    ),
                    ("2.0b1", vec![file("demo-2.0b1.tar.gz", None)]),
                ],
            ))
        });
        registry
            .expect_download()
            .with(eq("https://files.example/demo-1.1-py3-none-any.whl"))
            .times(1)
            .returning(move |_| Ok(bytes.clone()));

        let warnings = Arc::new(CollectingWarnings::new());
        let acquirer = acquirer(registry, dir.path(), warnings.clone());

        let first = acquirer.acquire("demo", None, &NoLocalPackages).unwrap();
        assert_eq!(first.source, AcquisitionSource::Downloaded);
        assert_eq!(first.resolved_version.as_deref(), Some("1.1"));
        assert!(first.local_path.join("__init__.py").is_file());
        assert_eq!(
            warnings.take(),
            vec![Warning::Downloading {
                package: "demo".to_string(),
                version: "1.1".to_string()
            }]
        );

        // the mock panics on a second registry call
        let second = acquirer.acquire("demo", None, &NoLocalPackages).unwrap();
        assert_eq!(first, second);
        assert!(warnings.take().is_empty());
    }

    #[test]
    fn test_local_package_skips_registry() {
        let dir = tempfile::tempdir().unwrap();
        let registry = MockRegistry::new();
        let acquirer = acquirer(registry, dir.path(), Arc::new(CollectingWarnings::new()));

        let site = PathBuf::from("/site-packages");
        let acquired = acquirer.acquire("Demo-Pkg", None, &Present(site.clone())).unwrap();
        assert_eq!(acquired.source, AcquisitionSource::AlreadyPresent);
        assert_eq!(acquired.local_path, site.join("demo_pkg"));
        assert_eq!(acquired.resolved_version, None);
    }

    #[test]
    fn test_pinned_version_in_cache_skips_registry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PackageCache::new(dir.path());
        let staging = cache.staging().unwrap();
        std::fs::create_dir_all(staging.path().join("demo")).unwrap();
        cache
            .publish(
                staging,
                CacheEntry {
                    name: "demo".to_string(),
                    version: "1.0".to_string(),
                    artifact: "demo-1.0.tar.gz".to_string(),
                    import_root: PathBuf::new(),
                    package_path: PathBuf::from("demo"),
                },
            )
            .unwrap();

        let registry = MockRegistry::new();
        let acquirer = acquirer(registry, dir.path(), Arc::new(CollectingWarnings::new()));
        let acquired = acquirer
            .acquire("demo", Some("1.0"), &Present(PathBuf::from("/site-packages")))
            .unwrap();
        assert_eq!(acquired.source, AcquisitionSource::Downloaded);
        assert_eq!(acquired.import_root, dir.path().join("demo-1.0"));
    }

    #[test]
    fn test_unknown_package_and_unknown_version_differ() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = MockRegistry::new();
        registry.expect_project().returning(|name| match name {
            "nope" => Err(PackageError::PackageNotFound {
                name: name.to_string(),
            }),
            _ => Ok(metadata("1.0", vec![("1.0", vec![file("demo-1.0.tar.gz", None)])])),
        });
        let acquirer = acquirer(registry, dir.path(), Arc::new(CollectingWarnings::new()));

        let missing = acquirer.acquire("nope", None, &NoLocalPackages).unwrap_err();
        assert!(matches!(missing, PackageError::PackageNotFound { .. }));

        let bad_version = acquirer.acquire("demo", Some("9.9"), &NoLocalPackages).unwrap_err();
        assert!(matches!(bad_version, PackageError::VersionNotFound { .. }));
        assert!(bad_version.to_string().contains("latest is 1.0"));
        assert_ne!(missing.to_string(), bad_version.to_string());
    }

    #[test]
    fn test_checksum_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = MockRegistry::new();
        registry.expect_project().returning(|_| {
            Ok(metadata(
                "1.0",
                vec![(
                    "1.0",
                    vec![file("demo-1.0-py3-none-any.whl", Some("00".repeat(32)))],
                )],
            ))
        });
        registry
            .expect_download()
            .returning(|_| Ok(wheel(&[("demo/__init__.py", "")])));
        let acquirer = acquirer(registry, dir.path(), Arc::new(CollectingWarnings::new()));

        let err = acquirer.acquire("demo", None, &NoLocalPackages).unwrap_err();
        assert!(matches!(err, PackageError::ChecksumMismatch { .. }));
        assert!(acquirer.cache().lookup("demo", "1.0").is_none());
    }

    #[test]
    fn test_offline_uses_cache_only() {
        let dir = tempfile::tempdir().unwrap();
        let registry = MockRegistry::new();
        let config = PackageConfig {
            cache_dir: dir.path().to_path_buf(),
            offline: true,
            ..Default::default()
        };
        let acquirer = PackageAcquirer::new(
            config,
            Arc::new(registry),
            PackageCache::new(dir.path()),
            Arc::new(CollectingWarnings::new()),
        );

        let err = acquirer.acquire("demo", None, &NoLocalPackages).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Network);
    }

    #[test]
    fn test_yanked_releases_skipped() {
        let mut yanked = file("demo-2.0.tar.gz", None);
        yanked.yanked = true;
        let metadata = metadata(
            "2.0",
            vec![
                ("1.5", vec![file("demo-1.5.tar.gz", None)]),
                ("2.0", vec![yanked]),
                ("3.0", vec![]),
            ],
        );

        let any = VersionConstraint::any();
        let (version, _) = select_release("demo", &metadata, &any).unwrap();
        assert_eq!(version, "1.5");

        let pinned = VersionConstraint::parse("==2.0").unwrap();
        let (version, _) = select_release("demo", &metadata, &pinned).unwrap();
        assert_eq!(version, "2.0");
    }

    #[test]
    fn test_pinned_yanked_release_is_installable() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = wheel(&[("demo/__init__.py", "def old(): pass\n")]);

        let mut registry = MockRegistry::new();
        registry.expect_project().with(eq("demo")).times(2).returning(|_| {
            let mut yanked = file("demo-2.0-py3-none-any.whl", None);
            yanked.yanked = true;
            Ok(metadata(
                "2.1",
                vec![
                    ("2.0", vec![yanked]),
                    ("2.1", vec![file("demo-2.1.tar.gz", None)]),
                    ("3.0", vec![]),
                ],
            ))
        });
        registry
            .expect_download()
            .with(eq("https://files.example/demo-2.0-py3-none-any.whl"))
            .times(1)
            .returning(move |_| Ok(bytes.clone()));
        let acquirer = acquirer(registry, dir.path(), Arc::new(CollectingWarnings::new()));

        let pinned = acquirer.acquire("demo", Some("==2.0"), &NoLocalPackages).unwrap();
        assert_eq!(pinned.resolved_version.as_deref(), Some("2.0"));
        assert!(pinned.local_path.join("__init__.py").is_file());

        // a pinned release without any files is a missing version, not a broken archive
        let err = acquirer.acquire("demo", Some("3.0"), &NoLocalPackages).unwrap_err();
        assert!(matches!(err, PackageError::VersionNotFound { .. }));
        assert_eq!(err.kind(), crate::ErrorKind::NotFound);
    }

    #[test]
    fn test_yanked_files_need_a_pin() {
        let mut yanked = file("demo-2.0.tar.gz", None);
        yanked.yanked = true;
        let files = vec![yanked];
        assert!(choose_artifact(&files, false).is_none());
        assert_eq!(choose_artifact(&files, true).unwrap().filename, "demo-2.0.tar.gz");
    }

    #[test]
    fn test_artifact_preference() {
        let files = vec![
            file("demo-1.0.tar.gz", None),
            file("demo-1.0-cp311-cp311-manylinux_2_17_x86_64.whl", None),
            file("demo-1.0-py2.py3-none-any.whl", None),
        ];
        assert_eq!(
            choose_artifact(&files, false).unwrap().filename,
            "demo-1.0-py2.py3-none-any.whl"
        );
        assert_eq!(
            choose_artifact(&files[..2], false).unwrap().filename,
            "demo-1.0-cp311-cp311-manylinux_2_17_x86_64.whl"
        );
        assert_eq!(choose_artifact(&files[..1], false).unwrap().filename, "demo-1.0.tar.gz");
        assert!(choose_artifact(&[], false).is_none());
    }
}

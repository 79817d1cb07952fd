//! On-disk cache of extracted distributions
//!
//! Each entry lives in `{root}/{name}-{version}`. An entry is complete once
//! its `.complete` marker exists; entries are assembled in a staging
//! directory under the root and published with a single rename, so readers
//! never observe a half-extracted tree.

use crate::{PackageError, Result, Version};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

const MARKER: &str = ".complete";

/// Canonical cache key for a distribution name
pub fn normalize_name(name: &str) -> String {
    name.trim()
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c == '-' || c == '.' { '_' } else { c })
        .collect()
}

/// Contents of the `.complete` marker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Distribution name as requested
    pub name: String,

    /// Resolved version
    pub version: String,

    /// Artifact the entry was extracted from
    pub artifact: String,

    /// Import root, relative to the entry directory
    pub import_root: PathBuf,

    /// Package directory or module file, relative to the entry directory
    pub package_path: PathBuf,
}

/// A complete cache entry on disk
#[derive(Debug, Clone)]
pub struct CachedPackage {
    pub dir: PathBuf,
    pub entry: CacheEntry,
}

impl CachedPackage {
    pub fn import_root(&self) -> PathBuf {
        self.dir.join(&self.entry.import_root)
    }

    pub fn package_path(&self) -> PathBuf {
        self.dir.join(&self.entry.package_path)
    }
}

/// Distribution cache rooted at a directory
#[derive(Debug, Clone)]
pub struct PackageCache {
    root: PathBuf,
}

impl PackageCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_dir(&self, name: &str, version: &str) -> PathBuf {
        self.root
            .join(format!("{}-{}", normalize_name(name), version))
    }

    /// Look up a complete entry
    pub fn lookup(&self, name: &str, version: &str) -> Option<CachedPackage> {
        read_entry(&self.entry_dir(name, version))
    }

    /// Versions of `name` with a complete entry, highest first
    pub fn versions(&self, name: &str) -> Vec<Version> {
        let prefix = format!("{}-", normalize_name(name));
        let Ok(entries) = fs::read_dir(&self.root) else {
            return Vec::new();
        };

        let mut versions: Vec<Version> = entries
            .flatten()
            .filter_map(|entry| {
                let file_name = entry.file_name();
                let rest = file_name.to_str()?.strip_prefix(&prefix)?.to_string();
                let cached = read_entry(&entry.path())?;
                Version::parse(&cached.entry.version)
                    .ok()
                    .filter(|v| v.as_str() == rest)
            })
            .collect();
        versions.sort_by(|a, b| b.cmp(a));
        versions
    }

    /// A fresh staging directory on the same filesystem as the cache
    pub fn staging(&self) -> Result<TempDir> {
        fs::create_dir_all(&self.root).map_err(|e| PackageError::io(&self.root, e))?;
        tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(&self.root)
            .map_err(|e| PackageError::io(&self.root, e))
    }

    /// Mark `staging` complete and move it into place
    ///
    /// When another process published the same entry first, that entry wins
    /// and the staging directory is discarded.
    pub fn publish(&self, staging: TempDir, entry: CacheEntry) -> Result<CachedPackage> {
        let marker = staging.path().join(MARKER);
        let json = serde_json::to_vec_pretty(&entry).map_err(|e| {
            PackageError::io(&marker, std::io::Error::new(std::io::ErrorKind::Other, e))
        })?;
        fs::write(&marker, json).map_err(|e| PackageError::io(&marker, e))?;

        let target = self.entry_dir(&entry.name, &entry.version);
        let staged = staging.into_path();

        match fs::rename(&staged, &target) {
            Ok(()) => {}
            Err(err) => {
                if let Some(existing) = read_entry(&target) {
                    debug!("cache entry {} published concurrently", target.display());
                    discard(&staged);
                    return Ok(existing);
                }
                if target.exists() {
                    warn!("replacing incomplete cache entry {}", target.display());
                    fs::remove_dir_all(&target).map_err(|e| {
                        discard(&staged);
                        PackageError::io(&target, e)
                    })?;
                    fs::rename(&staged, &target).map_err(|e| {
                        discard(&staged);
                        PackageError::io(&target, e)
                    })?;
                } else {
                    discard(&staged);
                    return Err(PackageError::io(&target, err));
                }
            }
        }

        Ok(CachedPackage { dir: target, entry })
    }
}

fn read_entry(dir: &Path) -> Option<CachedPackage> {
    let marker = fs::read(dir.join(MARKER)).ok()?;
    let entry: CacheEntry = serde_json::from_slice(&marker).ok()?;
    Some(CachedPackage {
        dir: dir.to_path_buf(),
        entry,
    })
}

fn discard(path: &Path) {
    if let Err(e) = fs::remove_dir_all(path) {
        debug!("could not remove {}: {}", path.display(), e);
    }
}

//! pretty-mod package acquisition
//!
//! This crate makes a Python distribution available on the local filesystem:
//! - Registry metadata and artifact download (PyPI JSON API)
//! - PEP 440 version parsing and constraint matching
//! - Wheel and source archive extraction
//! - A download cache published with atomic renames

pub mod acquirer;
pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod registry;
pub mod version;

pub use acquirer::{LocalResolver, NoLocalPackages, PackageAcquirer};
pub use cache::{normalize_name, CacheEntry, CachedPackage, PackageCache};
pub use config::PackageConfig;
pub use error::{ErrorKind, PackageError, Result};
pub use registry::{ProjectMetadata, PypiRegistry, Registry, ReleaseFile};
pub use version::{Version, VersionConstraint};

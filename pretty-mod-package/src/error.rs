//! Package acquisition error types

use std::path::PathBuf;
use thiserror::Error;

/// Type alias for package results
pub type Result<T> = std::result::Result<T, PackageError>;

/// Errors that can occur while acquiring a package
#[derive(Error, Debug)]
pub enum PackageError {
    /// The registry has no project with this name
    #[error("package '{name}' was not found on the registry")]
    PackageNotFound {
        /// Requested name
        name: String,
    },

    /// The project exists but no release satisfies the constraint
    #[error(
        "package '{name}' has no release matching '{constraint}' (latest is {})",
        .latest.as_deref().unwrap_or("unknown")
    )]
    VersionNotFound {
        /// Requested name
        name: String,
        /// Requested constraint
        constraint: String,
        /// Latest version the registry advertises
        latest: Option<String>,
    },

    /// Transport failure, timeout or unexpected HTTP status
    #[error("network error fetching {url}: {message}")]
    Network {
        /// URL being fetched
        url: String,
        /// What went wrong
        message: String,
    },

    /// The registry answered with something we cannot read
    #[error("invalid registry response from {url}: {message}")]
    InvalidResponse {
        /// URL being fetched
        url: String,
        /// Decoding error
        message: String,
    },

    /// Offline mode and nothing usable in the cache
    #[error("'{name}' is not in the package cache and offline mode is enabled")]
    Offline {
        /// Requested name
        name: String,
    },

    /// The archive could not be unpacked into a usable source tree
    #[error("failed to extract {archive}: {message}")]
    Extraction {
        /// Archive file name
        archive: String,
        /// What went wrong
        message: String,
    },

    /// Downloaded bytes do not match the published digest
    #[error("checksum mismatch for {archive}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Archive file name
        archive: String,
        /// Published sha256
        expected: String,
        /// Computed sha256
        actual: String,
    },

    /// A version string that is not PEP 440
    #[error("invalid version '{version}'")]
    InvalidVersion {
        /// The offending text
        version: String,
    },

    /// A constraint that cannot be parsed
    #[error("invalid version constraint '{constraint}': {message}")]
    InvalidConstraint {
        /// The offending text
        constraint: String,
        /// What is wrong with it
        message: String,
    },

    /// Filesystem error in the cache or during extraction
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

/// Coarse classification used to pick messages and exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Network,
    Extraction,
    InvalidRequest,
    Io,
}

impl PackageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PackageError::PackageNotFound { .. } | PackageError::VersionNotFound { .. } => {
                ErrorKind::NotFound
            }
            PackageError::Network { .. }
            | PackageError::InvalidResponse { .. }
            | PackageError::Offline { .. } => ErrorKind::Network,
            PackageError::Extraction { .. } | PackageError::ChecksumMismatch { .. } => {
                ErrorKind::Extraction
            }
            PackageError::InvalidVersion { .. } | PackageError::InvalidConstraint { .. } => {
                ErrorKind::InvalidRequest
            }
            PackageError::Io { .. } => ErrorKind::Io,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PackageError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn extraction(archive: impl Into<String>, message: impl ToString) -> Self {
        PackageError::Extraction {
            archive: archive.into(),
            message: message.to_string(),
        }
    }
}

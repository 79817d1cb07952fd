//! Module system error types

use pretty_mod_core::SyntaxError;
use pretty_mod_package::PackageError;
use pretty_mod_parser::ParseError;
use std::path::PathBuf;
use thiserror::Error;

/// Type alias for module system results
pub type Result<T> = std::result::Result<T, ModuleError>;

/// Errors that can occur while exploring modules or resolving signatures
#[derive(Error, Debug)]
pub enum ModuleError {
    /// The import path itself is malformed
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    /// Module could not be found locally, in the cache, or by importing it
    #[error("No module named '{module}'")]
    ModuleNotFound {
        /// Dotted module name
        module: String,
    },

    /// Acquisition from the registry failed
    #[error(transparent)]
    Package(#[from] PackageError),

    /// Source text of the module could not be parsed
    #[error("Parse error in module {path}: {error}")]
    Parse {
        /// Source file
        path: PathBuf,
        /// The underlying parse error
        #[source]
        error: ParseError,
    },

    /// A dotted name that cannot be a Python module
    #[error("Invalid module path: {path}")]
    InvalidPath {
        /// The invalid name
        path: String,
    },

    /// The interpreter could not be run or reported a failure
    #[error("Introspection of '{module}' failed: {message}")]
    Introspection {
        /// Module being inspected
        module: String,
        /// What went wrong
        message: String,
    },

    /// I/O error occurred while reading a module
    #[error("IO error reading module {path}: {error}")]
    Io {
        /// Path being read
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        error: std::io::Error,
    },
}

/// Error taxonomy shared by the CLI for messages and exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    ModuleNotFound,
    NotFound,
    Network,
    Extraction,
    Parse,
    Io,
    Introspection,
}

impl ModuleError {
    pub fn kind(&self) -> ErrorKind {
        use pretty_mod_package::ErrorKind as PackageKind;

        match self {
            ModuleError::Syntax(_) | ModuleError::InvalidPath { .. } => ErrorKind::Syntax,
            ModuleError::ModuleNotFound { .. } => ErrorKind::ModuleNotFound,
            ModuleError::Package(err) => match err.kind() {
                PackageKind::NotFound => ErrorKind::NotFound,
                PackageKind::Network => ErrorKind::Network,
                PackageKind::Extraction => ErrorKind::Extraction,
                PackageKind::InvalidRequest => ErrorKind::Syntax,
                PackageKind::Io => ErrorKind::Io,
            },
            ModuleError::Parse { .. } => ErrorKind::Parse,
            ModuleError::Io { .. } => ErrorKind::Io,
            ModuleError::Introspection { .. } => ErrorKind::Introspection,
        }
    }

    /// A short hint on what the user can do about it
    pub fn advice(&self) -> Option<&'static str> {
        match self.kind() {
            ErrorKind::Syntax => Some("use 'module.path' for modules and 'module.path:attribute' for objects"),
            ErrorKind::ModuleNotFound => Some("check the module name, or name the distribution with 'package::module'"),
            ErrorKind::NotFound => Some("check the package name and version on PyPI"),
            ErrorKind::Network => Some("check connectivity, or set PRETTY_MOD_OFFLINE=1 to use cached packages only"),
            ErrorKind::Extraction => Some("the downloaded archive is unusable; try another version"),
            ErrorKind::Introspection => Some("set PRETTY_MOD_PYTHON to a working interpreter"),
            ErrorKind::Parse | ErrorKind::Io => None,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        ModuleError::Io {
            path: path.into(),
            error,
        }
    }
}

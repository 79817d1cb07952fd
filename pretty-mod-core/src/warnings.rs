//! Non-fatal diagnostics channel
//!
//! Exploration keeps going when a submodule fails and acquisition announces
//! downloads before they start. Both report through a [`WarningSink`] so
//! callers decide whether to log, print, collect or drop them.

use parking_lot::Mutex;
use std::fmt;
use tracing::{debug, warn};

/// A non-fatal event worth telling the user about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A submodule could not be explored and was left out of the tree
    SubmoduleSkipped {
        /// Dotted name of the submodule
        module: String,
        /// Why it was skipped
        reason: String,
    },

    /// A package is about to be fetched from the registry
    Downloading {
        /// Package name
        package: String,
        /// Version being fetched
        version: String,
    },

    /// A module had no source and was imported in an interpreter instead
    DynamicFallback {
        /// Dotted module name
        module: String,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::SubmoduleSkipped { module, reason } => {
                write!(f, "skipping submodule '{}': {}", module, reason)
            }
            Warning::Downloading { package, version } => write!(
                f,
                "Module '{}' not found locally. Downloading {}=={} from PyPI...",
                package, package, version
            ),
            Warning::DynamicFallback { module } => {
                write!(f, "no source for '{}', importing it to inspect", module)
            }
        }
    }
}

/// Receiver of [`Warning`]s
pub trait WarningSink: Send + Sync {
    /// Report one warning
    fn emit(&self, warning: Warning);
}

/// Logs warnings through `tracing`, demoted to debug level when quiet
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingWarnings {
    quiet: bool,
}

impl TracingWarnings {
    /// Create a sink; `quiet` demotes everything to debug level
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl WarningSink for TracingWarnings {
    fn emit(&self, warning: Warning) {
        if self.quiet {
            debug!("{}", warning);
        } else {
            warn!("{}", warning);
        }
    }
}

/// Keeps every warning in memory
#[derive(Debug, Default)]
pub struct CollectingWarnings {
    warnings: Mutex<Vec<Warning>>,
}

impl CollectingWarnings {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything collected so far
    pub fn warnings(&self) -> Vec<Warning> {
        self.warnings.lock().clone()
    }

    /// Remove and return everything collected so far
    pub fn take(&self) -> Vec<Warning> {
        std::mem::take(&mut *self.warnings.lock())
    }
}

impl WarningSink for CollectingWarnings {
    fn emit(&self, warning: Warning) {
        self.warnings.lock().push(warning);
    }
}

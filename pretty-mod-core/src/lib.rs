//! pretty-mod core types
//!
//! This crate holds everything the other pretty-mod crates share:
//! - Import-path parsing (`json:loads`, `pillow::PIL`, `requests@2.31.0`)
//! - The records produced by exploration and signature resolution
//! - The warnings channel used to report non-fatal problems

pub mod error;
pub mod import_path;
pub mod model;
pub mod warnings;

pub use error::SyntaxError;
pub use import_path::ImportSpecifier;
pub use model::{
    AcquiredPackage, AcquisitionSource, ApiSurface, DiscoveryMode, ModuleNode, ParamKind,
    ParameterInfo, SignatureRecord, Unavailable,
};
pub use warnings::{CollectingWarnings, TracingWarnings, Warning, WarningSink};

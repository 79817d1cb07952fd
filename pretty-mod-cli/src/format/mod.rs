//! Output formats for trees and signatures

mod json;
mod pretty;

pub use json::JsonFormatter;
pub use pretty::PrettyFormatter;

use crate::display::DisplayConfig;
use anyhow::Result;
use clap::ValueEnum;
use pretty_mod_core::{ModuleNode, SignatureRecord, Unavailable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Icons and tree glyphs for terminals
    #[default]
    Pretty,
    /// Machine-readable JSON
    Json,
}

/// Renders command results as text
pub trait OutputFormatter {
    fn format_tree(&self, tree: &ModuleNode) -> Result<String>;

    fn format_signature(&self, record: &SignatureRecord) -> Result<String>;

    fn format_unavailable(&self, unavailable: &Unavailable) -> Result<String>;
}

pub fn formatter(format: OutputFormat, display: DisplayConfig) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Pretty => Box::new(PrettyFormatter::new(display)),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

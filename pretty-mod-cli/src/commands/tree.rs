//! `pretty-mod tree`

use super::Session;
use crate::format::{formatter, OutputFormat};
use anyhow::Result;
use pretty_mod_modules::ModuleTreeExplorer;
use tracing::debug;

/// Explore `module` down to `depth` levels and print the tree
pub fn run(session: &Session, module: &str, depth: usize, format: OutputFormat) -> Result<()> {
    debug!("exploring {} to depth {}", module, depth);
    let tree = ModuleTreeExplorer::new(session.env.clone()).explore_str(module, depth)?;
    let output = formatter(format, session.display.clone()).format_tree(&tree)?;
    println!("{}", output.trim_end());
    Ok(())
}

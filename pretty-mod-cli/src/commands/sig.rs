//! `pretty-mod sig`

use super::Session;
use crate::format::{formatter, OutputFormat};
use anyhow::Result;
use pretty_mod_modules::SignatureResolver;
use tracing::debug;

/// Resolve and print the signature at `import_path`.
/// An unavailable signature is reported on stdout and is not an error.
pub fn run(session: &Session, import_path: &str, format: OutputFormat) -> Result<()> {
    let resolution = SignatureResolver::new(session.env.clone()).resolve_str(import_path)?;
    let formatter = formatter(format, session.display.clone());
    let output = match &resolution {
        Ok(record) => {
            for hop in &record.resolution_path {
                debug!("{}", hop);
            }
            formatter.format_signature(record)?
        }
        Err(unavailable) => formatter.format_unavailable(unavailable)?,
    };
    println!("{}", output.trim_end());
    Ok(())
}

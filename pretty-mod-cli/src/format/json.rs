use super::OutputFormatter;
use anyhow::Result;
use pretty_mod_core::{ModuleNode, SignatureRecord, Unavailable};
use serde_json::json;

/// JSON output for scripts
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn format_tree(&self, tree: &ModuleNode) -> Result<String> {
        let value = json!({
            "module": tree.name,
            "tree": tree,
        });
        Ok(serde_json::to_string_pretty(&value)?)
    }

    fn format_signature(&self, record: &SignatureRecord) -> Result<String> {
        Ok(serde_json::to_string_pretty(record)?)
    }

    fn format_unavailable(&self, unavailable: &Unavailable) -> Result<String> {
        let value = json!({
            "name": unavailable.symbol,
            "available": false,
            "reason": unavailable.reason,
        });
        Ok(serde_json::to_string_pretty(&value)?)
    }
}

use super::OutputFormatter;
use crate::display::{DisplayConfig, Element};
use anyhow::Result;
use pretty_mod_core::{ModuleNode, SignatureRecord, Unavailable};
use std::collections::BTreeSet;

/// Tree-drawing output for terminals
pub struct PrettyFormatter {
    display: DisplayConfig,
}

impl PrettyFormatter {
    pub fn new(display: DisplayConfig) -> Self {
        Self { display }
    }

    fn glyph(&self, last: bool) -> String {
        let glyph = if last {
            &self.display.tree_last
        } else {
            &self.display.tree_branch
        };
        self.display.paint(glyph, Element::Tree)
    }

    fn indent(&self, prefix: &str, last: bool) -> String {
        let extension = if last {
            &self.display.tree_empty
        } else {
            &self.display.tree_vertical
        };
        format!("{}{}", prefix, self.display.paint(extension, Element::Tree))
    }

    fn paint_param(&self, param: &str) -> String {
        match param.split_once('=') {
            Some((head, default)) => format!(
                "{}={}",
                self.display.paint(head, Element::Param),
                self.display.paint(default, Element::Default)
            ),
            None => self.display.paint(param, Element::Param),
        }
    }

    fn api_lines(&self, node: &ModuleNode) -> Vec<String> {
        let display = &self.display;
        let api = &node.api;
        let mut lines = Vec::new();
        let mut push = |icon: &str, label: &str, names: &BTreeSet<String>, element: Element| {
            if names.is_empty() {
                return;
            }
            let joined = names.iter().cloned().collect::<Vec<_>>().join(", ");
            lines.push(format!(
                "{} {}: {}",
                display.paint(icon, element),
                display.paint(label, element),
                joined
            ));
        };
        if let Some(exported) = &api.exported {
            push(&display.exports_icon, "__all__", exported, Element::Exports);
        }
        push(&display.function_icon, "functions", &api.functions, Element::Function);
        push(&display.class_icon, "classes", &api.classes, Element::Class);
        push(&display.constant_icon, "constants", &api.constants, Element::Constant);
        lines
    }

    fn write_children(&self, node: &ModuleNode, prefix: &str, out: &mut String) {
        let items = self.api_lines(node);
        let has_submodules = !node.submodules.is_empty();
        for (i, item) in items.iter().enumerate() {
            let last = i + 1 == items.len() && !has_submodules;
            out.push_str(&format!("{}{}{}\n", prefix, self.glyph(last), item));
        }

        let count = node.submodules.len();
        for (i, (name, child)) in node.submodules.iter().enumerate() {
            let last = i + 1 == count;
            out.push_str(&format!(
                "{}{}{} {}\n",
                prefix,
                self.glyph(last),
                self.display.paint(&self.display.module_icon, Element::Module),
                self.display.paint(name, Element::Module)
            ));
            self.write_children(child, &self.indent(prefix, last), out);
        }
    }
}

impl OutputFormatter for PrettyFormatter {
    fn format_tree(&self, tree: &ModuleNode) -> Result<String> {
        let mut out = format!(
            "{} {}\n",
            self.display.paint(&self.display.module_icon, Element::Module),
            self.display.paint(&tree.name, Element::Module)
        );
        self.write_children(tree, "", &mut out);
        Ok(out)
    }

    fn format_signature(&self, record: &SignatureRecord) -> Result<String> {
        let display = &self.display;
        let mut out = format!(
            "{} {}\n",
            display.paint(&display.signature_icon, Element::Signature),
            display.paint(&record.qualified_name, Element::Signature)
        );
        out.push_str(&format!("{}Parameters:\n", self.glyph(false)));

        let has_return = record.return_annotation.is_some();
        let params = record.rendered_parameters();
        if params.is_empty() {
            out.push_str(&format!("{}(no parameters)\n", self.glyph(!has_return)));
        }
        for (i, param) in params.iter().enumerate() {
            let last = i + 1 == params.len() && !has_return;
            out.push_str(&format!(
                "{}{}\n",
                self.glyph(last),
                self.paint_param(param)
            ));
        }

        if let Some(ret) = &record.return_annotation {
            out.push_str(&format!("{}Returns:\n", self.glyph(true)));
            out.push_str(&format!(
                "{}{}{}\n",
                display.tree_empty,
                self.glyph(true),
                display.paint(ret, Element::Type)
            ));
        }
        Ok(out)
    }

    fn format_unavailable(&self, unavailable: &Unavailable) -> Result<String> {
        let display = &self.display;
        Ok(format!(
            "{} {} {}\n",
            display.paint(&display.signature_icon, Element::Signature),
            display.paint(&unavailable.symbol, Element::Signature),
            display.paint(
                &format!("(signature not available: {})", unavailable.reason),
                Element::Warning
            )
        ))
    }
}

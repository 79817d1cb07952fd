//! Icons, tree glyphs and colors used by the pretty formatter

use colored::Colorize;
use serde::{Deserialize, Serialize};

/// What a piece of output text represents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Element {
    Module,
    Function,
    Class,
    Constant,
    Exports,
    Signature,
    Tree,
    Param,
    Type,
    Default,
    Warning,
}

/// Hex colors (`#RRGGBB`) per element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorScheme {
    pub module: String,
    pub function: String,
    pub class: String,
    pub constant: String,
    pub exports: String,
    pub signature: String,
    pub tree: String,
    pub param: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub default: String,
    pub warning: String,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            module: "#8B7355".to_string(),
            function: "#6B8E23".to_string(),
            class: "#4682B4".to_string(),
            constant: "#BC8F8F".to_string(),
            exports: "#9370DB".to_string(),
            signature: "#5F9EA0".to_string(),
            tree: "#696969".to_string(),
            param: "#708090".to_string(),
            type_: "#778899".to_string(),
            default: "#8FBC8F".to_string(),
            warning: "#DAA520".to_string(),
        }
    }
}

impl ColorScheme {
    fn slot(&mut self, element: Element) -> &mut String {
        match element {
            Element::Module => &mut self.module,
            Element::Function => &mut self.function,
            Element::Class => &mut self.class,
            Element::Constant => &mut self.constant,
            Element::Exports => &mut self.exports,
            Element::Signature => &mut self.signature,
            Element::Tree => &mut self.tree,
            Element::Param => &mut self.param,
            Element::Type => &mut self.type_,
            Element::Default => &mut self.default,
            Element::Warning => &mut self.warning,
        }
    }

    pub fn get(&self, element: Element) -> &str {
        match element {
            Element::Module => &self.module,
            Element::Function => &self.function,
            Element::Class => &self.class,
            Element::Constant => &self.constant,
            Element::Exports => &self.exports,
            Element::Signature => &self.signature,
            Element::Tree => &self.tree,
            Element::Param => &self.param,
            Element::Type => &self.type_,
            Element::Default => &self.default,
            Element::Warning => &self.warning,
        }
    }
}

/// Display settings for pretty output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub module_icon: String,
    pub function_icon: String,
    pub class_icon: String,
    pub constant_icon: String,
    pub exports_icon: String,
    pub signature_icon: String,

    pub tree_branch: String,
    pub tree_last: String,
    pub tree_vertical: String,
    pub tree_empty: String,

    pub use_color: bool,
    pub colors: ColorScheme,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            module_icon: "📦".to_string(),
            function_icon: "⚡".to_string(),
            class_icon: "🔷".to_string(),
            constant_icon: "📌".to_string(),
            exports_icon: "📜".to_string(),
            signature_icon: "📎".to_string(),
            tree_branch: "├── ".to_string(),
            tree_last: "└── ".to_string(),
            tree_vertical: "│   ".to_string(),
            tree_empty: "    ".to_string(),
            use_color: true,
            colors: ColorScheme::default(),
        }
    }
}

const COLOR_VARS: [(&str, Element); 11] = [
    ("PRETTY_MOD_MODULE_COLOR", Element::Module),
    ("PRETTY_MOD_FUNCTION_COLOR", Element::Function),
    ("PRETTY_MOD_CLASS_COLOR", Element::Class),
    ("PRETTY_MOD_CONSTANT_COLOR", Element::Constant),
    ("PRETTY_MOD_EXPORTS_COLOR", Element::Exports),
    ("PRETTY_MOD_SIGNATURE_COLOR", Element::Signature),
    ("PRETTY_MOD_TREE_COLOR", Element::Tree),
    ("PRETTY_MOD_PARAM_COLOR", Element::Param),
    ("PRETTY_MOD_TYPE_COLOR", Element::Type),
    ("PRETTY_MOD_DEFAULT_COLOR", Element::Default),
    ("PRETTY_MOD_WARNING_COLOR", Element::Warning),
];

impl DisplayConfig {
    /// Plain-ASCII icons and glyphs for terminals without Unicode
    pub fn ascii() -> Self {
        Self {
            module_icon: "[M]".to_string(),
            function_icon: "[F]".to_string(),
            class_icon: "[C]".to_string(),
            constant_icon: "[K]".to_string(),
            exports_icon: "[E]".to_string(),
            signature_icon: "[S]".to_string(),
            tree_branch: "|-- ".to_string(),
            tree_last: "`-- ".to_string(),
            tree_vertical: "|   ".to_string(),
            tree_empty: "    ".to_string(),
            ..Self::default()
        }
    }

    /// Same settings without any color
    pub fn plain(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Apply display environment variables read through `get`.
    /// `PRETTY_MOD_ASCII` switches the whole glyph set first, so
    /// individual icon variables still win over it.
    pub fn apply_overrides(&mut self, get: impl Fn(&str) -> Option<String>) {
        if get("PRETTY_MOD_ASCII").is_some_and(|v| is_truthy(&v)) {
            let ascii = Self::ascii();
            self.module_icon = ascii.module_icon;
            self.function_icon = ascii.function_icon;
            self.class_icon = ascii.class_icon;
            self.constant_icon = ascii.constant_icon;
            self.exports_icon = ascii.exports_icon;
            self.signature_icon = ascii.signature_icon;
            self.tree_branch = ascii.tree_branch;
            self.tree_last = ascii.tree_last;
            self.tree_vertical = ascii.tree_vertical;
            self.tree_empty = ascii.tree_empty;
        }

        let text_vars: [(&str, &mut String); 9] = [
            ("PRETTY_MOD_MODULE_ICON", &mut self.module_icon),
            ("PRETTY_MOD_FUNCTION_ICON", &mut self.function_icon),
            ("PRETTY_MOD_CLASS_ICON", &mut self.class_icon),
            ("PRETTY_MOD_CONSTANT_ICON", &mut self.constant_icon),
            ("PRETTY_MOD_EXPORTS_ICON", &mut self.exports_icon),
            ("PRETTY_MOD_SIGNATURE_ICON", &mut self.signature_icon),
            ("PRETTY_MOD_TREE_BRANCH", &mut self.tree_branch),
            ("PRETTY_MOD_TREE_LAST", &mut self.tree_last),
            ("PRETTY_MOD_TREE_VERTICAL", &mut self.tree_vertical),
        ];
        for (key, slot) in text_vars {
            if let Some(value) = get(key) {
                *slot = value;
            }
        }

        // NO_COLOR disables color whatever its value, as long as it is set
        if get("NO_COLOR").is_some_and(|v| !v.is_empty())
            || get("PRETTY_MOD_NO_COLOR").is_some_and(|v| is_truthy(&v))
        {
            self.use_color = false;
        }

        for (key, element) in COLOR_VARS {
            if let Some(value) = get(key).filter(|v| parse_hex_color(v).is_some()) {
                *self.colors.slot(element) = value;
            }
        }
    }

    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Wrap `text` in the element's truecolor, or return it unchanged
    pub fn paint(&self, text: &str, element: Element) -> String {
        if !self.use_color {
            return text.to_string();
        }
        match parse_hex_color(self.colors.get(element)) {
            Some((r, g, b)) => text.truecolor(r, g, b).to_string(),
            None => text.to_string(),
        }
    }
}

/// Parse `#RRGGBB` (leading `#` optional)
pub fn parse_hex_color(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
    Some((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn overridden(pairs: &[(&str, &str)]) -> DisplayConfig {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut config = DisplayConfig::default();
        config.apply_overrides(|key| env.get(key).cloned());
        config
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#8B7355"), Some((0x8B, 0x73, 0x55)));
        assert_eq!(parse_hex_color("ffffff"), Some((255, 255, 255)));
        assert_eq!(parse_hex_color("#fff"), None);
        assert_eq!(parse_hex_color("#GG0000"), None);
        assert_eq!(parse_hex_color("#ééé"), None);
    }

    #[test]
    fn test_ascii_mode_then_icon_override() {
        let config = overridden(&[("PRETTY_MOD_ASCII", "1"), ("PRETTY_MOD_CLASS_ICON", "<C>")]);
        assert_eq!(config.module_icon, "[M]");
        assert_eq!(config.class_icon, "<C>");
        assert_eq!(config.tree_branch, "|-- ");
        assert_eq!(config.tree_last, "`-- ");
        assert!(config.use_color);
    }

    #[test]
    fn test_no_color_variables() {
        assert!(!overridden(&[("NO_COLOR", "anything")]).use_color);
        assert!(overridden(&[("NO_COLOR", "")]).use_color);
        assert!(!overridden(&[("PRETTY_MOD_NO_COLOR", "true")]).use_color);
        assert!(overridden(&[("PRETTY_MOD_NO_COLOR", "0")]).use_color);
    }

    #[test]
    fn test_color_overrides_ignore_invalid_values() {
        let config = overridden(&[
            ("PRETTY_MOD_FUNCTION_COLOR", "#112233"),
            ("PRETTY_MOD_TYPE_COLOR", "blue"),
        ]);
        assert_eq!(config.colors.function, "#112233");
        assert_eq!(config.colors.type_, "#778899");
    }

    #[test]
    fn test_paint_without_color_is_identity() {
        let config = DisplayConfig::default().plain();
        assert_eq!(config.paint("requests", Element::Module), "requests");
    }

    #[test]
    fn test_deserialize_partial_table() {
        let config: DisplayConfig =
            toml::from_str("use_color = false\n[colors]\nclass = \"#000000\"\n").unwrap();
        assert!(!config.use_color);
        assert_eq!(config.colors.class, "#000000");
        assert_eq!(config.colors.module, "#8B7355");
        assert_eq!(config.module_icon, "📦");
    }
}

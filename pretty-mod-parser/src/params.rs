//! Parameter list extraction

use crate::syntax::{child_by_kind, expression_text, node_text};
use pretty_mod_core::{ParamKind, ParameterInfo};
use tree_sitter::Node;

/// Extract parameters from a `parameters` or `lambda_parameters` node
pub(crate) fn extract_parameters(params_node: Node, source: &[u8]) -> Vec<ParameterInfo> {
    let mut params = Vec::new();
    // Everything after `*` or `*args` is keyword-only
    let mut keyword_only = false;
    let positional = |keyword_only: bool| {
        if keyword_only {
            ParamKind::KeywordOnly
        } else {
            ParamKind::Positional
        }
    };

    let mut cursor = params_node.walk();
    for child in params_node.children(&mut cursor) {
        match child.kind() {
            "identifier" => {
                params.push(ParameterInfo::new(
                    node_text(child, source),
                    positional(keyword_only),
                ));
            }
            "typed_parameter" => {
                let annotation = child
                    .child_by_field_name("type")
                    .map(|n| expression_text(n, source));
                let param = if let Some(splat) = child_by_kind(child, "list_splat_pattern") {
                    keyword_only = true;
                    ParameterInfo::new(splat_name(splat, source), ParamKind::VarPositional)
                } else if let Some(splat) = child_by_kind(child, "dictionary_splat_pattern") {
                    ParameterInfo::new(splat_name(splat, source), ParamKind::VarKeyword)
                } else {
                    let name = child_by_kind(child, "identifier")
                        .map(|n| node_text(n, source))
                        .unwrap_or("");
                    ParameterInfo::new(name, positional(keyword_only))
                };
                params.push(ParameterInfo { annotation, ..param });
            }
            "default_parameter" | "typed_default_parameter" => {
                let name = child
                    .child_by_field_name("name")
                    .map(|n| node_text(n, source))
                    .unwrap_or("");
                let mut param = ParameterInfo::new(name, positional(keyword_only));
                param.annotation = child
                    .child_by_field_name("type")
                    .map(|n| expression_text(n, source));
                param.default = child
                    .child_by_field_name("value")
                    .map(|n| expression_text(n, source));
                params.push(param);
            }
            "list_splat_pattern" => {
                keyword_only = true;
                params.push(ParameterInfo::new(
                    splat_name(child, source),
                    ParamKind::VarPositional,
                ));
            }
            "dictionary_splat_pattern" => {
                params.push(ParameterInfo::new(
                    splat_name(child, source),
                    ParamKind::VarKeyword,
                ));
            }
            // bare `*`
            "keyword_separator" | "*" => keyword_only = true,
            _ => {}
        }
    }

    params
}

fn splat_name<'a>(splat: Node<'a>, source: &'a [u8]) -> &'a str {
    child_by_kind(splat, "identifier")
        .map(|n| node_text(n, source))
        .unwrap_or_else(|| node_text(splat, source).trim_start_matches('*'))
}

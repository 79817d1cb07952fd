//! Helpers over the tree-sitter Python grammar

use crate::error::ParseError;
use tree_sitter::{Node, Parser, Tree};

/// Parse `source` and reject trees containing ERROR or MISSING nodes
pub(crate) fn parse_tree(source: &str, filename: &str) -> Result<Tree, ParseError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| ParseError::Grammar(e.to_string()))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| ParseError::Aborted {
            filename: filename.to_string(),
        })?;

    let root = tree.root_node();
    if root.has_error() {
        let (line, column, message) = match first_error(root) {
            Some(bad) => {
                let position = bad.start_position();
                (position.row + 1, position.column + 1, describe_error(bad, source))
            }
            None => (1, 1, "unrecognized syntax".to_string()),
        };
        return Err(ParseError::InvalidSyntax {
            filename: filename.to_string(),
            line,
            column,
            message,
        });
    }

    Ok(tree)
}

fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(found) = first_error(child) {
            return Some(found);
        }
    }
    None
}

fn describe_error(node: Node, source: &str) -> String {
    if node.is_missing() {
        return format!("missing '{}'", node.kind());
    }
    let text = node_text(node, source.as_bytes());
    let first_line = text.lines().next().unwrap_or("").trim();
    let snippet: String = first_line.chars().take(30).collect();
    if snippet.is_empty() {
        "unexpected input".to_string()
    } else {
        format!("unexpected '{}'", snippet)
    }
}

/// Get text from a node, handling UTF-8 safely
pub(crate) fn node_text<'a>(node: Node<'a>, source: &'a [u8]) -> &'a str {
    std::str::from_utf8(&source[node.start_byte()..node.end_byte()]).unwrap_or("")
}

/// Find first child with given kind
pub(crate) fn child_by_kind<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find(|child| child.kind() == kind);
    found
}

/// Source text of an expression with whitespace runs collapsed
pub(crate) fn expression_text(node: Node, source: &[u8]) -> String {
    collapse_whitespace(node_text(node, source))
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace("[ ", "[")
        .replace("( ", "(")
        .replace(" ]", "]")
        .replace(" )", ")")
}

/// `a.b.c` for identifier/attribute chains, `None` for anything else
pub(crate) fn dotted_name(node: Node, source: &[u8]) -> Option<String> {
    match node.kind() {
        "identifier" | "dotted_name" => Some(node_text(node, source).to_string()),
        "attribute" => {
            let object = dotted_name(node.child_by_field_name("object")?, source)?;
            let attribute = node.child_by_field_name("attribute")?;
            Some(format!("{}.{}", object, node_text(attribute, source)))
        }
        _ => None,
    }
}

/// Value of a plain (non f-) string literal
pub(crate) fn string_literal(node: Node, source: &[u8]) -> Option<String> {
    match node.kind() {
        "string" => {
            if child_by_kind(node, "interpolation").is_some() {
                return None;
            }
            let text = node_text(node, source);
            let quote_at = text.find(|c: char| c == '"' || c == '\'')?;
            if text[..quote_at].contains(['f', 'F']) {
                return None;
            }
            let body = &text[quote_at..];
            ["\"\"\"", "'''", "\"", "'"].iter().find_map(|quote| {
                let inner = body.strip_prefix(*quote)?.strip_suffix(*quote)?;
                Some(inner.to_string())
            })
        }
        "concatenated_string" => {
            let mut cursor = node.walk();
            let parts: Option<Vec<String>> = node
                .named_children(&mut cursor)
                .map(|part| string_literal(part, source))
                .collect();
            parts.map(|parts| parts.concat())
        }
        "parenthesized_expression" => string_literal(node.named_child(0)?, source),
        _ => None,
    }
}

/// Elements of a list/tuple literal made only of strings
pub(crate) fn string_sequence(node: Node, source: &[u8]) -> Option<Vec<String>> {
    match node.kind() {
        "list" | "tuple" => {
            let mut cursor = node.walk();
            let items: Option<Vec<String>> = node
                .named_children(&mut cursor)
                .filter(|child| child.kind() != "comment")
                .map(|child| string_literal(child, source))
                .collect();
            items
        }
        "parenthesized_expression" => string_sequence(node.named_child(0)?, source),
        _ => None,
    }
}

use tree_sitter::Node;

use crate::util::{literal_string, string_value, txt, unwrap_expression};

/// Key of a read from `process.env`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvKey {
    Named(String),
    /// `process.env[expr]` with a non-literal key.
    Dynamic,
}

impl EnvKey {
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Named(n) => Some(n),
            Self::Dynamic => None,
        }
    }
}

/// Classify a member or subscript access as a `process.env` read.
pub fn env_access(node: Node, src: &[u8]) -> Option<EnvKey> {
    let object = node.child_by_field_name("object")?;
    if !is_env_namespace(object, src) {
        return None;
    }
    match node.kind() {
        "member_expression" => {
            let prop = node.child_by_field_name("property")?;
            Some(EnvKey::Named(txt(prop, src).to_string()))
        }
        "subscript_expression" => {
            let index = node.child_by_field_name("index").map(unwrap_expression);
            Some(
                index
                    .and_then(|i| literal_string(i, src))
                    .map_or(EnvKey::Dynamic, EnvKey::Named),
            )
        }
        _ => None,
    }
}

/// Whether `node` is the `process.env` object itself.
pub fn is_env_namespace(node: Node, src: &[u8]) -> bool {
    let node = unwrap_expression(node);
    if node.kind() != "member_expression" {
        return false;
    }
    let object = node.child_by_field_name("object").map(unwrap_expression);
    let property = node.child_by_field_name("property");
    matches!(
        (object, property),
        (Some(o), Some(p))
            if o.kind() == "identifier" && txt(o, src) == "process" && txt(p, src) == "env"
    )
}

/// Property keys pulled out of `process.env` by an object pattern.
///
/// `const { A, B: b, C = "x" } = process.env` yields `A`, `B`, `C`.
pub fn destructured_env_names(pattern: Node, src: &[u8]) -> Vec<String> {
    let mut names = Vec::new();
    if pattern.kind() != "object_pattern" {
        return names;
    }

    let mut cursor = pattern.walk();
    for prop in pattern.named_children(&mut cursor) {
        let name = match prop.kind() {
            "shorthand_property_identifier_pattern" => Some(txt(prop, src).to_string()),
            "pair_pattern" => prop.child_by_field_name("key").and_then(|k| key_name(k, src)),
            "object_assignment_pattern" => prop
                .child_by_field_name("left")
                .filter(|l| l.kind() == "shorthand_property_identifier_pattern")
                .map(|l| txt(l, src).to_string()),
            _ => None,
        };
        if let Some(name) = name {
            names.push(name);
        }
    }

    names
}

fn key_name(key: Node, src: &[u8]) -> Option<String> {
    match key.kind() {
        "property_identifier" => Some(txt(key, src).to_string()),
        "string" => Some(string_value(key, src)),
        "computed_property_name" => key
            .named_child(0)
            .and_then(|inner| literal_string(unwrap_expression(inner), src)),
        _ => None,
    }
}

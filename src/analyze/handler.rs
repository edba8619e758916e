use tree_sitter::Node;

use crate::model::HandlerCandidate;
use crate::util::{line_of, txt, unwrap_expression};

/// Conventional export name of a Lambda entry point.
pub const HANDLER_EXPORT: &str = "handler";

const DEFAULT_EXPORT: &str = "default";
const CJS_SOURCE: &str = "commonjs-export";
const ESM_SOURCE: &str = "esm-export";

/// Entry-point candidates declared by an `export` statement.
pub fn esm_candidates(stmt: Node, src: &[u8]) -> Vec<HandlerCandidate> {
    let mut names = Vec::new();

    let mut cursor = stmt.walk();
    let children: Vec<_> = stmt.children(&mut cursor).collect();
    for child in children {
        match child.kind() {
            "default" => names.push(DEFAULT_EXPORT.to_string()),
            "lexical_declaration" | "variable_declaration" => {
                let mut dc = child.walk();
                for decl in child.named_children(&mut dc) {
                    if let Some(name) = decl.child_by_field_name("name") {
                        names.push(txt(name, src).to_string());
                    }
                }
            }
            "function_declaration" | "generator_function_declaration" | "class_declaration" => {
                if let Some(name) = child.child_by_field_name("name") {
                    names.push(txt(name, src).to_string());
                }
            }
            "export_clause" => {
                let mut sc = child.walk();
                for spec in child.named_children(&mut sc) {
                    if spec.kind() != "export_specifier" {
                        continue;
                    }
                    let exported = spec
                        .child_by_field_name("alias")
                        .or_else(|| spec.child_by_field_name("name"));
                    if let Some(n) = exported {
                        names.push(txt(n, src).to_string());
                    }
                }
            }
            _ => {}
        }
    }

    names
        .into_iter()
        .filter(|n| n == HANDLER_EXPORT || n == DEFAULT_EXPORT)
        .map(|export| HandlerCandidate {
            export,
            source: ESM_SOURCE,
            line: line_of(stmt),
        })
        .collect()
}

/// Entry-point candidates declared by a CommonJS assignment.
///
/// Recognizes `exports.handler = ...`, `module.exports.handler = ...` and
/// `module.exports = { handler }`.
pub fn commonjs_candidates(assign: Node, src: &[u8]) -> Vec<HandlerCandidate> {
    let (Some(left), Some(right)) = (
        assign.child_by_field_name("left").map(unwrap_expression),
        assign.child_by_field_name("right").map(unwrap_expression),
    ) else {
        return Vec::new();
    };

    let exported = if is_module_exports(left, src) {
        object_keys(right, src)
    } else if left.kind() == "member_expression" {
        let target = left.child_by_field_name("object").map(unwrap_expression);
        let property = left.child_by_field_name("property");
        match (target, property) {
            (Some(t), Some(p)) if is_exports_object(t, src) => vec![txt(p, src).to_string()],
            _ => Vec::new(),
        }
    } else {
        Vec::new()
    };

    exported
        .into_iter()
        .filter(|n| n == HANDLER_EXPORT)
        .map(|export| HandlerCandidate {
            export,
            source: CJS_SOURCE,
            line: line_of(assign),
        })
        .collect()
}

fn is_exports_object(node: Node, src: &[u8]) -> bool {
    (node.kind() == "identifier" && txt(node, src) == "exports") || is_module_exports(node, src)
}

fn is_module_exports(node: Node, src: &[u8]) -> bool {
    if node.kind() != "member_expression" {
        return false;
    }
    let object = node.child_by_field_name("object").map(unwrap_expression);
    let property = node.child_by_field_name("property");
    matches!(
        (object, property),
        (Some(o), Some(p))
            if o.kind() == "identifier" && txt(o, src) == "module" && txt(p, src) == "exports"
    )
}

fn object_keys(node: Node, src: &[u8]) -> Vec<String> {
    if node.kind() != "object" {
        return Vec::new();
    }
    let mut keys = Vec::new();
    let mut cursor = node.walk();
    for prop in node.named_children(&mut cursor) {
        let key = match prop.kind() {
            "shorthand_property_identifier" => Some(prop),
            "pair" | "method_definition" => {
                prop.child_by_field_name("key").or_else(|| prop.child_by_field_name("name"))
            }
            _ => None,
        };
        if let Some(k) = key {
            keys.push(crate::util::trim_quotes(txt(k, src)).to_string());
        }
    }
    keys
}

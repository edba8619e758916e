use tree_sitter::Node;

use crate::util::{call_arguments, first_named_child, string_value, txt, unwrap_expression};

/// Module named by a static `require("x")` or `import("x")` call.
///
/// Only a single string-literal argument counts; computed specifiers are
/// skipped.
pub fn loaded_module(call: Node, src: &[u8]) -> Option<String> {
    let callee = unwrap_expression(call.child_by_field_name("function")?);
    let is_loader = match callee.kind() {
        "identifier" => txt(callee, src) == "require",
        "import" => true,
        _ => false,
    };
    if !is_loader {
        return None;
    }
    match call_arguments(call).as_slice() {
        [arg] if arg.kind() == "string" => Some(string_value(*arg, src)),
        _ => None,
    }
}

/// Source module of an `import` statement or an `export ... from` re-export.
pub fn statement_source(stmt: Node, src: &[u8]) -> Option<String> {
    if !matches!(stmt.kind(), "import_statement" | "export_statement") {
        return None;
    }
    let source = stmt.child_by_field_name("source")?;
    (source.kind() == "string").then(|| string_value(source, src))
}

/// Names an import statement binds, as `(imported, local)` pairs.
///
/// Default and namespace imports appear with an empty imported name.
pub fn import_bindings(stmt: Node, src: &[u8]) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut cursor = stmt.walk();
    for clause in stmt.named_children(&mut cursor) {
        if clause.kind() != "import_clause" {
            continue;
        }
        let mut cc = clause.walk();
        for part in clause.named_children(&mut cc) {
            match part.kind() {
                "identifier" => out.push((String::new(), txt(part, src).to_string())),
                "namespace_import" => {
                    if let Some(id) = first_named_child(part) {
                        out.push((String::new(), txt(id, src).to_string()));
                    }
                }
                "named_imports" => {
                    let mut nc = part.walk();
                    for spec in part.named_children(&mut nc) {
                        if spec.kind() != "import_specifier" {
                            continue;
                        }
                        let Some(name) = spec.child_by_field_name("name") else {
                            continue;
                        };
                        let imported = txt(name, src).to_string();
                        let local = spec
                            .child_by_field_name("alias")
                            .map_or_else(|| imported.clone(), |a| txt(a, src).to_string());
                        out.push((imported, local));
                    }
                }
                _ => {}
            }
        }
    }
    out
}

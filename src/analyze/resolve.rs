//! Symbolic evaluation of expressions.
//!
//! Resolution never executes code and never fails: every expression shape
//! maps to a [`ResolvedValue`], with `unknown` components standing in for
//! anything that cannot be known statically. Calls are never followed.

use std::collections::BTreeSet;

use tree_sitter::Node;

use crate::model::{ResolvedValue, ValueComponent};
use crate::util::{first_named_child, string_value, txt, unescape, unwrap_expression};

use super::env::env_access;
use super::scope::ScopeStack;

/// Deepest nesting level resolved before giving up.
pub const MAX_DEPTH: usize = 10;

/// Raised when resolution nests past [`MAX_DEPTH`]; collapses the whole value
/// to one `unknown` that keeps the env names read before the limit.
#[derive(Debug)]
struct DepthExceeded;

/// State threaded through one resolution.
struct Chain {
    /// Bindings currently being followed, as `(name, frame)`.
    visiting: Vec<(String, usize)>,
    /// Frame identifier lookups start from.
    frame: usize,
    /// Every env name met so far, including in abandoned branches.
    env_seen: BTreeSet<String>,
}

/// Resolves expressions against the bindings visible at one point of a file.
pub struct Resolver<'a, 't> {
    scopes: &'a ScopeStack<'t>,
    src: &'a [u8],
}

impl<'a, 't> Resolver<'a, 't> {
    pub fn new(scopes: &'a ScopeStack<'t>, src: &'a [u8]) -> Self {
        Self { scopes, src }
    }

    pub fn resolve(&self, node: Node<'t>) -> ResolvedValue {
        let mut chain = Chain {
            visiting: Vec::new(),
            frame: self.scopes.top(),
            env_seen: BTreeSet::new(),
        };
        match self.resolve_at(node, 0, &mut chain) {
            Ok(value) => value,
            Err(DepthExceeded) => {
                let mut value = ResolvedValue::unknown("<max depth>");
                value.referenced_env_vars = chain.env_seen;
                value
            }
        }
    }

    fn resolve_at(
        &self,
        node: Node<'t>,
        depth: usize,
        chain: &mut Chain,
    ) -> Result<ResolvedValue, DepthExceeded> {
        if depth > MAX_DEPTH {
            return Err(DepthExceeded);
        }

        let node = unwrap_expression(node);
        let value = match node.kind() {
            "string" => ResolvedValue::literal(&string_value(node, self.src)),
            "template_string" => self.resolve_template(node, depth, chain)?,
            "identifier" => self.resolve_identifier(node, depth, chain)?,
            "member_expression" | "subscript_expression" => match env_access(node, self.src) {
                Some(key) => {
                    if let Some(name) = key.name() {
                        chain.env_seen.insert(name.to_string());
                    }
                    ResolvedValue::env(key.name())
                }
                None => ResolvedValue::unknown("<member expression>"),
            },
            "binary_expression" if is_concatenation(node, self.src) => {
                self.resolve_concatenation(node, depth, chain)?
            }
            "call_expression" => ResolvedValue::unknown("<function call>"),
            _ => ResolvedValue::unknown("<unknown>"),
        };
        Ok(value)
    }

    /// Interleave static template text with resolved substitutions.
    ///
    /// Static text is sliced from the source between substitutions, so the
    /// result does not depend on how the grammar splits template chars.
    fn resolve_template(
        &self,
        node: Node<'t>,
        depth: usize,
        chain: &mut Chain,
    ) -> Result<ResolvedValue, DepthExceeded> {
        let mut value = ResolvedValue::empty();
        let mut pos = node.start_byte() + 1;
        let end = node.end_byte().saturating_sub(1);

        let mut cursor = node.walk();
        let substitutions: Vec<_> = node
            .named_children(&mut cursor)
            .filter(|c| c.kind() == "template_substitution")
            .collect();

        for sub in substitutions {
            self.push_static(&mut value, pos, sub.start_byte());
            let part = match first_named_child(sub).filter(|e| !e.is_error()) {
                Some(expr) => self.resolve_at(expr, depth + 1, chain)?,
                None => ResolvedValue::unknown("<type>"),
            };
            value.append(part);
            pos = sub.end_byte();
        }
        self.push_static(&mut value, pos, end);

        if value.components.is_empty() {
            value.push_literal("");
        }
        Ok(value)
    }

    fn push_static(&self, value: &mut ResolvedValue, start: usize, end: usize) {
        if start >= end {
            return;
        }
        let raw = self
            .src
            .get(start..end)
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
            .unwrap_or_default();
        if !raw.is_empty() {
            value.push_literal(&unescape(raw));
        }
    }

    fn resolve_identifier(
        &self,
        node: Node<'t>,
        depth: usize,
        chain: &mut Chain,
    ) -> Result<ResolvedValue, DepthExceeded> {
        let name = txt(node, self.src);
        let Some(binding) = self.scopes.lookup(name, chain.frame) else {
            return Ok(ResolvedValue::unbound(name));
        };
        // Parameters and loop variables shadow outer names with no known value.
        let Some(init) = binding.init else {
            return Ok(ResolvedValue::unbound(name));
        };
        if chain
            .visiting
            .iter()
            .any(|(n, frame)| n == name && *frame == binding.frame)
        {
            return Ok(ResolvedValue::unknown("<cycle>"));
        }

        chain.visiting.push((name.to_string(), binding.frame));
        let outer_frame = std::mem::replace(&mut chain.frame, binding.frame);
        let resolved = self.resolve_at(init, depth + 1, chain);
        chain.frame = outer_frame;
        chain.visiting.pop();

        Ok(retag_literal(resolved?, name))
    }

    fn resolve_concatenation(
        &self,
        node: Node<'t>,
        depth: usize,
        chain: &mut Chain,
    ) -> Result<ResolvedValue, DepthExceeded> {
        let mut value = ResolvedValue::empty();
        for side in ["left", "right"] {
            let part = match node.child_by_field_name(side).filter(|n| !n.is_error()) {
                Some(operand) => self.resolve_at(operand, depth + 1, chain)?,
                None => ResolvedValue::unknown("<unknown>"),
            };
            value.append(part);
        }
        Ok(value)
    }
}

fn is_concatenation(node: Node, src: &[u8]) -> bool {
    node.child_by_field_name("operator")
        .is_some_and(|op| txt(op, src) == "+")
}

/// A binding that resolved to one literal becomes a `variable` carrying it.
fn retag_literal(mut value: ResolvedValue, name: &str) -> ResolvedValue {
    if let [ValueComponent::Literal { value: literal }] = value.components.as_mut_slice() {
        let literal = std::mem::take(literal);
        value.components = vec![ValueComponent::Variable {
            name: name.to_string(),
            value: Some(literal),
        }];
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ValueComponent as C;

    fn parse(src: &str) -> tree_sitter::Tree {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into())
            .unwrap();
        parser.parse(src, None).unwrap()
    }

    /// Bind every top-level `let`/`const` and resolve the final expression statement.
    fn resolve_last(src: &str) -> ResolvedValue {
        let tree = parse(src);
        let root = tree.root_node();
        let mut scopes = ScopeStack::new();
        let mut last = None;

        let mut cursor = root.walk();
        for stmt in root.named_children(&mut cursor) {
            match stmt.kind() {
                "lexical_declaration" => {
                    let mut dc = stmt.walk();
                    for decl in stmt.named_children(&mut dc) {
                        if let (Some(name), Some(value)) = (
                            decl.child_by_field_name("name"),
                            decl.child_by_field_name("value"),
                        ) {
                            scopes.declare_lexical(txt(name, src.as_bytes()), value);
                        }
                    }
                }
                "expression_statement" => last = stmt.named_child(0),
                _ => {}
            }
        }

        Resolver::new(&scopes, src.as_bytes()).resolve(last.expect("expression statement"))
    }

    fn lit(v: &str) -> C {
        C::Literal { value: v.into() }
    }

    fn var(n: &str) -> C {
        C::Variable {
            name: n.into(),
            value: None,
        }
    }

    #[test]
    fn string_literal_is_fully_static() {
        let r = resolve_last(r#""https://api.example.com";"#);
        assert!(r.is_fully_static);
        assert_eq!(r.components, vec![lit("https://api.example.com")]);
        assert_eq!(r.approximate_text, "https://api.example.com");
        assert!(r.referenced_env_vars.is_empty());
    }

    #[test]
    fn string_escapes_are_cooked() {
        let r = resolve_last(r#"'it\'s';"#);
        assert_eq!(r.approximate_text, "it's");
    }

    #[test]
    fn concatenation_with_unbound_variable() {
        let r = resolve_last(r#""https://" + HOST_VAR + "/x";"#);
        assert_eq!(r.components, vec![lit("https://"), var("HOST_VAR"), lit("/x")]);
        assert!(!r.is_fully_static);
        assert_eq!(r.approximate_text, "https://${HOST_VAR}/x");
    }

    #[test]
    fn deep_concatenation_collapses_to_unknown() {
        let chain = vec!["'a'"; 13].join(" + ");
        let r = resolve_last(&format!("{chain};"));
        assert_eq!(r.components, vec![C::Unknown]);
        assert_eq!(r.approximate_text, "<max depth>");
        assert!(!r.is_fully_static);
    }

    #[test]
    fn concatenation_within_depth_limit_resolves() {
        let chain = vec!["'a'"; 11].join(" + ");
        let r = resolve_last(&format!("{chain};"));
        assert!(r.is_fully_static);
        assert_eq!(r.approximate_text, "a".repeat(11));
        assert_eq!(r.components.len(), 11);
    }

    #[test]
    fn template_with_bound_and_unbound_parts() {
        let r = resolve_last("const A = 'x';\n`${A}-${B}`;");
        assert!(r.approximate_text.starts_with("x-"));
        assert_eq!(r.approximate_text, "x-${B}");
        assert!(!r.is_fully_static);
        assert_eq!(
            r.components,
            vec![
                C::Variable {
                    name: "A".into(),
                    value: Some("x".into())
                },
                lit("-"),
                var("B"),
            ]
        );
    }

    #[test]
    fn empty_template_is_empty_literal() {
        let r = resolve_last("``;");
        assert_eq!(r.components, vec![lit("")]);
        assert!(r.is_fully_static);
    }

    #[test]
    fn plain_template_is_static() {
        let r = resolve_last("`https://api.example.com/v1`;");
        assert_eq!(r.components, vec![lit("https://api.example.com/v1")]);
        assert!(r.is_fully_static);
    }

    #[test]
    fn bound_literal_is_retagged_and_stays_static() {
        let r = resolve_last("const url = 'https://a.example';\nurl;");
        assert_eq!(
            r.components,
            vec![C::Variable {
                name: "url".into(),
                value: Some("https://a.example".into())
            }]
        );
        assert_eq!(r.approximate_text, "https://a.example");
        assert!(r.is_fully_static);
    }

    #[test]
    fn bound_composite_propagates_unchanged() {
        let r = resolve_last("const base = 'https://a.example' + path;\nbase;");
        assert_eq!(r.components, vec![lit("https://a.example"), var("path")]);
    }

    #[test]
    fn env_reads_are_named_components() {
        let r = resolve_last("process.env.API_URL + '/users';");
        assert_eq!(
            r.components,
            vec![
                C::Env {
                    name: Some("API_URL".into())
                },
                lit("/users")
            ]
        );
        assert_eq!(r.approximate_text, "${process.env.API_URL}/users");
        assert!(r.referenced_env_vars.contains("API_URL"));
        assert!(!r.is_fully_static);
    }

    #[test]
    fn dynamic_env_read_has_no_name() {
        let r = resolve_last("process.env[key];");
        assert_eq!(r.components, vec![C::Env { name: None }]);
        assert_eq!(r.approximate_text, "${process.env.<dynamic>}");
        assert!(r.referenced_env_vars.is_empty());
    }

    #[test]
    fn env_through_bindings_is_reported() {
        let r = resolve_last("const BASE = process.env.BASE;\nconst url = `${BASE}/orders`;\nurl;");
        assert_eq!(
            r.components,
            vec![
                C::Env {
                    name: Some("BASE".into())
                },
                lit("/orders")
            ]
        );
        assert!(r.referenced_env_vars.contains("BASE"));
    }

    #[test]
    fn calls_are_never_evaluated() {
        let r = resolve_last("getBaseUrl();");
        assert_eq!(r.components, vec![C::Unknown]);
        assert_eq!(r.approximate_text, "<function call>");
    }

    #[test]
    fn other_member_access_is_unknown() {
        let r = resolve_last("config.url;");
        assert_eq!(r.components, vec![C::Unknown]);
        assert_eq!(r.approximate_text, "<member expression>");
    }

    #[test]
    fn other_operators_are_unknown() {
        let r = resolve_last("'a' - 'b';");
        assert_eq!(r.components, vec![C::Unknown]);
        let r = resolve_last("42;");
        assert_eq!(r.approximate_text, "<unknown>");
    }

    #[test]
    fn type_wrappers_are_transparent() {
        let r = resolve_last("const u = ('https://x.example' as string);\n(u!);");
        assert!(r.is_fully_static);
        assert_eq!(r.approximate_text, "https://x.example");
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let r = resolve_last("const a = b + '/x';\nconst b = a;\nb;");
        assert_eq!(r.components, vec![C::Unknown, lit("/x")]);
        assert_eq!(r.approximate_text, "<cycle>/x");
    }

    #[test]
    fn repeated_name_in_siblings_is_not_a_cycle() {
        let r = resolve_last("const h = 'x';\n`${h}.${h}`;");
        assert_eq!(r.approximate_text, "x.x");
        assert!(r.is_fully_static);
    }

    #[test]
    fn long_binding_chain_exhausts_depth() {
        let mut src = String::from("const a0 = 'x';\n");
        for i in 1..=12 {
            src.push_str(&format!("const a{i} = a{};\n", i - 1));
        }
        src.push_str("a12;");
        let r = resolve_last(&src);
        assert_eq!(r.components, vec![C::Unknown]);
        assert_eq!(r.approximate_text, "<max depth>");
    }

    #[test]
    fn depth_collapse_keeps_env_names_read_before_the_limit() {
        let mut src = String::from("const a0 = 'x';\n");
        for i in 1..=12 {
            src.push_str(&format!("const a{i} = a{};\n", i - 1));
        }
        src.push_str("'https://api.example.com/' + process.env.STAGE + '/' + a12;");
        let r = resolve_last(&src);
        assert_eq!(r.components, vec![C::Unknown]);
        assert_eq!(r.approximate_text, "<max depth>");
        assert!(r.referenced_env_vars.contains("STAGE"));
        assert!(!r.is_fully_static);
    }
}

use std::path::Path;

use tree_sitter::Node;

/// Extract UTF-8 text from a tree-sitter node, returning `""` on failure.
pub fn txt<'a>(node: Node, src: &'a [u8]) -> &'a str {
    node.utf8_text(src).unwrap_or("")
}

/// Strip surrounding quotes (`'`, `"`, `` ` ``) from a string literal.
pub fn trim_quotes(s: &str) -> &str {
    s.trim_matches(|c: char| c == '\'' || c == '"' || c == '`')
}

/// Cooked value of a `string` node: quotes removed, escapes decoded.
pub fn string_value(node: Node, src: &[u8]) -> String {
    let raw = txt(node, src);
    let inner = raw
        .get(1..raw.len().saturating_sub(1))
        .unwrap_or_default();
    unescape(inner)
}

/// Cooked value of a template string with no substitutions, or `None`.
pub fn plain_template_value(node: Node, src: &[u8]) -> Option<String> {
    if node.kind() != "template_string" {
        return None;
    }
    let mut cursor = node.walk();
    if node
        .named_children(&mut cursor)
        .any(|c| c.kind() == "template_substitution")
    {
        return None;
    }
    Some(string_value(node, src))
}

/// Literal string value of a `string` or substitution-free template node.
pub fn literal_string(node: Node, src: &[u8]) -> Option<String> {
    match node.kind() {
        "string" => Some(string_value(node, src)),
        "template_string" => plain_template_value(node, src),
        _ => None,
    }
}

/// Decode JavaScript string escape sequences.
///
/// Malformed escapes pass through as the escaped character.
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(esc) = chars.next() else {
            break;
        };
        match esc {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' => out.push('\0'),
            // Line continuation
            '\n' => {}
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            'x' => {
                let hex: String = chars.by_ref().take(2).collect();
                push_code_point(&mut out, &hex, 'x');
            }
            'u' => {
                let hex: String = if chars.peek() == Some(&'{') {
                    chars.next();
                    chars.by_ref().take_while(|&h| h != '}').collect()
                } else {
                    chars.by_ref().take(4).collect()
                };
                push_code_point(&mut out, &hex, 'u');
            }
            other => out.push(other),
        }
    }

    out
}

fn push_code_point(out: &mut String, hex: &str, fallback: char) {
    match u32::from_str_radix(hex, 16).ok().and_then(char::from_u32) {
        Some(ch) => out.push(ch),
        None => {
            out.push(fallback);
            out.push_str(hex);
        }
    }
}

/// Strip wrappers with no runtime effect: parentheses, `as`, `satisfies`,
/// non-null `!` and `<T>` assertions.
pub fn unwrap_expression(mut node: Node) -> Node {
    loop {
        let inner = match node.kind() {
            "parenthesized_expression" | "as_expression" | "satisfies_expression"
            | "non_null_expression" => first_named_child(node),
            // `<T>expr`: the expression follows the type arguments.
            "type_assertion" => node.named_child(node.named_child_count().saturating_sub(1)),
            _ => None,
        };
        match inner {
            Some(n) => node = n,
            None => return node,
        }
    }
}

/// Argument expressions of a call, skipping comments.
pub fn call_arguments(call: Node) -> Vec<Node> {
    let Some(args) = call.child_by_field_name("arguments") else {
        return Vec::new();
    };
    if args.kind() != "arguments" {
        return Vec::new();
    }
    let mut cursor = args.walk();
    let found: Vec<_> = args
        .named_children(&mut cursor)
        .filter(|n| n.kind() != "comment")
        .collect();
    found
}

/// First named child that is not a comment.
pub fn first_named_child(node: Node) -> Option<Node> {
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .find(|n| n.kind() != "comment");
    found
}

/// 1-based line of a node.
pub fn line_of(node: Node) -> usize {
    node.start_position().row + 1
}

/// Path of `path` relative to `root`, with `/` separators.
pub fn relative_path(path: &Path, root: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let joined: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if joined.is_empty() {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    } else {
        joined.join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse(src: &[u8]) -> tree_sitter::Tree {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into())
            .unwrap();
        parser.parse(src, None).unwrap()
    }

    fn first_expression(tree: &tree_sitter::Tree) -> Node<'_> {
        let stmt = tree.root_node().named_child(0).unwrap();
        stmt.named_child(0).unwrap()
    }

    #[test]
    fn unescape_decodes_common_escapes() {
        assert_eq!(unescape(r"a\nb\tc"), "a\nb\tc");
        assert_eq!(unescape(r#"\"q\" \'s\'"#), "\"q\" 's'");
        assert_eq!(unescape(r"\x41B\u{43}"), "ABC");
        assert_eq!(unescape(r"back\\slash"), "back\\slash");
    }

    #[test]
    fn unescape_keeps_malformed_escapes() {
        assert_eq!(unescape(r"\xZZ"), "xZZ");
        assert_eq!(unescape(r"\q"), "q");
    }

    #[test]
    fn string_value_strips_quotes() {
        let src = br#"'https://api.example.com/a';"#;
        let tree = parse(src);
        let node = first_expression(&tree);
        assert_eq!(node.kind(), "string");
        assert_eq!(string_value(node, src), "https://api.example.com/a");
    }

    #[test]
    fn literal_string_accepts_plain_templates_only() {
        let src = b"`plain`;";
        let tree = parse(src);
        assert_eq!(literal_string(first_expression(&tree), src), Some("plain".into()));

        let src = b"`a${b}`;";
        let tree = parse(src);
        assert_eq!(literal_string(first_expression(&tree), src), None);
    }

    #[test]
    fn unwrap_expression_strips_type_wrappers() {
        let src = b"((url as string)!) satisfies string;";
        let tree = parse(src);
        let node = unwrap_expression(first_expression(&tree));
        assert_eq!(node.kind(), "identifier");
        assert_eq!(txt(node, src), "url");
    }

    #[test]
    fn call_arguments_skips_comments() {
        let src = b"require(/* pkg */ 'x');";
        let tree = parse(src);
        let call = first_expression(&tree);
        let args = call_arguments(call);
        assert_eq!(args.len(), 1);
        assert_eq!(args[0].kind(), "string");
    }

    #[test]
    fn relative_path_uses_forward_slashes() {
        let root = PathBuf::from("/fn");
        let file = root.join("src").join("index.js");
        assert_eq!(relative_path(&file, &root), "src/index.js");
    }

    #[test]
    fn relative_path_of_root_file_is_its_name() {
        let file = PathBuf::from("/fn/index.js");
        assert_eq!(relative_path(&file, &file), "index.js");
    }

    #[test]
    fn trim_quotes_handles_all_quote_styles() {
        assert_eq!(trim_quotes("'a'"), "a");
        assert_eq!(trim_quotes("\"b\""), "b");
        assert_eq!(trim_quotes("`c`"), "c");
    }
}

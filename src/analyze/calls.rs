use tree_sitter::Node;

use crate::model::HttpCallSite;
use crate::util::{call_arguments, line_of, string_value, txt, unwrap_expression};

use super::resolve::Resolver;

/// Clients invoked directly as `client(url, ...)`.
const CALLABLE_CLIENTS: &[&str] = &["fetch", "axios", "got", "ky", "superagent", "request", "needle"];

/// Clients whose methods name the request verb: `client.post(url)`.
const METHOD_CLIENTS: &[&str] = &["axios", "got", "ky", "superagent", "request", "needle", "http", "https"];

const HTTP_METHODS: &[&str] = &["get", "post", "put", "patch", "delete", "head", "options"];

/// The client that defaults to `GET` when called directly.
const DEFAULT_GET_CLIENT: &str = "fetch";

/// Detect an HTTP request at `call` and resolve its URL argument.
///
/// `display_path` is the file's path as reported in `location`.
pub fn detect_http_call<'t>(
    call: Node<'t>,
    src: &[u8],
    resolver: &Resolver<'_, 't>,
    display_path: &str,
) -> Option<HttpCallSite> {
    let callee = unwrap_expression(call.child_by_field_name("function")?);
    let args = call_arguments(call);

    let method = match callee.kind() {
        "identifier" => {
            let name = txt(callee, src);
            if !CALLABLE_CLIENTS.contains(&name) {
                return None;
            }
            if name == DEFAULT_GET_CLIENT {
                args.get(1)
                    .and_then(|opts| method_option(*opts, src))
                    .unwrap_or_else(|| "GET".to_string())
            } else {
                "unknown".to_string()
            }
        }
        "member_expression" => {
            let object = unwrap_expression(callee.child_by_field_name("object")?);
            let property = callee.child_by_field_name("property")?;
            let member = txt(property, src);
            if object.kind() != "identifier"
                || !METHOD_CLIENTS.contains(&txt(object, src))
                || !HTTP_METHODS.contains(&member)
            {
                return None;
            }
            member.to_ascii_uppercase()
        }
        _ => return None,
    };

    let url_arg = *args.first()?;
    Some(HttpCallSite {
        url: resolver.resolve(url_arg),
        method,
        location: format!("{display_path}:{}", line_of(call)),
    })
}

/// `method` from an options object literal: `fetch(url, { method: "POST" })`.
fn method_option(node: Node, src: &[u8]) -> Option<String> {
    let node = unwrap_expression(node);
    if node.kind() != "object" {
        return None;
    }
    let mut cursor = node.walk();
    let pairs: Vec<_> = node
        .named_children(&mut cursor)
        .filter(|c| c.kind() == "pair")
        .collect();
    pairs.into_iter().find_map(|pair| {
        let key = pair.child_by_field_name("key")?;
        let key_text = match key.kind() {
            "string" => string_value(key, src),
            _ => txt(key, src).to_string(),
        };
        if key_text != "method" {
            return None;
        }
        let value = unwrap_expression(pair.child_by_field_name("value")?);
        (value.kind() == "string").then(|| string_value(value, src).to_ascii_uppercase())
    })
}

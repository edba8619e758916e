//! Per-file analysis: one traversal of a syntax tree driving the binding
//! tracker, the environment collector and every call-site detector.

mod aws;
mod calls;
mod deps;
mod env;
mod handler;
mod resolve;
mod scope;

use tracing::debug;
use tree_sitter::{Node, Tree};

use crate::discover::SourceFile;
use crate::error::AnalyzerError;
use crate::lang::ModuleSystem;
use crate::model::{Dependency, FileAnalysis};
use crate::parser::parse_file;
use crate::util::{txt, unwrap_expression};

use self::aws::AwsCollector;
use self::env::EnvKey;
use self::resolve::Resolver;
use self::scope::{FrameKind, ScopeStack};

pub use self::handler::HANDLER_EXPORT;

/// Parse and analyze one source file.
pub fn analyze_file(file: &SourceFile) -> Result<FileAnalysis, AnalyzerError> {
    let parsed = parse_file(&file.path)?;
    Ok(analyze_source(
        &parsed.tree,
        &parsed.source,
        &file.display_path,
        file.module,
    ))
}

/// Analyze an already parsed tree.
pub fn analyze_source(
    tree: &Tree,
    source: &str,
    display_path: &str,
    module: ModuleSystem,
) -> FileAnalysis {
    let mut walker = FileWalker {
        src: source.as_bytes(),
        scopes: ScopeStack::new(),
        aws: AwsCollector::default(),
        out: FileAnalysis::new(display_path, module),
    };
    walker.visit(tree.root_node());

    let FileWalker { aws, mut out, .. } = walker;
    out.aws = aws.finish();
    if out.dynamic_env_reads > 0 {
        out.warnings.push(format!(
            "{display_path}: {} process.env read(s) with a computed key could not be resolved",
            out.dynamic_env_reads
        ));
    }
    debug!(
        file = display_path,
        env = out.env_vars.len(),
        http = out.http_calls.len(),
        deps = out.dependencies.len(),
        "analyzed"
    );
    out
}

struct FileWalker<'a, 't> {
    src: &'a [u8],
    scopes: ScopeStack<'t>,
    aws: AwsCollector,
    out: FileAnalysis,
}

impl<'a, 't> FileWalker<'a, 't> {
    /// Walk every named node in document order without recursion, so
    /// arbitrarily deep trees cannot exhaust the thread's stack.
    fn visit(&mut self, root: Node<'t>) {
        let mut cursor = root.walk();
        loop {
            self.open(cursor.node());
            if cursor.goto_first_child() {
                continue;
            }
            loop {
                self.close(cursor.node());
                if cursor.goto_next_sibling() {
                    break;
                }
                if !cursor.goto_parent() {
                    return;
                }
            }
        }
    }

    fn open(&mut self, node: Node<'t>) {
        if !node.is_named() {
            return;
        }
        if let Some(kind) = frame_kind(node.kind()) {
            self.scopes.push(kind);
            self.bind_runtime_names(node);
        }
        self.enter(node);
    }

    fn close(&mut self, node: Node<'t>) {
        if !node.is_named() {
            return;
        }
        if frame_kind(node.kind()).is_some() {
            self.scopes.pop();
        }
        if node.kind() == "variable_declarator" {
            self.declare(node);
        }
    }

    /// Shadow outer names with the parameters, `catch` binding or loop
    /// variable a frame introduces.
    fn bind_runtime_names(&mut self, node: Node<'t>) {
        let fields: &[&str] = match node.kind() {
            "catch_clause" => &["parameter"],
            "for_in_statement" => &["left"],
            _ => &["parameters", "parameter"],
        };
        let mut names = Vec::new();
        for field in fields {
            if let Some(pattern) = node.child_by_field_name(field) {
                pattern_names(pattern, self.src, &mut names);
            }
        }
        for name in names {
            self.scopes.declare_opaque(name);
        }
    }

    fn enter(&mut self, node: Node<'t>) {
        match node.kind() {
            "member_expression" | "subscript_expression" => match env::env_access(node, self.src) {
                Some(EnvKey::Named(name)) => {
                    self.out.env_vars.insert(name);
                }
                Some(EnvKey::Dynamic) => self.out.dynamic_env_reads += 1,
                None => {}
            },
            "call_expression" => self.call(node),
            "new_expression" => {
                self.aws.constructed(node, self.src);
            }
            "import_statement" => {
                if let Some(module) = deps::statement_source(node, self.src) {
                    let bindings = deps::import_bindings(node, self.src);
                    self.module_loaded(&module);
                    self.aws.module_bound(&module, &bindings);
                }
            }
            "export_statement" => {
                if let Some(module) = deps::statement_source(node, self.src) {
                    self.module_loaded(&module);
                }
                self.out
                    .handlers
                    .extend(handler::esm_candidates(node, self.src));
            }
            "assignment_expression" => {
                self.out
                    .handlers
                    .extend(handler::commonjs_candidates(node, self.src));
            }
            _ => {}
        }
    }

    fn call(&mut self, call: Node<'t>) {
        let resolver = Resolver::new(&self.scopes, self.src);
        if let Some(site) =
            calls::detect_http_call(call, self.src, &resolver, &self.out.display_path)
        {
            self.out
                .env_vars
                .extend(site.url.referenced_env_vars.iter().cloned());
            self.out.http_calls.push(site);
        }
        if let Some(module) = deps::loaded_module(call, self.src) {
            self.module_loaded(&module);
        }
        self.aws.method_called(call, self.src);
    }

    fn module_loaded(&mut self, module: &str) {
        self.out.dependencies.push(Dependency::loaded(module));
        self.aws.module_loaded(module);
    }

    /// Bind a declarator once its initializer has been walked.
    fn declare(&mut self, decl: Node<'t>) {
        let (Some(name), Some(value)) = (
            decl.child_by_field_name("name"),
            decl.child_by_field_name("value"),
        ) else {
            return;
        };
        let init = unwrap_expression(value);
        let required = (init.kind() == "call_expression")
            .then(|| deps::loaded_module(init, self.src))
            .flatten();

        match name.kind() {
            "identifier" => {
                let local = txt(name, self.src);
                let is_var = decl
                    .parent()
                    .is_some_and(|p| p.kind() == "variable_declaration");
                if is_var {
                    self.scopes.declare_var(local, value);
                } else {
                    self.scopes.declare_lexical(local, value);
                }

                if init.kind() == "new_expression" {
                    self.aws.bind_client(local, init, self.src);
                }
                if let Some(module) = required {
                    self.aws
                        .module_bound(&module, &[(String::new(), local.to_string())]);
                }
            }
            "object_pattern" => {
                if env::is_env_namespace(init, self.src) {
                    self.out
                        .env_vars
                        .extend(env::destructured_env_names(name, self.src));
                } else if let Some(module) = required {
                    let bindings = pattern_bindings(name, self.src);
                    self.aws.module_bound(&module, &bindings);
                }
            }
            _ => {}
        }
    }
}

fn frame_kind(kind: &str) -> Option<FrameKind> {
    match kind {
        "function_declaration"
        | "function_expression"
        | "function"
        | "generator_function"
        | "generator_function_declaration"
        | "arrow_function"
        | "method_definition" => Some(FrameKind::Function),
        "statement_block" | "class_body" | "for_statement" | "for_in_statement"
        | "switch_body" | "catch_clause" => Some(FrameKind::Block),
        _ => None,
    }
}

/// Local names bound by a parameter list or destructuring pattern.
fn pattern_names<'s>(node: Node, src: &'s [u8], out: &mut Vec<&'s str>) {
    match node.kind() {
        "identifier" | "shorthand_property_identifier_pattern" => out.push(txt(node, src)),
        "required_parameter" | "optional_parameter" => {
            if let Some(pattern) = node.child_by_field_name("pattern") {
                pattern_names(pattern, src, out);
            }
        }
        "assignment_pattern" | "object_assignment_pattern" => {
            if let Some(left) = node.child_by_field_name("left") {
                pattern_names(left, src, out);
            }
        }
        "pair_pattern" => {
            if let Some(value) = node.child_by_field_name("value") {
                pattern_names(value, src, out);
            }
        }
        "formal_parameters" | "object_pattern" | "array_pattern" | "rest_pattern" => {
            let mut cursor = node.walk();
            let parts: Vec<_> = node.named_children(&mut cursor).collect();
            for part in parts {
                pattern_names(part, src, out);
            }
        }
        _ => {}
    }
}

/// `(imported, local)` pairs of `const { A, B: b } = require("m")`.
fn pattern_bindings(pattern: Node, src: &[u8]) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut cursor = pattern.walk();
    for prop in pattern.named_children(&mut cursor) {
        match prop.kind() {
            "shorthand_property_identifier_pattern" => {
                let n = txt(prop, src).to_string();
                out.push((n.clone(), n));
            }
            "pair_pattern" => {
                let key = prop.child_by_field_name("key");
                let value = prop.child_by_field_name("value");
                if let (Some(k), Some(v)) = (key, value) {
                    if v.kind() == "identifier" {
                        out.push((txt(k, src).to_string(), txt(v, src).to_string()));
                    }
                }
            }
            _ => {}
        }
    }
    out
}

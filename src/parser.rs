use std::path::Path;

use tree_sitter::{Parser, Tree};

use crate::error::AnalyzerError;
use crate::lang::LanguageKind;

/// A parsed source file and the text its tree points into.
#[derive(Debug)]
pub struct ParsedFile {
    pub tree: Tree,
    pub source: String,
}

/// Read and parse a source file.
///
/// A tree containing syntax errors is rejected.
pub fn parse_file(path: &Path) -> Result<ParsedFile, AnalyzerError> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let language = LanguageKind::from_extension(ext)?;

    let source = std::fs::read_to_string(path).map_err(|e| AnalyzerError::Io {
        path: path.display().to_string(),
        source: e,
    })?;

    let tree = parse_source(&source, language)?;
    Ok(ParsedFile { tree, source })
}

/// Parse source text with the grammar for `language`.
pub fn parse_source(source: &str, language: LanguageKind) -> Result<Tree, AnalyzerError> {
    let mut parser = Parser::new();
    parser
        .set_language(&language.tree_sitter_language())
        .map_err(|e| AnalyzerError::ParseFailed(e.to_string()))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| AnalyzerError::ParseFailed("parser produced no tree".to_string()))?;

    if tree.root_node().has_error() {
        let line = first_error_line(&tree).unwrap_or(1);
        return Err(AnalyzerError::ParseFailed(format!("syntax error near line {line}")));
    }

    Ok(tree)
}

fn first_error_line(tree: &Tree) -> Option<usize> {
    let mut stack = vec![tree.root_node()];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return Some(node.start_position().row + 1);
        }
        if node.has_error() {
            let mut cursor = node.walk();
            let children: Vec<_> = node.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
    }
    None
}

use std::path::Path;

use tree_sitter::Language;

use crate::error::AnalyzerError;
use crate::manifest::{Manifest, ModuleType};

/// Grammar a source file is parsed with.
///
/// Plain JavaScript is parsed with the TypeScript grammar, which accepts it;
/// JSX-bearing extensions need the TSX variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageKind {
    TypeScript,
    Tsx,
}

impl LanguageKind {
    pub fn from_extension(ext: &str) -> Result<Self, AnalyzerError> {
        Self::for_extension(ext).ok_or_else(|| AnalyzerError::UnsupportedExtension(ext.to_string()))
    }

    pub fn for_extension(ext: &str) -> Option<Self> {
        if ext.eq_ignore_ascii_case("tsx") || ext.eq_ignore_ascii_case("jsx") {
            return Some(Self::Tsx);
        }
        if is_script_extension(ext) {
            return Some(Self::TypeScript);
        }
        None
    }

    pub fn tree_sitter_language(self) -> Language {
        match self {
            Self::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Self::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }
}

/// Module system a file executes under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleSystem {
    EsModule,
    CommonJs,
}

impl ModuleSystem {
    /// Name as spelled in a manifest's `type` field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EsModule => "module",
            Self::CommonJs => "commonjs",
        }
    }
}

/// Classify a file's module system from its extension and nearest manifest.
///
/// `.mjs`/`.mts` and `.cjs`/`.cts` are fixed by extension. Everything else
/// follows the manifest's `type`, defaulting to CommonJS when there is no
/// manifest or no `type`. Returns `None` when the manifest declares a type
/// Node would reject.
pub fn classify_module(ext: &str, manifest: Option<&Manifest>) -> Option<ModuleSystem> {
    match ext.to_ascii_lowercase().as_str() {
        "mjs" | "mts" => return Some(ModuleSystem::EsModule),
        "cjs" | "cts" => return Some(ModuleSystem::CommonJs),
        _ => {}
    }
    match manifest.map(Manifest::module_type) {
        None | Some(ModuleType::Unspecified) | Some(ModuleType::CommonJs) => {
            Some(ModuleSystem::CommonJs)
        }
        Some(ModuleType::Module) => Some(ModuleSystem::EsModule),
        Some(ModuleType::Other(_)) => None,
    }
}

/// Whether a path names a source file the analyzer reads.
///
/// Declaration files (`.d.ts` and friends) carry no runtime code.
pub fn is_source_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if name.ends_with(".d.ts") || name.ends_with(".d.mts") || name.ends_with(".d.cts") {
        return false;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| LanguageKind::for_extension(ext).is_some())
}

fn is_script_extension(ext: &str) -> bool {
    ["js", "mjs", "cjs", "ts", "mts", "cts"]
        .iter()
        .any(|known| ext.eq_ignore_ascii_case(known))
}

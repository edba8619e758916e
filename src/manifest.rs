use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::AnalyzerError;
use crate::model::Dependency;

pub const MANIFEST_FILE: &str = "package.json";

/// Test runners recognized as a test fixture, in preference order.
const TEST_FRAMEWORKS: &[&str] = &["jest", "vitest", "mocha", "ava", "tap"];

/// The parts of `package.json` the analyzer consumes.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default, rename = "type")]
    module_type: Option<String>,
    #[serde(default)]
    main: Option<String>,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
    #[serde(default)]
    peer_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    dev_dependencies: BTreeMap<String, String>,
}

/// A manifest's declared `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleType<'a> {
    Unspecified,
    Module,
    CommonJs,
    Other(&'a str),
}

impl Manifest {
    /// Load `package.json` from `dir`. A missing manifest is `Ok(None)`.
    pub fn load(dir: &Path) -> Result<Option<Self>, AnalyzerError> {
        let path = dir.join(MANIFEST_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path).map_err(|e| AnalyzerError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| AnalyzerError::Manifest {
                path: path.display().to_string(),
                source: e,
            })
    }

    pub fn module_type(&self) -> ModuleType<'_> {
        match self.module_type.as_deref() {
            None => ModuleType::Unspecified,
            Some("module") => ModuleType::Module,
            Some("commonjs") => ModuleType::CommonJs,
            Some(other) => ModuleType::Other(other),
        }
    }

    /// The `main` entry with any leading `./` removed.
    pub fn main_entry(&self) -> Option<&str> {
        self.main.as_deref().map(|m| m.trim_start_matches("./"))
    }

    /// Declared packages: runtime, then peer, then development tables.
    pub fn dependencies(&self) -> Vec<Dependency> {
        [&self.dependencies, &self.peer_dependencies, &self.dev_dependencies]
            .into_iter()
            .flat_map(|table| table.iter())
            .map(|(name, version)| Dependency::declared(name, version))
            .collect()
    }

    /// First recognized test runner declared in any dependency table.
    pub fn test_framework(&self) -> Option<&'static str> {
        TEST_FRAMEWORKS.iter().copied().find(|fw| {
            self.dev_dependencies.contains_key(*fw) || self.dependencies.contains_key(*fw)
        })
    }
}

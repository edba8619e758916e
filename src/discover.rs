use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, warn};

use crate::error::AnalyzerError;
use crate::lang::{self, ModuleSystem};
use crate::manifest::{Manifest, ModuleType, MANIFEST_FILE};
use crate::model::{Dependency, DiscoveredTest};
use crate::util::relative_path;

/// Directories never descended into, besides hidden ones.
pub const SKIP_DIRS: &[&str] = &[
    "node_modules",
    "dist",
    "build",
    ".next",
    ".turbo",
    "coverage",
    ".cache",
    "out",
];

/// Directory names whose contents are all tests.
const TEST_DIRS: &[&str] = &["__tests__", "test", "tests"];

/// A classified source file awaiting analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Path relative to the analyzed root, `/`-separated.
    pub display_path: String,
    pub module: ModuleSystem,
}

/// Everything the directory walk finds before any file is parsed.
#[derive(Debug, Default)]
pub struct Discovery {
    pub sources: Vec<SourceFile>,
    pub tests: Vec<DiscoveredTest>,
    /// Manifest dependency entries, per manifest in walk order.
    pub declared: Vec<Dependency>,
    /// `main` of the root manifest, relative to the root.
    pub root_main: Option<String>,
    pub warnings: Vec<String>,
}

/// Walk `root` (a directory or a single file) and classify what it holds.
///
/// Only an unreadable root is an error; problems below it become warnings.
pub fn discover(root: &Path, exclude: &[String]) -> Result<Discovery, AnalyzerError> {
    let meta = std::fs::metadata(root).map_err(|e| AnalyzerError::Io {
        path: root.display().to_string(),
        source: e,
    })?;

    let mut walk = Walk {
        root,
        exclude,
        out: Discovery::default(),
    };

    if meta.is_file() {
        let dir = root.parent().unwrap_or_else(|| Path::new("."));
        let manifest = walk.load_manifest(dir);
        walk.out.root_main = manifest
            .as_ref()
            .and_then(|m| m.main_entry())
            .map(String::from);
        walk.file(root, manifest.as_deref(), false);
    } else {
        let entries = read_entries(root)?;
        walk.dir(root, entries, None, false);
    }

    debug!(
        sources = walk.out.sources.len(),
        tests = walk.out.tests.len(),
        "discovery finished"
    );
    Ok(walk.out)
}

struct Walk<'a> {
    root: &'a Path,
    exclude: &'a [String],
    out: Discovery,
}

impl Walk<'_> {
    fn dir(
        &mut self,
        dir: &Path,
        entries: (Vec<PathBuf>, Vec<PathBuf>),
        inherited: Option<Rc<Manifest>>,
        in_test_dir: bool,
    ) {
        let manifest = self.load_manifest(dir).or(inherited);
        if dir == self.root {
            self.out.root_main = manifest
                .as_ref()
                .and_then(|m| m.main_entry())
                .map(String::from);
        }

        let (dirs, files) = entries;
        for file in &files {
            self.file(file, manifest.as_deref(), in_test_dir);
        }
        for sub in &dirs {
            let name = sub.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if self.should_skip_dir(name) {
                debug!(dir = name, "skipped");
                continue;
            }
            match read_entries(sub) {
                Ok(entries) => {
                    let test_dir = in_test_dir || TEST_DIRS.contains(&name);
                    self.dir(sub, entries, manifest.clone(), test_dir);
                }
                Err(e) => self.warn(relative_path(sub, self.root), &e),
            }
        }
    }

    /// Manifest declared in `dir`. Its dependency entries are recorded on load.
    fn load_manifest(&mut self, dir: &Path) -> Option<Rc<Manifest>> {
        match Manifest::load(dir) {
            Ok(Some(m)) => {
                self.out.declared.extend(m.dependencies());
                Some(Rc::new(m))
            }
            Ok(None) => None,
            Err(e) => {
                self.warn(relative_path(&dir.join(MANIFEST_FILE), self.root), &e);
                None
            }
        }
    }

    fn file(&mut self, path: &Path, manifest: Option<&Manifest>, in_test_dir: bool) {
        if !lang::is_source_file(path) {
            debug!(path = %path.display(), "not a source file");
            return;
        }
        let display_path = relative_path(path, self.root);

        if in_test_dir || is_test_name(path) {
            self.out.tests.push(DiscoveredTest {
                name: display_path,
                fixture: manifest
                    .and_then(Manifest::test_framework)
                    .unwrap_or_default()
                    .to_string(),
            });
            return;
        }

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match lang::classify_module(ext, manifest) {
            Some(module) => self.out.sources.push(SourceFile {
                path: path.to_path_buf(),
                display_path,
                module,
            }),
            None => {
                let declared = match manifest.map(Manifest::module_type) {
                    Some(ModuleType::Other(t)) => t,
                    _ => "",
                };
                let message =
                    format!("{display_path}: unrecognized module type \"{declared}\"; skipped");
                warn!("{message}");
                self.out.warnings.push(message);
            }
        }
    }

    fn warn(&mut self, display: String, err: &AnalyzerError) {
        let message = format!("{display}: {}", err.reason());
        warn!("{message}");
        self.out.warnings.push(message);
    }

    fn should_skip_dir(&self, name: &str) -> bool {
        should_skip_dir(name) || self.exclude.iter().any(|e| e == name)
    }
}

/// Sorted `(dirs, files)` of a directory.
fn read_entries(dir: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>), AnalyzerError> {
    let entries = std::fs::read_dir(dir).map_err(|e| AnalyzerError::Io {
        path: dir.display().to_string(),
        source: e,
    })?;

    let mut dirs = Vec::new();
    let mut files = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            dirs.push(path);
        } else if path.is_file() {
            files.push(path);
        }
    }
    dirs.sort();
    files.sort();
    Ok((dirs, files))
}

fn should_skip_dir(name: &str) -> bool {
    name.starts_with('.') || SKIP_DIRS.contains(&name)
}

fn is_test_name(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.contains(".test.") || n.contains(".spec."))
}

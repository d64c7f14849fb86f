//! Source loading
//!
//! Reads every `.go` file in one directory, parses it with tree-sitter-go and
//! keeps the raw bytes so declarations can be sliced back out later.

use crate::{Error, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tree_sitter::{Node, Parser, Tree};

/// Syntax trees and contents for one package directory.
///
/// Files are keyed by base name since the directory is already known.
#[derive(Debug)]
pub struct LoadedPackage {
    pub dir: PathBuf,
    pub import_path: String,
    /// Declared package name
    pub name: String,
    /// Files that belong to `name`, sorted
    pub files: Vec<String>,
    contents: BTreeMap<String, Vec<u8>>,
    trees: BTreeMap<String, Tree>,
}

impl LoadedPackage {
    pub fn contents(&self, file: &str) -> Option<&[u8]> {
        self.contents.get(file).map(Vec::as_slice)
    }

    pub fn tree(&self, file: &str) -> Option<&Tree> {
        self.trees.get(file)
    }

    /// Raw bytes between two offsets of one file
    pub fn slice(&self, file: &str, start: usize, end: usize) -> Option<&[u8]> {
        self.contents(file).and_then(|c| c.get(start..end))
    }
}

/// Parses package directories
pub struct SourceLoader {
    parser: Mutex<Parser>,
    include_tests: bool,
}

impl SourceLoader {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_go::LANGUAGE.into())
            .map_err(|e| Error::Invariant(format!("loading Go grammar: {}", e)))?;
        Ok(Self { parser: Mutex::new(parser), include_tests: false })
    }

    /// Also read `_test.go` files
    pub fn with_tests(mut self, include_tests: bool) -> Self {
        self.include_tests = include_tests;
        self
    }

    fn wants(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        if !name.ends_with(".go") || name.starts_with('.') || name.starts_with('_') {
            return false;
        }
        self.include_tests || !name.ends_with("_test.go")
    }

    /// Load and parse the package in `dir`.
    ///
    /// Any syntax error fails the whole directory; all offending files are
    /// reported in one aggregated error.
    pub fn load(&self, dir: &Path, import_path: &str) -> Result<LoadedPackage> {
        if !dir.is_dir() {
            return Err(Error::PackageNotFound(format!("{} is not a directory", dir.display())));
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && self.wants(path))
            .collect();
        paths.sort();

        let mut contents = BTreeMap::new();
        let mut trees = BTreeMap::new();
        let mut errors = Vec::new();

        for path in paths {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let bytes = std::fs::read(&path)?;
            let tree = {
                let mut parser = self
                    .parser
                    .lock()
                    .map_err(|_| Error::Invariant("parser lock poisoned".to_string()))?;
                parser.parse(&bytes, None)
            };
            let Some(tree) = tree else {
                errors.push(format!("{}: parser returned no tree", name));
                continue;
            };
            if tree.root_node().has_error() {
                errors.extend(syntax_errors(&name, tree.root_node()));
            }
            contents.insert(name.clone(), bytes);
            trees.insert(name, tree);
        }

        if !errors.is_empty() {
            return Err(Error::Parse { dir: dir.display().to_string(), errors });
        }

        let mut by_package: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (file, tree) in &trees {
            let source = &contents[file];
            let pkg = package_clause(tree.root_node(), source).unwrap_or_default();
            by_package.entry(pkg).or_default().push(file.clone());
        }

        let name = choose_package(&by_package, dir)?;
        let files = by_package.remove(&name).unwrap_or_default();

        tracing::debug!(
            import_path,
            package = %name,
            files = files.len(),
            "loaded package sources"
        );

        Ok(LoadedPackage {
            dir: dir.to_path_buf(),
            import_path: import_path.to_string(),
            name,
            files,
            contents,
            trees,
        })
    }
}

/// External test packages never count. `main` only wins when it is the
/// sole package, since library directories often carry ignored `main` tools.
fn choose_package(by_package: &BTreeMap<String, Vec<String>>, dir: &Path) -> Result<String> {
    let mut chosen: Option<&str> = None;
    let mut has_main = false;
    for pkg in by_package.keys() {
        if pkg == "main" {
            has_main = true;
        } else if !pkg.ends_with("_test") && !pkg.is_empty() {
            if let Some(existing) = chosen {
                return Err(Error::Parse {
                    dir: dir.display().to_string(),
                    errors: vec![format!("multiple packages found: {} and {}", existing, pkg)],
                });
            }
            chosen = Some(pkg);
        }
    }
    match chosen {
        Some(pkg) => Ok(pkg.to_string()),
        None if has_main => Ok("main".to_string()),
        None => Err(Error::PackageNotFound(format!("no Go source files in {}", dir.display()))),
    }
}

fn package_clause(root: Node, source: &[u8]) -> Option<String> {
    let mut cursor = root.walk();
    let clause = root
        .named_children(&mut cursor)
        .find(|n| n.kind() == "package_clause")?;
    let mut inner = clause.walk();
    let ident = clause
        .named_children(&mut inner)
        .find(|n| n.kind() == "package_identifier")?;
    ident.utf8_text(source).ok().map(str::to_string)
}

fn syntax_errors(file: &str, root: Node) -> Vec<String> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            let pos = node.start_position();
            let what = if node.is_missing() {
                format!("missing {}", node.kind())
            } else {
                "syntax error".to_string()
            };
            out.push(format!("{}:{}:{}: {}", file, pos.row + 1, pos.column + 1, what));
            continue;
        }
        if node.has_error() {
            let mut cursor = node.walk();
            let children: Vec<_> = node.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
    }
    out.sort();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn test_load_package() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a.go", "package foo\n\ntype A int\n");
        write(tmp.path(), "b.go", "package foo\n\ntype B string\n");
        write(tmp.path(), "a_test.go", "package foo_test\n");
        write(tmp.path(), "notes.txt", "not go");

        let loader = SourceLoader::new().unwrap();
        let pkg = loader.load(tmp.path(), "example.com/foo").unwrap();
        assert_eq!(pkg.name, "foo");
        assert_eq!(pkg.files, vec!["a.go", "b.go"]);
        assert!(pkg.contents("a_test.go").is_none());
        assert_eq!(pkg.contents("a.go").unwrap(), b"package foo\n\ntype A int\n");
        assert_eq!(pkg.slice("a.go", 13, 23).unwrap(), b"type A int");
        assert!(pkg.tree("b.go").is_some());
    }

    #[test]
    fn test_include_tests_drops_external_test_package() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a.go", "package foo\n");
        write(tmp.path(), "a_test.go", "package foo\n\ntype T int\n");
        write(tmp.path(), "x_test.go", "package foo_test\n");

        let loader = SourceLoader::new().unwrap().with_tests(true);
        let pkg = loader.load(tmp.path(), "foo").unwrap();
        assert_eq!(pkg.files, vec!["a.go", "a_test.go"]);
        // read, but belongs to another package
        assert!(pkg.contents("x_test.go").is_some());
    }

    #[test]
    fn test_parse_error_fails_whole_directory() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "ok.go", "package foo\n\ntype A int\n");
        write(tmp.path(), "bad.go", "package foo\n\ntype B struct {\n");

        let loader = SourceLoader::new().unwrap();
        match loader.load(tmp.path(), "foo") {
            Err(Error::Parse { errors, .. }) => {
                assert!(!errors.is_empty());
                assert!(errors.iter().all(|e| e.starts_with("bad.go:")));
            }
            other => panic!("expected parse error, got {:?}", other.map(|p| p.name)),
        }
    }

    #[test]
    fn test_main_only_when_alone() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "lib.go", "package lib\n");
        write(tmp.path(), "gen.go", "//go:build ignore\n\npackage main\n");
        let loader = SourceLoader::new().unwrap();
        let pkg = loader.load(tmp.path(), "lib").unwrap();
        assert_eq!(pkg.name, "lib");
        assert_eq!(pkg.files, vec!["lib.go"]);

        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "main.go", "package main\n\nfunc main() {}\n");
        let pkg = loader.load(tmp.path(), "cmd").unwrap();
        assert_eq!(pkg.name, "main");
    }

    #[test]
    fn test_multiple_packages_error() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a.go", "package a\n");
        write(tmp.path(), "b.go", "package b\n");
        let loader = SourceLoader::new().unwrap();
        assert!(matches!(loader.load(tmp.path(), "x"), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_missing_directory() {
        let tmp = TempDir::new().unwrap();
        let loader = SourceLoader::new().unwrap();
        assert!(matches!(
            loader.load(&tmp.path().join("nope"), "nope"),
            Err(Error::PackageNotFound(_))
        ));
        assert!(matches!(loader.load(tmp.path(), "empty"), Err(Error::PackageNotFound(_))));
    }
}

//! Resolution engine
//!
//! [`PackageSet`] owns every piece of session state: the package cache, the
//! provenance of each import path and the object index. Each import path is
//! located, loaded and checked at most once per session.

use super::{ObjectIndex, Package, ResolveOptions};
use crate::check::{CheckOutcome, CheckUnit, Checker, GoChecker, Importer, PrebuiltPackages, TypeError};
use crate::source::{PackageKind, ProvenanceResolver, SearchRoots, SourceLoader};
use crate::type_name::TypeName;
use crate::types::TypeDef;
use crate::{Error, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

const LOG_TARGET: &str = "structer::typeset";

/// Error reported to the capture callback, execution continued
const CODE_CALLBACK: u32 = 1;
/// Check returned an error, execution continued
const CODE_CHECK: u32 = 2;

type CaptureFn = Box<dyn FnMut(&TypeError) + Send>;

enum CacheEntry {
    Resolved(Arc<Package>),
    Absent,
    Failed(String),
}

/// Work counters, mostly for tests and `--verbose` output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolveStats {
    /// Calls to `resolve`/`import_from`, including cache hits
    pub requests: usize,
    pub cache_hits: usize,
    /// Directories read by the source loader
    pub loads: usize,
    /// Checker invocations
    pub checks: usize,
}

/// A resolution session
pub struct PackageSet {
    options: ResolveOptions,
    provenance: ProvenanceResolver,
    loader: SourceLoader,
    checker: Arc<dyn Checker>,
    prebuilt: PrebuiltPackages,
    cache: HashMap<String, CacheEntry>,
    in_progress: Vec<String>,
    kinds: HashMap<String, PackageKind>,
    index: ObjectIndex,
    capture: Option<CaptureFn>,
    stats: ResolveStats,
}

impl PackageSet {
    /// New session over `roots` with the Go checker and the standard prebuilt models
    pub fn new(roots: SearchRoots) -> Result<Self> {
        Ok(Self {
            options: ResolveOptions::default(),
            provenance: ProvenanceResolver::new(roots),
            loader: SourceLoader::new()?,
            checker: Arc::new(GoChecker::new()),
            prebuilt: PrebuiltPackages::standard(),
            cache: HashMap::new(),
            in_progress: Vec::new(),
            kinds: HashMap::new(),
            index: ObjectIndex::new(),
            capture: None,
            stats: ResolveStats::default(),
        })
    }

    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self.loader = self.loader.with_tests(options.include_tests);
        self
    }

    pub fn include_tests(self, include_tests: bool) -> Self {
        let options = ResolveOptions { include_tests, ..self.options };
        self.with_options(options)
    }

    pub fn allow_hard_errors(self, allow_hard_errors: bool) -> Self {
        let options = ResolveOptions { allow_hard_errors, ..self.options };
        self.with_options(options)
    }

    /// Receive every error any checker run reports, soft or hard
    pub fn capture_errors(mut self, capture: impl FnMut(&TypeError) + Send + 'static) -> Self {
        self.capture = Some(Box::new(capture));
        self
    }

    pub fn with_checker(mut self, checker: impl Checker + 'static) -> Self {
        self.checker = Arc::new(checker);
        self
    }

    pub fn with_prebuilt(mut self, prebuilt: PrebuiltPackages) -> Self {
        self.prebuilt = prebuilt;
        self
    }

    pub fn options(&self) -> ResolveOptions {
        self.options
    }

    pub fn roots(&self) -> &SearchRoots {
        self.provenance.roots()
    }

    pub fn index(&self) -> &ObjectIndex {
        &self.index
    }

    pub fn stats(&self) -> ResolveStats {
        self.stats
    }

    // ------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------

    /// Resolve `path`, searching vendor directories from its own workspace
    /// location upward.
    ///
    /// `Ok(None)` means the package does not exist in any search root.
    pub fn resolve(&mut self, path: &str) -> Result<Option<Arc<Package>>> {
        let origin = self.roots().workspace.as_ref().map(|ws| ws.join(path));
        self.resolve_inner(path, origin.as_deref())
    }

    /// Resolve `path` as imported by a package in `dir`
    pub fn import_from(&mut self, path: &str, dir: &Path) -> Result<Option<Arc<Package>>> {
        self.resolve_inner(path, Some(dir))
    }

    fn resolve_inner(&mut self, path: &str, origin: Option<&Path>) -> Result<Option<Arc<Package>>> {
        self.stats.requests += 1;
        if let Some(entry) = self.cache.get(path) {
            self.stats.cache_hits += 1;
            return match entry {
                CacheEntry::Resolved(pkg) => Ok(Some(Arc::clone(pkg))),
                CacheEntry::Absent => Ok(None),
                CacheEntry::Failed(cause) => Err(Error::PackageFailed {
                    path: path.to_string(),
                    cause: cause.clone(),
                }),
            };
        }
        if self.in_progress.iter().any(|p| p == path) {
            let mut chain = self.in_progress.clone();
            chain.push(path.to_string());
            return Err(Error::ImportCycle(chain.join(" -> ")));
        }

        let resolution = self.provenance.resolve(path, origin)?;
        let mut kind = resolution.kind;
        if !kind.is_found() && self.prebuilt.contains(path) {
            kind = PackageKind::System;
        }
        self.kinds.insert(path.to_string(), kind);

        match kind {
            PackageKind::None => {
                tracing::debug!(target: LOG_TARGET, package = path, "package not found");
                self.cache.insert(path.to_string(), CacheEntry::Absent);
                Ok(None)
            }
            PackageKind::System => {
                let mut pkg = match self.prebuilt.get(path) {
                    Some(checked) => Package::from_checked(path, kind, None, checked.clone()),
                    None => Package::opaque(path),
                };
                pkg.dir = resolution.dir;
                tracing::trace!(target: LOG_TARGET, package = path, opaque = pkg.opaque, "system package");
                let pkg = Arc::new(pkg);
                self.cache.insert(path.to_string(), CacheEntry::Resolved(Arc::clone(&pkg)));
                Ok(Some(pkg))
            }
            PackageKind::Vendored | PackageKind::User => {
                let dir = resolution.dir.ok_or_else(|| {
                    Error::Invariant(format!("{} resolved as {} without a directory", path, kind))
                })?;
                self.in_progress.push(path.to_string());
                let result = self.load_and_check(path, kind, &dir);
                self.in_progress.pop();

                match result {
                    Ok(pkg) => {
                        self.cache.insert(path.to_string(), CacheEntry::Resolved(Arc::clone(&pkg)));
                        Ok(Some(pkg))
                    }
                    Err(e) => {
                        if !e.is_invariant() {
                            self.cache.insert(path.to_string(), CacheEntry::Failed(e.to_string()));
                        }
                        Err(e)
                    }
                }
            }
        }
    }

    fn load_and_check(&mut self, path: &str, kind: PackageKind, dir: &Path) -> Result<Arc<Package>> {
        self.stats.loads += 1;
        let loaded = Arc::new(self.loader.load(dir, path)?);

        self.stats.checks += 1;
        let checker = Arc::clone(&self.checker);
        let mut outcome = checker.check(CheckUnit { import_path: path, source: &loaded }, self);
        self.report(path, &outcome)?;

        let defs: Vec<Arc<TypeDef>> = std::mem::take(&mut outcome.package.types)
            .into_iter()
            .map(Arc::new)
            .collect();
        self.index.merge(path, &defs)?;

        let mut pkg = Package::from_checked(path, kind, Some(loaded), outcome.package);
        pkg.types = defs.iter().map(|def| (def.name.name.clone(), Arc::clone(def))).collect();

        tracing::debug!(
            target: LOG_TARGET,
            package = path,
            kind = %kind,
            checker = checker.name(),
            types = defs.len(),
            "resolved package"
        );
        Ok(Arc::new(pkg))
    }

    /// Apply the error policy to one checker run
    fn report(&mut self, path: &str, outcome: &CheckOutcome) -> Result<()> {
        let errors = &outcome.errors;
        for err in errors {
            if err.soft {
                tracing::debug!(target: LOG_TARGET, code = CODE_CALLBACK, package = path, error = %err, "soft type error");
            } else {
                tracing::warn!(target: LOG_TARGET, code = CODE_CALLBACK, package = path, error = %err, "type error");
            }
            if let Some(capture) = self.capture.as_mut() {
                capture(err);
            }
        }

        let Some(first) = errors.first() else {
            return Ok(());
        };
        let hard = outcome.first_hard();
        if let (Some(hard), false) = (hard, self.options.allow_hard_errors) {
            return Err(Error::TypeCheck { path: path.to_string(), message: hard.to_string() });
        }
        tracing::info!(
            target: LOG_TARGET,
            code = CODE_CHECK,
            package = path,
            errors = errors.len(),
            error = %hard.unwrap_or(first),
            "continuing past type errors"
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Provenance recorded for `path`; `None` if it was never looked up or not found
    pub fn kind(&self, path: &str) -> PackageKind {
        self.kinds.get(path).copied().unwrap_or_default()
    }

    /// A package already resolved in this session
    pub fn package(&self, path: &str) -> Option<Arc<Package>> {
        match self.cache.get(path) {
            Some(CacheEntry::Resolved(pkg)) => Some(Arc::clone(pkg)),
            _ => None,
        }
    }

    /// Every resolved package, sorted by import path
    pub fn packages(&self) -> Vec<Arc<Package>> {
        let mut out: Vec<_> = self
            .cache
            .values()
            .filter_map(|entry| match entry {
                CacheEntry::Resolved(pkg) => Some(Arc::clone(pkg)),
                _ => None,
            })
            .collect();
        out.sort_by(|a, b| a.path.cmp(&b.path));
        out
    }

    /// Classify a source file and recover its package's import path
    pub fn file_package(&self, file: &Path) -> Result<(PackageKind, String)> {
        self.provenance.file_package(file)
    }

    pub fn find_object(&self, name: &TypeName) -> Option<Arc<TypeDef>> {
        self.index.get(name).cloned()
    }

    pub fn find_object_by_name(&self, name: &str) -> Result<Option<Arc<TypeDef>>> {
        let name = TypeName::parse(name)?;
        Ok(self.find_object(&name))
    }

    /// Resolve the declaring package first, then look the object up
    pub fn find_import_object(&mut self, name: &TypeName) -> Result<Option<Arc<TypeDef>>> {
        self.resolve(&name.package_path)?;
        Ok(self.find_object(name))
    }

    pub fn find_import_object_by_name(&mut self, name: &str) -> Result<Option<Arc<TypeDef>>> {
        let name = TypeName::parse(name)?;
        self.find_import_object(&name)
    }

    /// Like [`find_object`](Self::find_object), but also sees the models of
    /// system packages, which are never indexed.
    pub fn definition(&self, name: &TypeName) -> Option<Arc<TypeDef>> {
        if let Some(def) = self.index.get(name) {
            return Some(Arc::clone(def));
        }
        self.package(&name.package_path)
            .and_then(|pkg| pkg.lookup(&name.name).cloned())
    }

    /// Declared name of an already resolved package
    pub fn local_package(&self, path: &str) -> Result<String> {
        self.package(path)
            .map(|pkg| pkg.name.clone())
            .ok_or_else(|| Error::PackageNotFound(path.to_string()))
    }

    /// How `name` is spelled from inside the package at `rel_pkg`.
    ///
    /// Both packages must already be resolved. A `main` package can only be
    /// referred to from itself.
    pub fn local_import_name(&self, name: &TypeName, rel_pkg: &str) -> Result<String> {
        if name.is_builtin() {
            return Ok(name.name.clone());
        }
        let target = self.local_package(&name.package_path)?;
        if target == "main" && name.package_path != rel_pkg {
            return Err(Error::InvalidImportPath(format!(
                "attempted to import main package {} relative to package {}",
                name.package_path, rel_pkg
            )));
        }
        let rel = self.local_package(rel_pkg)?;
        if target == rel {
            Ok(name.name.clone())
        } else {
            Ok(format!("{}.{}", target, name.name))
        }
    }

    /// Full name for a type reference written inside `pkg`.
    ///
    /// `Type` is local to `pkg`; `alias.Type` is matched against the names of
    /// the packages `pkg` imports.
    pub fn find_import_path(&mut self, pkg: &str, type_name: &str) -> Result<String> {
        let not_found = || {
            Error::ObjectNotFound(format!("import path not found for pkg {}, type {}", pkg, type_name))
        };
        let package = self.resolve(pkg)?.ok_or_else(not_found)?;

        let Some((alias, rest)) = type_name.split_once('.') else {
            return Ok(format!("{}.{}", pkg, type_name));
        };
        for import in &package.imports {
            let name = self
                .local_package(import)
                .unwrap_or_else(|_| import.rsplit('/').next().unwrap_or(import).to_string());
            if name == alias {
                return Ok(format!("{}.{}", import, rest));
            }
        }
        Err(not_found())
    }
}

impl Importer for PackageSet {
    fn import(&mut self, path: &str, from_dir: &Path) -> Result<Arc<Package>> {
        self.import_from(path, from_dir)?
            .ok_or_else(|| Error::PackageNotFound(path.to_string()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::check::{CheckOutcome, CheckedPackage};
    use crate::types::{BasicKind, Type};
    use std::fs;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    pub(crate) const TESTPKG: &str = "example.com/structer/testpkg";

    pub(crate) fn testdata() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata")
    }

    pub(crate) fn fixture_roots() -> SearchRoots {
        SearchRoots::new(testdata().join("src")).with_system(testdata().join("goroot/src"))
    }

    pub(crate) fn fixture_set() -> PackageSet {
        PackageSet::new(fixture_roots()).unwrap()
    }

    pub(crate) fn testpkg(name: &str) -> String {
        format!("{}/{}", TESTPKG, name)
    }

    fn captured(set: PackageSet) -> (PackageSet, Arc<Mutex<Vec<TypeError>>>) {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&errors);
        let set = set.capture_errors(move |e| sink.lock().unwrap().push(e.clone()));
        (set, errors)
    }

    /// Scripted checker: one `int` type per declared name, fixed errors
    struct StubChecker {
        names: Vec<&'static str>,
        errors: Vec<TypeError>,
        calls: Arc<AtomicUsize>,
    }

    impl Checker for StubChecker {
        fn name(&self) -> &str {
            "stub"
        }

        fn check(&self, unit: CheckUnit<'_>, _importer: &mut dyn Importer) -> CheckOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let types = self
                .names
                .iter()
                .map(|n| TypeDef::new(TypeName::new(unit.import_path, *n), Type::basic(BasicKind::Int)))
                .collect();
            CheckOutcome {
                package: CheckedPackage { name: unit.source.name.clone(), types, ..Default::default() },
                errors: self.errors.clone(),
            }
        }
    }

    fn stub_workspace() -> TempDir {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("stub/pkg");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("pkg.go"), "package pkg\n").unwrap();
        tmp
    }

    #[test]
    fn test_resolve_is_cached() {
        let mut set = fixture_set();
        let path = testpkg("valid");
        let first = set.resolve(&path).unwrap().unwrap();
        let second = set.resolve(&path).unwrap().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.name, "valid");
        assert_eq!(set.kind(&path), PackageKind::User);
        let stats = set.stats();
        assert_eq!(stats.loads, 1);
        assert_eq!(stats.checks, 1);
        assert_eq!(stats.cache_hits, 1);
        assert!(set.find_object(&TypeName::new(&path, "Valid")).is_some());
    }

    #[test]
    fn test_absent_package_is_cached() {
        let mut set = fixture_set();
        assert!(set.resolve("example.com/does/not/exist").unwrap().is_none());
        assert!(set.resolve("example.com/does/not/exist").unwrap().is_none());
        assert_eq!(set.kind("example.com/does/not/exist"), PackageKind::None);
        assert_eq!(set.stats().loads, 0);
        assert_eq!(set.stats().cache_hits, 1);
    }

    #[test]
    fn test_invalid_import_path() {
        let mut set = fixture_set();
        assert!(matches!(set.resolve("../escape"), Err(Error::InvalidImportPath(_))));
    }

    #[test]
    fn test_hard_errors_captured_and_swallowed() {
        let (mut set, errors) = captured(fixture_set());
        let path = testpkg("intferr");
        let pkg = set.resolve(&path).unwrap().unwrap();

        assert_eq!(errors.lock().unwrap().len(), 1);
        assert!(!errors.lock().unwrap()[0].soft);
        assert!(pkg.lookup("Broken").is_some());
        assert!(set.find_object(&TypeName::new(&path, "Fine")).is_some());
    }

    #[test]
    fn test_hard_errors_fail_when_strict() {
        let mut set = fixture_set().allow_hard_errors(false);
        let path = testpkg("intferr");
        assert!(matches!(set.resolve(&path), Err(Error::TypeCheck { .. })));
        assert_eq!(set.index().package(&path).count(), 0);
        assert!(matches!(set.resolve(&path), Err(Error::PackageFailed { .. })));
        assert_eq!(set.stats().checks, 1);
    }

    #[test]
    fn test_soft_errors_pass_strict_policy() {
        let (mut set, errors) = captured(fixture_set().allow_hard_errors(false));
        let path = testpkg("softerr");
        let pkg = set.resolve(&path).unwrap().unwrap();
        assert!(pkg.lookup("Soft").is_some());
        let errors = errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].soft);
        assert!(errors[0].message.contains("imported and not used"));
    }

    #[test]
    fn test_parse_failure_is_isolated() {
        let mut set = fixture_set();
        let broken = testpkg("parseerr");
        assert!(matches!(set.resolve(&broken), Err(Error::Parse { .. })));
        assert!(set.index().is_empty());

        let user = testpkg("usesparseerr");
        let pkg = set.resolve(&user).unwrap().unwrap();
        let def = pkg.lookup("UsesParseErr").unwrap();
        let field = def.underlying.as_struct().unwrap().field("Foo").unwrap();
        assert!(field.ty.is_invalid());
        assert!(set.find_object(&TypeName::new(&user, "Other")).is_some());
        assert_eq!(set.index().package(&broken).count(), 0);
    }

    #[test]
    fn test_system_packages_are_not_indexed() {
        let mut set = fixture_set();
        let fmt = set.resolve("fmt").unwrap().unwrap();
        assert_eq!(set.kind("fmt"), PackageKind::System);
        assert!(!fmt.opaque);
        assert!(fmt.lookup("Stringer").is_some());

        let strings = set.resolve("strings").unwrap().unwrap();
        assert!(strings.opaque);
        assert!(set.index().is_empty());
        assert!(set.definition(&TypeName::new("fmt", "Stringer")).is_some());
        assert!(set.find_object(&TypeName::new("fmt", "Stringer")).is_none());
    }

    #[test]
    fn test_vendored_dependency() {
        let mut set = fixture_set();
        let pkg = set.resolve(&testpkg("usesvendor")).unwrap().unwrap();
        assert_eq!(set.kind("example.com/vendoredpkg"), PackageKind::Vendored);
        assert!(pkg.imports.iter().any(|i| i == "example.com/vendoredpkg"));
        assert!(set.find_object(&TypeName::parse("example.com/vendoredpkg.Dep").unwrap()).is_some());
    }

    #[test]
    fn test_local_names() {
        let mut set = fixture_set();
        let valid = testpkg("valid");
        let valid2 = testpkg("valid2");
        let main = testpkg("testmain");
        set.resolve(&valid).unwrap();
        set.resolve(&valid2).unwrap();
        set.resolve(&main).unwrap();

        assert_eq!(set.local_package(&valid).unwrap(), "valid");
        assert_eq!(set.local_package(&main).unwrap(), "main");
        assert!(matches!(set.local_package("nope"), Err(Error::PackageNotFound(_))));

        let name = TypeName::new(&valid, "Valid");
        assert_eq!(set.local_import_name(&name, &valid).unwrap(), "Valid");
        assert_eq!(set.local_import_name(&name, &valid2).unwrap(), "valid.Valid");
        assert_eq!(set.local_import_name(&TypeName::builtin("int"), "whatever").unwrap(), "int");

        let in_main = TypeName::new(&main, "Thing");
        assert_eq!(set.local_import_name(&in_main, &main).unwrap(), "Thing");
        assert!(set.local_import_name(&in_main, &valid).is_err());
    }

    #[test]
    fn test_find_import_path() {
        let mut set = fixture_set();
        let valid2 = testpkg("valid2");
        assert_eq!(set.find_import_path(&valid2, "Valid2").unwrap(), format!("{}.Valid2", valid2));
        assert_eq!(
            set.find_import_path(&valid2, "valid.Valid").unwrap(),
            format!("{}.Valid", testpkg("valid"))
        );
        assert!(set.find_import_path(&valid2, "nope.Thing").is_err());
        assert!(set.find_import_path("example.com/missing", "Thing").is_err());
    }

    #[test]
    fn test_find_import_object() {
        let mut set = fixture_set();
        let name = format!("{}.Valid", testpkg("valid"));
        assert!(set.find_object_by_name(&name).unwrap().is_none());
        assert!(set.find_import_object_by_name(&name).unwrap().is_some());
        assert!(set.find_object_by_name(&name).unwrap().is_some());
        assert!(set.find_object_by_name("nodot").is_err());
    }

    #[test]
    fn test_file_package() {
        let set = fixture_set();
        let user = testdata().join("src").join(testpkg("valid")).join("valid.go");
        assert_eq!(set.file_package(&user).unwrap(), (PackageKind::User, testpkg("valid")));

        let vendored = testdata()
            .join("src")
            .join(testpkg("usesvendor"))
            .join("vendor/example.com/vendoredpkg/dep.go");
        assert_eq!(
            set.file_package(&vendored).unwrap(),
            (PackageKind::Vendored, "example.com/vendoredpkg".to_string())
        );

        let system = testdata().join("goroot/src/fmt/doc.go");
        assert_eq!(set.file_package(&system).unwrap(), (PackageKind::System, "fmt".to_string()));
    }

    #[test]
    fn test_import_cycle_reported_as_type_error() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("cyc/a");
        let b = tmp.path().join("cyc/b");
        fs::create_dir_all(&a).unwrap();
        fs::create_dir_all(&b).unwrap();
        fs::write(a.join("a.go"), "package a\n\nimport \"cyc/b\"\n\ntype A struct{ B b.B }\n").unwrap();
        fs::write(b.join("b.go"), "package b\n\nimport \"cyc/a\"\n\ntype B struct{ A *a.A }\n").unwrap();

        let (mut set, errors) = captured(PackageSet::new(SearchRoots::new(tmp.path())).unwrap());
        set.resolve("cyc/a").unwrap().unwrap();
        let errors = errors.lock().unwrap();
        assert!(errors.iter().any(|e| e.message.contains("import cycle")));
        assert!(set.find_object(&TypeName::new("cyc/b", "B")).is_some());
    }

    #[test]
    fn test_stub_checker_counts_and_policy() {
        let tmp = stub_workspace();
        let calls = Arc::new(AtomicUsize::new(0));
        let checker = StubChecker {
            names: vec!["One", "Two"],
            errors: vec![TypeError::hard("scripted")],
            calls: Arc::clone(&calls),
        };
        let mut set = PackageSet::new(SearchRoots::new(tmp.path())).unwrap().with_checker(checker);
        set.resolve("stub/pkg").unwrap().unwrap();
        set.resolve("stub/pkg").unwrap().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(set.index().len(), 2);
    }

    #[test]
    fn test_duplicate_definition_is_always_fatal() {
        let tmp = stub_workspace();
        let checker = StubChecker {
            names: vec!["Same", "Same"],
            errors: vec![],
            calls: Arc::new(AtomicUsize::new(0)),
        };
        let mut set = PackageSet::new(SearchRoots::new(tmp.path()))
            .unwrap()
            .allow_hard_errors(true)
            .with_checker(checker);
        let err = set.resolve("stub/pkg").unwrap_err();
        assert!(err.is_invariant());
        assert!(set.index().is_empty());
    }
}

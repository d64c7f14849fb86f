//! Package/type resolution engine
//!
//! Provides:
//! - [`PackageSet`]: the per-session cache of resolved packages
//! - [`ObjectIndex`]: every package-scope named type across those packages
//! - Derived queries: interface implementers, constant groups, docs and source

pub mod consts;
pub mod doc;
pub mod engine;
pub mod implements;
pub mod index;

pub use consts::{ConstValue, Consts};
pub use engine::{PackageSet, ResolveStats};
pub use implements::Implementation;
pub use index::ObjectIndex;

use crate::check::CheckedPackage;
use crate::source::{LoadedPackage, PackageKind};
use crate::type_name::last_segment;
use crate::types::{ConstDef, TypeDef};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Policy knobs for a resolution session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Load `_test.go` files along with the package
    pub include_tests: bool,
    /// Log hard type errors and keep going instead of failing the package
    pub allow_hard_errors: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self { include_tests: false, allow_hard_errors: true }
    }
}

/// Handle to one resolved package
#[derive(Debug, Clone)]
pub struct Package {
    pub path: String,
    /// Declared package name
    pub name: String,
    pub kind: PackageKind,
    pub dir: Option<PathBuf>,
    /// System package with no type model; qualified references are trusted
    pub opaque: bool,
    pub types: BTreeMap<String, Arc<TypeDef>>,
    /// Declaration order
    pub consts: Vec<ConstDef>,
    pub imports: Vec<String>,
    pub source: Option<Arc<LoadedPackage>>,
}

impl Package {
    pub fn new(path: impl Into<String>, name: impl Into<String>, kind: PackageKind) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            kind,
            dir: None,
            opaque: false,
            types: BTreeMap::new(),
            consts: Vec::new(),
            imports: Vec::new(),
            source: None,
        }
    }

    /// Wrap a checker's output
    pub fn from_checked(
        path: &str,
        kind: PackageKind,
        source: Option<Arc<LoadedPackage>>,
        checked: CheckedPackage,
    ) -> Self {
        let name = if checked.name.is_empty() {
            last_segment(path).to_string()
        } else {
            checked.name
        };
        let types = checked
            .types
            .into_iter()
            .map(|def| (def.name.name.clone(), Arc::new(def)))
            .collect();
        Self {
            path: path.to_string(),
            name,
            kind,
            dir: source.as_ref().map(|s| s.dir.clone()),
            opaque: false,
            types,
            consts: checked.consts,
            imports: checked.imports,
            source,
        }
    }

    /// A system package known only by path
    pub fn opaque(path: &str) -> Self {
        let mut pkg = Self::new(path, last_segment(path), PackageKind::System);
        pkg.opaque = true;
        pkg
    }

    pub fn lookup(&self, name: &str) -> Option<&Arc<TypeDef>> {
        self.types.get(name)
    }

    pub fn constant(&self, name: &str) -> Option<&ConstDef> {
        self.consts.iter().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_name::TypeName;
    use crate::types::{BasicKind, Constant, Type};

    #[test]
    fn test_from_checked() {
        let checked = CheckedPackage {
            name: String::new(),
            types: vec![TypeDef::new(TypeName::new("a/b/widget", "Size"), Type::basic(BasicKind::Int))],
            consts: vec![ConstDef {
                name: "Small".to_string(),
                ty: Type::named(TypeName::new("a/b/widget", "Size")),
                value: Constant::Int(1),
                span: None,
            }],
            imports: vec!["fmt".to_string()],
        };
        let pkg = Package::from_checked("a/b/widget", PackageKind::User, None, checked);
        assert_eq!(pkg.name, "widget");
        assert!(!pkg.opaque);
        assert!(pkg.lookup("Size").is_some());
        assert!(pkg.lookup("Missing").is_none());
        assert_eq!(pkg.constant("Small").map(|c| &c.value), Some(&Constant::Int(1)));
    }

    #[test]
    fn test_opaque_package() {
        let pkg = Package::opaque("net/http");
        assert_eq!(pkg.name, "http");
        assert_eq!(pkg.kind, PackageKind::System);
        assert!(pkg.opaque);
        assert!(pkg.types.is_empty());

        assert_eq!(Package::opaque("net/http/").name, "http");
    }
}

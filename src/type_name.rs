//! TypeName - Global, stable identity for every named type
//!
//! Format: `<package path>.<Name>`
//!
//! Examples:
//! - `example.com/app/models.User`
//! - `time.Duration`
//! - `int` (builtins carry no package)

use crate::{Error, Result};
use crate::types::Type;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Fully-qualified identifier for a named type.
///
/// Two names are equal iff their fully-qualified forms match, and they order
/// lexicographically on that form so output built from them is deterministic.
#[derive(Debug, Clone)]
pub struct TypeName {
    /// Import path of the declaring package (`example.com/app/models`)
    pub package_path: String,
    /// Last element of the package path (`models`)
    pub package_name: String,
    /// Local name inside the package (`User`)
    pub name: String,
    /// `package_path + "." + name`, or just `name` for builtins
    pub full: String,
    builtin: bool,
}

impl TypeName {
    /// Create a name for a type declared in `package_path`
    pub fn new(package_path: impl Into<String>, name: impl Into<String>) -> Self {
        let package_path = package_path.into();
        let name = name.into();
        Self {
            package_name: last_segment(&package_path).to_string(),
            full: format!("{}.{}", package_path, name),
            package_path,
            name,
            builtin: false,
        }
    }

    /// Create a name for a predeclared type (`int`, `string`, `error`)
    pub fn builtin(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            package_path: String::new(),
            package_name: String::new(),
            full: name.clone(),
            name,
            builtin: true,
        }
    }

    /// Parse a fully-qualified name of the form `full/pkg/path.Type`
    pub fn parse(full: &str) -> Result<Self> {
        let (package_path, name) = full
            .rsplit_once('.')
            .ok_or_else(|| Error::InvalidTypeName(full.to_string()))?;
        if package_path.trim().is_empty() || name.trim().is_empty() {
            return Err(Error::InvalidTypeName(full.to_string()));
        }
        Ok(Self::new(package_path, name))
    }

    /// Parse a name that may omit its package, in which case `local_pkg` is assumed
    pub fn parse_local(name: &str, local_pkg: &str) -> Result<Self> {
        if name.contains('.') {
            Self::parse(name)
        } else {
            Ok(Self::new(local_pkg, name))
        }
    }

    pub fn is_builtin(&self) -> bool {
        self.builtin
    }

    /// Exported names start with an uppercase letter. Builtins are always visible.
    pub fn is_exported(&self) -> bool {
        self.builtin || is_exported_ident(&self.name)
    }

    /// Whether `ty` is exactly the named type this name refers to
    pub fn is_type(&self, ty: &Type) -> bool {
        matches!(ty, Type::Named { name } if name == self)
    }

    /// How the name should be spelled from inside package `rel`.
    ///
    /// `rel` is compared against the package path, and against the package
    /// name too when `use_package_name` is set.
    pub fn import_name(&self, rel: &str, use_package_name: bool) -> String {
        if self.builtin || rel == self.package_path || (use_package_name && rel == self.package_name) {
            self.name.clone()
        } else {
            format!("{}.{}", self.package_name, self.name)
        }
    }
}

/// Go's export rule: the first character is a Unicode uppercase letter
pub fn is_exported_ident(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

/// Package name implied by an import path
pub(crate) fn last_segment(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or(path)
}

impl PartialEq for TypeName {
    fn eq(&self, other: &Self) -> bool {
        self.full == other.full
    }
}

impl Eq for TypeName {}

impl Hash for TypeName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.full.hash(state);
    }
}

impl PartialOrd for TypeName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.full.cmp(&other.full)
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.builtin {
            f.write_str(&self.name)
        } else {
            f.write_str(&self.full)
        }
    }
}

impl FromStr for TypeName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for TypeName {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TypeName {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        if s.contains('.') {
            TypeName::parse(&s).map_err(serde::de::Error::custom)
        } else {
            Ok(TypeName::builtin(s))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rejects_unqualified_names() {
        for bad in ["foo", "yep/foo", "", "!", " ", "pkg.", ".Name"] {
            let err = TypeName::parse(bad).unwrap_err();
            assert!(err.is_invariant(), "expected invariant error for {:?}", bad);
        }
    }

    #[test]
    fn test_package_name_ignores_trailing_slash() {
        assert_eq!(TypeName::new("a/b/", "X").package_name, "b");
        assert_eq!(last_segment("a/b"), "b");
        assert_eq!(last_segment("plain"), "plain");
    }

    #[test]
    fn test_parse() {
        let tn = TypeName::parse("yep/foo.bar").unwrap();
        assert_eq!(tn.package_path, "yep/foo");
        assert_eq!(tn.package_name, "foo");
        assert_eq!(tn.name, "bar");
        assert_eq!(tn.full, "yep/foo.bar");
        assert!(!tn.is_builtin());

        let tn = TypeName::parse("foo.bar").unwrap();
        assert_eq!(tn, TypeName::new("foo", "bar"));
        assert_eq!(tn.package_name, "foo");
    }

    #[test]
    fn test_builtin() {
        let tn = TypeName::builtin("int");
        assert!(tn.is_builtin());
        assert_eq!(tn.full, "int");
        assert_eq!(tn.to_string(), "int");
        assert_eq!(tn.package_path, "");
    }

    #[test]
    fn test_import_name() {
        let tn = TypeName::builtin("int");
        assert_eq!(tn.import_name("", false), "int");
        assert_eq!(tn.import_name("pants", false), "int");

        let tn = TypeName::parse("test/yep.Foo").unwrap();
        assert_eq!(tn.import_name("", false), "yep.Foo");
        assert_eq!(tn.import_name("test", false), "yep.Foo");
        assert_eq!(tn.import_name("test/yep", false), "Foo");
        assert_eq!(tn.import_name("test/yep", true), "Foo");
        assert_eq!(tn.import_name("yep", false), "yep.Foo");
        assert_eq!(tn.import_name("yep", true), "Foo");
    }

    #[test]
    fn test_exported() {
        assert!(TypeName::builtin("int").is_exported());
        assert!(!TypeName::parse("test/yep.unexported").unwrap().is_exported());
        assert!(TypeName::parse("test/yep.Exported").unwrap().is_exported());
        assert!(TypeName::parse("test/yep.Ünicode").unwrap().is_exported());
    }

    #[test]
    fn test_ordering_and_parse_local() {
        let a = TypeName::new("a/b", "X");
        let b = TypeName::new("a/b", "Y");
        assert!(a < b);
        assert!(b > a);

        let local = TypeName::parse_local("Thing", "a/b").unwrap();
        assert_eq!(local.full, "a/b.Thing");
        let qualified = TypeName::parse_local("c/d.Other", "a/b").unwrap();
        assert_eq!(qualified.package_path, "c/d");
    }

    #[test]
    fn test_serde_as_string() {
        let tn = TypeName::new("a/b", "X");
        let json = serde_json::to_string(&tn).unwrap();
        assert_eq!(json, "\"a/b.X\"");
        let back: TypeName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tn);
        let builtin: TypeName = serde_json::from_str("\"int\"").unwrap();
        assert!(builtin.is_builtin());
    }
}

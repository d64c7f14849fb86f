//! Type checking collaborator
//!
//! The engine never type-checks anything itself. It hands a loaded package to
//! an injected [`Checker`] and gets back package-scope definitions plus a list
//! of errors, each classified soft or hard by the checker.
//!
//! Dependencies are resolved through the [`Importer`] the engine passes in, so
//! every package goes through the same cache no matter who asked for it.

pub mod constant;
pub mod go;
pub mod prebuilt;

pub use go::GoChecker;
pub use prebuilt::PrebuiltPackages;

use crate::resolve::Package;
use crate::source::LoadedPackage;
use crate::types::{ConstDef, TypeDef};
use crate::Result;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// One error reported by a checker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeError {
    pub message: String,
    /// Soft errors leave the rest of the package trustworthy
    pub soft: bool,
    pub file: Option<String>,
    pub line: Option<usize>,
}

impl TypeError {
    pub fn soft(message: impl Into<String>) -> Self {
        Self { message: message.into(), soft: true, file: None, line: None }
    }

    pub fn hard(message: impl Into<String>) -> Self {
        Self { message: message.into(), soft: false, file: None, line: None }
    }

    pub fn at(mut self, file: impl Into<String>, line: usize) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.file, self.line) {
            (Some(file), Some(line)) => write!(f, "{}:{}: {}", file, line, self.message),
            (Some(file), None) => write!(f, "{}: {}", file, self.message),
            _ => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for TypeError {}

/// Input to a checker run
#[derive(Debug, Clone, Copy)]
pub struct CheckUnit<'a> {
    pub import_path: &'a str,
    pub source: &'a LoadedPackage,
}

/// Package-scope definitions a checker produced
#[derive(Debug, Clone, Default)]
pub struct CheckedPackage {
    pub name: String,
    pub types: Vec<TypeDef>,
    /// Declaration order
    pub consts: Vec<ConstDef>,
    pub imports: Vec<String>,
}

#[derive(Debug, Default)]
pub struct CheckOutcome {
    pub package: CheckedPackage,
    pub errors: Vec<TypeError>,
}

impl CheckOutcome {
    pub fn first_hard(&self) -> Option<&TypeError> {
        self.errors.iter().find(|e| !e.soft)
    }
}

/// Resolves a dependency while a package is being checked
pub trait Importer {
    fn import(&mut self, path: &str, from_dir: &Path) -> Result<Arc<Package>>;
}

/// Type-checking capability driven by the engine
pub trait Checker: Send + Sync {
    /// Name for logs
    fn name(&self) -> &str;

    /// Check one package. Failures are reported in the outcome, never by
    /// aborting, so partially valid packages stay usable.
    fn check(&self, unit: CheckUnit<'_>, importer: &mut dyn Importer) -> CheckOutcome;
}

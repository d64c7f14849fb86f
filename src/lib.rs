//! # Structer - package and type introspection for Go source trees
//!
//! Structer sits on top of a parser and a type checker and gives code
//! generators a navigable model of the packages they run against.
//!
//! Structer provides:
//! - Provenance-aware package location (vendored, system, user)
//! - A resolution engine that loads and checks each package once and indexes
//!   every package-scope named type
//! - Interface implementer search, constant/enum extraction, doc and source lookup
//! - A recursive type walker with composable visitors

pub mod type_name;
pub mod types;
pub mod source;
pub mod check;
pub mod resolve;
pub mod walk;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use type_name::TypeName;
pub use types::{BasicKind, Constant, Type, TypeDef};
pub use source::{LoadedPackage, PackageKind, SearchRoots};
pub use check::{Checker, GoChecker, TypeError};
pub use resolve::{Consts, Package, PackageSet, ResolveOptions};
pub use walk::{walk, Flow, MultiVisitor, PartialVisitor, TypeVisitor, WalkContext};

/// Result type alias for Structer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Structer operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid type name {0:?}, expected format full/pkg/path.Type")]
    InvalidTypeName(String),

    #[error("invalid import path {0:?}")]
    InvalidImportPath(String),

    #[error("package not found: {0}")]
    PackageNotFound(String),

    #[error("package {path} failed to resolve: {cause}")]
    PackageFailed { path: String, cause: String },

    #[error("parse error in {dir}:\n{}", .errors.join("\n"))]
    Parse { dir: String, errors: Vec<String> },

    #[error("type check failed for {path}: {message}")]
    TypeCheck { path: String, message: String },

    #[error("import cycle through {0}")]
    ImportCycle(String),

    #[error("type {0} is not an interface")]
    NotInterface(String),

    #[error("type {0} is not a struct")]
    NotStruct(String),

    #[error("object not found: {0}")]
    ObjectNotFound(String),

    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error("unhandled type kind in walk: {0}")]
    UnhandledKind(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Visitor(#[from] anyhow::Error),
}

impl Error {
    /// Invariant violations, walker kind failures and malformed type names
    /// signal a bug in the engine or its caller rather than a data condition.
    pub fn is_invariant(&self) -> bool {
        matches!(
            self,
            Error::Invariant(_) | Error::UnhandledKind(_) | Error::InvalidTypeName(_)
        )
    }
}

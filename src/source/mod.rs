//! Locating and loading package sources
//!
//! Two leaf components with no cross-package knowledge:
//! - [`ProvenanceResolver`] maps an import path to a directory and a
//!   [`PackageKind`]
//! - [`SourceLoader`] reads a directory into syntax trees and raw bytes

pub mod loader;
pub mod provenance;

pub use loader::{LoadedPackage, SourceLoader};
pub use provenance::{PackageKind, ProvenanceResolver, Resolution, SearchRoots};

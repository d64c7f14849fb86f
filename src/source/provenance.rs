//! Provenance resolution
//!
//! An import path is looked up in three places, in order:
//! 1. `<level>/<vendor_dir>/<path>` for every directory level from the
//!    search origin up to (but excluding) the workspace root
//! 2. `<system root>/<path>`
//! 3. `<workspace root>/<path>`
//!
//! Nothing matching is a legitimate outcome and yields [`PackageKind::None`].

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Where a package came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageKind {
    #[default]
    None,
    Vendored,
    System,
    User,
}

impl PackageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageKind::None => "",
            PackageKind::Vendored => "vendor",
            PackageKind::System => "system",
            PackageKind::User => "user",
        }
    }

    pub fn is_found(&self) -> bool {
        *self != PackageKind::None
    }
}

impl fmt::Display for PackageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageKind::None => f.write_str("none"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// The three roots packages are searched in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRoots {
    /// User workspace, the directory import paths are relative to
    pub workspace: Option<PathBuf>,
    /// Standard library sources
    pub system: Option<PathBuf>,
    /// Name of vendored dependency directories
    pub vendor_dir: String,
}

impl Default for SearchRoots {
    fn default() -> Self {
        Self { workspace: None, system: None, vendor_dir: "vendor".to_string() }
    }
}

impl SearchRoots {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self { workspace: Some(workspace.into()), ..Self::default() }
    }

    pub fn with_system(mut self, system: impl Into<PathBuf>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_vendor_dir(mut self, vendor_dir: impl Into<String>) -> Self {
        self.vendor_dir = vendor_dir.into();
        self
    }

    /// Roots derived from `GOPATH` and `GOROOT`.
    ///
    /// Only the CLI calls this; library users pass their roots explicitly.
    pub fn from_env() -> Self {
        let workspace = std::env::var_os("GOPATH")
            .and_then(|p| std::env::split_paths(&p).next())
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join("go")))
            .map(|p| p.join("src"));
        let system = std::env::var_os("GOROOT").map(|p| PathBuf::from(p).join("src"));
        Self { workspace, system, ..Self::default() }
    }
}

/// Outcome of a provenance lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub kind: PackageKind,
    pub dir: Option<PathBuf>,
}

impl Resolution {
    fn none() -> Self {
        Self { kind: PackageKind::None, dir: None }
    }

    fn found(kind: PackageKind, dir: PathBuf) -> Self {
        Self { kind, dir: Some(dir) }
    }
}

/// Maps import paths to directories
#[derive(Debug, Clone)]
pub struct ProvenanceResolver {
    roots: SearchRoots,
}

impl ProvenanceResolver {
    pub fn new(roots: SearchRoots) -> Self {
        Self { roots }
    }

    pub fn roots(&self) -> &SearchRoots {
        &self.roots
    }

    /// Locate `import_path`, searching vendor directories upward from `origin` first
    pub fn resolve(&self, import_path: &str, origin: Option<&Path>) -> Result<Resolution> {
        validate_import_path(import_path)?;
        let rel = to_relative(import_path);

        if let Some(origin) = origin {
            for level in self.vendor_levels(origin) {
                let candidate = level.join(&self.roots.vendor_dir).join(&rel);
                if is_dir(&candidate) {
                    tracing::trace!(import_path, dir = %candidate.display(), "vendored package");
                    return Ok(Resolution::found(PackageKind::Vendored, candidate));
                }
            }
        }

        if let Some(system) = &self.roots.system {
            let candidate = system.join(&rel);
            if is_dir(&candidate) {
                return Ok(Resolution::found(PackageKind::System, candidate));
            }
        }

        if let Some(workspace) = &self.roots.workspace {
            let candidate = workspace.join(&rel);
            if is_dir(&candidate) {
                return Ok(Resolution::found(PackageKind::User, candidate));
            }
        }

        Ok(Resolution::none())
    }

    /// Directories tested for a vendor subdirectory: `origin` and its
    /// ancestors, stopping before the workspace root.
    fn vendor_levels(&self, origin: &Path) -> Vec<PathBuf> {
        let mut levels = Vec::new();
        let workspace = self.roots.workspace.as_deref();
        let mut current = Some(origin);
        while let Some(dir) = current {
            if workspace.is_some_and(|ws| dir == ws || !dir.starts_with(ws)) {
                break;
            }
            levels.push(dir.to_path_buf());
            current = dir.parent().filter(|p| !p.as_os_str().is_empty());
        }
        levels
    }

    /// Classify a source file and recover its package's import path
    pub fn file_package(&self, file: &Path) -> Result<(PackageKind, String)> {
        let dir = file
            .parent()
            .ok_or_else(|| Error::PackageNotFound(file.display().to_string()))?;

        if let Some(path) = self.roots.system.as_deref().and_then(|root| relative_import(dir, root)) {
            return Ok((PackageKind::System, path));
        }

        if let Some(path) = self.vendored_import(dir) {
            return Ok((PackageKind::Vendored, path));
        }

        if let Some(path) = self.roots.workspace.as_deref().and_then(|root| relative_import(dir, root)) {
            return Ok((PackageKind::User, path));
        }

        Err(Error::PackageNotFound(format!(
            "{} is not inside any search root",
            file.display()
        )))
    }

    fn vendored_import(&self, dir: &Path) -> Option<String> {
        let components: Vec<_> = dir.components().collect();
        let vendor_at = components
            .iter()
            .rposition(|c| matches!(c, Component::Normal(n) if *n == self.roots.vendor_dir.as_str()))?;
        let rest: Vec<String> = components[vendor_at + 1..]
            .iter()
            .filter_map(|c| match c {
                Component::Normal(n) => Some(n.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        if rest.is_empty() { None } else { Some(rest.join("/")) }
    }
}

/// Reject import paths that could escape the search roots
pub fn validate_import_path(import_path: &str) -> Result<()> {
    let invalid = import_path.trim().is_empty()
        || import_path.starts_with('/')
        || import_path.contains('\\')
        || import_path
            .split('/')
            .any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if invalid {
        return Err(Error::InvalidImportPath(import_path.to_string()));
    }
    Ok(())
}

fn to_relative(import_path: &str) -> PathBuf {
    import_path.split('/').collect()
}

fn relative_import(dir: &Path, root: &Path) -> Option<String> {
    let rel = dir.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() { None } else { Some(parts.join("/")) }
}

fn is_dir(path: &Path) -> bool {
    path.is_dir()
}

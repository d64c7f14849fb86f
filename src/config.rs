//! `structer.toml` handling
//!
//! Every key is optional. Unset roots fall back to `GOPATH`/`GOROOT` in the
//! CLI; the library itself only ever sees the resulting [`SearchRoots`].

use crate::resolve::ResolveOptions;
use crate::source::SearchRoots;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct StructerConfig {
    /// Directory import paths are resolved against (a `GOPATH/src`)
    pub workspace_root: Option<PathBuf>,
    /// Standard library sources (a `GOROOT/src`)
    pub system_root: Option<PathBuf>,
    pub vendor_dir: Option<String>,
    pub include_tests: Option<bool>,
    pub allow_hard_errors: Option<bool>,
}

impl StructerConfig {
    /// Search roots with config values layered over `fallback`
    pub fn search_roots(&self, fallback: SearchRoots) -> SearchRoots {
        let mut roots = fallback;
        if let Some(workspace) = &self.workspace_root {
            roots.workspace = Some(workspace.clone());
        }
        if let Some(system) = &self.system_root {
            roots.system = Some(system.clone());
        }
        if let Some(vendor_dir) = &self.vendor_dir {
            roots.vendor_dir = vendor_dir.clone();
        }
        roots
    }

    pub fn resolve_options(&self) -> ResolveOptions {
        let defaults = ResolveOptions::default();
        ResolveOptions {
            include_tests: self.include_tests.unwrap_or(defaults.include_tests),
            allow_hard_errors: self.allow_hard_errors.unwrap_or(defaults.allow_hard_errors),
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("structer.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<StructerConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: StructerConfig = toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("invalid config {}: {}", path.display(), e))?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &StructerConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_config_is_none() {
        let dir = tempdir().unwrap();
        let loaded = load_config(Some(&dir.path().join("structer.toml"))).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("structer.toml");
        let config = StructerConfig {
            workspace_root: Some(PathBuf::from("/go/src")),
            vendor_dir: Some("third_party".to_string()),
            allow_hard_errors: Some(false),
            ..Default::default()
        };
        write_config(&path, &config, false).unwrap();
        assert_eq!(load_config(Some(&path)).unwrap(), Some(config.clone()));

        assert!(write_config(&path, &config, false).is_err());
        write_config(&path, &StructerConfig::default(), true).unwrap();
        assert_eq!(load_config(Some(&path)).unwrap(), Some(StructerConfig::default()));
    }

    #[test]
    fn test_invalid_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("structer.toml");
        std::fs::write(&path, "include_tests = \"yes\"").unwrap();
        let err = load_config(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("invalid config"));
    }

    #[test]
    fn test_layering() {
        let config: StructerConfig = toml::from_str(
            r#"
            system_root = "/usr/local/go/src"
            include_tests = true
            "#,
        )
        .unwrap();

        let roots = config.search_roots(SearchRoots::new("/home/me/go/src"));
        assert_eq!(roots.workspace, Some(PathBuf::from("/home/me/go/src")));
        assert_eq!(roots.system, Some(PathBuf::from("/usr/local/go/src")));
        assert_eq!(roots.vendor_dir, "vendor");

        let options = config.resolve_options();
        assert!(options.include_tests);
        assert!(options.allow_hard_errors);
    }
}

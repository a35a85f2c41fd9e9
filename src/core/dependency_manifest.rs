//! Standalone dependency manifests.
//!
//! A [`DependencyManifest`] is a subset of a full package manifest: just a
//! `dependencies` table, with no `[package]` or `[targets]` sections. It
//! lets a consumer declare "these are the dependencies I need" (for example
//! to drive `resolve` against a throwaway root) without authoring a
//! complete buildable package.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::dependency::{Dependency, DependencySpec};

/// A standalone listing of dependencies, distinct from [`crate::core::Manifest`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependencyManifest {
    #[serde(default)]
    pub dependencies: HashMap<String, DependencySpec>,
}

impl DependencyManifest {
    /// Load a dependency manifest from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read dependency manifest: {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("failed to parse dependency manifest: {}", path.display()))
    }

    /// Parse a dependency manifest from its TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        let manifest: DependencyManifest = toml::from_str(contents)?;
        if manifest.dependencies.is_empty() {
            anyhow::bail!("dependency manifest has no `dependencies` entries");
        }
        Ok(manifest)
    }

    /// Resolve every entry into a concrete [`Dependency`], relative to
    /// `base_dir` for path-dependency resolution.
    pub fn to_dependencies(&self, base_dir: &Path) -> Result<Vec<Dependency>> {
        self.dependencies
            .iter()
            .map(|(name, spec)| spec.to_dependency(name, base_dir))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_dependencies_table() {
        let manifest = DependencyManifest::parse(
            r#"
[dependencies]
zlib = "^1.2"
fmt = { version = "^10", uses = ["fmt-core"] }
"#,
        )
        .unwrap();

        assert_eq!(manifest.dependencies.len(), 2);
        let deps = manifest.to_dependencies(Path::new(".")).unwrap();
        assert_eq!(deps.len(), 2);
    }

    #[test]
    fn empty_dependencies_table_is_rejected() {
        let err = DependencyManifest::parse("[dependencies]\n").unwrap_err();
        assert!(err.to_string().contains("no `dependencies` entries"));
    }
}

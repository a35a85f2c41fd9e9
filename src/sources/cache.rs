//! Source cache management.
//!
//! Every dependency this crate resolves is either a path dependency or a
//! registry-less requirement resolved against locally vendored packages
//! under the workspace cache directory. [`SourceCache`] keeps one
//! [`PathSource`] per distinct root directory alive for the duration of a
//! resolve/build, so repeated queries against the same package don't re-walk
//! the filesystem.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::core::{Dependency, Package, PackageId, Summary};
use crate::sources::{PathSource, Source};

/// Manages all package sources and caching.
pub struct SourceCache {
    /// Cache directory for the workspace (vendored packages land here).
    cache_dir: PathBuf,

    /// Active sources keyed by their root directory.
    sources: HashMap<PathBuf, Box<dyn Source>>,
}

impl SourceCache {
    /// Create a new source cache.
    pub fn new(cache_dir: PathBuf) -> Self {
        SourceCache {
            cache_dir,
            sources: HashMap::new(),
        }
    }

    fn root_for(&self, dep: &Dependency) -> Result<PathBuf> {
        dep.path()
            .map(Path::to_path_buf)
            .ok_or_else(|| anyhow::anyhow!("dependency `{}` has no resolvable source path", dep.name()))
    }

    /// Get or create a source for a dependency.
    pub fn get_or_create(&mut self, dep: &Dependency) -> Result<&mut dyn Source> {
        let root = self.root_for(dep)?;

        if !self.sources.contains_key(&root) {
            let source = self.create_source(&root)?;
            self.sources.insert(root.clone(), source);
        }

        Ok(self.sources.get_mut(&root).unwrap().as_mut())
    }

    fn create_source(&self, root: &Path) -> Result<Box<dyn Source>> {
        if !root.exists() {
            bail!("source path does not exist: {}", root.display());
        }
        Ok(Box::new(PathSource::new(root.to_path_buf())))
    }

    /// Query all sources for versions matching a dependency.
    pub fn query(&mut self, dep: &Dependency) -> Result<Vec<Summary>> {
        let source = self.get_or_create(dep)?;
        source.query(dep)
    }

    /// Load a package from its source, given the root directory it lives in.
    pub fn load_package(&mut self, root: &Path, pkg_id: PackageId) -> Result<Package> {
        if !self.sources.contains_key(root) {
            let source = self.create_source(root)?;
            self.sources.insert(root.to_path_buf(), source);
        }

        let source = self.sources.get_mut(root).unwrap();
        source.load_package(pkg_id)
    }

    /// Ensure all sources for the given dependencies are ready.
    pub fn ensure_ready(&mut self, deps: &[Dependency]) -> Result<()> {
        for dep in deps {
            let source = self.get_or_create(dep)?;
            source.ensure_ready()?;
        }
        Ok(())
    }

    /// Get the cache directory.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_source_cache_path() {
        let tmp = TempDir::new().unwrap();
        let cache_dir = tmp.path().join("cache");
        let pkg_dir = tmp.path().join("pkg");

        std::fs::create_dir_all(&pkg_dir).unwrap();
        std::fs::write(
            pkg_dir.join("Crucible.toml"),
            "[package]\nname = \"test\"\nversion = \"1.0.0\"\n",
        )
        .unwrap();

        let mut cache = SourceCache::new(cache_dir);
        let dep = Dependency::new("test").with_path(&pkg_dir);

        let summaries = cache.query(&dep).unwrap();
        assert_eq!(summaries.len(), 1);
    }
}

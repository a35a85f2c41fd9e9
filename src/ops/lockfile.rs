//! Lockfile I/O operations.

use std::collections::BTreeMap;
use std::hash::Hasher;
use std::path::Path;

use anyhow::{Context, Result};
use siphasher::sip::SipHasher24;

use crate::core::Manifest;
use crate::resolver::encode::Lockfile;
use crate::resolver::Resolve;

/// Load a lockfile from the given path.
pub fn load_lockfile(path: &Path) -> Result<Option<Resolve>> {
    if !path.exists() {
        return Ok(None);
    }

    let lockfile = Lockfile::load(path)?;

    if !lockfile.is_compatible() {
        anyhow::bail!(
            "lockfile version {} is not compatible with this version",
            lockfile.version
        );
    }

    let resolve = lockfile.to_resolve()?;
    Ok(Some(resolve))
}

/// Save a resolve to the lockfile, stamping it with the manifest's
/// resolution-affecting content hash for later freshness checks.
pub fn save_lockfile(path: &Path, resolve: &Resolve, manifest_path: &Path) -> Result<()> {
    let manifest = Manifest::load(manifest_path)?;
    let hash = manifest_dependency_hash(&manifest);

    let lockfile = Lockfile::from_resolve(resolve).with_manifest_hash(hash);
    lockfile.save(path)?;
    Ok(())
}

/// Check if the lockfile needs updating.
///
/// Returns true if the lockfile doesn't exist, can't be parsed, or was
/// stamped with a different dependency-table hash than the current manifest.
pub fn lockfile_needs_update(manifest_path: &Path, lockfile_path: &Path) -> Result<bool> {
    if !lockfile_path.exists() {
        return Ok(true);
    }

    let Ok(lockfile) = Lockfile::load(lockfile_path) else {
        return Ok(true);
    };

    let manifest = Manifest::load(manifest_path)
        .with_context(|| format!("failed to load manifest: {}", manifest_path.display()))?;
    let current_hash = manifest_dependency_hash(&manifest);

    Ok(lockfile.manifest_hash() != Some(current_hash.as_str()))
}

/// Hash of a manifest's resolution-affecting fields: its name, version, and
/// dependency table. Used for content-based lockfile freshness detection
/// instead of brittle filesystem mtimes.
fn manifest_dependency_hash(manifest: &Manifest) -> String {
    let mut deps: BTreeMap<&str, String> = BTreeMap::new();
    for (name, spec) in &manifest.dependencies {
        deps.insert(name.as_str(), format!("{:?}", spec));
    }

    let canonical = format!(
        "{}|{}|{:?}",
        manifest.package.name, manifest.package.version, deps
    );

    let mut hasher = SipHasher24::new_with_keys(42, 1729);
    hasher.write(canonical.as_bytes());
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PackageId, Summary};
    use semver::Version;
    use tempfile::TempDir;

    #[test]
    fn test_lockfile_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let lockfile_path = tmp.path().join("Crucible.lock");

        let pkg_id = PackageId::new("test", Version::new(1, 0, 0), 0);

        let mut resolve = Resolve::new();
        resolve.add_package(pkg_id, Summary::new(pkg_id, vec![], None));

        let lockfile = crate::resolver::encode::Lockfile::from_resolve(&resolve);
        lockfile.save(&lockfile_path).unwrap();

        let loaded = load_lockfile(&lockfile_path).unwrap().unwrap();
        assert_eq!(loaded.len(), 1);
    }

    #[test]
    fn test_missing_lockfile() {
        let tmp = TempDir::new().unwrap();
        let lockfile_path = tmp.path().join("nonexistent.lock");

        let result = load_lockfile(&lockfile_path).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_needs_update_when_manifest_changes() {
        let tmp = TempDir::new().unwrap();
        let manifest_path = tmp.path().join("Crucible.toml");
        let lockfile_path = tmp.path().join("Crucible.lock");

        std::fs::write(
            &manifest_path,
            "[package]\nname = \"test\"\nversion = \"1.0.0\"\n",
        )
        .unwrap();

        let resolve = Resolve::new();
        save_lockfile(&lockfile_path, &resolve, &manifest_path).unwrap();
        assert!(!lockfile_needs_update(&manifest_path, &lockfile_path).unwrap());

        std::fs::write(
            &manifest_path,
            "[package]\nname = \"test\"\nversion = \"2.0.0\"\n",
        )
        .unwrap();
        assert!(lockfile_needs_update(&manifest_path, &lockfile_path).unwrap());
    }
}

//! Dependency declarations - WHAT is required (name + version range + usage).
//!
//! A `Dependency` is the resolver-facing form of a manifest dependency
//! entry: a package name, a version range, and which of that package's
//! libraries this edge actually uses (for `uses`-edge propagation, see
//! [`crate::core::library`]).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};

use crate::resolver::range::RangeSet;
use crate::util::InternedString;

/// A dependency requirement as the resolver sees it.
#[derive(Debug, Clone)]
pub struct Dependency {
    name: InternedString,
    version_req: VersionReq,
    /// Set when the manifest used range syntax that can't be flattened into
    /// a single `VersionReq` (a bracketed union of disjoint clauses). When
    /// present, this is authoritative over `version_req` for both matching
    /// and resolver range construction.
    range: Option<RangeSet>,
    /// A local path dependency always resolves to the package rooted here,
    /// bypassing version resolution against a registry.
    path: Option<PathBuf>,
    optional: bool,
    /// Which libraries of the dependency are used. `None` means all of
    /// them (the common case for a single-library package).
    uses: Option<Vec<String>>,
}

impl Dependency {
    /// Create a new dependency with an unconstrained version requirement.
    pub fn new(name: impl Into<InternedString>) -> Self {
        Dependency {
            name: name.into(),
            version_req: VersionReq::STAR,
            range: None,
            path: None,
            optional: false,
            uses: None,
        }
    }

    /// Set the version requirement.
    pub fn with_version_req(mut self, req: VersionReq) -> Self {
        self.version_req = req;
        self
    }

    /// Set a range expressible only as a multi-interval set (a bracketed
    /// union). Takes priority over `version_req` once set.
    pub fn with_range(mut self, range: RangeSet) -> Self {
        self.range = Some(range);
        self
    }

    /// Parse a version constraint written in either cargo-native
    /// `VersionReq` syntax (`^1.2`, `~1.3`, `>=1.0, <2.0`) or the `@`/
    /// bracketed-union range syntax, applying whichever fits.
    fn with_version_constraint(self, name: &str, req: &str) -> Result<Self> {
        if crate::resolver::range::looks_like_range_syntax(req) {
            let range = crate::resolver::range::parse_range(req)
                .with_context(|| format!("invalid version range for `{name}`: {req}"))?;
            if let Some(version_req) = crate::resolver::range::to_version_req(&range) {
                return Ok(self.with_version_req(version_req));
            }
            return Ok(self.with_range(range));
        }

        let version_req = VersionReq::parse(req)
            .with_context(|| format!("invalid version requirement for `{name}`: {req}"))?;
        Ok(self.with_version_req(version_req))
    }

    /// Mark this as a path dependency rooted at `path`.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Mark this dependency optional.
    pub fn with_optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    /// Restrict to a subset of the dependency's libraries.
    pub fn with_uses(mut self, uses: Vec<String>) -> Self {
        self.uses = Some(uses);
        self
    }

    pub fn name(&self) -> InternedString {
        self.name
    }

    pub fn version_req(&self) -> &VersionReq {
        &self.version_req
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_path(&self) -> bool {
        self.path.is_some()
    }

    pub fn optional(&self) -> bool {
        self.optional
    }

    /// Libraries used from the dependency, or `None` for "all of them".
    pub fn uses(&self) -> Option<&[String]> {
        self.uses.as_deref()
    }

    /// Check if a candidate version satisfies this dependency.
    pub fn matches_version(&self, version: &Version) -> bool {
        match &self.range {
            Some(range) => range.contains(version),
            None => self.version_req.matches(version),
        }
    }

    /// The multi-interval range, when this dependency's constraint can't be
    /// expressed as a plain `VersionReq` (see [`Dependency::with_range`]).
    pub fn range(&self) -> Option<&RangeSet> {
        self.range.as_ref()
    }
}

/// How a dependency entry is written in the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencySpec {
    /// `name = "^1.2"`
    Simple(String),
    /// `name = { version = "^1.2", path = "...", uses = [...] }`
    Detailed(DetailedDependencySpec),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailedDependencySpec {
    pub version: Option<String>,
    pub path: Option<String>,
    pub optional: bool,
    pub uses: Option<Vec<String>>,
}

impl DependencySpec {
    /// Resolve this spec into a concrete [`Dependency`], relative to
    /// `manifest_dir` for path resolution.
    pub fn to_dependency(&self, name: &str, manifest_dir: &Path) -> Result<Dependency> {
        match self {
            DependencySpec::Simple(req) => Dependency::new(name).with_version_constraint(name, req),
            DependencySpec::Detailed(detail) => {
                let mut dep = Dependency::new(name);

                if let Some(req) = &detail.version {
                    dep = dep.with_version_constraint(name, req)?;
                }

                if let Some(path) = &detail.path {
                    dep = dep.with_path(manifest_dir.join(path));
                }

                dep = dep.with_optional(detail.optional);

                if let Some(uses) = &detail.uses {
                    dep = dep.with_uses(uses.clone());
                }

                Ok(dep)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_spec_parses_version_req() {
        let spec = DependencySpec::Simple("^1.2".to_string());
        let dep = spec.to_dependency("foo", Path::new(".")).unwrap();
        assert!(dep.matches_version(&Version::new(1, 3, 0)));
        assert!(!dep.matches_version(&Version::new(2, 0, 0)));
    }

    #[test]
    fn at_syntax_spec_matches_until_next_major() {
        let spec = DependencySpec::Simple("@1.2.3".to_string());
        let dep = spec.to_dependency("foo", Path::new(".")).unwrap();
        assert!(dep.matches_version(&Version::new(1, 9, 0)));
        assert!(!dep.matches_version(&Version::new(2, 0, 0)));
        // Collapses to a plain VersionReq, no need for the multi-interval path.
        assert!(dep.range().is_none());
    }

    #[test]
    fn bracketed_union_spec_keeps_a_range_set() {
        let spec =
            DependencySpec::Simple("[(>=1.0.0 <2.0.0) || (>=3.0.0 <4.0.0)]".to_string());
        let dep = spec.to_dependency("foo", Path::new(".")).unwrap();
        assert!(dep.matches_version(&Version::new(1, 5, 0)));
        assert!(dep.matches_version(&Version::new(3, 5, 0)));
        assert!(!dep.matches_version(&Version::new(2, 5, 0)));
        assert!(dep.range().is_some());
    }

    #[test]
    fn detailed_path_spec_has_no_version_constraint() {
        let spec = DependencySpec::Detailed(DetailedDependencySpec {
            version: None,
            path: Some("../foo".to_string()),
            optional: false,
            uses: None,
        });
        let dep = spec.to_dependency("foo", Path::new("/ws/bar")).unwrap();
        assert!(dep.is_path());
        assert_eq!(dep.path(), Some(Path::new("/ws/foo")));
    }
}

//! Dependency resolution.
//!
//! This module implements PubGrub-based version resolution. The resolver
//! is pure and deterministic - all I/O happens before resolution.

pub mod encode;
pub mod errors;
pub mod range;
pub mod resolve;
pub mod version;

pub use errors::ResolveError;
pub use resolve::Resolve;

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;

use anyhow::{bail, Result};
use pubgrub::{
    DefaultStringReporter, Dependencies, DependencyProvider, PackageResolutionStatistics, Range,
    Reporter,
};
use semver::Version;

use crate::core::{Dependency, Summary};
use crate::util::InternedString;

/// The PubGrub range a dependency edge constrains a package to, preferring
/// a multi-interval range set over the flattened `VersionReq` when the
/// manifest used bracketed-union syntax that can't collapse into one.
fn dependency_range(dep: &Dependency) -> Range<Version> {
    match dep.range() {
        Some(range) => range.to_pubgrub_range(),
        None => version::version_req_to_range(dep.version_req()),
    }
}

/// A package identifier for PubGrub resolution. Resolution happens purely
/// on name + version; source location plays no part in package identity.
pub type PubGrubPackage = InternedString;

/// Custom error type for the resolver that implements std::error::Error.
#[derive(Debug)]
pub struct ResolverError(String);

impl fmt::Display for ResolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StdError for ResolverError {}

impl From<anyhow::Error> for ResolverError {
    fn from(e: anyhow::Error) -> Self {
        ResolverError(e.to_string())
    }
}

/// Dependency provider for PubGrub resolution.
pub struct PackageResolver {
    /// Available package summaries by name
    summaries: HashMap<InternedString, Vec<Summary>>,

    /// Root package
    root: Summary,
}

impl PackageResolver {
    /// Create a new resolver with the root package.
    pub fn new(root: Summary) -> Self {
        PackageResolver {
            summaries: HashMap::new(),
            root,
        }
    }

    /// Add available summaries for resolution.
    pub fn add_summaries(&mut self, summaries: Vec<Summary>) {
        for summary in summaries {
            self.summaries
                .entry(summary.name())
                .or_default()
                .push(summary);
        }
    }

    /// Get the root package.
    pub fn root(&self) -> &Summary {
        &self.root
    }

    /// Resolve dependencies and return the result.
    pub fn resolve(self) -> Result<Resolve> {
        let root_pkg: PubGrubPackage = self.root.name();
        let root_version = self.root.version().clone();

        match pubgrub::resolve(&self, root_pkg, root_version) {
            Ok(solution) => {
                // Convert PubGrub solution to Resolve
                let mut resolve = Resolve::new();

                for (name, version) in solution {
                    if let Some(summaries) = self.summaries.get(&name) {
                        let best = summaries
                            .iter()
                            .filter(|s| s.version() == &version)
                            .max_by_key(|s| s.package_id().revision());
                        if let Some(summary) = best {
                            resolve.add_package(summary.package_id(), summary.clone());
                        }
                    } else if name == self.root.name() {
                        resolve.add_package(self.root.package_id(), self.root.clone());
                    }
                }

                // Add dependency edges
                let packages: Vec<_> = resolve.packages().map(|(id, s)| (*id, s.clone())).collect();
                for (pkg_id, summary) in packages {
                    for dep in summary.dependencies() {
                        if let Some(dep_id) = resolve.get_package_by_name(dep.name()) {
                            resolve.add_edge(pkg_id, dep_id);
                        }
                    }
                }

                Ok(resolve)
            }
            Err(pubgrub::PubGrubError::NoSolution(tree)) => {
                let report = DefaultStringReporter::report(&tree);
                bail!("dependency resolution failed:\n{}", report);
            }
            Err(e) => {
                bail!("dependency resolution error: {:?}", e);
            }
        }
    }
}

impl DependencyProvider for PackageResolver {
    type P = PubGrubPackage;
    type V = Version;
    type VS = Range<Version>;
    type M = String;
    type Err = ResolverError;
    type Priority = u32;

    fn prioritize(
        &self,
        package: &Self::P,
        _range: &Self::VS,
        _package_conflicts_counts: &PackageResolutionStatistics,
    ) -> Self::Priority {
        // Higher priority = resolved first
        // Prioritize packages with fewer available versions
        if let Some(summaries) = self.summaries.get(package) {
            (1000 - summaries.len().min(1000)) as u32
        } else {
            1000
        }
    }

    fn choose_version(
        &self,
        package: &Self::P,
        range: &Self::VS,
    ) -> Result<Option<Self::V>, Self::Err> {
        // For root package
        if *package == self.root.name() {
            let version = self.root.version().clone();
            if range.contains(&version) {
                return Ok(Some(version));
            }
            return Ok(None);
        }

        // Find the highest matching version
        if let Some(summaries) = self.summaries.get(package) {
            // Highest version wins; among summaries sharing a version, the
            // highest revision wins (§4.4 tie-break).
            let best = summaries
                .iter()
                .filter(|s| range.contains(s.version()))
                .max_by(|a, b| {
                    a.version()
                        .cmp(b.version())
                        .then_with(|| a.package_id().revision().cmp(&b.package_id().revision()))
                });

            if let Some(best) = best {
                return Ok(Some(best.version().clone()));
            }
        }

        Ok(None)
    }

    fn get_dependencies(
        &self,
        package: &Self::P,
        version: &Self::V,
    ) -> Result<Dependencies<Self::P, Self::VS, Self::M>, Self::Err> {
        // For root package
        if *package == self.root.name() && version == self.root.version() {
            let deps = self
                .root
                .dependencies()
                .iter()
                .map(|dep| (dep.name(), dependency_range(dep)))
                .collect();

            return Ok(Dependencies::Available(deps));
        }

        // Find the summary for this version, preferring the highest revision
        // when more than one summary shares it.
        if let Some(summaries) = self.summaries.get(package) {
            let summary = summaries
                .iter()
                .filter(|s| s.version() == version)
                .max_by_key(|s| s.package_id().revision());
            if let Some(summary) = summary {
                let deps = summary
                    .dependencies()
                    .iter()
                    .map(|dep| (dep.name(), dependency_range(dep)))
                    .collect();

                return Ok(Dependencies::Available(deps));
            }
        }

        Ok(Dependencies::Unavailable("package not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PackageId;

    #[test]
    fn test_resolver_simple() {
        let root_id = PackageId::new("root", Version::new(1, 0, 0), 0);
        let root = Summary::new(root_id, vec![], None);

        let resolver = PackageResolver::new(root);
        let resolve = resolver.resolve().unwrap();

        assert_eq!(resolve.packages().count(), 1);
    }

    #[test]
    fn test_resolver_picks_highest_revision_on_version_tie() {
        use crate::core::Dependency;

        let root_id = PackageId::new("root", Version::new(1, 0, 0), 0);
        let dep = Dependency::new("dep").with_version_req(semver::VersionReq::STAR);
        let root = Summary::new(root_id, vec![dep], None);

        let low_rev = Summary::new(
            PackageId::new("dep", Version::new(1, 0, 0), 0),
            vec![],
            None,
        );
        let high_rev = Summary::new(
            PackageId::new("dep", Version::new(1, 0, 0), 7),
            vec![],
            None,
        );

        let mut resolver = PackageResolver::new(root);
        resolver.add_summaries(vec![low_rev, high_rev]);
        let resolve = resolver.resolve().unwrap();

        let dep_id = resolve
            .get_package_by_name("dep".into())
            .expect("dep resolved");
        let dep_summary = resolve
            .packages()
            .find(|(id, _)| **id == dep_id)
            .map(|(_, s)| s.clone())
            .expect("dep summary present");
        assert_eq!(dep_summary.package_id().revision(), 7);
    }
}

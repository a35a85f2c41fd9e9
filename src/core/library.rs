//! Library identity and usage requirements.
//!
//! A package can expose more than one library. Two libraries are
//! independently addressable by a `(namespace, name)` pair, and the
//! compile/link inputs one library contributes to a consumer are captured
//! as a [`UsageRequirement`]. Requirements connect to each other along two
//! kinds of edge:
//!
//! - `uses`: transitive. If A uses B and B uses C, A also (indirectly)
//!   uses C's public include roots and link inputs.
//! - `links`: non-transitive. A library placed directly on another's link
//!   line does not itself propagate further down the chain.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::util::InternedString;

/// A globally addressable library: `namespace/name`, e.g. `zlib/zlib` or
/// `my-package/widgets`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LibraryId {
    pub namespace: InternedString,
    pub name: InternedString,
}

impl LibraryId {
    pub fn new(namespace: impl Into<InternedString>, name: impl Into<InternedString>) -> Self {
        LibraryId {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for LibraryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// What a library contributes to a consumer that uses or links it directly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageRequirement {
    /// Include directories exposed to anything that uses this library,
    /// transitively.
    pub public_include_roots: Vec<PathBuf>,

    /// Linker inputs (archive/object paths, `-l` names) this library
    /// contributes directly to a consumer's link line.
    pub link_inputs: Vec<String>,

    /// Libraries whose public include roots and link inputs this library
    /// exposes transitively to its own consumers.
    pub uses: Vec<LibraryId>,

    /// Libraries placed on this library's own link line, but not exposed
    /// further to consumers of this library.
    pub links: Vec<LibraryId>,
}

impl UsageRequirement {
    pub fn new() -> Self {
        Self::default()
    }
}

/// An error produced while building or querying a [`UsageGraph`].
#[derive(Debug, thiserror::Error)]
pub enum UsageGraphError {
    #[error("usage cycle detected: {0}")]
    Cycle(String),

    #[error("unknown library: {0}")]
    UnknownLibrary(LibraryId),
}

/// The registry of every known library's usage requirement, plus the
/// machinery to resolve transitive include/link sets.
#[derive(Debug, Default)]
pub struct UsageGraph {
    libraries: HashMap<LibraryId, UsageRequirement>,
    /// Insertion order, used to make cycle detection deterministic: the
    /// first-registered library whose DFS finds a back-edge reports it.
    order: Vec<LibraryId>,
}

impl UsageGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a library's usage requirement. Replaces any prior
    /// registration under the same id but keeps its original insertion
    /// order.
    pub fn insert(&mut self, id: LibraryId, requirement: UsageRequirement) {
        if !self.libraries.contains_key(&id) {
            self.order.push(id);
        }
        self.libraries.insert(id, requirement);
    }

    pub fn get(&self, id: LibraryId) -> Option<&UsageRequirement> {
        self.libraries.get(&id)
    }

    pub fn contains(&self, id: LibraryId) -> bool {
        self.libraries.contains_key(&id)
    }

    /// Verify the `uses` edges form a DAG. On failure, returns the first
    /// cycle found in first-registered order, so the error is stable
    /// across runs regardless of hash-map iteration order.
    pub fn verify_acyclic(&self) -> Result<(), UsageGraphError> {
        let mut state: HashMap<LibraryId, VisitState> = HashMap::new();

        for &root in &self.order {
            if matches!(state.get(&root), Some(VisitState::Done)) {
                continue;
            }
            let mut stack = Vec::new();
            if let Some(cycle) = self.visit(root, &mut state, &mut stack) {
                return Err(UsageGraphError::Cycle(
                    cycle
                        .iter()
                        .map(|id| id.to_string())
                        .collect::<Vec<_>>()
                        .join(" -> "),
                ));
            }
        }

        Ok(())
    }

    fn visit(
        &self,
        id: LibraryId,
        state: &mut HashMap<LibraryId, VisitState>,
        stack: &mut Vec<LibraryId>,
    ) -> Option<Vec<LibraryId>> {
        match state.get(&id) {
            Some(VisitState::InProgress) => {
                let start = stack.iter().position(|&x| x == id).unwrap_or(0);
                let mut cycle = stack[start..].to_vec();
                cycle.push(id);
                return Some(cycle);
            }
            Some(VisitState::Done) => return None,
            None => {}
        }

        state.insert(id, VisitState::InProgress);
        stack.push(id);

        if let Some(req) = self.libraries.get(&id) {
            for &dep in &req.uses {
                if let Some(cycle) = self.visit(dep, state, stack) {
                    return Some(cycle);
                }
            }
        }

        stack.pop();
        state.insert(id, VisitState::Done);
        None
    }

    /// The transitive closure of `uses` edges reachable from `id` (`id`
    /// itself is not included).
    pub fn transitive_uses(&self, id: LibraryId) -> Result<Vec<LibraryId>, UsageGraphError> {
        if !self.contains(id) {
            return Err(UsageGraphError::UnknownLibrary(id));
        }

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut stack = vec![id];

        while let Some(current) = stack.pop() {
            let Some(req) = self.libraries.get(&current) else {
                continue;
            };
            for &dep in &req.uses {
                if seen.insert(dep) {
                    out.push(dep);
                    stack.push(dep);
                }
            }
        }

        out.sort();
        Ok(out)
    }

    /// Include roots for building against `id`: its own public includes
    /// plus every transitively-used library's public includes.
    pub fn include_paths(&self, id: LibraryId) -> Result<Vec<PathBuf>, UsageGraphError> {
        let mut roots = self
            .libraries
            .get(&id)
            .ok_or(UsageGraphError::UnknownLibrary(id))?
            .public_include_roots
            .clone();

        for dep in self.transitive_uses(id)? {
            roots.extend(self.libraries[&dep].public_include_roots.clone());
        }

        roots.sort();
        roots.dedup();
        Ok(roots)
    }

    /// Link inputs for linking a consumer of `id`: direct `links` (each
    /// non-transitive) plus the full transitive `uses` closure's link
    /// inputs, in an order suitable for a single-pass linker (dependents
    /// before dependencies).
    pub fn link_inputs(&self, id: LibraryId) -> Result<Vec<String>, UsageGraphError> {
        let root = self
            .libraries
            .get(&id)
            .ok_or(UsageGraphError::UnknownLibrary(id))?;

        let mut out = root.link_inputs.clone();

        for &linked in &root.links {
            if let Some(req) = self.libraries.get(&linked) {
                out.extend(req.link_inputs.clone());
            }
        }

        for dep in self.transitive_uses(id)? {
            out.extend(self.libraries[&dep].link_inputs.clone());
        }

        out.dedup();
        Ok(out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    InProgress,
    Done,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lib(ns: &str, name: &str) -> LibraryId {
        LibraryId::new(ns, name)
    }

    #[test]
    fn acyclic_graph_verifies() {
        let mut graph = UsageGraph::new();
        let a = lib("pkg", "a");
        let b = lib("pkg", "b");

        graph.insert(
            a,
            UsageRequirement {
                uses: vec![b],
                ..Default::default()
            },
        );
        graph.insert(b, UsageRequirement::default());

        assert!(graph.verify_acyclic().is_ok());
    }

    #[test]
    fn cycle_is_detected() {
        let mut graph = UsageGraph::new();
        let a = lib("pkg", "a");
        let b = lib("pkg", "b");

        graph.insert(
            a,
            UsageRequirement {
                uses: vec![b],
                ..Default::default()
            },
        );
        graph.insert(
            b,
            UsageRequirement {
                uses: vec![a],
                ..Default::default()
            },
        );

        let err = graph.verify_acyclic().unwrap_err();
        assert!(matches!(err, UsageGraphError::Cycle(_)));
    }

    #[test]
    fn uses_is_transitive_links_is_not() {
        let mut graph = UsageGraph::new();
        let a = lib("pkg", "a");
        let b = lib("pkg", "b");
        let c = lib("pkg", "c");

        graph.insert(
            a,
            UsageRequirement {
                uses: vec![b],
                ..Default::default()
            },
        );
        graph.insert(
            b,
            UsageRequirement {
                public_include_roots: vec![PathBuf::from("/b/include")],
                link_inputs: vec!["-lb".to_string()],
                links: vec![c],
                ..Default::default()
            },
        );
        graph.insert(
            c,
            UsageRequirement {
                public_include_roots: vec![PathBuf::from("/c/include")],
                link_inputs: vec!["-lc".to_string()],
                ..Default::default()
            },
        );

        // a transitively uses b, so a picks up b's includes...
        assert_eq!(graph.include_paths(a).unwrap(), vec![PathBuf::from("/b/include")]);
        // ...but not c's, since b only *links* c, it doesn't *use* it.
        assert!(!graph.transitive_uses(a).unwrap().contains(&c));

        // b's own link line does include c directly (non-transitively).
        assert_eq!(graph.link_inputs(b).unwrap(), vec!["-lb", "-lc"]);
    }
}

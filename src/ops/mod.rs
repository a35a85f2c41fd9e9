//! High-level operations.
//!
//! This module contains the implementation of crucible's CLI-facing
//! operations, built on top of the resolver and builder libraries.

pub mod lockfile;
pub mod resolve;

pub use lockfile::{load_lockfile, save_lockfile};
pub use resolve::{resolve_fresh, resolve_workspace, update_resolve};

//! A source-based package manager and build orchestrator for native C/C++ code.
//!
//! This crate provides the core library functionality: dependency
//! resolution, build planning, and incremental execution.

pub mod builder;
pub mod core;
pub mod ops;
pub mod resolver;
pub mod sources;
pub mod util;

pub use core::{
    dependency::Dependency, manifest::Manifest, package::Package, package_id::PackageId,
    surface::Surface, target::Target, workspace::Workspace,
};

pub use resolver::Resolve;
pub use util::context::GlobalContext;

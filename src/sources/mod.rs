//! Package sources.
//!
//! A source resolves a dependency to a package rooted at some directory on
//! disk. Only local path sources are supported.

pub mod cache;
pub mod path;
pub mod source;

pub use cache::SourceCache;
pub use path::PathSource;
pub use source::Source;

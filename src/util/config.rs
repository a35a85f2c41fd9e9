//! Configuration file support.
//!
//! Two configuration file locations are consulted:
//! - Global: `~/.crucible/config.toml` - user-wide defaults
//! - Project: `.crucible/config.toml` - project-specific overrides
//!
//! Project config takes precedence over global config.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Build settings
    pub build: BuildConfig,

    /// Resolver settings
    pub resolve: ResolveConfig,

    /// Network settings
    pub net: NetConfig,
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Preferred toolchain family (gcc, clang, msvc). None means auto-detect.
    pub toolchain: Option<String>,

    /// Default number of parallel jobs (None = hardware_concurrency + 2)
    pub jobs: Option<usize>,

    /// Always emit compile_commands.json
    #[serde(default)]
    pub emit_compile_commands: bool,

    /// Default C++ standard version
    pub cpp_std: Option<String>,
}

/// Resolver-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveConfig {
    /// Prefer the newest allowed version for every package during resolution.
    #[serde(default = "default_true")]
    pub prefer_newest: bool,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        ResolveConfig {
            prefer_newest: true,
        }
    }
}

/// Network-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    /// Registry fetch timeout in seconds
    pub fetch_timeout: Option<u64>,

    /// Offline mode (don't fetch from network)
    #[serde(default)]
    pub offline: bool,
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        // Build settings
        if other.build.toolchain.is_some() {
            self.build.toolchain = other.build.toolchain;
        }
        if other.build.jobs.is_some() {
            self.build.jobs = other.build.jobs;
        }
        if other.build.emit_compile_commands {
            self.build.emit_compile_commands = true;
        }
        if other.build.cpp_std.is_some() {
            self.build.cpp_std = other.build.cpp_std;
        }

        // Resolver settings: `other` always carries an explicit value since
        // ResolveConfig has no optional fields, so project config wins outright.
        self.resolve.prefer_newest = other.resolve.prefer_newest;

        // Net settings
        if other.net.fetch_timeout.is_some() {
            self.net.fetch_timeout = other.net.fetch_timeout;
        }
        if other.net.offline {
            self.net.offline = true;
        }
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.crucible/config.toml)
/// 2. Global config (~/.crucible/config.toml)
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    // Load global config first
    if global_path.exists() {
        let global = Config::load_or_default(global_path);
        config.merge(global);
    }

    // Project config overrides global
    if project_path.exists() {
        let project = Config::load_or_default(project_path);
        config.merge(project);
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.build.toolchain.is_none());
        assert!(config.resolve.prefer_newest);
    }

    #[test]
    fn test_config_load() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");

        std::fs::write(
            &config_path,
            r#"
[build]
toolchain = "clang"
jobs = 8

[resolve]
prefer_newest = false
"#,
        )
        .unwrap();

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.build.toolchain, Some("clang".to_string()));
        assert_eq!(config.build.jobs, Some(8));
        assert!(!config.resolve.prefer_newest);
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config::default();
        base.build.toolchain = Some("gcc".to_string());
        base.build.jobs = Some(4);

        let mut override_cfg = Config::default();
        override_cfg.build.toolchain = Some("clang".to_string());

        base.merge(override_cfg);

        assert_eq!(base.build.toolchain, Some("clang".to_string()));
        assert_eq!(base.build.jobs, Some(4)); // Not overridden
    }
}

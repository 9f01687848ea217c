use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use simtree_graph::BuildOptions;

pub const CONFIG_ENV: &str = "SIMTREE_CONFIG";

/// Engine settings resolved from defaults, an optional TOML file and CLI flags.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EngineConfig {
    pub build: BuildOptions,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    build: Option<RawBuildConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBuildConfig {
    primary_branches: Option<usize>,
    max_children_per_node: Option<usize>,
    secondary_search_k: Option<usize>,
    neighbor_list_len: Option<usize>,
    top_branches_len: Option<usize>,
}

/// Flag-level overrides; `None` keeps the file/default value.
#[derive(Clone, Debug, Default)]
pub struct BuildOverrides {
    pub primary_branches: Option<usize>,
    pub max_children_per_node: Option<usize>,
    pub secondary_search_k: Option<usize>,
}

impl EngineConfig {
    /// Load from `path`, falling back to `$SIMTREE_CONFIG`, then defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = Self::from_toml_str(&raw)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let parsed: RawConfig = toml::from_str(raw)?;
        let mut build = BuildOptions::default();
        if let Some(raw_build) = parsed.build {
            if let Some(v) = raw_build.primary_branches {
                build.primary_branches = v;
            }
            if let Some(v) = raw_build.max_children_per_node {
                build.max_children_per_node = v;
            }
            if let Some(v) = raw_build.secondary_search_k {
                build.secondary_search_k = v;
            }
            if let Some(v) = raw_build.neighbor_list_len {
                build.neighbor_list_len = v;
            }
            if let Some(v) = raw_build.top_branches_len {
                build.top_branches_len = v;
            }
        }
        build.validate()?;
        Ok(Self { build })
    }

    pub fn apply_overrides(&mut self, overrides: &BuildOverrides) -> Result<()> {
        if let Some(v) = overrides.primary_branches {
            self.build.primary_branches = v;
        }
        if let Some(v) = overrides.max_children_per_node {
            self.build.max_children_per_node = v;
        }
        if let Some(v) = overrides.secondary_search_k {
            self.build.secondary_search_k = v;
        }
        self.build.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn partial_build_table_keeps_other_defaults() {
        let config = EngineConfig::from_toml_str("[build]\nmax_children_per_node = 4\n").unwrap();
        assert_eq!(config.build.max_children_per_node, 4);
        assert_eq!(config.build.primary_branches, 20);
    }

    #[test]
    fn unknown_keys_and_zero_cap_are_rejected() {
        assert!(EngineConfig::from_toml_str("[build]\nfanout = 3\n").is_err());
        assert!(EngineConfig::from_toml_str("[build]\nmax_children_per_node = 0\n").is_err());
    }

    #[test]
    fn overrides_take_precedence() {
        let mut config = EngineConfig::from_toml_str("[build]\nprimary_branches = 5\n").unwrap();
        config
            .apply_overrides(&BuildOverrides {
                primary_branches: Some(7),
                ..BuildOverrides::default()
            })
            .unwrap();
        assert_eq!(config.build.primary_branches, 7);
    }
}

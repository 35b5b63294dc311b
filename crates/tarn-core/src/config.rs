use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tarn_util::errors::TarnError;

use crate::marker::MarkerEnvironment;

/// Global user configuration loaded from `~/.tarn/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Target environment for marker evaluation.
    #[serde(default)]
    pub environment: MarkerEnvironment,

    #[serde(default)]
    pub index: IndexConfig,
}

/// Which packages may move to a newer version than the one installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpgradeStrategy {
    /// Every package.
    Eager,
    /// Only packages the user named.
    #[default]
    OnlyIfNeeded,
    /// None; installed versions are kept whenever they satisfy.
    ToSatisfyOnly,
}

impl UpgradeStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eager => "eager",
            Self::OnlyIfNeeded => "only-if-needed",
            Self::ToSatisfyOnly => "to-satisfy-only",
        }
    }
}

impl fmt::Display for UpgradeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UpgradeStrategy {
    type Err = TarnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eager" => Ok(Self::Eager),
            "only-if-needed" => Ok(Self::OnlyIfNeeded),
            "to-satisfy-only" => Ok(Self::ToSatisfyOnly),
            other => Err(TarnError::Config {
                message: format!(
                    "unknown upgrade strategy `{other}` (expected eager, only-if-needed or to-satisfy-only)"
                ),
            }),
        }
    }
}

/// Resolver settings from `[resolver]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResolverConfig {
    #[serde(default)]
    pub upgrade_strategy: UpgradeStrategy,
    /// Consider pre-releases even when not explicitly requested.
    #[serde(default)]
    pub pre: bool,
    #[serde(default)]
    pub ignore_installed: bool,
    #[serde(default)]
    pub ignore_requires_python: bool,
    #[serde(default)]
    pub no_deps: bool,
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            upgrade_strategy: UpgradeStrategy::default(),
            pre: false,
            ignore_installed: false,
            ignore_requires_python: false,
            no_deps: false,
            max_rounds: default_max_rounds(),
        }
    }
}

fn default_max_rounds() -> usize {
    200_000
}

/// Default data files from `[index]`, used when the command line names none.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub installed: Option<String>,
}

impl GlobalConfig {
    /// Load the global configuration from `~/.tarn/config.toml`, or return defaults if the file doesn't exist.
    pub fn load() -> miette::Result<Self> {
        Self::load_from(&Self::default_path())
    }

    pub fn load_from(path: &Path) -> miette::Result<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| TarnError::Config {
            message: format!("Failed to read global config: {e}"),
        })?;
        toml::from_str(&content).map_err(|e| {
            TarnError::Config {
                message: format!("Failed to parse global config: {e}"),
            }
            .into()
        })
    }

    /// Returns the default path to the global config file.
    pub fn default_path() -> PathBuf {
        dirs_path().join("config.toml")
    }
}

/// Returns the path to the tarn data directory (`~/.tarn/`).
pub fn dirs_path() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".tarn")
}

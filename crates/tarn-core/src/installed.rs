//! Packages already present in the target environment.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tarn_util::errors::TarnError;

use crate::link::Link;
use crate::metadata::PackageMetadata;
use crate::name::{ExtraName, PackageName};
use crate::version::Version;

/// An installed distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledDist {
    pub metadata: PackageMetadata,
    pub editable: bool,
    /// Set when the package was installed from a direct URL.
    pub direct_url: Option<Link>,
}

impl InstalledDist {
    pub fn new(metadata: PackageMetadata) -> Self {
        Self {
            metadata,
            editable: false,
            direct_url: None,
        }
    }

    pub fn name(&self) -> &PackageName {
        &self.metadata.name
    }

    pub fn version(&self) -> &Version {
        &self.metadata.version
    }
}

/// Read access to the installed-package database.
pub trait InstalledRegistry {
    fn iter_installed(&self) -> Vec<InstalledDist>;

    fn get(&self, name: &PackageName) -> Option<InstalledDist> {
        self.iter_installed().into_iter().find(|d| d.name() == name)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct InstalledRecord {
    name: String,
    version: String,
    #[serde(default)]
    requires_dist: Vec<String>,
    #[serde(default)]
    provides_extras: Vec<String>,
    #[serde(default)]
    editable: bool,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct InstalledFile {
    #[serde(default, rename = "package")]
    packages: Vec<InstalledRecord>,
}

/// An in-memory registry, usually loaded from a TOML file with the same
/// `[[package]]` layout as an index file.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    dists: BTreeMap<PackageName, InstalledDist>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_path(path: &Path) -> Result<Self, TarnError> {
        let content = std::fs::read_to_string(path).map_err(|e| TarnError::Generic {
            message: format!("Failed to read installed packages file {}: {e}", path.display()),
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, TarnError> {
        let file: InstalledFile = toml::from_str(content).map_err(|e| TarnError::Generic {
            message: format!("Failed to parse installed packages file: {e}"),
        })?;
        let mut registry = Self::new();
        for record in file.packages {
            let mut metadata = PackageMetadata::new(
                PackageName::new(&record.name)?,
                Version::parse(&record.version),
            );
            metadata.requires_dist = record.requires_dist;
            metadata.provides_extras = record
                .provides_extras
                .iter()
                .map(|e| ExtraName::new(e))
                .collect::<Result<_, _>>()?;
            let direct_url = record.url.as_deref().map(Link::parse).transpose()?;
            registry.insert(InstalledDist {
                metadata,
                editable: record.editable,
                direct_url,
            });
        }
        Ok(registry)
    }

    /// Add or replace a distribution.
    pub fn insert(&mut self, dist: InstalledDist) {
        self.dists.insert(dist.name().clone(), dist);
    }

    pub fn remove(&mut self, name: &PackageName) -> Option<InstalledDist> {
        self.dists.remove(name)
    }

    pub fn len(&self) -> usize {
        self.dists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dists.is_empty()
    }
}

impl InstalledRegistry for StaticRegistry {
    fn iter_installed(&self) -> Vec<InstalledDist> {
        self.dists.values().cloned().collect()
    }

    fn get(&self, name: &PackageName) -> Option<InstalledDist> {
        self.dists.get(name).cloned()
    }
}

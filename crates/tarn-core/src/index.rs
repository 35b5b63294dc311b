//! The package index: which artifacts exist for a project and what their
//! metadata says.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;
use tarn_util::errors::TarnError;
use tracing::debug;
use url::Url;

use crate::link::Link;
use crate::metadata::PackageMetadata;
use crate::name::{ExtraName, PackageName};
use crate::specifier::VersionSpecifiers;
use crate::version::Version;

const DEFAULT_BASE_URL: &str = "https://index.invalid/simple/";

/// One downloadable artifact as listed by the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub name: PackageName,
    pub version: Version,
    pub link: Link,
    /// `Requires-Python` as advertised on the index page.
    pub requires_python: Option<VersionSpecifiers>,
    pub yanked: bool,
}

/// Source of candidate artifacts and their metadata.
pub trait PackageIndex {
    /// Every artifact listed for `name`, in any order.
    fn entries(&self, name: &PackageName) -> Vec<IndexEntry>;

    /// Read the metadata of the artifact at `link`.
    ///
    /// This is the expensive step (download and possibly build), so callers
    /// should delay it until the candidate is actually considered.
    fn fetch_metadata(&self, link: &Link) -> Result<PackageMetadata, TarnError>;
}

/// A package record in an index file.
///
/// ```toml
/// [[package]]
/// name = "requests"
/// version = "2.31.0"
/// requires-dist = ["urllib3>=1.21.1,<3", "pysocks>=1.5.6; extra == 'socks'"]
/// requires-python = ">=3.7"
/// provides-extras = ["socks"]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PackageRecord {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub requires_dist: Vec<String>,
    #[serde(default)]
    pub requires_python: Option<String>,
    #[serde(default)]
    pub provides_extras: Vec<String>,
    /// Artifact URL. Defaults to a synthesized path under the index base URL.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub sha256: Option<String>,
    #[serde(default)]
    pub yanked: bool,
    /// The artifact exists but its metadata cannot be read.
    #[serde(default)]
    pub broken: bool,
    /// Whether the index lists the artifact. Unlisted artifacts are only
    /// reachable through a direct URL.
    #[serde(default = "default_listed")]
    pub listed: bool,
}

fn default_listed() -> bool {
    true
}

impl PackageRecord {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            listed: true,
            ..Self::default()
        }
    }

    pub fn requires(mut self, requires_dist: &[&str]) -> Self {
        self.requires_dist = requires_dist.iter().map(|s| s.to_string()).collect();
        self
    }
}

#[derive(Debug, Default, Deserialize)]
struct IndexFile {
    #[serde(default, rename = "base-url")]
    base_url: Option<String>,
    #[serde(default, rename = "package")]
    packages: Vec<PackageRecord>,
}

#[derive(Debug, Clone)]
enum Artifact {
    Readable(PackageMetadata),
    Broken(String),
}

/// An in-memory index, usually loaded from a TOML file.
#[derive(Debug, Clone)]
pub struct StaticIndex {
    /// Always ends with `/`.
    base_url: String,
    entries: BTreeMap<PackageName, Vec<IndexEntry>>,
    /// Keyed by URL without fragment.
    artifacts: HashMap<String, Artifact>,
}

impl Default for StaticIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticIndex {
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            entries: BTreeMap::new(),
            artifacts: HashMap::new(),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, TarnError> {
        let content = std::fs::read_to_string(path).map_err(|e| TarnError::Index {
            message: format!("Failed to read index file {}: {e}", path.display()),
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, TarnError> {
        let file: IndexFile = toml::from_str(content).map_err(|e| TarnError::Index {
            message: format!("Failed to parse index file: {e}"),
        })?;
        let mut index = Self::new();
        if let Some(base) = file.base_url {
            let base = if base.ends_with('/') { base } else { format!("{base}/") };
            Url::parse(&base).map_err(|e| TarnError::Index {
                message: format!("Invalid base-url `{base}`: {e}"),
            })?;
            index.base_url = base;
        }
        for record in file.packages {
            index.add(record)?;
        }
        Ok(index)
    }

    /// Register one artifact.
    pub fn add(&mut self, record: PackageRecord) -> Result<(), TarnError> {
        let invalid = |message: String| TarnError::Index { message };
        let name = PackageName::new(&record.name)?;
        let version = Version::parse(&record.version);
        let requires_python = record
            .requires_python
            .as_deref()
            .map(str::parse::<VersionSpecifiers>)
            .transpose()?;
        let provides_extras = record
            .provides_extras
            .iter()
            .map(|e| ExtraName::new(e))
            .collect::<Result<_, _>>()?;

        let mut url = match &record.url {
            Some(url) => Url::parse(url)
                .map_err(|e| invalid(format!("Invalid url `{url}` for {name}: {e}")))?,
            None => Url::parse(&format!("{}{name}/{name}-{}.tar.gz", self.base_url, record.version))
                .map_err(|e| invalid(format!("Cannot build a url for {name}: {e}")))?,
        };
        if let Some(digest) = &record.sha256 {
            url.set_fragment(Some(&format!("sha256={}", digest.to_ascii_lowercase())));
        }
        let link = Link::from_index(url);

        let artifact = if record.broken {
            Artifact::Broken(format!("{name} {version}"))
        } else {
            Artifact::Readable(PackageMetadata {
                name: name.clone(),
                version: version.clone(),
                requires_dist: record.requires_dist,
                requires_python: requires_python.clone(),
                provides_extras,
            })
        };
        self.artifacts.insert(link.url_without_fragment(), artifact);

        if record.listed {
            self.entries.entry(name.clone()).or_default().push(IndexEntry {
                name,
                version,
                link,
                requires_python,
                yanked: record.yanked,
            });
        }
        Ok(())
    }

    /// Number of listed artifacts.
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PackageIndex for StaticIndex {
    fn entries(&self, name: &PackageName) -> Vec<IndexEntry> {
        self.entries.get(name).cloned().unwrap_or_default()
    }

    fn fetch_metadata(&self, link: &Link) -> Result<PackageMetadata, TarnError> {
        debug!("reading metadata for {link}");
        match self.artifacts.get(&link.url_without_fragment()) {
            Some(Artifact::Readable(metadata)) => Ok(metadata.clone()),
            Some(Artifact::Broken(package)) => Err(TarnError::Metadata {
                package: package.clone(),
                message: "artifact metadata could not be read".to_string(),
            }),
            None => Err(TarnError::Index {
                message: format!("No artifact found at {link}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = r#"
[[package]]
name = "Requests"
version = "2.31.0"
requires-dist = ["urllib3>=1.21.1,<3"]
requires-python = ">=3.7"
sha256 = "ABC123"

[[package]]
name = "requests"
version = "2.30.0"
yanked = true

[[package]]
name = "ghost"
version = "1.0"
broken = true

[[package]]
name = "private"
version = "0.1"
url = "https://files.example/private-0.1.tar.gz"
listed = false
"#;

    #[test]
    fn loads_entries_with_synthesized_links() {
        let index = StaticIndex::from_toml(INDEX).unwrap();
        let requests = index.entries(&PackageName::new("requests").unwrap());
        assert_eq!(requests.len(), 2);
        assert_eq!(
            requests[0].link.to_string(),
            "https://index.invalid/simple/requests/requests-2.31.0.tar.gz#sha256=abc123"
        );
        assert!(requests[1].yanked);
        assert!(requests[0].requires_python.is_some());
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn metadata_lookup_ignores_fragment() {
        let index = StaticIndex::from_toml(INDEX).unwrap();
        let link = Link::parse("https://index.invalid/simple/requests/requests-2.31.0.tar.gz").unwrap();
        let metadata = index.fetch_metadata(&link).unwrap();
        assert_eq!(metadata.version, Version::parse("2.31.0"));
        assert_eq!(metadata.requires_dist.len(), 1);
    }

    #[test]
    fn broken_and_unlisted_artifacts() {
        let index = StaticIndex::from_toml(INDEX).unwrap();
        let ghost = &index.entries(&PackageName::new("ghost").unwrap())[0];
        assert!(index.fetch_metadata(&ghost.link).is_err());

        assert!(index.entries(&PackageName::new("private").unwrap()).is_empty());
        let direct = Link::parse("https://files.example/private-0.1.tar.gz").unwrap();
        assert!(index.fetch_metadata(&direct).is_ok());

        let missing = Link::parse("https://files.example/nothing-1.0.tar.gz").unwrap();
        assert!(index.fetch_metadata(&missing).is_err());
    }

    #[test]
    fn custom_base_url() {
        let index = StaticIndex::from_toml(
            "base-url = \"https://mirror.example/pypi\"\n[[package]]\nname = \"six\"\nversion = \"1.16.0\"\n",
        )
        .unwrap();
        let six = &index.entries(&PackageName::new("six").unwrap())[0];
        assert_eq!(six.link.to_string(), "https://mirror.example/pypi/six/six-1.16.0.tar.gz");
    }
}

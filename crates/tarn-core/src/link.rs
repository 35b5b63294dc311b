//! Artifact locations: index files, direct archive URLs, VCS URLs and local paths.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::str::FromStr;

use tarn_util::errors::TarnError;
use url::Url;

const VCS_SCHEMES: &[&str] = &["git+", "hg+", "svn+", "bzr+"];

/// Where a link came from and what it points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    /// An artifact listed by the package index.
    Index,
    /// A direct URL to an archive.
    Archive,
    /// A version-control checkout (`git+https://...`).
    Vcs,
    /// A `file:` URL.
    LocalPath,
}

/// A URL with a known kind. Equality and ordering use the full URL
/// including its fragment; use [`links_equivalent`] to ignore it.
#[derive(Debug, Clone)]
pub struct Link {
    url: Url,
    kind: LinkKind,
}

impl Link {
    /// Parse a user-supplied URL or absolute path and infer its kind.
    pub fn parse(input: &str) -> Result<Self, TarnError> {
        let input = input.trim();
        let url = match Url::parse(input) {
            Ok(url) => url,
            Err(_) if input.starts_with('/') => {
                Url::from_file_path(PathBuf::from(input)).map_err(|()| TarnError::Link {
                    input: input.to_string(),
                    message: "not an absolute path".to_string(),
                })?
            }
            Err(e) => {
                return Err(TarnError::Link {
                    input: input.to_string(),
                    message: e.to_string(),
                })
            }
        };
        let kind = if VCS_SCHEMES.iter().any(|s| url.scheme().starts_with(s)) {
            LinkKind::Vcs
        } else if url.scheme() == "file" {
            LinkKind::LocalPath
        } else {
            LinkKind::Archive
        };
        Ok(Self { url, kind })
    }

    /// A link served by the package index.
    pub fn from_index(url: Url) -> Self {
        Self {
            url,
            kind: LinkKind::Index,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn kind(&self) -> LinkKind {
        self.kind
    }

    pub fn is_vcs(&self) -> bool {
        self.kind == LinkKind::Vcs
    }

    pub fn is_file(&self) -> bool {
        self.kind == LinkKind::LocalPath
    }

    /// The URL as a string with any `#fragment` removed.
    pub fn url_without_fragment(&self) -> String {
        let mut url = self.url.clone();
        url.set_fragment(None);
        url.to_string()
    }

    /// Last path segment, e.g. `requests-2.31.0.tar.gz`.
    pub fn filename(&self) -> &str {
        self.url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or("")
    }

    /// Digest declared in the fragment as `#sha256=<hex>`.
    pub fn hash(&self) -> Option<(&str, &str)> {
        let fragment = self.url.fragment()?;
        fragment.split('&').find_map(|part| {
            let (name, value) = part.split_once('=')?;
            tarn_util::hash::SUPPORTED_ALGORITHMS
                .contains(&name)
                .then_some((name, value))
        })
    }

    pub fn has_hash(&self) -> bool {
        self.hash().is_some()
    }
}

/// Whether two links point at the same artifact, ignoring fragments such
/// as `#sha256=...` or `#egg=...`.
pub fn links_equivalent(a: &Link, b: &Link) -> bool {
    a.url_without_fragment() == b.url_without_fragment()
}

impl PartialEq for Link {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl Eq for Link {}

impl Hash for Link {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.url.as_str().hash(state);
    }
}

impl Ord for Link {
    fn cmp(&self, other: &Self) -> Ordering {
        self.url.as_str().cmp(other.url.as_str())
    }
}

impl PartialOrd for Link {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

impl FromStr for Link {
    type Err = TarnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_inferred() {
        assert_eq!(
            Link::parse("https://files.example/pkg-1.0.tar.gz").unwrap().kind(),
            LinkKind::Archive
        );
        assert_eq!(
            Link::parse("git+https://github.com/psf/requests@v2.31.0").unwrap().kind(),
            LinkKind::Vcs
        );
        assert_eq!(Link::parse("file:///src/pkg").unwrap().kind(), LinkKind::LocalPath);
        assert_eq!(Link::parse("/src/pkg").unwrap().kind(), LinkKind::LocalPath);
        assert!(Link::parse("not a url").is_err());
    }

    #[test]
    fn equivalence_ignores_fragment() {
        let a = Link::parse("https://files.example/pkg-1.0.tar.gz#sha256=abc").unwrap();
        let b = Link::parse("https://files.example/pkg-1.0.tar.gz").unwrap();
        assert!(links_equivalent(&a, &b));
        assert_ne!(a, b);
    }

    #[test]
    fn fragment_hash_and_filename() {
        let link = Link::parse("https://files.example/pkg-1.0.tar.gz#sha256=abc").unwrap();
        assert_eq!(link.hash(), Some(("sha256", "abc")));
        assert_eq!(link.filename(), "pkg-1.0.tar.gz");
        let egg = Link::parse("git+https://example.com/repo#egg=pkg").unwrap();
        assert!(!egg.has_hash());
    }
}

//! Allowed artifact digests (`--hash=sha256:...`).

use std::collections::{BTreeMap, BTreeSet};
use std::ops::BitAnd;
use std::path::Path;

use tarn_util::errors::TarnError;
use tarn_util::hash::{file_digest, SUPPORTED_ALGORITHMS};

use crate::link::Link;

/// Allowed digests per algorithm. An empty value places no constraint on
/// artifacts; a non-empty one only admits artifacts matching some digest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Hashes {
    allowed: BTreeMap<String, BTreeSet<String>>,
}

impl Hashes {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse one `--hash` option value, `algorithm:hexdigest`.
    pub fn parse_option(value: &str) -> Result<Self, TarnError> {
        let invalid = |message: &str| TarnError::Requirement {
            input: format!("--hash={value}"),
            message: message.to_string(),
        };
        let (algorithm, digest) = value
            .split_once(':')
            .ok_or_else(|| invalid("expected algorithm:digest"))?;
        let algorithm = algorithm.trim().to_ascii_lowercase();
        if !SUPPORTED_ALGORITHMS.contains(&algorithm.as_str()) {
            return Err(invalid("unsupported hash algorithm"));
        }
        let digest = digest.trim().to_ascii_lowercase();
        if digest.is_empty() || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid("digest must be hexadecimal"));
        }
        let mut hashes = Self::empty();
        hashes.insert(&algorithm, &digest);
        Ok(hashes)
    }

    pub fn insert(&mut self, algorithm: &str, digest: &str) {
        self.allowed
            .entry(algorithm.to_ascii_lowercase())
            .or_default()
            .insert(digest.to_ascii_lowercase());
    }

    /// Add every digest of `other`.
    pub fn extend(&mut self, other: &Hashes) {
        for (algorithm, digests) in &other.allowed {
            self.allowed
                .entry(algorithm.clone())
                .or_default()
                .extend(digests.iter().cloned());
        }
    }

    /// `true` when no hash was specified at all.
    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }

    pub fn digest_count(&self) -> usize {
        self.allowed.values().map(BTreeSet::len).sum()
    }

    pub fn is_hash_allowed(&self, algorithm: &str, digest: &str) -> bool {
        self.allowed
            .get(&algorithm.to_ascii_lowercase())
            .is_some_and(|d| d.contains(&digest.to_ascii_lowercase()))
    }

    /// Whether the digest declared in the link's fragment is allowed.
    pub fn is_link_allowed(&self, link: &Link) -> bool {
        link.hash()
            .is_some_and(|(algorithm, digest)| self.is_hash_allowed(algorithm, digest))
    }

    /// Hashes admitted by both sides. An empty side admits everything, so the
    /// other side is returned unchanged.
    pub fn intersection(&self, other: &Hashes) -> Hashes {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        let allowed = other
            .allowed
            .iter()
            .filter_map(|(algorithm, digests)| {
                let ours = self.allowed.get(algorithm)?;
                Some((algorithm.clone(), digests.intersection(ours).cloned().collect()))
            })
            .collect();
        Hashes { allowed }
    }

    /// Check a downloaded artifact against the allowed digests.
    pub fn check_file(&self, path: &Path) -> Result<(), TarnError> {
        let mut last = None;
        for algorithm in self.allowed.keys() {
            let Some(got) = file_digest(path, algorithm)? else {
                continue;
            };
            if self.is_hash_allowed(algorithm, &got) {
                return Ok(());
            }
            last = Some((algorithm.clone(), got));
        }
        match last {
            None => Ok(()),
            Some((algorithm, got)) => Err(TarnError::HashMismatch {
                path: path.display().to_string(),
                algorithm,
                got,
            }),
        }
    }

    /// Render as `--hash` options.
    pub fn to_options(&self) -> Vec<String> {
        self.allowed
            .iter()
            .flat_map(|(algorithm, digests)| digests.iter().map(move |d| format!("--hash={algorithm}:{d}")))
            .collect()
    }
}

impl BitAnd<&Hashes> for &Hashes {
    type Output = Hashes;

    fn bitand(self, rhs: &Hashes) -> Hashes {
        self.intersection(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hashes(options: &[&str]) -> Hashes {
        let mut h = Hashes::empty();
        for o in options {
            h.extend(&Hashes::parse_option(o).unwrap());
        }
        h
    }

    #[test]
    fn parse_and_lookup() {
        let h = hashes(&["sha256:ABCD", "sha256:beef"]);
        assert!(h.is_hash_allowed("sha256", "abcd"));
        assert!(!h.is_hash_allowed("md5", "abcd"));
        assert_eq!(h.digest_count(), 2);
        assert!(Hashes::parse_option("crc:00").is_err());
        assert!(Hashes::parse_option("sha256").is_err());
        assert!(Hashes::parse_option("sha256:xyz").is_err());
    }

    #[test]
    fn intersection_semantics() {
        let a = hashes(&["sha256:aa", "sha256:bb"]);
        let b = hashes(&["sha256:bb", "sha256:cc"]);
        let both = &a & &b;
        assert!(both.is_hash_allowed("sha256", "bb"));
        assert!(!both.is_hash_allowed("sha256", "aa"));
        assert_eq!(&a & &Hashes::empty(), a);
        assert_eq!(&Hashes::empty() & &b, b);
        let disjoint = &hashes(&["md5:aa"]) & &hashes(&["sha256:aa"]);
        assert!(disjoint.is_empty());
    }

    #[test]
    fn link_fragment_checked() {
        let h = hashes(&["sha256:abc"]);
        let good = Link::parse("https://x.example/p-1.0.tar.gz#sha256=abc").unwrap();
        let bad = Link::parse("https://x.example/p-1.0.tar.gz#sha256=def").unwrap();
        let bare = Link::parse("https://x.example/p-1.0.tar.gz").unwrap();
        assert!(h.is_link_allowed(&good));
        assert!(!h.is_link_allowed(&bad));
        assert!(!h.is_link_allowed(&bare));
    }

    #[test]
    fn check_file_against_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p-1.0.tar.gz");
        std::fs::write(&path, b"abc").unwrap();
        let ok = hashes(&["sha256:ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"]);
        assert!(ok.check_file(&path).is_ok());
        let bad = hashes(&["sha256:00"]);
        assert!(bad.check_file(&path).is_err());
        assert!(Hashes::empty().check_file(&path).is_ok());
    }
}

//! Constraints from constraints files: limits on what may be picked for an
//! identifier without asking for it to be installed.

use std::collections::BTreeSet;
use std::ops::BitAnd;

use tarn_core::hashes::Hashes;
use tarn_core::link::{links_equivalent, Link};
use tarn_core::requirement::InstallRequirement;
use tarn_core::specifier::VersionSpecifiers;

use crate::candidates::Candidate;

/// Accumulated version, hash and link limits for one identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Constraint {
    pub specifier: VersionSpecifiers,
    pub hashes: Hashes,
    pub links: BTreeSet<Link>,
}

impl Constraint {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Only inline `--hash` options count; a hash in the link fragment is
    /// not trusted for constraints.
    pub fn from_install_requirement(ireq: &InstallRequirement) -> Self {
        Self {
            specifier: ireq.specifier.clone(),
            hashes: ireq.hashes(false),
            links: ireq.link.iter().cloned().collect(),
        }
    }

    /// No limits at all.
    pub fn is_empty(&self) -> bool {
        self.specifier.is_empty() && self.hashes.is_empty() && self.links.is_empty()
    }

    pub fn and(&self, ireq: &InstallRequirement) -> Self {
        self & &Self::from_install_requirement(ireq)
    }

    /// When links are present the candidate must come from one of them.
    /// Pre-releases always pass; that policy belongs to the provider.
    pub fn is_satisfied_by(&self, candidate: &Candidate) -> bool {
        if !self.links.is_empty() {
            let Some(source) = candidate.source_link() else {
                return false;
            };
            if !self.links.iter().any(|link| links_equivalent(link, source)) {
                return false;
            }
        }
        self.specifier.contains(candidate.version(), Some(true))
    }
}

impl BitAnd<&Constraint> for &Constraint {
    type Output = Constraint;

    fn bitand(self, rhs: &Constraint) -> Constraint {
        Constraint {
            specifier: &self.specifier & &rhs.specifier,
            hashes: &self.hashes & &rhs.hashes,
            links: self.links.union(&rhs.links).cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tarn_core::installed::InstalledDist;
    use tarn_core::metadata::PackageMetadata;
    use tarn_core::name::PackageName;
    use tarn_core::version::Version;

    fn ireq(s: &str) -> InstallRequirement {
        s.parse().unwrap()
    }

    fn link_candidate(url: &str, version: &str) -> Arc<Candidate> {
        let name = PackageName::new("pkg").unwrap();
        let m = PackageMetadata::new(name.clone(), Version::parse(version));
        Candidate::from_link(Link::parse(url).unwrap(), &InstallRequirement::new(name), m)
    }

    fn installed(version: &str) -> Arc<Candidate> {
        let name = PackageName::new("pkg").unwrap();
        let dist = InstalledDist::new(PackageMetadata::new(name.clone(), Version::parse(version)));
        Candidate::installed(dist, &InstallRequirement::new(name))
    }

    #[test]
    fn empty_constraint_is_satisfied_by_anything() {
        let c = Constraint::empty();
        assert!(c.is_empty());
        assert!(c.is_satisfied_by(&installed("0.1")));
        assert!(c.is_satisfied_by(&link_candidate("https://x.example/pkg-2.0a1.tar.gz", "2.0a1")));
    }

    #[test]
    fn and_intersects_specifiers_and_hashes() {
        let c = Constraint::empty()
            .and(&ireq("pkg>=1.0 --hash=sha256:aa --hash=sha256:bb"))
            .and(&ireq("pkg<2 --hash=sha256:bb"));
        assert!(c.is_satisfied_by(&installed("1.5")));
        assert!(!c.is_satisfied_by(&installed("2.0")));
        assert!(!c.is_satisfied_by(&installed("2.0a1")));
        assert!(c.is_satisfied_by(&installed("1.9rc1")));
        assert!(c.hashes.is_hash_allowed("sha256", "bb"));
        assert!(!c.hashes.is_hash_allowed("sha256", "aa"));
    }

    #[test]
    fn link_constraint_accepts_any_equivalent_link() {
        let c = Constraint::from_install_requirement(&ireq("pkg @ https://a.example/pkg-1.0.tar.gz"))
            .and(&ireq("pkg @ https://b.example/pkg-1.0.tar.gz"));
        assert_eq!(c.links.len(), 2);
        assert!(c.is_satisfied_by(&link_candidate("https://b.example/pkg-1.0.tar.gz#sha256=00", "1.0")));
        assert!(!c.is_satisfied_by(&link_candidate("https://c.example/pkg-1.0.tar.gz", "1.0")));
        assert!(!c.is_satisfied_by(&installed("1.0")));
    }

    #[test]
    fn fragment_hash_is_not_trusted() {
        let c = Constraint::from_install_requirement(&ireq("pkg @ https://a.example/pkg-1.0.tar.gz#sha256=cc"));
        assert!(c.hashes.is_empty());
    }

    #[test]
    fn and_is_commutative_on_satisfaction() {
        let c1 = Constraint::from_install_requirement(&ireq("pkg>=1,!=1.5"));
        let c2 = Constraint::from_install_requirement(&ireq("pkg<3"));
        for v in ["0.9", "1.0", "1.5", "2.9", "3.0", "2.0b2"] {
            let x = installed(v);
            assert_eq!((&c1 & &c2).is_satisfied_by(&x), (&c2 & &c1).is_satisfied_by(&x), "{v}");
        }
    }

    #[test]
    fn and_is_associative_with_links_and_hashes() {
        let c1 = Constraint::from_install_requirement(&ireq("pkg>=1,!=1.5 --hash=sha256:aa --hash=sha256:bb"));
        let c2 = Constraint::from_install_requirement(&ireq(
            "pkg @ https://b.example/pkg-2.0.tar.gz --hash=sha256:bb --hash=sha256:cc",
        ));
        let c3 = Constraint::from_install_requirement(&ireq("pkg<3 --hash=sha256:bb"));
        let c4 = Constraint::from_install_requirement(&ireq("pkg @ https://a.example/pkg-1.5.tar.gz"));

        let left = &(&(&c1 & &c2) & &c3) & &c4;
        let right = &c1 & &(&c2 & &(&c3 & &c4));
        let middle = &(&c1 & &c2) & &(&c3 & &c4);
        assert_eq!(left.specifier.to_string(), right.specifier.to_string());
        assert_eq!(left.hashes, right.hashes);
        assert_eq!(left.hashes, middle.hashes);
        assert_eq!(left.links, right.links);
        assert_eq!(left.links, middle.links);

        for v in ["0.9", "1.0", "1.5", "2.0", "2.9", "3.0"] {
            let mut candidates = vec![installed(v)];
            for host in ["a", "b", "c"] {
                candidates.push(link_candidate(&format!("https://{host}.example/pkg-{v}.tar.gz"), v));
            }
            for c in &candidates {
                let expected = left.is_satisfied_by(c);
                assert_eq!(right.is_satisfied_by(c), expected, "{v}");
                assert_eq!(middle.is_satisfied_by(c), expected, "{v}");
            }
        }
        assert!(left.is_satisfied_by(&link_candidate("https://b.example/pkg-2.0.tar.gz", "2.0")));
        assert!(!left.is_satisfied_by(&link_candidate("https://a.example/pkg-1.5.tar.gz", "1.5")));
        assert!(!left.is_satisfied_by(&installed("2.0")));
    }
}

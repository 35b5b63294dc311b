//! Requirement kinds as seen by the resolver.

use std::fmt;
use std::sync::Arc;

use tarn_core::link::LinkKind;
use tarn_core::name::{format_name, PackageName};
use tarn_core::requirement::InstallRequirement;

use crate::candidates::Candidate;

/// What kind of source a requirement names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequirementKind {
    Named,
    DirectUrl,
    Vcs,
    LocalPath,
}

/// A named requirement resolved against the index: `requests[socks]>=2`.
#[derive(Debug, Clone)]
pub struct SpecifierRequirement {
    ireq: InstallRequirement,
}

/// A requirement that already pins one materialized candidate (a URL, a
/// path, or the base of an extras candidate).
#[derive(Debug, Clone)]
pub struct ExplicitRequirement {
    candidate: Arc<Candidate>,
}

#[derive(Debug, Clone)]
pub enum Requirement {
    Specifier(SpecifierRequirement),
    Explicit(ExplicitRequirement),
}

/// Result of [`Requirement::get_candidate_lookup`]: either the candidate is
/// already known, or the index has to be searched for `ireq`.
#[derive(Debug, Clone, Copy)]
pub enum CandidateLookup<'a> {
    Candidate(&'a Arc<Candidate>),
    Deferred(&'a InstallRequirement),
}

impl Requirement {
    pub fn from_specifier(ireq: InstallRequirement) -> Self {
        Self::Specifier(SpecifierRequirement { ireq })
    }

    pub fn explicit(candidate: Arc<Candidate>) -> Self {
        Self::Explicit(ExplicitRequirement { candidate })
    }

    pub fn project_name(&self) -> &PackageName {
        match self {
            Self::Specifier(r) => &r.ireq.name,
            Self::Explicit(r) => r.candidate.project_name(),
        }
    }

    /// Resolver identifier, including extras.
    pub fn name(&self) -> String {
        match self {
            Self::Specifier(r) => format_name(&r.ireq.name, &r.ireq.extras),
            Self::Explicit(r) => r.candidate.name(),
        }
    }

    pub fn kind(&self) -> RequirementKind {
        match self {
            Self::Specifier(_) => RequirementKind::Named,
            Self::Explicit(r) => match r.candidate.source_link().map(|l| l.kind()) {
                Some(LinkKind::Vcs) => RequirementKind::Vcs,
                Some(LinkKind::LocalPath) => RequirementKind::LocalPath,
                Some(LinkKind::Archive) => RequirementKind::DirectUrl,
                Some(LinkKind::Index) | None => RequirementKind::Named,
            },
        }
    }

    /// The install requirement behind a named requirement.
    pub fn install_requirement(&self) -> Option<&InstallRequirement> {
        match self {
            Self::Specifier(r) => Some(&r.ireq),
            Self::Explicit(_) => None,
        }
    }

    pub fn get_candidate_lookup(&self) -> CandidateLookup<'_> {
        match self {
            Self::Specifier(r) => CandidateLookup::Deferred(&r.ireq),
            Self::Explicit(r) => CandidateLookup::Candidate(&r.candidate),
        }
    }

    /// Pre-releases are always acceptable here; the provider has already
    /// applied the pre-release policy when it listed candidates.
    pub fn is_satisfied_by(&self, candidate: &Candidate) -> bool {
        match self {
            Self::Specifier(r) => {
                candidate.name() == self.name()
                    && r.ireq.specifier.contains(candidate.version(), Some(true))
            }
            Self::Explicit(r) => r.candidate.as_ref() == candidate,
        }
    }

    pub fn format_for_error(&self) -> String {
        match self {
            Self::Specifier(r) => r.ireq.to_string(),
            Self::Explicit(r) => r.candidate.format_for_error(),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_for_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tarn_core::installed::InstalledDist;
    use tarn_core::link::Link;
    use tarn_core::metadata::PackageMetadata;
    use tarn_core::version::Version;

    fn candidate(url: &str, version: &str) -> Arc<Candidate> {
        let name = PackageName::new("pkg").unwrap();
        let m = PackageMetadata::new(name.clone(), Version::parse(version));
        Candidate::from_link(Link::parse(url).unwrap(), &InstallRequirement::new(name), m)
    }

    #[test]
    fn specifier_requirement_accepts_prereleases() {
        let req = Requirement::from_specifier("pkg>=1.0".parse().unwrap());
        assert_eq!(req.kind(), RequirementKind::Named);
        assert!(req.is_satisfied_by(&candidate("https://x.example/pkg-2.0b1.tar.gz", "2.0b1")));
        assert!(!req.is_satisfied_by(&candidate("https://x.example/pkg-0.9.tar.gz", "0.9")));
        assert!(matches!(req.get_candidate_lookup(), CandidateLookup::Deferred(_)));
    }

    #[test]
    fn identifier_includes_extras() {
        let req = Requirement::from_specifier("Pkg[B,a]".parse().unwrap());
        assert_eq!(req.name(), "pkg[a,b]");
        assert_eq!(req.project_name().as_str(), "pkg");
        assert!(!req.is_satisfied_by(&candidate("https://x.example/pkg-1.0.tar.gz", "1.0")));
    }

    #[test]
    fn explicit_requirement_kinds_and_lookup() {
        let vcs = candidate("git+https://x.example/pkg", "1.0");
        let req = Requirement::explicit(Arc::clone(&vcs));
        assert_eq!(req.kind(), RequirementKind::Vcs);
        assert!(matches!(req.get_candidate_lookup(), CandidateLookup::Candidate(c) if Arc::ptr_eq(c, &vcs)));
        assert!(req.is_satisfied_by(&candidate("git+https://x.example/pkg#egg=pkg", "1.0")));
        assert!(!req.is_satisfied_by(&candidate("https://x.example/pkg-1.0.tar.gz", "1.0")));

        let local = Requirement::explicit(candidate("file:///src/pkg", "1.0"));
        assert_eq!(local.kind(), RequirementKind::LocalPath);
        let url = Requirement::explicit(candidate("https://x.example/pkg-1.0.tar.gz", "1.0"));
        assert_eq!(url.kind(), RequirementKind::DirectUrl);

        let dist = InstalledDist::new(PackageMetadata::new(PackageName::new("pkg").unwrap(), Version::parse("1.0")));
        let installed = Candidate::installed(dist, &InstallRequirement::new(PackageName::new("pkg").unwrap()));
        assert_eq!(Requirement::explicit(installed).kind(), RequirementKind::Named);
    }
}

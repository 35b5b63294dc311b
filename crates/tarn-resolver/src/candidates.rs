//! Candidate kinds: something concrete and versioned that may satisfy a
//! requirement.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tarn_core::installed::InstalledDist;
use tarn_core::link::{links_equivalent, Link};
use tarn_core::marker::MarkerEnvironment;
use tarn_core::metadata::PackageMetadata;
use tarn_core::name::{format_name, ExtraName, PackageName};
use tarn_core::requirement::InstallRequirement;
use tarn_core::version::Version;
use tracing::warn;

static NEXT_CANDIDATE_ID: AtomicU64 = AtomicU64::new(1);

/// Object identity of a constructed candidate.
///
/// Two candidates can compare equal (same link, same version) and still have
/// different ids; incompatibility tracking works on ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CandidateId(u64);

impl CandidateId {
    fn next() -> Self {
        Self(NEXT_CANDIDATE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A candidate backed by an artifact link: an index file, a direct URL, a VCS
/// checkout or a local path.
#[derive(Debug)]
pub struct LinkCandidate {
    id: CandidateId,
    link: Link,
    template: InstallRequirement,
    metadata: PackageMetadata,
}

/// A package already present in the environment.
#[derive(Debug)]
pub struct AlreadyInstalledCandidate {
    id: CandidateId,
    dist: InstalledDist,
    template: InstallRequirement,
}

/// A base candidate with extras requested on top of it.
#[derive(Debug)]
pub struct ExtrasCandidate {
    id: CandidateId,
    base: Arc<Candidate>,
    extras: BTreeSet<ExtraName>,
}

#[derive(Debug)]
pub enum Candidate {
    Link(LinkCandidate),
    Installed(AlreadyInstalledCandidate),
    Extras(ExtrasCandidate),
}

/// One entry produced by [`Candidate::iter_dependencies`].
#[derive(Debug, Clone)]
pub enum Dependency {
    /// The exact base candidate (extras candidates depend on it first).
    Base(Arc<Candidate>),
    Requirement(InstallRequirement),
}

impl Candidate {
    pub fn from_link(link: Link, template: &InstallRequirement, metadata: PackageMetadata) -> Arc<Self> {
        Arc::new(Self::Link(LinkCandidate {
            id: CandidateId::next(),
            link,
            template: template.clone(),
            metadata,
        }))
    }

    pub fn installed(dist: InstalledDist, template: &InstallRequirement) -> Arc<Self> {
        Arc::new(Self::Installed(AlreadyInstalledCandidate {
            id: CandidateId::next(),
            dist,
            template: template.clone(),
        }))
    }

    pub fn with_extras(base: Arc<Candidate>, extras: BTreeSet<ExtraName>) -> Arc<Self> {
        Arc::new(Self::Extras(ExtrasCandidate {
            id: CandidateId::next(),
            base,
            extras,
        }))
    }

    pub fn id(&self) -> CandidateId {
        match self {
            Self::Link(c) => c.id,
            Self::Installed(c) => c.id,
            Self::Extras(c) => c.id,
        }
    }

    /// Bare package identity, without extras.
    pub fn project_name(&self) -> &PackageName {
        &self.metadata().name
    }

    /// Resolver identifier, including extras.
    pub fn name(&self) -> String {
        format_name(self.project_name(), &self.extras())
    }

    pub fn version(&self) -> &Version {
        &self.metadata().version
    }

    pub fn extras(&self) -> BTreeSet<ExtraName> {
        match self {
            Self::Extras(c) => c.extras.clone(),
            _ => BTreeSet::new(),
        }
    }

    pub fn is_installed(&self) -> bool {
        match self {
            Self::Link(_) => false,
            Self::Installed(_) => true,
            Self::Extras(c) => c.base.is_installed(),
        }
    }

    pub fn is_editable(&self) -> bool {
        match self {
            Self::Link(c) => c.template.editable,
            Self::Installed(c) => c.dist.editable,
            Self::Extras(c) => c.base.is_editable(),
        }
    }

    /// Where the candidate's artifact comes from. Installed packages have
    /// no source link.
    pub fn source_link(&self) -> Option<&Link> {
        match self {
            Self::Link(c) => Some(&c.link),
            Self::Installed(_) => None,
            Self::Extras(c) => c.base.source_link(),
        }
    }

    pub fn metadata(&self) -> &PackageMetadata {
        match self {
            Self::Link(c) => &c.metadata,
            Self::Installed(c) => &c.dist.metadata,
            Self::Extras(c) => c.base.metadata(),
        }
    }

    /// The base candidate of an extras candidate, or the candidate itself.
    pub fn base(self: &Arc<Self>) -> Arc<Candidate> {
        match self.as_ref() {
            Self::Extras(c) => Arc::clone(&c.base),
            _ => Arc::clone(self),
        }
    }

    /// Dependencies declared in the candidate's metadata.
    ///
    /// `None` entries are dependencies that could not be parsed; they are
    /// dropped by the caller. With `with_requires` unset only the base pin
    /// of an extras candidate is produced.
    pub fn iter_dependencies<'a>(
        &'a self,
        with_requires: bool,
        env: &'a MarkerEnvironment,
    ) -> impl Iterator<Item = Option<Dependency>> + 'a {
        let (base, extras) = match self {
            Self::Extras(c) => {
                let provided = &c.base.metadata().provides_extras;
                let (valid, invalid): (Vec<_>, Vec<_>) =
                    c.extras.iter().cloned().partition(|e| provided.contains(e));
                for extra in invalid {
                    warn!(
                        "{} {} does not provide the extra '{extra}'",
                        c.base.project_name(),
                        c.base.version()
                    );
                }
                (Some(Dependency::Base(Arc::clone(&c.base))), valid)
            }
            _ => (None, Vec::new()),
        };
        let metadata = self.metadata();
        let requires: &[String] = if with_requires { &metadata.requires_dist } else { &[] };
        base.map(Some).into_iter().chain(requires.iter().filter_map(move |raw| {
            metadata
                .dependency(raw, &extras, env)
                .map(|dep| dep.map(Dependency::Requirement))
        }))
    }

    /// What the installer needs to act on, or `None` when nothing needs
    /// installing (already installed, or an extras wrapper whose base
    /// carries the work).
    pub fn get_install_requirement(&self) -> Option<InstallRequirement> {
        match self {
            Self::Link(c) => {
                let mut ireq = InstallRequirement::from_link(c.link.clone(), &c.template);
                ireq.name = c.metadata.name.clone();
                ireq.written_name = None;
                ireq.extras.clear();
                Some(ireq)
            }
            Self::Installed(_) | Self::Extras(_) => None,
        }
    }

    /// The requirement this candidate was created for.
    pub fn template(&self) -> &InstallRequirement {
        match self {
            Self::Link(c) => &c.template,
            Self::Installed(c) => &c.template,
            Self::Extras(c) => c.base.template(),
        }
    }

    /// `name version (from url)` or `name version (Installed)`.
    pub fn format_for_error(&self) -> String {
        match self.source_link() {
            Some(link) if link.kind() != tarn_core::link::LinkKind::Index => {
                format!("{} {} (from {link})", self.name(), self.version())
            }
            Some(_) => format!("{} {}", self.name(), self.version()),
            None => format!("{} {} (Installed)", self.name(), self.version()),
        }
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Link(a), Self::Link(b)) => links_equivalent(&a.link, &b.link),
            (Self::Installed(a), Self::Installed(b)) => {
                a.dist.name() == b.dist.name() && a.dist.version() == b.dist.version()
            }
            (Self::Extras(a), Self::Extras(b)) => a.base == b.base && a.extras == b.extras,
            _ => false,
        }
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name(), self.version())
    }
}

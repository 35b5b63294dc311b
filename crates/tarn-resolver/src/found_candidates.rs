//! Lazily materialized candidate sequences.
//!
//! Index pages list versions cheaply, but turning an entry into a candidate
//! means fetching the artifact and reading its metadata. [`FoundCandidates`]
//! walks the listing in preference order and only runs a candidate's thunk
//! when the resolver actually asks for the next candidate.

use std::cell::OnceCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::Arc;

use tarn_core::version::Version;

use crate::candidates::{Candidate, CandidateId};
use crate::provider::Matches;

/// Builds a candidate on demand. `None` means the artifact could not be
/// turned into a usable candidate; that version is skipped.
pub type CandidateThunk = Box<dyn FnOnce() -> Option<Arc<Candidate>>>;

/// One pass over the index listing, newest first.
pub type IndexInfos = Box<dyn Iterator<Item = (Version, CandidateThunk)>>;

/// Restartable source of index listings.
pub type InfoSource = Rc<dyn Fn() -> IndexInfos>;

/// A re-iterable, deduplicated candidate sequence for one identifier.
///
/// The incompatibility set is captured at construction. A sequence never
/// changes afterwards; the resolver builds a new one whenever the set of
/// known incompatibilities grows.
pub struct FoundCandidates {
    get_infos: InfoSource,
    installed: Option<Arc<Candidate>>,
    prefers_installed: bool,
    incompatible_ids: HashSet<CandidateId>,
    non_empty: OnceCell<bool>,
}

impl FoundCandidates {
    pub fn new(
        get_infos: InfoSource,
        installed: Option<Arc<Candidate>>,
        prefers_installed: bool,
        incompatible_ids: HashSet<CandidateId>,
    ) -> Self {
        Self {
            get_infos,
            installed,
            prefers_installed,
            incompatible_ids,
            non_empty: OnceCell::new(),
        }
    }

    /// Walk the candidates in order:
    ///
    /// * without an installed candidate, index candidates newest first;
    /// * when the installed candidate is preferred, it comes first;
    /// * otherwise it is slotted in right before the first index version that
    ///   is not newer than it (or last, if every index version is newer).
    ///
    /// No version is produced twice. Candidates whose id is incompatible are
    /// skipped.
    pub fn iter(&self) -> impl Iterator<Item = Arc<Candidate>> + '_ {
        let infos = (self.get_infos)();
        let inner: Box<dyn Iterator<Item = Arc<Candidate>>> = match &self.installed {
            None => Box::new(Deduplicated::new(infos, None)),
            Some(installed) if self.prefers_installed => {
                let mut rest = Deduplicated::new(infos, None);
                rest.seen.insert(installed.version().clone());
                Box::new(std::iter::once(Arc::clone(installed)).chain(rest))
            }
            Some(installed) => Box::new(Deduplicated::new(infos, Some(Arc::clone(installed)))),
        };
        inner.filter(move |c| !self.incompatible_ids.contains(&c.id()))
    }

    /// Memoized on first call. A preferred installed candidate makes the
    /// sequence non-empty without touching the index.
    pub fn is_empty(&self) -> bool {
        !*self.non_empty.get_or_init(|| {
            (self.prefers_installed && self.installed.is_some()) || self.iter().next().is_some()
        })
    }
}

impl Matches<Arc<Candidate>> for FoundCandidates {
    fn iter_candidates(&self) -> Box<dyn Iterator<Item = Arc<Candidate>> + '_> {
        Box::new(FoundCandidates::iter(self))
    }

    fn is_empty(&self) -> bool {
        FoundCandidates::is_empty(self)
    }
}

/// Streams index infos, skipping versions already produced, optionally
/// inserting an installed candidate at its place in descending order.
struct Deduplicated {
    infos: IndexInfos,
    seen: HashSet<Version>,
    insert: Option<Arc<Candidate>>,
    pending: Option<(Version, CandidateThunk)>,
}

impl Deduplicated {
    fn new(infos: IndexInfos, insert: Option<Arc<Candidate>>) -> Self {
        Self {
            infos,
            seen: HashSet::new(),
            insert,
            pending: None,
        }
    }

    fn materialize(&mut self, version: Version, thunk: CandidateThunk) -> Option<Arc<Candidate>> {
        let candidate = thunk()?;
        self.seen.insert(version);
        Some(candidate)
    }
}

impl Iterator for Deduplicated {
    type Item = Arc<Candidate>;

    fn next(&mut self) -> Option<Arc<Candidate>> {
        if let Some((version, thunk)) = self.pending.take() {
            if let Some(candidate) = self.materialize(version, thunk) {
                return Some(candidate);
            }
        }
        loop {
            let Some((version, thunk)) = self.infos.next() else {
                return self.insert.take();
            };
            if self.seen.contains(&version) {
                continue;
            }
            if self.insert.as_ref().is_some_and(|i| i.version() >= &version) {
                if let Some(installed) = self.insert.take() {
                    self.seen.insert(installed.version().clone());
                    // Same version as installed: the index artifact is never fetched.
                    if installed.version() != &version {
                        self.pending = Some((version, thunk));
                    }
                    return Some(installed);
                }
            }
            if let Some(candidate) = self.materialize(version, thunk) {
                return Some(candidate);
            }
        }
    }
}

//! Per-resolve candidate cache.
//!
//! The factory builds candidates on demand from inside lazy thunks, so the
//! maps sit behind `RefCell`s. A cache lives exactly as long as the factory
//! that owns it, which is one `resolve()` call.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;
use std::sync::Arc;

use tarn_core::index::IndexEntry;
use tarn_core::link::Link;
use tarn_core::name::{ExtraName, PackageName};

use crate::candidates::{Candidate, CandidateId};

#[derive(Debug, Default)]
pub struct CandidateCache {
    /// Keyed by URL without fragment and the editable flag.
    links: RefCell<HashMap<(String, bool), Arc<Candidate>>>,
    installed: RefCell<HashMap<PackageName, Arc<Candidate>>>,
    extras: RefCell<HashMap<(CandidateId, BTreeSet<ExtraName>), Arc<Candidate>>>,
    pages: RefCell<HashMap<PackageName, Rc<Vec<IndexEntry>>>>,
    /// Links whose candidate could not be built, with the reason.
    failures: RefCell<HashMap<String, String>>,
}

impl CandidateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn link_candidate(&self, link: &Link, editable: bool) -> Option<Arc<Candidate>> {
        self.links
            .borrow()
            .get(&(link.url_without_fragment(), editable))
            .cloned()
    }

    pub fn insert_link_candidate(&self, link: &Link, editable: bool, candidate: &Arc<Candidate>) {
        self.links
            .borrow_mut()
            .insert((link.url_without_fragment(), editable), Arc::clone(candidate));
    }

    pub fn installed_candidate(&self, name: &PackageName) -> Option<Arc<Candidate>> {
        self.installed.borrow().get(name).cloned()
    }

    pub fn insert_installed_candidate(&self, name: &PackageName, candidate: &Arc<Candidate>) {
        self.installed
            .borrow_mut()
            .insert(name.clone(), Arc::clone(candidate));
    }

    /// The extras candidate over `base`, created once per (base, extras).
    pub fn extras_candidate(&self, base: &Arc<Candidate>, extras: &BTreeSet<ExtraName>) -> Arc<Candidate> {
        let key = (base.id(), extras.clone());
        if let Some(found) = self.extras.borrow().get(&key) {
            return Arc::clone(found);
        }
        let candidate = Candidate::with_extras(Arc::clone(base), extras.clone());
        self.extras.borrow_mut().insert(key, Arc::clone(&candidate));
        candidate
    }

    /// The index listing for `name`, fetched through `fetch` at most once.
    pub fn page(&self, name: &PackageName, fetch: impl FnOnce() -> Vec<IndexEntry>) -> Rc<Vec<IndexEntry>> {
        if let Some(page) = self.pages.borrow().get(name) {
            return Rc::clone(page);
        }
        let page = Rc::new(fetch());
        self.pages.borrow_mut().insert(name.clone(), Rc::clone(&page));
        page
    }

    pub fn failure(&self, link: &Link) -> Option<String> {
        self.failures.borrow().get(&link.url_without_fragment()).cloned()
    }

    pub fn record_failure(&self, link: &Link, message: &str) {
        self.failures
            .borrow_mut()
            .insert(link.url_without_fragment(), message.to_string());
    }

    pub fn failure_count(&self) -> usize {
        self.failures.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tarn_core::metadata::PackageMetadata;
    use tarn_core::requirement::InstallRequirement;
    use tarn_core::version::Version;

    fn candidate(url: &str) -> Arc<Candidate> {
        let name = PackageName::new("pkg").unwrap();
        let m = PackageMetadata::new(name.clone(), Version::parse("1.0"));
        Candidate::from_link(Link::parse(url).unwrap(), &InstallRequirement::new(name), m)
    }

    #[test]
    fn link_cache_ignores_fragment_but_not_editable() {
        let cache = CandidateCache::new();
        let c = candidate("https://x.example/pkg-1.0.tar.gz#sha256=aa");
        let link = Link::parse("https://x.example/pkg-1.0.tar.gz#sha256=aa").unwrap();
        cache.insert_link_candidate(&link, false, &c);

        let bare = Link::parse("https://x.example/pkg-1.0.tar.gz").unwrap();
        assert!(cache.link_candidate(&bare, false).is_some());
        assert!(cache.link_candidate(&bare, true).is_none());
    }

    #[test]
    fn extras_candidates_are_shared() {
        let cache = CandidateCache::new();
        let base = candidate("https://x.example/pkg-1.0.tar.gz");
        let extras: BTreeSet<ExtraName> = [ExtraName::new("a").unwrap()].into_iter().collect();
        let first = cache.extras_candidate(&base, &extras);
        let second = cache.extras_candidate(&base, &extras);
        assert_eq!(first.id(), second.id());
    }

    #[test]
    fn pages_are_fetched_once() {
        let cache = CandidateCache::new();
        let name = PackageName::new("pkg").unwrap();
        let calls = Cell::new(0);
        for _ in 0..3 {
            cache.page(&name, || {
                calls.set(calls.get() + 1);
                Vec::new()
            });
        }
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn failures_are_recorded_per_link() {
        let cache = CandidateCache::new();
        let link = Link::parse("https://x.example/pkg-1.0.tar.gz").unwrap();
        assert!(cache.failure(&link).is_none());
        cache.record_failure(&link, "broken metadata");
        assert_eq!(cache.failure(&link).as_deref(), Some("broken metadata"));
        assert_eq!(cache.failure_count(), 1);
    }
}

//! Turns requirements into candidates.
//!
//! The factory owns the index, a snapshot of the installed packages and the
//! per-resolve [`CandidateCache`]. Index candidates are only built when a
//! [`FoundCandidates`] thunk runs, so the factory is shared with those thunks
//! through an `Rc`.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::rc::Rc;
use std::sync::Arc;

use tarn_core::hashes::Hashes;
use tarn_core::index::{IndexEntry, PackageIndex};
use tarn_core::installed::{InstalledDist, InstalledRegistry};
use tarn_core::link::Link;
use tarn_core::marker::MarkerEnvironment;
use tarn_core::name::{parse_identifier, ExtraName, PackageName};
use tarn_core::requirement::InstallRequirement;
use tarn_core::specifier::VersionSpecifiers;
use tarn_core::version::Version;
use tarn_util::errors::TarnError;
use tracing::{debug, warn};

use crate::cache::CandidateCache;
use crate::candidates::{Candidate, CandidateId};
use crate::constraint::Constraint;
use crate::found_candidates::{CandidateThunk, FoundCandidates, IndexInfos, InfoSource};
use crate::provider::Matches;
use crate::requirements::{CandidateLookup, Requirement};

/// Knobs that change which candidates the factory offers.
#[derive(Debug, Clone, Default)]
pub struct FactoryOptions {
    pub environment: MarkerEnvironment,
    /// Offer pre-releases even when no specifier asks for them.
    pub allow_prereleases: bool,
    /// Never offer installed packages as candidates.
    pub ignore_installed: bool,
    pub ignore_requires_python: bool,
}

/// What [`Factory::find_candidates`] returns: a lazy index sequence, or the
/// explicit candidates some requirement pinned.
pub enum CandidateMatches {
    Found(FoundCandidates),
    Explicit(Vec<Arc<Candidate>>),
}

impl CandidateMatches {
    pub fn iter(&self) -> Box<dyn Iterator<Item = Arc<Candidate>> + '_> {
        match self {
            Self::Found(found) => Box::new(found.iter()),
            Self::Explicit(candidates) => Box::new(candidates.as_slice().iter().cloned()),
        }
    }
}

impl Matches<Arc<Candidate>> for CandidateMatches {
    fn iter_candidates(&self) -> Box<dyn Iterator<Item = Arc<Candidate>> + '_> {
        CandidateMatches::iter(self)
    }

    fn is_empty(&self) -> bool {
        match self {
            Self::Found(found) => found.is_empty(),
            Self::Explicit(candidates) => candidates.is_empty(),
        }
    }
}

/// Why an artifact is not `name` (at `version`, when one is listed), if it
/// is not.
fn identity_mismatch(
    link: &Link,
    name: &PackageName,
    version: Option<&Version>,
    found_name: &PackageName,
    found_version: &Version,
) -> Option<String> {
    if found_name != name {
        return Some(format!("{link} contains {found_name} instead of {name}"));
    }
    match version {
        Some(listed) if listed != found_version => Some(format!(
            "{link} has version {found_version} instead of the listed {listed}"
        )),
        _ => None,
    }
}

pub struct Factory {
    index: Rc<dyn PackageIndex>,
    installed: HashMap<PackageName, InstalledDist>,
    options: FactoryOptions,
    cache: CandidateCache,
}

impl Factory {
    pub fn new(
        index: Rc<dyn PackageIndex>,
        registry: Option<Rc<dyn InstalledRegistry>>,
        options: FactoryOptions,
    ) -> Rc<Self> {
        let installed = registry
            .map(|r| {
                r.iter_installed()
                    .into_iter()
                    .map(|dist| (dist.name().clone(), dist))
                    .collect()
            })
            .unwrap_or_default();
        Rc::new(Self {
            index,
            installed,
            options,
            cache: CandidateCache::new(),
        })
    }

    pub fn environment(&self) -> &MarkerEnvironment {
        &self.options.environment
    }

    pub fn cache(&self) -> &CandidateCache {
        &self.cache
    }

    /// The installed distribution of `name`, whether or not installed
    /// packages are offered as candidates.
    pub fn installed_dist(&self, name: &PackageName) -> Option<&InstalledDist> {
        self.installed.get(name)
    }

    /// Turn an install requirement into a resolver requirement.
    ///
    /// Returns `None` when its marker does not apply. A URL requirement is
    /// materialized right away; failing to do so is an error.
    pub fn make_requirement_from_install_req(
        &self,
        ireq: InstallRequirement,
        requested_extras: &[ExtraName],
    ) -> Result<Option<Requirement>, TarnError> {
        if !ireq.match_markers(self.environment(), requested_extras) {
            debug!("ignoring {ireq}: markers do not match the environment");
            return Ok(None);
        }
        let Some(link) = ireq.link.clone() else {
            return Ok(Some(Requirement::from_specifier(ireq)));
        };
        let extras = ireq.extras.clone();
        let candidate = self.make_candidate_from_link(&link, &extras, &ireq, &ireq.name, None)?;
        Ok(Some(Requirement::explicit(candidate)))
    }

    /// Build (or fetch from the cache) the candidate for `link`.
    ///
    /// The artifact's metadata must name `name`, and `version` when given.
    /// A failure is remembered, so the same link is never read twice.
    pub fn make_base_candidate_from_link(
        &self,
        link: &Link,
        template: &InstallRequirement,
        name: &PackageName,
        version: Option<&Version>,
    ) -> Result<Arc<Candidate>, TarnError> {
        let failed = |message: String| TarnError::Metadata {
            package: name.to_string(),
            message,
        };
        if let Some(message) = self.cache.failure(link) {
            return Err(failed(message));
        }
        if let Some(candidate) = self.cache.link_candidate(link, template.editable) {
            return match identity_mismatch(link, name, version, candidate.project_name(), candidate.version()) {
                Some(message) => Err(failed(message)),
                None => Ok(candidate),
            };
        }

        let metadata = match self.index.fetch_metadata(link) {
            Ok(metadata) => metadata,
            Err(e) => {
                self.cache.record_failure(link, &e.to_string());
                return Err(e);
            }
        };
        let problem = if let Some(message) = identity_mismatch(link, name, version, &metadata.name, &metadata.version) {
            Some(message)
        } else if !self.options.ignore_requires_python
            && !metadata.supports_python(&self.environment().python_full_version())
        {
            Some(format!(
                "{name} {} requires a different Python: {} not in '{}'",
                metadata.version,
                self.environment().python_full_version,
                metadata
                    .requires_python
                    .as_ref()
                    .map(VersionSpecifiers::to_string)
                    .unwrap_or_default()
            ))
        } else {
            None
        };
        if let Some(message) = problem {
            self.cache.record_failure(link, &message);
            return Err(failed(message));
        }

        let candidate = Candidate::from_link(link.clone(), template, metadata);
        self.cache.insert_link_candidate(link, template.editable, &candidate);
        Ok(candidate)
    }

    pub fn make_candidate_from_link(
        &self,
        link: &Link,
        extras: &BTreeSet<ExtraName>,
        template: &InstallRequirement,
        name: &PackageName,
        version: Option<&Version>,
    ) -> Result<Arc<Candidate>, TarnError> {
        let base = self.make_base_candidate_from_link(link, template, name, version)?;
        Ok(self.with_extras(base, extras))
    }

    fn with_extras(&self, base: Arc<Candidate>, extras: &BTreeSet<ExtraName>) -> Arc<Candidate> {
        if extras.is_empty() {
            base
        } else {
            self.cache.extras_candidate(&base, extras)
        }
    }

    fn make_candidate_from_dist(
        &self,
        dist: &InstalledDist,
        extras: &BTreeSet<ExtraName>,
        template: &InstallRequirement,
    ) -> Arc<Candidate> {
        let base = match self.cache.installed_candidate(dist.name()) {
            Some(candidate) => candidate,
            None => {
                let candidate = Candidate::installed(dist.clone(), template);
                self.cache.insert_installed_candidate(dist.name(), &candidate);
                candidate
            }
        };
        self.with_extras(base, extras)
    }

    /// Index entries for `name` that this environment can use, oldest first.
    fn applicable_entries(&self, name: &PackageName, specifier: &VersionSpecifiers, hashes: &Hashes) -> Vec<IndexEntry> {
        let page = self.cache.page(name, || self.index.entries(name));
        let python = self.environment().python_full_version();
        let compatible = page.iter().filter(|entry| {
            self.options.ignore_requires_python
                || entry
                    .requires_python
                    .as_ref()
                    .map_or(true, |spec| spec.contains(&python, Some(true)))
        });
        let prereleases = self.options.allow_prereleases.then_some(true);
        let mut matching = specifier.filter(compatible.cloned(), |e| &e.version, prereleases);
        matching = filter_unallowed_hashes(matching, hashes);
        matching.sort_by(|a, b| a.version.cmp(&b.version));
        matching
    }

    /// Every non-yanked version the index offers for `name` in this
    /// environment, ignoring specifiers.
    pub fn available_versions(&self, name: &PackageName) -> Vec<Version> {
        let page = self.cache.page(name, || self.index.entries(name));
        let python = self.environment().python_full_version();
        let versions: BTreeSet<Version> = page
            .iter()
            .filter(|entry| !entry.yanked)
            .filter(|entry| {
                self.options.ignore_requires_python
                    || entry
                        .requires_python
                        .as_ref()
                        .map_or(true, |spec| spec.contains(&python, Some(true)))
            })
            .map(|entry| entry.version.clone())
            .collect();
        versions.into_iter().collect()
    }

    /// All candidates that may satisfy `identifier`, most preferred first.
    ///
    /// Explicit candidates (from URL requirements, from the extra-less form
    /// of the identifier, or from constraint links) take over entirely when
    /// present. Otherwise the index is searched lazily.
    pub fn find_candidates(
        self: &Rc<Self>,
        identifier: &str,
        requirements: &BTreeMap<&String, Vec<&Requirement>>,
        incompatible_ids: HashSet<CandidateId>,
        constraint: &Constraint,
        prefers_installed: bool,
    ) -> CandidateMatches {
        let own: &[&Requirement] = requirements
            .iter()
            .find(|(k, _)| k.as_str() == identifier)
            .map(|(_, reqs)| reqs.as_slice())
            .unwrap_or(&[]);

        let mut explicit: Vec<Arc<Candidate>> = Vec::new();
        let mut ireqs: Vec<&InstallRequirement> = Vec::new();
        for req in own {
            match req.get_candidate_lookup() {
                CandidateLookup::Candidate(c) => push_unique(&mut explicit, Arc::clone(c)),
                CandidateLookup::Deferred(ireq) => ireqs.push(ireq),
            }
        }

        // `name[extra]` inherits whatever the plain `name` pins or asks for.
        let parsed = parse_identifier(identifier);
        if let Some((base_name, extras)) = parsed.as_ref().filter(|(_, extras)| !extras.is_empty()) {
            let base_reqs = requirements
                .iter()
                .find(|(k, _)| k.as_str() == base_name.as_str())
                .map(|(_, reqs)| reqs.as_slice())
                .unwrap_or(&[]);
            for req in base_reqs {
                match req.get_candidate_lookup() {
                    CandidateLookup::Candidate(c) => {
                        push_unique(&mut explicit, self.with_extras(c.base(), extras));
                    }
                    CandidateLookup::Deferred(ireq) => ireqs.push(ireq),
                }
            }
        }

        if let (Some(template), Some((name, extras))) = (ireqs.first(), parsed.as_ref()) {
            for link in &constraint.links {
                let template = InstallRequirement::from_link(link.clone(), template);
                match self.make_candidate_from_link(link, extras, &template, name, None) {
                    Ok(candidate) => push_unique(&mut explicit, candidate),
                    Err(e) => warn!("ignoring constraint link {link}: {e}"),
                }
            }
        }

        if explicit.is_empty() {
            return CandidateMatches::Found(self.iter_found_candidates(
                &ireqs,
                constraint,
                prefers_installed,
                incompatible_ids,
            ));
        }

        explicit.retain(|c| {
            !incompatible_ids.contains(&c.id())
                && constraint.is_satisfied_by(c)
                && own.iter().all(|req| req.is_satisfied_by(c))
        });
        CandidateMatches::Explicit(explicit)
    }

    fn iter_found_candidates(
        self: &Rc<Self>,
        ireqs: &[&InstallRequirement],
        constraint: &Constraint,
        prefers_installed: bool,
        incompatible_ids: HashSet<CandidateId>,
    ) -> FoundCandidates {
        let Some(template) = ireqs.first().map(|r| (*r).clone()) else {
            let nothing: InfoSource = Rc::new(|| Box::new(std::iter::empty()) as IndexInfos);
            return FoundCandidates::new(nothing, None, prefers_installed, incompatible_ids);
        };
        let name = template.name.clone();

        let mut specifier = constraint.specifier.clone();
        let mut hashes = constraint.hashes.clone();
        let mut extras = BTreeSet::new();
        for ireq in ireqs {
            specifier = &specifier & &ireq.specifier;
            hashes = &hashes & &ireq.hashes(false);
            extras.extend(ireq.extras.iter().cloned());
        }

        let installed = self
            .installed_candidate(&name, &specifier, &extras, &template)
            .filter(|c| !incompatible_ids.contains(&c.id()));

        let factory = Rc::clone(self);
        let get_infos: InfoSource = Rc::new(move || {
            let entries = factory.applicable_entries(&name, &specifier, &hashes);
            // Yanked files are only considered when they are all there is
            // and the user pinned one exactly.
            let all_yanked = entries.iter().all(|e| e.yanked);
            let allow_yanked = all_yanked && specifier.is_pinned();

            let factory = Rc::clone(&factory);
            let name = name.clone();
            let extras = extras.clone();
            let template = template.clone();
            let infos = entries
                .into_iter()
                .rev()
                .filter(move |e| allow_yanked || !e.yanked)
                .map(move |entry| {
                    let factory = Rc::clone(&factory);
                    let name = name.clone();
                    let extras = extras.clone();
                    let template = template.clone();
                    let version = entry.version.clone();
                    let thunk: CandidateThunk = Box::new(move || {
                        let result = factory.make_candidate_from_link(
                            &entry.link,
                            &extras,
                            &template,
                            &name,
                            Some(&entry.version),
                        );
                        match result {
                            Ok(candidate) => Some(candidate),
                            Err(e) => {
                                warn!("discarding {} {}: {e}", entry.name, entry.version);
                                None
                            }
                        }
                    });
                    (version, thunk)
                });
            Box::new(infos) as IndexInfos
        });

        FoundCandidates::new(get_infos, installed, prefers_installed, incompatible_ids)
    }

    fn installed_candidate(
        &self,
        name: &PackageName,
        specifier: &VersionSpecifiers,
        extras: &BTreeSet<ExtraName>,
        template: &InstallRequirement,
    ) -> Option<Arc<Candidate>> {
        if self.options.ignore_installed {
            return None;
        }
        let dist = self.installed.get(name)?;
        if !specifier.contains(dist.version(), Some(true)) {
            return None;
        }
        Some(self.make_candidate_from_dist(dist, extras, template))
    }
}

fn push_unique(candidates: &mut Vec<Arc<Candidate>>, candidate: Arc<Candidate>) {
    if !candidates.iter().any(|c| c.as_ref() == candidate.as_ref()) {
        candidates.push(candidate);
    }
}

/// With hashes required, prefer entries whose declared digest is allowed.
/// Entries without a digest stay; if no entry matches, everything stays.
fn filter_unallowed_hashes(entries: Vec<IndexEntry>, hashes: &Hashes) -> Vec<IndexEntry> {
    if hashes.is_empty() {
        return entries;
    }
    let matched = entries.iter().filter(|e| hashes.is_link_allowed(&e.link)).count();
    if matched == 0 {
        debug!("no index entry matches the required hashes; keeping all");
        return entries;
    }
    entries
        .into_iter()
        .filter(|e| !e.link.has_hash() || hashes.is_link_allowed(&e.link))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tarn_core::index::{PackageRecord, StaticIndex};
    use tarn_core::installed::StaticRegistry;
    use tarn_core::metadata::PackageMetadata;

    fn index(records: Vec<PackageRecord>) -> Rc<dyn PackageIndex> {
        let mut index = StaticIndex::new();
        for r in records {
            index.add(r).unwrap();
        }
        Rc::new(index)
    }

    fn factory(records: Vec<PackageRecord>, installed: &[(&str, &str)], options: FactoryOptions) -> Rc<Factory> {
        let mut registry = StaticRegistry::new();
        for (name, version) in installed {
            registry.insert(InstalledDist::new(PackageMetadata::new(
                PackageName::new(name).unwrap(),
                Version::parse(version),
            )));
        }
        Factory::new(index(records), Some(Rc::new(registry)), options)
    }

    fn versions(matches: &CandidateMatches) -> Vec<String> {
        matches.iter().map(|c| c.version().to_string()).collect()
    }

    fn find(f: &Rc<Factory>, identifier: &str, reqs: &[&str], prefers_installed: bool) -> CandidateMatches {
        let key = identifier.to_string();
        let requirements: Vec<Requirement> = reqs
            .iter()
            .map(|r| Requirement::from_specifier(InstallRequirement::parse(r).unwrap()))
            .collect();
        let mut map = BTreeMap::new();
        map.insert(&key, requirements.iter().collect());
        f.find_candidates(identifier, &map, HashSet::new(), &Constraint::empty(), prefers_installed)
    }

    #[test]
    fn index_candidates_newest_first_without_prereleases() {
        let f = factory(
            vec![
                PackageRecord::new("pkg", "1.0"),
                PackageRecord::new("pkg", "2.0b1"),
                PackageRecord::new("pkg", "1.5"),
            ],
            &[],
            FactoryOptions::default(),
        );
        assert_eq!(versions(&find(&f, "pkg", &["pkg"], true)), vec!["1.5", "1.0"]);
        assert_eq!(versions(&find(&f, "pkg", &["pkg>=2.0b1"], true)), vec!["2.0b1"]);
    }

    #[test]
    fn prereleases_offered_when_allowed() {
        let options = FactoryOptions {
            allow_prereleases: true,
            ..Default::default()
        };
        let f = factory(
            vec![PackageRecord::new("pkg", "1.0"), PackageRecord::new("pkg", "2.0b1")],
            &[],
            options,
        );
        assert_eq!(versions(&find(&f, "pkg", &["pkg"], true)), vec!["2.0b1", "1.0"]);
    }

    #[test]
    fn installed_candidate_respects_policy() {
        let f = factory(
            vec![PackageRecord::new("pkg", "1.0"), PackageRecord::new("pkg", "2.0")],
            &[("pkg", "1.0")],
            FactoryOptions::default(),
        );
        let preferred = find(&f, "pkg", &["pkg"], true);
        let first = preferred.iter().next().unwrap();
        assert!(first.is_installed());
        assert_eq!(versions(&preferred), vec!["1.0", "2.0"]);

        let upgrade = find(&f, "pkg", &["pkg"], false);
        let order: Vec<(String, bool)> = upgrade
            .iter()
            .map(|c| (c.version().to_string(), c.is_installed()))
            .collect();
        assert_eq!(order, vec![("2.0".to_string(), false), ("1.0".to_string(), true)]);

        let excluded = find(&f, "pkg", &["pkg>1.0"], true);
        assert!(excluded.iter().all(|c| !c.is_installed()));
    }

    #[test]
    fn yanked_only_for_exact_pins() {
        let mut yanked = PackageRecord::new("pkg", "2.0");
        yanked.yanked = true;
        let f = factory(vec![PackageRecord::new("pkg", "1.0"), yanked], &[], FactoryOptions::default());
        assert_eq!(versions(&find(&f, "pkg", &["pkg"], true)), vec!["1.0"]);
        assert_eq!(versions(&find(&f, "pkg", &["pkg==2.0"], true)), vec!["2.0"]);
    }

    #[test]
    fn requires_python_filters_entries() {
        let mut new = PackageRecord::new("pkg", "2.0");
        new.requires_python = Some(">=4".to_string());
        let f = factory(vec![PackageRecord::new("pkg", "1.0"), new.clone()], &[], FactoryOptions::default());
        assert_eq!(versions(&find(&f, "pkg", &["pkg"], true)), vec!["1.0"]);
        assert_eq!(f.available_versions(&PackageName::new("pkg").unwrap()).len(), 1);

        let options = FactoryOptions {
            ignore_requires_python: true,
            ..Default::default()
        };
        let f = factory(vec![PackageRecord::new("pkg", "1.0"), new], &[], options);
        assert_eq!(versions(&find(&f, "pkg", &["pkg"], true)), vec!["2.0", "1.0"]);
    }

    #[test]
    fn broken_artifacts_are_skipped_and_remembered() {
        let mut broken = PackageRecord::new("pkg", "2.0");
        broken.broken = true;
        let f = factory(vec![PackageRecord::new("pkg", "1.0"), broken], &[], FactoryOptions::default());
        assert_eq!(versions(&find(&f, "pkg", &["pkg"], true)), vec!["1.0"]);
        assert_eq!(f.cache().failure_count(), 1);
        assert_eq!(versions(&find(&f, "pkg", &["pkg"], true)), vec!["1.0"]);
        assert_eq!(f.cache().failure_count(), 1);
    }

    #[test]
    fn hash_options_prefer_matching_artifacts() {
        let mut a = PackageRecord::new("pkg", "1.0");
        a.sha256 = Some("aa".to_string());
        let mut b = PackageRecord::new("pkg", "2.0");
        b.sha256 = Some("bb".to_string());
        let f = factory(vec![a, b], &[], FactoryOptions::default());
        assert_eq!(versions(&find(&f, "pkg", &["pkg --hash=sha256:aa"], true)), vec!["1.0"]);
        assert_eq!(versions(&find(&f, "pkg", &["pkg --hash=sha256:cc"], true)), vec!["2.0", "1.0"]);
    }

    #[test]
    fn url_requirements_become_explicit() {
        let mut record = PackageRecord::new("pkg", "3.0");
        record.url = Some("https://files.example/pkg-3.0.tar.gz".to_string());
        record.listed = false;
        let f = factory(vec![record, PackageRecord::new("pkg", "1.0")], &[], FactoryOptions::default());

        let ireq = InstallRequirement::parse("pkg @ https://files.example/pkg-3.0.tar.gz").unwrap();
        let req = f.make_requirement_from_install_req(ireq, &[]).unwrap().unwrap();
        assert!(matches!(req.get_candidate_lookup(), CandidateLookup::Candidate(_)));

        let key = "pkg".to_string();
        let mut map = BTreeMap::new();
        map.insert(&key, vec![&req]);
        let matches = f.find_candidates("pkg", &map, HashSet::new(), &Constraint::empty(), true);
        assert_eq!(versions(&matches), vec!["3.0"]);

        let wrong = InstallRequirement::parse("other @ https://files.example/pkg-3.0.tar.gz").unwrap();
        assert!(f.make_requirement_from_install_req(wrong, &[]).is_err());
    }

    #[test]
    fn cached_link_candidates_still_check_identity() {
        let url = "https://files.example/pkg-3.0.tar.gz";
        let mut record = PackageRecord::new("pkg", "3.0");
        record.url = Some(url.to_string());
        record.listed = false;
        let f = factory(vec![record], &[], FactoryOptions::default());

        let link = Link::parse(url).unwrap();
        let template = InstallRequirement::parse(&format!("pkg @ {url}")).unwrap();
        let pkg = PackageName::new("pkg").unwrap();
        assert!(f.make_base_candidate_from_link(&link, &template, &pkg, None).is_ok());

        // The link is cached now; asking for it under another name must still fail.
        let other = PackageName::new("other").unwrap();
        let err = f.make_base_candidate_from_link(&link, &template, &other, None).unwrap_err();
        assert!(matches!(err, TarnError::Metadata { .. }));
        assert!(err.to_string().contains("instead of other"));

        let listed = Version::parse("2.0");
        let err = f
            .make_base_candidate_from_link(&link, &template, &pkg, Some(&listed))
            .unwrap_err();
        assert!(err.to_string().contains("instead of the listed 2.0"));

        // A mismatch for one caller does not poison the cache for the right one.
        let listed = Version::parse("3.0");
        let candidate = f.make_base_candidate_from_link(&link, &template, &pkg, Some(&listed)).unwrap();
        assert_eq!(candidate.version().to_string(), "3.0");
    }

    #[test]
    fn extras_identifier_inherits_base_pin() {
        let mut record = PackageRecord::new("pkg", "3.0");
        record.url = Some("https://files.example/pkg-3.0.tar.gz".to_string());
        record.provides_extras = vec!["fast".to_string()];
        record.listed = false;
        let f = factory(vec![record], &[], FactoryOptions::default());

        let ireq = InstallRequirement::parse("pkg @ https://files.example/pkg-3.0.tar.gz").unwrap();
        let base_req = f.make_requirement_from_install_req(ireq, &[]).unwrap().unwrap();
        let extra_req = Requirement::from_specifier(InstallRequirement::parse("pkg[fast]").unwrap());

        let base_key = "pkg".to_string();
        let extra_key = "pkg[fast]".to_string();
        let mut map = BTreeMap::new();
        map.insert(&base_key, vec![&base_req]);
        map.insert(&extra_key, vec![&extra_req]);
        let matches = f.find_candidates("pkg[fast]", &map, HashSet::new(), &Constraint::empty(), true);
        let found: Vec<Arc<Candidate>> = matches.iter().collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name(), "pkg[fast]");
        assert_eq!(found[0].version().to_string(), "3.0");
    }

    #[test]
    fn markers_drop_requirements() {
        let f = factory(vec![], &[], FactoryOptions::default());
        let ireq = InstallRequirement::parse("pywin32; sys_platform == 'win32'").unwrap();
        assert!(f.make_requirement_from_install_req(ireq, &[]).unwrap().is_none());
    }
}

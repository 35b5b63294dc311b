//! Generic backtracking resolver.
//!
//! The search keeps a stack of states. Each round picks the most preferred
//! unsatisfied identifier and pins its first candidate whose dependencies can
//! all be added without emptying some identifier's candidate set. When no
//! candidate works, the resolver backjumps to the most recent pin that
//! contributed to the conflict, marks that pin incompatible and retries from
//! the state before it.

use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

use indexmap::IndexMap;
use thiserror::Error;
use tracing::debug;

use crate::graph::{DependencyGraph, Vertex};
use crate::provider::{Matches, Provider, RequirementInformation};
use crate::reporter::Reporter;

type Req<P> = <P as Provider>::Requirement;
type Cand<P> = <P as Provider>::Candidate;
type Ident<P> = <P as Provider>::Identifier;

pub type Information<P> = RequirementInformation<Req<P>, Cand<P>>;
pub type CriterionFor<P> = Criterion<Req<P>, Cand<P>, <P as Provider>::Matches>;
pub type Criteria<P> = BTreeMap<Ident<P>, CriterionFor<P>>;
pub type ResolverError<P> = ResolutionError<Req<P>, Cand<P>, <P as Provider>::Error>;

#[derive(Debug, Error)]
pub enum ResolutionError<R, C, E> {
    /// No assignment satisfies every requirement. Carries the requirements
    /// (and the candidates that introduced them) involved in the last conflict.
    #[error("no set of candidates satisfies all requirements ({} conflicting)", .0.len())]
    Impossible(Vec<RequirementInformation<R, C>>),

    #[error("resolution did not finish within {0} rounds")]
    TooDeep(usize),

    /// The provider offered a candidate that fails its own requirements.
    #[error("provider returned a candidate that does not satisfy the requirements it was found for")]
    InconsistentCandidate { candidate: C, requirements: Vec<R> },

    #[error("{0}")]
    Provider(E),
}

/// Everything known about one identifier: remaining candidates, the
/// requirements on it, and candidates already ruled out.
pub struct Criterion<R, C, M> {
    candidates: Rc<M>,
    information: Vec<RequirementInformation<R, C>>,
    incompatibilities: Vec<C>,
}

impl<R: Clone, C: Clone, M> Clone for Criterion<R, C, M> {
    fn clone(&self) -> Self {
        Self {
            candidates: Rc::clone(&self.candidates),
            information: self.information.clone(),
            incompatibilities: self.incompatibilities.clone(),
        }
    }
}

impl<R, C, M> Criterion<R, C, M> {
    pub fn candidates(&self) -> &M {
        &self.candidates
    }

    pub fn information(&self) -> &[RequirementInformation<R, C>] {
        &self.information
    }

    pub fn incompatibilities(&self) -> &[C] {
        &self.incompatibilities
    }

    pub fn iter_requirement(&self) -> impl Iterator<Item = &R> {
        self.information.iter().map(|i| &i.requirement)
    }

    pub fn iter_parent(&self) -> impl Iterator<Item = Option<&C>> {
        self.information.iter().map(|i| i.parent.as_ref())
    }
}

struct State<P: Provider> {
    mapping: IndexMap<Ident<P>, Cand<P>>,
    criteria: Criteria<P>,
    backtrack_causes: Vec<Information<P>>,
}

impl<P: Provider> Clone for State<P> {
    fn clone(&self) -> Self {
        Self {
            mapping: self.mapping.clone(),
            criteria: self.criteria.clone(),
            backtrack_causes: self.backtrack_causes.clone(),
        }
    }
}

/// A successful resolution.
pub struct ResolutionResult<P: Provider> {
    /// Pinned candidate per identifier, in pin order. Only identifiers
    /// reachable from the root requirements are kept.
    pub mapping: IndexMap<Ident<P>, Cand<P>>,
    /// Who depends on whom, starting from [`Vertex::Root`].
    pub graph: DependencyGraph<Vertex<Ident<P>>>,
    pub criteria: Criteria<P>,
}

enum CriteriaError<P: Provider> {
    Conflicted(CriterionFor<P>),
    Provider(P::Error),
}

pub struct Resolver<'a, P: Provider> {
    provider: &'a P,
    reporter: &'a mut dyn Reporter<Req<P>, Cand<P>>,
}

impl<'a, P: Provider> Resolver<'a, P> {
    pub fn new(provider: &'a P, reporter: &'a mut dyn Reporter<Req<P>, Cand<P>>) -> Self {
        Self { provider, reporter }
    }

    /// Resolve `requirements` to one candidate per identifier, giving up
    /// after `max_rounds` pin attempts.
    pub fn resolve(
        &mut self,
        requirements: impl IntoIterator<Item = Req<P>>,
        max_rounds: usize,
    ) -> Result<ResolutionResult<P>, ResolverError<P>> {
        self.reporter.starting();

        let mut root = State::<P> {
            mapping: IndexMap::new(),
            criteria: BTreeMap::new(),
            backtrack_causes: Vec::new(),
        };
        for requirement in requirements {
            match self.add_to_criteria(&mut root.criteria, requirement, None) {
                Ok(()) => {}
                Err(CriteriaError::Conflicted(criterion)) => {
                    return Err(ResolutionError::Impossible(criterion.information))
                }
                Err(CriteriaError::Provider(e)) => return Err(ResolutionError::Provider(e)),
            }
        }

        // The root state stays at the bottom of the history so the first
        // pin has something to backtrack to.
        let mut history = vec![root.clone()];
        let mut state = root;

        for round in 0..max_rounds {
            self.reporter.starting_round(round);

            let unsatisfied: Vec<Ident<P>> = state
                .criteria
                .iter()
                .filter(|(name, criterion)| !self.is_current_pin_satisfying(&state, name, criterion))
                .map(|(name, _)| name.clone())
                .collect();

            let Some(name) = self.most_preferred(&state, unsatisfied.iter()) else {
                self.reporter.ending();
                debug!("resolution finished after {round} rounds");
                return Ok(self.build_result(state));
            };
            let satisfied: HashSet<Ident<P>> = state
                .criteria
                .keys()
                .filter(|k| !unsatisfied.contains(k))
                .cloned()
                .collect();

            let failures = self.attempt_to_pin_criterion(&mut state, &name)?;
            if failures.is_empty() {
                // Pins that this round's new requirements broke no longer
                // vouch for their dependencies.
                let newly_unsatisfied: HashSet<Ident<P>> = state
                    .criteria
                    .iter()
                    .filter(|(k, criterion)| {
                        satisfied.contains(*k) && !self.is_current_pin_satisfying(&state, k, criterion)
                    })
                    .map(|(k, _)| k.clone())
                    .collect();
                self.remove_information_from_criteria(&mut state.criteria, &newly_unsatisfied);
                history.push(state.clone());
            } else {
                let causes: Vec<Information<P>> =
                    failures.into_iter().flat_map(|c| c.information).collect();
                self.reporter.resolving_conflicts(&causes);
                let success = self.backjump(&mut history, &mut state, &causes)?;
                state.backtrack_causes = causes;
                if !success {
                    return Err(ResolutionError::Impossible(state.backtrack_causes));
                }
            }

            self.reporter.ending_round(round);
        }

        Err(ResolutionError::TooDeep(max_rounds))
    }

    fn most_preferred<'n>(
        &self,
        state: &State<P>,
        names: impl Iterator<Item = &'n Ident<P>>,
    ) -> Option<Ident<P>>
    where
        Ident<P>: 'n,
    {
        let candidates: BTreeMap<&Ident<P>, &P::Matches> = state
            .criteria
            .iter()
            .map(|(k, c)| (k, c.candidates()))
            .collect();
        let information: BTreeMap<&Ident<P>, &[Information<P>]> = state
            .criteria
            .iter()
            .map(|(k, c)| (k, c.information()))
            .collect();
        names
            .map(|name| {
                let preference = self.provider.get_preference(
                    name,
                    &state.mapping,
                    &candidates,
                    &information,
                    &state.backtrack_causes,
                );
                (preference, name)
            })
            .min()
            .map(|(_, name)| name.clone())
    }

    fn is_current_pin_satisfying(&self, state: &State<P>, name: &Ident<P>, criterion: &CriterionFor<P>) -> bool {
        state.mapping.get(name).is_some_and(|pin| {
            criterion
                .iter_requirement()
                .all(|r| self.provider.is_satisfied_by(r, pin))
        })
    }

    fn add_to_criteria(
        &mut self,
        criteria: &mut Criteria<P>,
        requirement: Req<P>,
        parent: Option<Cand<P>>,
    ) -> Result<(), CriteriaError<P>> {
        self.reporter.adding_requirement(&requirement, parent.as_ref());
        let identifier = self.provider.identify_requirement(&requirement);

        let existing = criteria.get(&identifier);
        let incompatibilities: Vec<Cand<P>> = existing
            .map(|c| c.incompatibilities.clone())
            .unwrap_or_default();
        let matches = {
            let requirements = requirement_map::<P>(criteria, Some((&identifier, &requirement)));
            let incompat = incompatibility_map::<P>(criteria, None);
            self.provider
                .find_matches(&identifier, &requirements, &incompat)
                .map_err(CriteriaError::Provider)?
        };
        let mut information = existing.map(|c| c.information.clone()).unwrap_or_default();
        information.push(RequirementInformation { requirement, parent });

        let criterion = Criterion {
            candidates: Rc::new(matches),
            information,
            incompatibilities,
        };
        if criterion.candidates.is_empty() {
            return Err(CriteriaError::Conflicted(criterion));
        }
        criteria.insert(identifier, criterion);
        Ok(())
    }

    fn remove_information_from_criteria(&self, criteria: &mut Criteria<P>, parents: &HashSet<Ident<P>>) {
        if parents.is_empty() {
            return;
        }
        for criterion in criteria.values_mut() {
            criterion.information.retain(|info| {
                info.parent
                    .as_ref()
                    .map_or(true, |p| !parents.contains(&self.provider.identify_candidate(p)))
            });
        }
    }

    /// Try the candidates of `name` in order. Returns the criteria that
    /// conflicted, one per rejected candidate; empty means a pin was made.
    fn attempt_to_pin_criterion(
        &mut self,
        state: &mut State<P>,
        name: &Ident<P>,
    ) -> Result<Vec<CriterionFor<P>>, ResolverError<P>> {
        let Some(criterion) = state.criteria.get(name).cloned() else {
            return Ok(Vec::new());
        };
        let mut causes = Vec::new();

        for candidate in criterion.candidates().iter_candidates() {
            let mut criteria = state.criteria.clone();
            let dependencies = self
                .provider
                .get_dependencies(&candidate)
                .map_err(ResolutionError::Provider)?;

            let mut conflict = None;
            for requirement in dependencies {
                match self.add_to_criteria(&mut criteria, requirement, Some(candidate.clone())) {
                    Ok(()) => {}
                    Err(CriteriaError::Conflicted(c)) => {
                        conflict = Some(c);
                        break;
                    }
                    Err(CriteriaError::Provider(e)) => return Err(ResolutionError::Provider(e)),
                }
            }
            if let Some(conflict) = conflict {
                self.reporter.rejecting_candidate(conflict.information(), &candidate);
                causes.push(conflict);
                continue;
            }

            let satisfied = criterion
                .iter_requirement()
                .all(|r| self.provider.is_satisfied_by(r, &candidate));
            if !satisfied {
                return Err(ResolutionError::InconsistentCandidate {
                    candidate,
                    requirements: criterion.iter_requirement().cloned().collect(),
                });
            }

            self.reporter.pinning(&candidate);
            state.criteria = criteria;
            state.mapping.shift_remove(name);
            state.mapping.insert(name.clone(), candidate);
            return Ok(Vec::new());
        }

        Ok(causes)
    }

    /// Unwind to the most recent state whose pin introduced one of the
    /// conflicting identifiers, mark that pin incompatible, and continue from
    /// the state before it. Returns `false` when there is nothing left to try.
    fn backjump(
        &mut self,
        history: &mut Vec<State<P>>,
        state: &mut State<P>,
        causes: &[Information<P>],
    ) -> Result<bool, ResolverError<P>> {
        let incompatible_deps: HashSet<Ident<P>> = causes
            .iter()
            .filter_map(|c| c.parent.as_ref())
            .map(|p| self.provider.identify_candidate(p))
            .chain(causes.iter().map(|c| self.provider.identify_requirement(&c.requirement)))
            .collect();

        while history.len() >= 2 {
            let (broken_state, name, candidate) = loop {
                let impossible = || ResolutionError::Impossible(causes.to_vec());
                let mut broken = history.pop().ok_or_else(impossible)?;
                let (name, candidate) = broken.mapping.pop().ok_or_else(impossible)?;
                let dependencies = self
                    .provider
                    .get_dependencies(&candidate)
                    .map_err(ResolutionError::Provider)?;
                let introduced_conflict = dependencies
                    .iter()
                    .any(|d| incompatible_deps.contains(&self.provider.identify_requirement(d)));
                if introduced_conflict {
                    break (broken, name, candidate);
                }
            };
            debug!("backjumping past {name}");

            let mut incompatibilities_from_broken: Vec<(Ident<P>, Vec<Cand<P>>)> = broken_state
                .criteria
                .iter()
                .map(|(k, v)| (k.clone(), v.incompatibilities.clone()))
                .collect();
            incompatibilities_from_broken.push((name, vec![candidate]));

            let Some(base) = history.last() else {
                return Err(ResolutionError::Impossible(causes.to_vec()));
            };
            *state = base.clone();
            if self.patch_criteria(state, incompatibilities_from_broken)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn patch_criteria(
        &mut self,
        state: &mut State<P>,
        incompatibilities_from_broken: Vec<(Ident<P>, Vec<Cand<P>>)>,
    ) -> Result<bool, ResolverError<P>> {
        for (k, mut incompatibilities) in incompatibilities_from_broken {
            if incompatibilities.is_empty() {
                continue;
            }
            let Some(criterion) = state.criteria.get(&k) else {
                continue;
            };
            let information = criterion.information.clone();
            let known = criterion.incompatibilities.clone();
            let matches = {
                let requirements = requirement_map::<P>(&state.criteria, None);
                let incompat = incompatibility_map::<P>(&state.criteria, Some((&k, &incompatibilities)));
                self.provider
                    .find_matches(&k, &requirements, &incompat)
                    .map_err(ResolutionError::Provider)?
            };
            if matches.is_empty() {
                return Ok(false);
            }
            incompatibilities.extend(known);
            state.criteria.insert(
                k,
                Criterion {
                    candidates: Rc::new(matches),
                    information,
                    incompatibilities,
                },
            );
        }
        Ok(true)
    }

    /// The pinned identifier of `candidate`, if it is the candidate pinned.
    fn pinned_key(&self, state: &State<P>, candidate: &Cand<P>) -> Option<Ident<P>> {
        let key = self.provider.identify_candidate(candidate);
        (state.mapping.get(&key) == Some(candidate)).then_some(key)
    }

    fn has_route_to_root(
        &self,
        state: &State<P>,
        key: &Ident<P>,
        connected: &mut HashSet<Ident<P>>,
        visiting: &mut HashSet<Ident<P>>,
    ) -> bool {
        if connected.contains(key) {
            return true;
        }
        let Some(criterion) = state.criteria.get(key) else {
            return false;
        };
        if !visiting.insert(key.clone()) {
            return false;
        }
        for parent in criterion.iter_parent() {
            let routed = match parent {
                None => true,
                Some(parent) => match self.pinned_key(state, parent) {
                    Some(pkey) => self.has_route_to_root(state, &pkey, connected, visiting),
                    None => false,
                },
            };
            if routed {
                connected.insert(key.clone());
                return true;
            }
        }
        false
    }

    fn build_result(&self, state: State<P>) -> ResolutionResult<P> {
        let mut graph = DependencyGraph::new();
        let root = graph.add_node(Vertex::Root);
        graph.set_root(root);

        let mut connected = HashSet::new();
        for (key, criterion) in &state.criteria {
            if !self.has_route_to_root(&state, key, &mut connected, &mut HashSet::new()) {
                continue;
            }
            let child = graph.add_node(Vertex::Package(key.clone()));
            for parent in criterion.iter_parent() {
                let from = match parent {
                    None => root,
                    Some(parent) => match self.pinned_key(&state, parent) {
                        Some(pkey) => graph.add_node(Vertex::Package(pkey)),
                        None => continue,
                    },
                };
                graph.add_edge(from, child);
            }
        }

        let mapping = state
            .mapping
            .into_iter()
            .filter(|(k, _)| connected.contains(k))
            .collect();
        ResolutionResult {
            mapping,
            graph,
            criteria: state.criteria,
        }
    }
}

/// Requirements per identifier, with `extra` appended to its identifier's list.
fn requirement_map<'c, P: Provider>(
    criteria: &'c Criteria<P>,
    extra: Option<(&'c Ident<P>, &'c Req<P>)>,
) -> BTreeMap<&'c Ident<P>, Vec<&'c Req<P>>> {
    let mut map: BTreeMap<&Ident<P>, Vec<&Req<P>>> = criteria
        .iter()
        .map(|(k, c)| (k, c.iter_requirement().collect()))
        .collect();
    if let Some((k, r)) = extra {
        map.entry(k).or_default().push(r);
    }
    map
}

/// Known incompatibilities per identifier, with `extra` appended.
fn incompatibility_map<'c, P: Provider>(
    criteria: &'c Criteria<P>,
    extra: Option<(&'c Ident<P>, &'c Vec<Cand<P>>)>,
) -> BTreeMap<&'c Ident<P>, Vec<&'c Cand<P>>> {
    let mut map: BTreeMap<&Ident<P>, Vec<&Cand<P>>> = criteria
        .iter()
        .map(|(k, c)| (k, c.incompatibilities.iter().collect()))
        .collect();
    if let Some((k, candidates)) = extra {
        map.entry(k).or_default().extend(candidates.iter());
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::NoOpReporter;

    #[derive(Debug, Clone, PartialEq)]
    struct Req {
        name: &'static str,
        lo: u32,
        hi: u32,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Cand {
        name: &'static str,
        version: u32,
    }

    fn req(name: &'static str, lo: u32, hi: u32) -> Req {
        Req { name, lo, hi }
    }

    /// name -> [(version, dependencies)]
    struct ToyProvider {
        index: BTreeMap<&'static str, Vec<(u32, Vec<Req>)>>,
    }

    impl ToyProvider {
        fn new(packages: &[(&'static str, u32, Vec<Req>)]) -> Self {
            let mut index: BTreeMap<&'static str, Vec<(u32, Vec<Req>)>> = BTreeMap::new();
            for (name, version, deps) in packages {
                index.entry(*name).or_default().push((*version, deps.clone()));
            }
            Self { index }
        }
    }

    impl Provider for ToyProvider {
        type Requirement = Req;
        type Candidate = Cand;
        type Identifier = &'static str;
        type Preference = usize;
        type Matches = Vec<Cand>;
        type Error = String;

        fn identify_requirement(&self, requirement: &Req) -> &'static str {
            requirement.name
        }

        fn identify_candidate(&self, candidate: &Cand) -> &'static str {
            candidate.name
        }

        fn get_preference(
            &self,
            _identifier: &&'static str,
            _resolutions: &IndexMap<&'static str, Cand>,
            _candidates: &BTreeMap<&&'static str, &Vec<Cand>>,
            _information: &BTreeMap<&&'static str, &[RequirementInformation<Req, Cand>]>,
            _backtrack_causes: &[RequirementInformation<Req, Cand>],
        ) -> usize {
            0
        }

        fn find_matches(
            &self,
            identifier: &&'static str,
            requirements: &BTreeMap<&&'static str, Vec<&Req>>,
            incompatibilities: &BTreeMap<&&'static str, Vec<&Cand>>,
        ) -> Result<Vec<Cand>, String> {
            let reqs = requirements.get(identifier).cloned().unwrap_or_default();
            let bad = incompatibilities.get(identifier).cloned().unwrap_or_default();
            let mut found: Vec<Cand> = self
                .index
                .get(*identifier)
                .map(Vec::as_slice)
                .unwrap_or(&[])
                .iter()
                .map(|(version, _)| Cand {
                    name: *identifier,
                    version: *version,
                })
                .filter(|c| reqs.iter().all(|r| self.is_satisfied_by(r, c)))
                .filter(|c| !bad.contains(&c))
                .collect();
            found.sort_by(|a, b| b.version.cmp(&a.version));
            Ok(found)
        }

        fn is_satisfied_by(&self, requirement: &Req, candidate: &Cand) -> bool {
            requirement.name == candidate.name && (requirement.lo..requirement.hi).contains(&candidate.version)
        }

        fn get_dependencies(&self, candidate: &Cand) -> Result<Vec<Req>, String> {
            self.index
                .get(candidate.name)
                .and_then(|versions| versions.iter().find(|(v, _)| *v == candidate.version))
                .map(|(_, deps)| deps.clone())
                .ok_or_else(|| format!("unknown candidate {candidate:?}"))
        }
    }

    fn resolve(provider: &ToyProvider, roots: Vec<Req>, max_rounds: usize) -> Result<Vec<(&'static str, u32)>, ResolverError<ToyProvider>> {
        let mut reporter = NoOpReporter;
        let mut resolver = Resolver::new(provider, &mut reporter);
        let result = resolver.resolve(roots, max_rounds)?;
        let mut pins: Vec<_> = result.mapping.values().map(|c| (c.name, c.version)).collect();
        pins.sort();
        Ok(pins)
    }

    #[test]
    fn picks_newest_compatible_versions() {
        let provider = ToyProvider::new(&[
            ("a", 1, vec![req("b", 1, 10)]),
            ("a", 2, vec![req("b", 2, 10)]),
            ("b", 1, vec![]),
            ("b", 3, vec![]),
        ]);
        let pins = resolve(&provider, vec![req("a", 0, 10)], 100).unwrap();
        assert_eq!(pins, vec![("a", 2), ("b", 3)]);
    }

    #[test]
    fn backtracks_to_older_version() {
        let provider = ToyProvider::new(&[
            ("a", 2, vec![req("b", 2, 3)]),
            ("a", 1, vec![req("b", 1, 2)]),
            ("b", 2, vec![req("c", 2, 3)]),
            ("b", 1, vec![]),
            ("c", 1, vec![]),
        ]);
        let pins = resolve(&provider, vec![req("a", 0, 10)], 100).unwrap();
        assert_eq!(pins, vec![("a", 1), ("b", 1)]);
    }

    #[test]
    fn conflicting_roots_are_impossible() {
        let provider = ToyProvider::new(&[("c", 1, vec![])]);
        let err = resolve(&provider, vec![req("c", 5, 6)], 100).unwrap_err();
        match err {
            ResolutionError::Impossible(causes) => {
                assert_eq!(causes.len(), 1);
                assert!(causes[0].parent.is_none());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn exhausted_backtracking_reports_causes() {
        let provider = ToyProvider::new(&[
            ("a", 1, vec![req("b", 2, 3)]),
            ("b", 1, vec![]),
        ]);
        let err = resolve(&provider, vec![req("a", 0, 10)], 100).unwrap_err();
        match err {
            ResolutionError::Impossible(causes) => {
                assert_eq!(causes[0].requirement.name, "b");
                assert_eq!(causes[0].parent.as_ref().map(|p| p.name), Some("a"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn too_many_rounds() {
        let provider = ToyProvider::new(&[("a", 1, vec![req("b", 0, 10)]), ("b", 1, vec![])]);
        let err = resolve(&provider, vec![req("a", 0, 10)], 1).unwrap_err();
        assert!(matches!(err, ResolutionError::TooDeep(1)));
    }

    #[test]
    fn graph_links_root_to_pins() {
        let provider = ToyProvider::new(&[("a", 1, vec![req("b", 0, 10)]), ("b", 1, vec![])]);
        let mut reporter = NoOpReporter;
        let mut resolver = Resolver::new(&provider, &mut reporter);
        let result = resolver.resolve(vec![req("a", 0, 10)], 100).unwrap();
        let path = result.graph.find_path("b").unwrap();
        let keys: Vec<String> = path.iter().map(|v| v.to_string()).collect();
        assert_eq!(keys, vec!["<root>", "a", "b"]);
        assert_eq!(result.criteria.len(), 2);
    }

    #[test]
    fn resolution_is_deterministic() {
        let provider = ToyProvider::new(&[
            ("a", 1, vec![req("c", 1, 3)]),
            ("b", 1, vec![req("c", 2, 4)]),
            ("c", 1, vec![]),
            ("c", 2, vec![]),
            ("c", 3, vec![]),
        ]);
        let first = resolve(&provider, vec![req("a", 0, 9), req("b", 0, 9)], 100).unwrap();
        for _ in 0..5 {
            assert_eq!(resolve(&provider, vec![req("a", 0, 9), req("b", 0, 9)], 100).unwrap(), first);
        }
        assert_eq!(first, vec![("a", 1), ("b", 1), ("c", 2)]);
    }
}

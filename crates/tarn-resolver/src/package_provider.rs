//! The [`Provider`] the resolver runs against for real packages.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;
use std::sync::Arc;

use indexmap::IndexMap;
use tarn_core::config::UpgradeStrategy;
use tarn_core::name::{parse_identifier, ExtraName};
use tarn_util::errors::TarnError;

use crate::candidates::{Candidate, Dependency};
use crate::constraint::Constraint;
use crate::factory::{CandidateMatches, Factory};
use crate::provider::{Provider, RequirementInformation};
use crate::requirements::{CandidateLookup, Requirement};

type Information = RequirementInformation<Requirement, Arc<Candidate>>;

/// Sort key returned by [`PackageProvider::get_preference`]; smaller sorts
/// first. Fields compare in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Preference {
    /// Explicit (URL or path) requirements go first: they have one candidate.
    not_direct: bool,
    /// Then exact pins (`==`, `===`).
    not_pinned: bool,
    /// Then whatever the last conflict was about.
    not_backtrack_cause: bool,
    /// Shortest distance from a user requirement.
    depth: usize,
    /// Order the user listed requirements in.
    requested_order: usize,
    /// Names with some specifier before completely free ones.
    free: bool,
    identifier: String,
}

pub struct PackageProvider {
    factory: Rc<Factory>,
    /// Keyed by bare package name.
    constraints: HashMap<String, Constraint>,
    ignore_dependencies: bool,
    upgrade_strategy: UpgradeStrategy,
    /// Identifier to the position the user requested it at.
    user_requested: HashMap<String, usize>,
}

impl PackageProvider {
    pub fn new(
        factory: Rc<Factory>,
        constraints: HashMap<String, Constraint>,
        ignore_dependencies: bool,
        upgrade_strategy: UpgradeStrategy,
        user_requested: HashMap<String, usize>,
    ) -> Self {
        Self {
            factory,
            constraints,
            ignore_dependencies,
            upgrade_strategy,
            user_requested,
        }
    }

    pub fn factory(&self) -> &Rc<Factory> {
        &self.factory
    }

    /// Look `identifier` up in `map`, falling back to its bare name.
    fn get_with_identifier<'m, V>(map: &'m HashMap<String, V>, identifier: &str) -> Option<&'m V> {
        map.get(identifier).or_else(|| {
            let (name, _) = parse_identifier(identifier)?;
            map.get(name.as_str())
        })
    }

    /// Whether a newer version may replace an installed one.
    fn eligible_for_upgrade(&self, identifier: &str) -> bool {
        match self.upgrade_strategy {
            UpgradeStrategy::Eager => true,
            UpgradeStrategy::OnlyIfNeeded => {
                Self::get_with_identifier(&self.user_requested, identifier).is_some()
            }
            UpgradeStrategy::ToSatisfyOnly => false,
        }
    }

    /// Shortest parent chain from `identifier` back to a user requirement,
    /// walked through `information`. User-requested identifiers sit at depth
    /// one. Chains that loop or lead nowhere count as infinitely deep.
    fn depth(
        &self,
        identifier: &String,
        information: &BTreeMap<&String, &[Information]>,
        visiting: &mut HashSet<String>,
    ) -> usize {
        if Self::get_with_identifier(&self.user_requested, identifier).is_some() {
            return 1;
        }
        if !visiting.insert(identifier.clone()) {
            return usize::MAX;
        }
        let infos: &[Information] = information.get(identifier).copied().unwrap_or(&[]);
        let depth = infos
            .iter()
            .map(|info| match &info.parent {
                None => 0,
                Some(parent) => self.depth(&parent.name(), information, visiting),
            })
            .min()
            .map_or(usize::MAX, |d| d.saturating_add(1));
        visiting.remove(identifier);
        depth
    }

    fn is_backtrack_cause(identifier: &str, causes: &[Information]) -> bool {
        causes.iter().any(|cause| {
            cause.requirement.name() == identifier
                || cause.parent.as_ref().is_some_and(|p| p.name() == identifier)
        })
    }
}

impl Provider for PackageProvider {
    type Requirement = Requirement;
    type Candidate = Arc<Candidate>;
    type Identifier = String;
    type Preference = Preference;
    type Matches = CandidateMatches;
    type Error = TarnError;

    fn identify_requirement(&self, requirement: &Requirement) -> String {
        requirement.name()
    }

    fn identify_candidate(&self, candidate: &Arc<Candidate>) -> String {
        candidate.name()
    }

    fn get_preference(
        &self,
        identifier: &String,
        _resolutions: &IndexMap<String, Arc<Candidate>>,
        _candidates: &BTreeMap<&String, &CandidateMatches>,
        information: &BTreeMap<&String, &[Information]>,
        backtrack_causes: &[Information],
    ) -> Preference {
        let infos: &[Information] = information.get(identifier).copied().unwrap_or(&[]);

        let mut direct = false;
        let mut operators = Vec::new();
        for info in infos {
            match info.requirement.get_candidate_lookup() {
                CandidateLookup::Candidate(_) => direct = true,
                CandidateLookup::Deferred(ireq) => {
                    operators.extend(ireq.specifier.iter().map(|s| s.operator()));
                }
            }
        }
        let pinned = operators.iter().any(|op| op.as_str().starts_with("=="));

        let requested_order = Self::get_with_identifier(&self.user_requested, identifier).copied();
        let depth = self.depth(identifier, information, &mut HashSet::new());

        Preference {
            not_direct: !direct,
            not_pinned: !pinned,
            not_backtrack_cause: !Self::is_backtrack_cause(identifier, backtrack_causes),
            depth,
            requested_order: requested_order.unwrap_or(usize::MAX),
            free: operators.is_empty(),
            identifier: identifier.clone(),
        }
    }

    fn find_matches(
        &self,
        identifier: &String,
        requirements: &BTreeMap<&String, Vec<&Requirement>>,
        incompatibilities: &BTreeMap<&String, Vec<&Arc<Candidate>>>,
    ) -> Result<CandidateMatches, TarnError> {
        let empty = Constraint::empty();
        let constraint = Self::get_with_identifier(&self.constraints, identifier).unwrap_or(&empty);
        let incompatible_ids: HashSet<_> = incompatibilities
            .get(identifier)
            .map(|cs| cs.iter().map(|c| c.id()).collect())
            .unwrap_or_default();
        Ok(self.factory.find_candidates(
            identifier,
            requirements,
            incompatible_ids,
            constraint,
            !self.eligible_for_upgrade(identifier),
        ))
    }

    fn is_satisfied_by(&self, requirement: &Requirement, candidate: &Arc<Candidate>) -> bool {
        requirement.is_satisfied_by(candidate)
    }

    fn get_dependencies(&self, candidate: &Arc<Candidate>) -> Result<Vec<Requirement>, TarnError> {
        let extras: Vec<ExtraName> = candidate.extras().into_iter().collect();
        let mut requirements = Vec::new();
        for dependency in candidate
            .iter_dependencies(!self.ignore_dependencies, self.factory.environment())
            .flatten()
        {
            match dependency {
                Dependency::Base(base) => requirements.push(Requirement::explicit(base)),
                Dependency::Requirement(ireq) => {
                    if let Some(req) = self.factory.make_requirement_from_install_req(ireq, &extras)? {
                        requirements.push(req);
                    }
                }
            }
        }
        Ok(requirements)
    }
}

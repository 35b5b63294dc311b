//! The contract between the backtracking resolver and whatever supplies
//! requirements and candidates.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::Hash;

use indexmap::IndexMap;

/// A requirement together with the candidate that brought it in (`None`
/// for a root requirement).
#[derive(Debug, Clone)]
pub struct RequirementInformation<R, C> {
    pub requirement: R,
    pub parent: Option<C>,
}

/// A candidate sequence returned by [`Provider::find_matches`]. It may be
/// iterated more than once, and each pass yields the same candidates in the
/// same order.
pub trait Matches<C> {
    fn iter_candidates(&self) -> Box<dyn Iterator<Item = C> + '_>;
    fn is_empty(&self) -> bool;
}

impl<C: Clone> Matches<C> for Vec<C> {
    fn iter_candidates(&self) -> Box<dyn Iterator<Item = C> + '_> {
        Box::new(self.as_slice().iter().cloned())
    }

    fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}

/// Everything the resolver needs to know about the problem domain.
///
/// Implementations must be deterministic: the same arguments give the same
/// answers, so that a resolve over a fixed index and a fixed environment
/// always picks the same candidates.
pub trait Provider {
    type Requirement: Clone + fmt::Debug;
    type Candidate: Clone + PartialEq + fmt::Debug;
    type Identifier: Clone + Eq + Hash + Ord + fmt::Display + fmt::Debug;
    /// Lower sorts first: the identifier with the smallest preference is
    /// pinned next.
    type Preference: Ord;
    type Matches: Matches<Self::Candidate>;
    type Error: fmt::Debug + fmt::Display;

    /// Depends only on identity (name and extras), never on versions.
    fn identify_requirement(&self, requirement: &Self::Requirement) -> Self::Identifier;

    fn identify_candidate(&self, candidate: &Self::Candidate) -> Self::Identifier;

    fn get_preference(
        &self,
        identifier: &Self::Identifier,
        resolutions: &IndexMap<Self::Identifier, Self::Candidate>,
        candidates: &BTreeMap<&Self::Identifier, &Self::Matches>,
        information: &BTreeMap<&Self::Identifier, &[RequirementInformation<Self::Requirement, Self::Candidate>]>,
        backtrack_causes: &[RequirementInformation<Self::Requirement, Self::Candidate>],
    ) -> Self::Preference;

    /// Candidates for `identifier` satisfying every entry of
    /// `requirements[identifier]`, excluding every candidate in
    /// `incompatibilities[identifier]`, most preferred first.
    fn find_matches(
        &self,
        identifier: &Self::Identifier,
        requirements: &BTreeMap<&Self::Identifier, Vec<&Self::Requirement>>,
        incompatibilities: &BTreeMap<&Self::Identifier, Vec<&Self::Candidate>>,
    ) -> Result<Self::Matches, Self::Error>;

    /// `candidate` always comes from `find_matches` for the same identifier.
    fn is_satisfied_by(&self, requirement: &Self::Requirement, candidate: &Self::Candidate) -> bool;

    fn get_dependencies(&self, candidate: &Self::Candidate) -> Result<Vec<Self::Requirement>, Self::Error>;
}

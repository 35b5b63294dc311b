//! Hooks into the resolver's progress.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::candidates::Candidate;
use crate::provider::RequirementInformation;
use crate::requirements::Requirement;

/// Receives resolver lifecycle events. Every method defaults to doing nothing.
pub trait Reporter<R, C> {
    fn starting(&mut self) {}

    fn starting_round(&mut self, _index: usize) {}

    fn ending_round(&mut self, _index: usize) {}

    fn ending(&mut self) {}

    fn adding_requirement(&mut self, _requirement: &R, _parent: Option<&C>) {}

    /// Pinning failed and the resolver is about to backtrack.
    fn resolving_conflicts(&mut self, _causes: &[RequirementInformation<R, C>]) {}

    fn rejecting_candidate(&mut self, _causes: &[RequirementInformation<R, C>], _candidate: &C) {}

    fn pinning(&mut self, _candidate: &C) {}
}

#[derive(Debug, Default)]
pub struct NoOpReporter;

impl<R, C> Reporter<R, C> for NoOpReporter {}

/// Logs resolver progress, and tells the user when backtracking on one
/// package starts to take a while.
#[derive(Debug, Default)]
pub struct TracingReporter {
    reject_count: HashMap<String, usize>,
}

impl TracingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many candidates of `name` have been rejected so far.
    pub fn rejections(&self, name: &str) -> usize {
        self.reject_count.get(name).copied().unwrap_or(0)
    }
}

impl Reporter<Requirement, Arc<Candidate>> for TracingReporter {
    fn starting_round(&mut self, index: usize) {
        debug!("resolution round {index}");
    }

    fn adding_requirement(&mut self, requirement: &Requirement, parent: Option<&Arc<Candidate>>) {
        match parent {
            Some(parent) => debug!("adding requirement {requirement} (from {parent})"),
            None => debug!("adding requirement {requirement}"),
        }
    }

    fn resolving_conflicts(&mut self, causes: &[RequirementInformation<Requirement, Arc<Candidate>>]) {
        let causes: Vec<String> = causes.iter().map(|c| c.requirement.to_string()).collect();
        debug!("backtracking due to conflicts: {}", causes.join(", "));
    }

    fn rejecting_candidate(
        &mut self,
        causes: &[RequirementInformation<Requirement, Arc<Candidate>>],
        candidate: &Arc<Candidate>,
    ) {
        let name = candidate.name();
        let count = self.reject_count.entry(name.clone()).or_default();
        *count += 1;
        match *count {
            1 => info!(
                "tarn is looking at multiple versions of {name} to determine which version is \
                 compatible with other requirements. This could take a while."
            ),
            8 => info!(
                "tarn is still looking at multiple versions of {name} to determine which version \
                 is compatible with other requirements. This could take a while."
            ),
            13 => info!(
                "This is taking longer than usual. You might need to provide the dependency \
                 resolver with stricter constraints to reduce runtime."
            ),
            _ => {}
        }
        for cause in causes {
            match &cause.parent {
                Some(parent) => debug!(
                    "rejecting {}: {parent} depends on {}",
                    candidate.format_for_error(),
                    cause.requirement
                ),
                None => debug!(
                    "rejecting {}: the user requested {}",
                    candidate.format_for_error(),
                    cause.requirement
                ),
            }
        }
    }

    fn pinning(&mut self, candidate: &Arc<Candidate>) {
        debug!("pinning {candidate}");
    }
}

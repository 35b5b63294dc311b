//! Human-readable explanations of resolution failures.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use tarn_core::name::PackageName;
use tarn_core::version::Version;

use crate::candidates::Candidate;
use crate::constraint::Constraint;
use crate::provider::RequirementInformation;
use crate::requirements::Requirement;

/// One requirement that took part in a conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictCause {
    /// `name version` of the candidate that declared the requirement;
    /// `None` for a requirement the user gave directly.
    pub parent: Option<String>,
    pub requirement: String,
}

impl fmt::Display for ConflictCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.parent {
            Some(parent) => write!(f, "{parent} depends on {}", self.requirement),
            None => write!(f, "The user requested {}", self.requirement),
        }
    }
}

/// Why a resolution failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictReport {
    /// A single requirement that nothing in the index satisfies.
    NoMatchingDistribution {
        requirement: String,
        parent: Option<String>,
        versions: Vec<Version>,
    },
    /// Requirements that cannot all hold at once.
    Conflicting {
        triggers: Vec<String>,
        causes: Vec<ConflictCause>,
        /// `name<specifier>` of each user constraint on a conflicting name.
        constraints: Vec<String>,
    },
}

impl ConflictReport {
    /// Explain the causes of an impossible resolution. `versions` lists what
    /// the index has for a package, for the single-requirement case.
    pub fn from_causes(
        causes: &[RequirementInformation<Requirement, Arc<Candidate>>],
        constraints: &HashMap<String, Constraint>,
        versions: impl Fn(&PackageName) -> Vec<Version>,
    ) -> Self {
        if let [cause] = causes {
            let requirement = &cause.requirement;
            if !constraints.contains_key(requirement.project_name().as_str()) {
                return Self::NoMatchingDistribution {
                    requirement: requirement.format_for_error(),
                    parent: cause.parent.as_ref().map(|p| p.name()),
                    versions: versions(requirement.project_name()),
                };
            }
        }

        let triggers: BTreeSet<String> = causes
            .iter()
            .map(|cause| match &cause.parent {
                None => cause.requirement.format_for_error(),
                Some(parent) => format!("{}=={}", parent.name(), parent.version()),
            })
            .collect();

        let mut relevant = BTreeSet::new();
        let causes = causes
            .iter()
            .map(|cause| {
                let name = cause.requirement.project_name().as_str().to_string();
                if let Some(constraint) = constraints.get(&name) {
                    relevant.insert(format!("{name}{}", constraint.specifier));
                }
                ConflictCause {
                    parent: cause
                        .parent
                        .as_ref()
                        .map(|p| format!("{} {}", p.name(), p.version())),
                    requirement: cause.requirement.format_for_error(),
                }
            })
            .collect();

        Self::Conflicting {
            triggers: triggers.into_iter().collect(),
            causes,
            constraints: relevant.into_iter().collect(),
        }
    }
}

/// `a`, `a and b`, `a, b and c`.
fn text_join(parts: &[String]) -> String {
    match parts {
        [] => "the requested packages".to_string(),
        [one] => one.clone(),
        [init @ .., last] => format!("{} and {last}", init.join(", ")),
    }
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMatchingDistribution {
                requirement,
                parent,
                versions,
            } => {
                let shown = match parent {
                    Some(parent) => format!("{requirement} (from {parent})"),
                    None => requirement.clone(),
                };
                let versions: Vec<String> = versions.iter().map(Version::to_string).collect();
                let versions = if versions.is_empty() {
                    "none".to_string()
                } else {
                    versions.join(", ")
                };
                writeln!(
                    f,
                    "Could not find a version that satisfies the requirement {shown} (from versions: {versions})"
                )?;
                write!(f, "No matching distribution found for {requirement}")
            }
            Self::Conflicting {
                triggers,
                causes,
                constraints,
            } => {
                writeln!(
                    f,
                    "Cannot install {} because these package versions have conflicting dependencies.",
                    text_join(triggers)
                )?;
                writeln!(f)?;
                writeln!(f, "The conflict is caused by:")?;
                for cause in causes {
                    writeln!(f, "    {cause}")?;
                }
                for constraint in constraints {
                    writeln!(f, "    The user requested (constraint) {constraint}")?;
                }
                writeln!(f)?;
                writeln!(f, "To fix this you could try to:")?;
                writeln!(f, "1. loosen the range of package versions you've specified")?;
                write!(
                    f,
                    "2. remove package versions to allow tarn to attempt to solve the dependency conflict"
                )
            }
        }
    }
}

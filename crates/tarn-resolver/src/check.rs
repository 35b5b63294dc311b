//! Consistency checks over a set of installed packages.
//!
//! The checker never touches the registry: it works on a [`PackageSet`]
//! snapshot, rebuilt on every call.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use tarn_core::installed::{InstalledDist, InstalledRegistry};
use tarn_core::marker::MarkerEnvironment;
use tarn_core::name::PackageName;
use tarn_core::requirement::InstallRequirement;
use tarn_core::version::Version;
use tracing::warn;

use crate::graph::DependencyGraph;

/// What the checker knows about one installed package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDetails {
    pub version: Version,
    pub requires: Vec<InstallRequirement>,
}

pub type PackageSet = BTreeMap<PackageName, PackageDetails>;

/// A requirement on a package that is not installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingEntry {
    pub name: PackageName,
    pub requirement: InstallRequirement,
}

/// A requirement the installed version of `name` does not satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictingEntry {
    pub name: PackageName,
    pub installed_version: Version,
    pub requirement: InstallRequirement,
}

impl fmt::Display for MissingEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.requirement)
    }
}

impl fmt::Display for ConflictingEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.name, self.installed_version, self.requirement)
    }
}

/// Findings per offending package; each list is sorted by its string form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckResult {
    pub missing: BTreeMap<PackageName, Vec<MissingEntry>>,
    pub conflicting: BTreeMap<PackageName, Vec<ConflictingEntry>>,
}

impl CheckResult {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.conflicting.is_empty()
    }

    /// `check`-style lines, one per finding.
    pub fn messages(&self, package_set: &PackageSet) -> Vec<String> {
        let mut lines = Vec::new();
        for (name, entries) in &self.missing {
            let version = version_of(package_set, name);
            for entry in entries {
                lines.push(format!(
                    "{name} {version} requires {}, which is not installed.",
                    entry.requirement
                ));
            }
        }
        for (name, entries) in &self.conflicting {
            let version = version_of(package_set, name);
            for entry in entries {
                lines.push(format!(
                    "{name} {version} has requirement {}, but you have {} {}.",
                    entry.requirement, entry.name, entry.installed_version
                ));
            }
        }
        lines
    }

    /// Warnings to show before committing an install plan.
    pub fn install_warnings(&self, package_set: &PackageSet) -> Vec<String> {
        let mut lines = Vec::new();
        for (name, entries) in &self.missing {
            let version = version_of(package_set, name);
            for entry in entries {
                lines.push(format!(
                    "{name} {version} requires {}, which is not installed.",
                    entry.requirement
                ));
            }
        }
        for (name, entries) in &self.conflicting {
            let version = version_of(package_set, name);
            for entry in entries {
                lines.push(format!(
                    "{name} {version} requires {}, but you'll have {} {} which is incompatible.",
                    entry.requirement, entry.name, entry.installed_version
                ));
            }
        }
        lines
    }
}

fn version_of(package_set: &PackageSet, name: &PackageName) -> String {
    package_set
        .get(name)
        .map(|d| d.version.to_string())
        .unwrap_or_default()
}

/// The requirements of `dist` that apply in `env` without extras.
fn details_of(dist: &InstalledDist, env: &MarkerEnvironment) -> Result<PackageDetails, String> {
    let requires = dist
        .metadata
        .requirements()
        .map_err(|e| e.to_string())?
        .into_iter()
        .filter(|req| req.match_markers(env, &[]))
        .collect();
    Ok(PackageDetails {
        version: dist.version().clone(),
        requires,
    })
}

/// Snapshot the registry. Packages whose requirements cannot be read are
/// left out with a warning, and the returned flag is set.
pub fn build_package_set(
    registry: &dyn InstalledRegistry,
    env: &MarkerEnvironment,
    include: impl Fn(&InstalledDist) -> bool,
) -> (PackageSet, bool) {
    let mut package_set = PackageSet::new();
    let mut problems = false;
    for dist in registry.iter_installed().iter().filter(|d| include(d)) {
        match details_of(dist, env) {
            Ok(details) => {
                package_set.insert(dist.name().clone(), details);
            }
            Err(e) => {
                warn!("Error parsing requirements for {}: {e}", dist.name());
                problems = true;
            }
        }
    }
    (package_set, problems)
}

/// Find requirements of each package that are missing or unsatisfied.
///
/// A missing requirement whose marker is false in `env` is not reported.
/// Pre-releases always satisfy specifiers here.
pub fn check_package_set(
    package_set: &PackageSet,
    env: &MarkerEnvironment,
    should_ignore: impl Fn(&PackageName) -> bool,
) -> CheckResult {
    let mut result = CheckResult::default();
    for (package, details) in package_set {
        if should_ignore(package) {
            continue;
        }
        let mut missing = Vec::new();
        let mut conflicting = Vec::new();
        for req in &details.requires {
            let Some(installed) = package_set.get(&req.name) else {
                let applies = req.marker.as_ref().map_or(true, |m| m.evaluate(env, &[]));
                if applies {
                    missing.push(MissingEntry {
                        name: req.name.clone(),
                        requirement: req.clone(),
                    });
                }
                continue;
            };
            if !req.specifier.contains(&installed.version, Some(true)) {
                conflicting.push(ConflictingEntry {
                    name: req.name.clone(),
                    installed_version: installed.version.clone(),
                    requirement: req.clone(),
                });
            }
        }
        if !missing.is_empty() {
            result.missing.insert(package.clone(), sorted_unique(missing));
        }
        if !conflicting.is_empty() {
            result.conflicting.insert(package.clone(), sorted_unique(conflicting));
        }
    }
    result
}

fn sorted_unique<T: fmt::Display + PartialEq>(mut entries: Vec<T>) -> Vec<T> {
    entries.sort_by_cached_key(ToString::to_string);
    entries.dedup();
    entries
}

/// Check what installing `to_install` would do to the installed set.
///
/// The new packages overwrite their entries in a fresh snapshot. Only
/// packages that are affected, meaning the new ones plus everything that
/// transitively requires one of them, are checked. Returns the simulated set
/// along with the findings.
pub fn check_install_conflicts(
    registry: &dyn InstalledRegistry,
    env: &MarkerEnvironment,
    to_install: Vec<(PackageName, PackageDetails)>,
) -> (PackageSet, CheckResult) {
    let (mut package_set, _) = build_package_set(registry, env, |_| true);
    let mut would_be_installed = Vec::new();
    for (name, details) in to_install {
        package_set.insert(name.clone(), details);
        would_be_installed.push(name);
    }
    let whitelist = affected_packages(&package_set, &would_be_installed);
    let result = check_package_set(&package_set, env, |name| !whitelist.contains(name));
    (package_set, result)
}

/// `changed` plus every package from which one of them is reachable through
/// requirements.
fn affected_packages(package_set: &PackageSet, changed: &[PackageName]) -> HashSet<PackageName> {
    let mut graph = DependencyGraph::new();
    for (name, details) in package_set {
        let from = graph.add_node(name.clone());
        for req in &details.requires {
            let to = graph.add_node(req.name.clone());
            graph.add_edge(from, to);
        }
    }
    let targets: Vec<_> = changed.iter().filter_map(|n| graph.find(n.as_str())).collect();
    graph
        .ancestors_of(&targets)
        .into_iter()
        .map(|idx| graph.node(idx).clone())
        .collect()
}

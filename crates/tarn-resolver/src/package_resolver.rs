//! Package-level resolution: from install requirements to an install plan.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use indexmap::IndexMap;
use tarn_core::config::{GlobalConfig, UpgradeStrategy};
use tarn_core::index::PackageIndex;
use tarn_core::installed::InstalledRegistry;
use tarn_core::marker::MarkerEnvironment;
use tarn_core::name::PackageName;
use tarn_core::requirement::InstallRequirement;
use tarn_core::version::Version;
use tarn_util::errors::TarnError;
use tracing::{debug, info, warn};

use crate::candidates::Candidate;
use crate::check::PackageDetails;
use crate::conflict::ConflictReport;
use crate::constraint::Constraint;
use crate::factory::{Factory, FactoryOptions};
use crate::graph::{DependencyGraph, Vertex};
use crate::package_provider::PackageProvider;
use crate::reporter::TracingReporter;
use crate::requirements::Requirement;
use crate::resolver::{ResolutionError, Resolver};

/// Settings for one resolution.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    pub upgrade_strategy: UpgradeStrategy,
    pub allow_prereleases: bool,
    pub ignore_installed: bool,
    pub ignore_requires_python: bool,
    pub ignore_dependencies: bool,
    pub max_rounds: usize,
    pub environment: MarkerEnvironment,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self::from_config(&GlobalConfig::default(), true)
    }
}

impl ResolveOptions {
    /// Without `upgrade`, installed packages are only replaced when they
    /// fail a requirement.
    pub fn from_config(config: &GlobalConfig, upgrade: bool) -> Self {
        let resolver = &config.resolver;
        Self {
            upgrade_strategy: if upgrade {
                resolver.upgrade_strategy
            } else {
                UpgradeStrategy::ToSatisfyOnly
            },
            allow_prereleases: resolver.pre,
            ignore_installed: resolver.ignore_installed,
            ignore_requires_python: resolver.ignore_requires_python,
            ignore_dependencies: resolver.no_deps,
            max_rounds: resolver.max_rounds,
            environment: config.environment.clone(),
        }
    }
}

/// What the installer has to do for one planned package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallAction {
    Install,
    /// Replace the installed version.
    Reinstall { installed: Version },
}

#[derive(Debug, Clone)]
pub struct PlannedInstall {
    pub name: PackageName,
    pub candidate: Arc<Candidate>,
    pub requirement: InstallRequirement,
    pub action: InstallAction,
    /// Named by the user rather than pulled in as a dependency.
    pub requested: bool,
}

impl PlannedInstall {
    pub fn version(&self) -> &Version {
        self.candidate.version()
    }
}

/// A successful resolution.
pub struct Resolution {
    /// Identifier to pinned candidate, in pin order.
    pub mapping: IndexMap<String, Arc<Candidate>>,
    pub graph: DependencyGraph<Vertex<String>>,
    /// Packages that need installing. Already-satisfied ones are left out.
    pub plan: Vec<PlannedInstall>,
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolution")
            .field("mapping", &self.mapping)
            .field("plan", &self.plan)
            .finish_non_exhaustive()
    }
}

impl Resolution {
    /// The plan with dependencies before their dependents: deepest first by
    /// longest path from the root, ties by name.
    pub fn installation_order(&self) -> Vec<&PlannedInstall> {
        let weights = self.graph.topological_weights();
        let weight = |entry: &PlannedInstall| {
            self.graph
                .find(entry.name.as_str())
                .and_then(|idx| weights.get(&idx).copied())
                .unwrap_or(0)
        };
        let mut order: Vec<&PlannedInstall> = self.plan.iter().collect();
        order.sort_by(|a, b| weight(b).cmp(&weight(a)).then_with(|| a.name.cmp(&b.name)));
        order
    }

    /// What the checker should assume about each planned package.
    pub fn package_details(&self, env: &MarkerEnvironment) -> Vec<(PackageName, PackageDetails)> {
        self.plan
            .iter()
            .map(|entry| {
                let metadata = entry.candidate.metadata();
                let requires = metadata
                    .iter_dependencies(&[], env)
                    .flatten()
                    .collect();
                (
                    entry.name.clone(),
                    PackageDetails {
                        version: metadata.version.clone(),
                        requires,
                    },
                )
            })
            .collect()
    }
}

/// Root requirements sorted into what the provider needs.
struct CollectedRootRequirements {
    requirements: Vec<Requirement>,
    constraints: HashMap<String, Constraint>,
    user_requested: HashMap<String, usize>,
}

pub struct PackageResolver {
    index: Rc<dyn PackageIndex>,
    registry: Option<Rc<dyn InstalledRegistry>>,
    options: ResolveOptions,
}

impl PackageResolver {
    pub fn new(
        index: Rc<dyn PackageIndex>,
        registry: Option<Rc<dyn InstalledRegistry>>,
        options: ResolveOptions,
    ) -> Self {
        Self {
            index,
            registry,
            options,
        }
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// Resolve `root_reqs` (requirements and constraints) into an install
    /// plan. A failure carries the rendered conflict explanation.
    pub fn resolve(&self, root_reqs: Vec<InstallRequirement>) -> Result<Resolution, TarnError> {
        let factory = Factory::new(
            Rc::clone(&self.index),
            self.registry.clone(),
            FactoryOptions {
                environment: self.options.environment.clone(),
                allow_prereleases: self.options.allow_prereleases,
                ignore_installed: self.options.ignore_installed,
                ignore_requires_python: self.options.ignore_requires_python,
            },
        );
        let collected = collect_root_requirements(&factory, root_reqs)?;
        info!(
            "resolving {} requirement(s) with {} constraint(s)",
            collected.requirements.len(),
            collected.constraints.len()
        );

        let provider = PackageProvider::new(
            Rc::clone(&factory),
            collected.constraints.clone(),
            self.options.ignore_dependencies,
            self.options.upgrade_strategy,
            collected.user_requested.clone(),
        );
        let mut reporter = TracingReporter::new();
        let mut resolver = Resolver::new(&provider, &mut reporter);
        let result = resolver
            .resolve(collected.requirements, self.options.max_rounds)
            .map_err(|e| match e {
                ResolutionError::Impossible(causes) => {
                    let report = ConflictReport::from_causes(&causes, &collected.constraints, |name| {
                        factory.available_versions(name)
                    });
                    TarnError::Resolution {
                        message: report.to_string(),
                    }
                }
                ResolutionError::TooDeep(rounds) => TarnError::Resolution {
                    message: format!(
                        "Resolution too deep: gave up after {rounds} rounds. \
                         Try narrowing the requirements or raising resolver.max-rounds."
                    ),
                },
                ResolutionError::InconsistentCandidate {
                    candidate,
                    requirements,
                } => TarnError::Resolution {
                    message: format!(
                        "Provided candidate {} does not satisfy {}",
                        candidate.format_for_error(),
                        requirements
                            .iter()
                            .map(Requirement::format_for_error)
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                },
                ResolutionError::Provider(e) => e,
            })?;

        let mut plan = Vec::new();
        for candidate in result.mapping.values() {
            let Some(requirement) = candidate.get_install_requirement() else {
                continue;
            };
            let name = candidate.project_name().clone();
            let installed = if self.options.ignore_installed {
                None
            } else {
                factory.installed_dist(&name)
            };
            let action = match installed {
                None => InstallAction::Install,
                Some(dist) => {
                    let local = candidate.source_link().is_some_and(|l| l.is_file());
                    if dist.version() != candidate.version() || candidate.is_editable() || dist.editable || local {
                        InstallAction::Reinstall {
                            installed: dist.version().clone(),
                        }
                    } else {
                        debug!("{name} {} is already installed", dist.version());
                        continue;
                    }
                }
            };
            let requested = collected.user_requested.contains_key(name.as_str())
                || collected.user_requested.contains_key(&candidate.name());
            plan.push(PlannedInstall {
                name,
                candidate: Arc::clone(candidate),
                requirement,
                action,
                requested,
            });
        }

        Ok(Resolution {
            mapping: result.mapping,
            graph: result.graph,
            plan,
        })
    }
}

/// Split roots into requirements and constraints, and remember the order
/// the user named things in. Requirements with extras go last.
fn collect_root_requirements(
    factory: &Factory,
    root_reqs: Vec<InstallRequirement>,
) -> Result<CollectedRootRequirements, TarnError> {
    let mut collected = CollectedRootRequirements {
        requirements: Vec::new(),
        constraints: HashMap::new(),
        user_requested: HashMap::new(),
    };

    for (i, ireq) in root_reqs.into_iter().enumerate() {
        if ireq.constraint {
            let problem = if ireq.editable {
                Some("Editable requirements are not allowed as constraints")
            } else if !ireq.extras.is_empty() {
                Some("Constraints cannot have extras")
            } else {
                None
            };
            if let Some(problem) = problem {
                return Err(TarnError::Installation {
                    message: format!("{problem}: {ireq}"),
                });
            }
            if !ireq.match_markers(factory.environment(), &[]) {
                debug!("ignoring constraint {ireq}: markers do not match the environment");
                continue;
            }
            let key = ireq.name.as_str().to_string();
            let merged = match collected.constraints.get(&key) {
                Some(existing) => existing.and(&ireq),
                None => Constraint::from_install_requirement(&ireq),
            };
            collected.constraints.insert(key, merged);
            continue;
        }

        let user_supplied = ireq.user_supplied;
        let Some(req) = factory.make_requirement_from_install_req(ireq, &[])? else {
            continue;
        };
        if user_supplied {
            collected.user_requested.entry(req.name()).or_insert(i);
        }
        collected.requirements.push(req);
    }

    collected
        .requirements
        .sort_by_key(|r| r.name() != r.project_name().as_str());
    if collected.requirements.is_empty() {
        warn!("nothing to resolve");
    }
    Ok(collected)
}

//! Operation: resolve requirements into an installation plan.
//!
//! Nothing is installed. The plan is printed in installation order, checked
//! against the installed set, and optionally written out as a JSON report.

use std::path::PathBuf;
use std::rc::Rc;

use serde::Serialize;
use tarn_core::config::{GlobalConfig, UpgradeStrategy};
use tarn_core::index::PackageIndex;
use tarn_core::installed::{InstalledRegistry, StaticRegistry};
use tarn_resolver::check;
use tarn_resolver::package_resolver::{InstallAction, PlannedInstall};
use tarn_resolver::{PackageResolver, Resolution, ResolveOptions};
use tarn_util::errors::TarnError;
use tarn_util::progress::{spinner, status, status_info, status_warn};

use crate::ops_setup::Inputs;

/// Command-line overrides for the `[resolver]` config section.
#[derive(Debug, Clone, Default)]
pub struct ResolveFlags {
    pub upgrade: bool,
    /// Only meaningful together with `upgrade`.
    pub upgrade_strategy: Option<UpgradeStrategy>,
    pub pre: bool,
    pub no_deps: bool,
    pub ignore_installed: bool,
    pub ignore_requires_python: bool,
}

impl ResolveFlags {
    pub fn options(&self, config: &GlobalConfig) -> ResolveOptions {
        let mut options = ResolveOptions::from_config(config, self.upgrade);
        if let (true, Some(strategy)) = (self.upgrade, self.upgrade_strategy) {
            options.upgrade_strategy = strategy;
        }
        options.allow_prereleases |= self.pre;
        options.ignore_dependencies |= self.no_deps;
        options.ignore_installed |= self.ignore_installed;
        options.ignore_requires_python |= self.ignore_requires_python;
        options
    }
}

/// Options for `tarn resolve`.
#[derive(Debug, Clone, Default)]
pub struct ResolveRequest {
    pub inputs: Inputs,
    pub flags: ResolveFlags,
    /// Write a JSON report of the plan here.
    pub report: Option<PathBuf>,
    /// Skip the post-resolution consistency check.
    pub no_check: bool,
}

#[derive(Debug, Serialize)]
struct Report {
    version: &'static str,
    install: Vec<ReportEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct ReportEntry {
    name: String,
    version: String,
    url: Option<String>,
    requested: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    replaces: Option<String>,
    requires_dist: Vec<String>,
}

impl From<&PlannedInstall> for ReportEntry {
    fn from(entry: &PlannedInstall) -> Self {
        Self {
            name: entry.name.to_string(),
            version: entry.version().to_string(),
            url: entry.candidate.source_link().map(ToString::to_string),
            requested: entry.requested,
            replaces: match &entry.action {
                InstallAction::Install => None,
                InstallAction::Reinstall { installed } => Some(installed.to_string()),
            },
            requires_dist: entry.candidate.metadata().requires_dist.clone(),
        }
    }
}

/// Run the resolver for `request`.
pub fn resolve(request: &ResolveRequest) -> miette::Result<()> {
    let config = request.inputs.load_config()?;
    let (resolution, registry, options) = run_resolver(&request.inputs, &request.flags, &config)?;

    print_plan(&resolution);

    if !request.no_check && !resolution.plan.is_empty() {
        warn_about_conflicts(&resolution, registry.as_deref(), &options);
    }

    if let Some(path) = &request.report {
        let report = Report {
            version: "1",
            install: resolution
                .installation_order()
                .into_iter()
                .map(ReportEntry::from)
                .collect(),
        };
        let json = serde_json::to_string_pretty(&report).map_err(|e| TarnError::Generic {
            message: format!("Failed to serialize report: {e}"),
        })?;
        std::fs::write(path, json + "\n").map_err(TarnError::Io)?;
        status_info("Report", &format!("written to {}", path.display()));
    }

    Ok(())
}

/// Load everything `inputs` names and resolve it. Shared with `tarn tree`.
pub(crate) fn run_resolver(
    inputs: &Inputs,
    flags: &ResolveFlags,
    config: &GlobalConfig,
) -> miette::Result<(Resolution, Option<Rc<StaticRegistry>>, ResolveOptions)> {
    let roots = inputs.root_requirements()?;
    let index = inputs.open_index(config)?;
    let registry = inputs.open_registry(config)?;
    let options = flags.options(config);

    let resolver = PackageResolver::new(
        index as Rc<dyn PackageIndex>,
        registry.clone().map(|r| r as Rc<dyn InstalledRegistry>),
        options.clone(),
    );
    let sp = spinner("Resolving dependencies...");
    let result = resolver.resolve(roots);
    sp.finish_and_clear();
    let resolution = result?;

    status(
        "Resolved",
        &format!("{} package(s)", resolution.graph.len()),
    );
    Ok((resolution, registry, options))
}

fn print_plan(resolution: &Resolution) {
    let order = resolution.installation_order();
    if order.is_empty() {
        println!("All requirements are already satisfied.");
        return;
    }
    for entry in &order {
        match &entry.action {
            InstallAction::Install => println!("{} {}", entry.name, entry.version()),
            InstallAction::Reinstall { installed } => {
                println!("{} {} (replaces {installed})", entry.name, entry.version())
            }
        }
    }
    let names: Vec<String> = order
        .iter()
        .map(|e| format!("{}-{}", e.name, e.version()))
        .collect();
    status("Would install", &names.join(" "));
}

fn warn_about_conflicts(
    resolution: &Resolution,
    registry: Option<&StaticRegistry>,
    options: &ResolveOptions,
) {
    let empty = StaticRegistry::new();
    let registry: &dyn InstalledRegistry = match registry {
        Some(r) if !options.ignore_installed => r,
        _ => &empty,
    };
    let to_install = resolution.package_details(&options.environment);
    let (package_set, result) = check::check_install_conflicts(registry, &options.environment, to_install);
    for line in result.install_warnings(&package_set) {
        status_warn("Warning", &line);
    }
}

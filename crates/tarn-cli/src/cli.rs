//! CLI argument definitions for Tarn.
//!
//! Uses `clap` derive macros to define the command surface. Each command
//! corresponds to a handler in the [`super::commands`] module.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tarn_core::config::UpgradeStrategy;

#[derive(Parser, Debug)]
#[command(
    name = "tarn",
    version,
    about = "A backtracking dependency resolver for Python packages",
    long_about = "Tarn resolves Python package requirements against a package index, \
                  plans what to install next to an existing environment, and checks \
                  installed packages for broken requirements."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Use this config file instead of ~/.tarn/config.toml
    #[arg(long, global = true, env = "TARN_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Where requirements and packages come from.
#[derive(Args, Debug)]
pub struct SourceArgs {
    /// Requirement specifiers, e.g. `requests>=2` or `pkg @ https://...`
    pub specs: Vec<String>,
    /// Install from the given requirements file
    #[arg(short = 'r', long = "requirement", value_name = "FILE")]
    pub requirements: Vec<PathBuf>,
    /// Constrain versions using the given constraints file
    #[arg(short = 'c', long = "constraint", value_name = "FILE")]
    pub constraints: Vec<PathBuf>,
    /// Package index file (TOML)
    #[arg(long, value_name = "FILE")]
    pub index: Option<PathBuf>,
    /// Installed packages file (TOML)
    #[arg(long, value_name = "FILE")]
    pub installed: Option<PathBuf>,
}

/// How the resolver behaves.
#[derive(Args, Debug)]
pub struct ResolverArgs {
    /// Upgrade packages to the newest available version
    #[arg(short = 'U', long)]
    pub upgrade: bool,
    /// Which packages `--upgrade` applies to
    #[arg(long, value_name = "STRATEGY", value_parser = parse_strategy)]
    pub upgrade_strategy: Option<UpgradeStrategy>,
    /// Include pre-release and development versions
    #[arg(long)]
    pub pre: bool,
    /// Don't resolve package dependencies
    #[arg(long)]
    pub no_deps: bool,
    /// Ignore the installed packages
    #[arg(long)]
    pub ignore_installed: bool,
    /// Ignore the Requires-Python information
    #[arg(long)]
    pub ignore_requires_python: bool,
}

fn parse_strategy(s: &str) -> Result<UpgradeStrategy, String> {
    s.parse().map_err(|e: tarn_util::errors::TarnError| e.to_string())
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve requirements and print the installation plan
    Resolve {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        resolver: ResolverArgs,
        /// Write a JSON report of the plan to this file
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
        /// Don't check the plan against the installed packages
        #[arg(long)]
        no_check: bool,
    },

    /// Verify installed packages have compatible dependencies
    Check {
        /// Installed packages file (TOML)
        #[arg(long, value_name = "FILE")]
        installed: Option<PathBuf>,
    },

    /// Print the resolved dependency tree
    Tree {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        resolver: ResolverArgs,
        /// Maximum depth
        #[arg(long)]
        depth: Option<u32>,
        /// Explain why a package is included
        #[arg(long)]
        why: Option<String>,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn resolve_flags_parse() {
        let cli = Cli::try_parse_from([
            "tarn",
            "resolve",
            "web",
            "-r",
            "reqs.txt",
            "--index",
            "index.toml",
            "-U",
            "--upgrade-strategy",
            "eager",
        ])
        .unwrap();
        let Command::Resolve { source, resolver, .. } = cli.command else {
            panic!("expected resolve");
        };
        assert_eq!(source.specs, vec!["web"]);
        assert_eq!(source.requirements, vec![PathBuf::from("reqs.txt")]);
        assert!(resolver.upgrade);
        assert_eq!(resolver.upgrade_strategy, Some(UpgradeStrategy::Eager));
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        let err = Cli::try_parse_from(["tarn", "resolve", "--upgrade-strategy", "sometimes"]);
        assert!(err.is_err());
    }
}

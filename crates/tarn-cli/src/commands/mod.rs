//! Command dispatch and handler modules.

mod check;
mod resolve;
mod tree;

use std::path::PathBuf;

use miette::Result;
use tarn_ops::ops_resolve::ResolveFlags;
use tarn_ops::ops_setup::Inputs;

use crate::cli::{Cli, Command, ResolverArgs, SourceArgs};

/// Route a parsed CLI invocation to the appropriate command handler.
pub fn dispatch(cli: Cli) -> Result<()> {
    let config = cli.config;
    match cli.command {
        Command::Resolve {
            source,
            resolver,
            report,
            no_check,
        } => resolve::exec(inputs(source, config), flags(resolver), report, no_check),
        Command::Check { installed } => check::exec(Inputs {
            installed,
            config,
            ..Inputs::default()
        }),
        Command::Tree {
            source,
            resolver,
            depth,
            why,
        } => tree::exec(inputs(source, config), flags(resolver), depth, why),
    }
}

fn inputs(source: SourceArgs, config: Option<PathBuf>) -> Inputs {
    Inputs {
        specs: source.specs,
        requirements: source.requirements,
        constraints: source.constraints,
        index: source.index,
        installed: source.installed,
        config,
    }
}

fn flags(args: ResolverArgs) -> ResolveFlags {
    ResolveFlags {
        upgrade: args.upgrade,
        upgrade_strategy: args.upgrade_strategy,
        pre: args.pre,
        no_deps: args.no_deps,
        ignore_installed: args.ignore_installed,
        ignore_requires_python: args.ignore_requires_python,
    }
}

//! Operation: verify that installed packages have compatible dependencies.

use tarn_resolver::check;
use tarn_util::errors::TarnError;
use tarn_util::progress::status;

use crate::ops_setup::Inputs;

/// Check every installed package. Each broken requirement is printed on
/// its own line; any finding, or any package whose metadata could not be
/// read, makes the operation fail.
pub fn check(inputs: &Inputs) -> miette::Result<()> {
    let config = inputs.load_config()?;
    let registry = inputs.open_registry(&config)?.ok_or_else(|| TarnError::Config {
        message: "No installed packages file given: pass --installed or set `installed` under [index] in the config"
            .to_string(),
    })?;
    let env = &config.environment;

    status("Checking", &format!("{} installed package(s)", registry.len()));
    let (package_set, parsing_problems) =
        check::build_package_set(&*registry, env, |_| true);
    let result = check::check_package_set(&package_set, env, |_| false);

    for line in result.messages(&package_set) {
        println!("{line}");
    }

    if result.is_clean() && !parsing_problems {
        println!("No broken requirements found.");
        return Ok(());
    }
    let broken = result.missing.values().map(Vec::len).sum::<usize>()
        + result.conflicting.values().map(Vec::len).sum::<usize>();
    let message = if parsing_problems {
        format!("{broken} broken requirement(s), some metadata could not be read")
    } else {
        format!("{broken} broken requirement(s)")
    };
    Err(TarnError::Generic { message }.into())
}

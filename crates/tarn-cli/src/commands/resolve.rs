//! Handler for `tarn resolve`.

use std::path::PathBuf;

use miette::Result;
use tarn_ops::ops_resolve::{self, ResolveFlags, ResolveRequest};
use tarn_ops::ops_setup::Inputs;
use tarn_util::errors::TarnError;

pub fn exec(inputs: Inputs, flags: ResolveFlags, report: Option<PathBuf>, no_check: bool) -> Result<()> {
    if inputs.specs.is_empty() && inputs.requirements.is_empty() {
        return Err(TarnError::Generic {
            message: "You must give at least one requirement to resolve (e.g. `tarn resolve requests`)"
                .to_string(),
        }
        .into());
    }

    ops_resolve::resolve(&ResolveRequest {
        inputs,
        flags,
        report,
        no_check,
    })
}

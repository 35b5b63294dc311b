//! Check command implementation.

use miette::Result;
use tarn_ops::ops_setup::Inputs;

pub fn exec(inputs: Inputs) -> Result<()> {
    tarn_ops::ops_check::check(&inputs)
}

//! Handler for `tarn tree`.

use miette::Result;
use tarn_ops::ops_resolve::ResolveFlags;
use tarn_ops::ops_setup::Inputs;
use tarn_ops::ops_tree::{self, TreeOptions};

pub fn exec(inputs: Inputs, flags: ResolveFlags, depth: Option<u32>, why: Option<String>) -> Result<()> {
    let opts = TreeOptions {
        inputs,
        flags,
        depth: depth.map(|d| d as usize),
        why,
    };
    ops_tree::tree(&opts)
}

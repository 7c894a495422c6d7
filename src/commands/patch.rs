// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Usage: felpatch patch <CONFIG> [--output <FILE>]

use super::patch_devicetree;
use crate::config;
use crate::error::Error;
use clap::Args;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct PatchArgs {
    /// Board configuration file
    pub config: PathBuf,

    /// Output file path
    #[arg(short, long, default_value = "devicetree.dts")]
    pub output: PathBuf,
}

/// Applies a board configuration and exports the patched source.
pub fn execute(args: &PatchArgs) -> Result<(), Error> {
    let config = config::load(&args.config)?;
    patch_devicetree(&config, &args.output)?;
    Ok(())
}

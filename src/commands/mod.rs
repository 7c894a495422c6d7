// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Subcommand implementations.

use crate::config::LoadedConfig;
use crate::error::Error;
use clap::Args;
use felpatch_device_tree::model::DeviceTree;
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

pub mod dedup;
pub mod patch;
pub mod provision;

/// Locations of the external tools.
#[derive(Debug, Clone, Args)]
pub struct Tools {
    /// Device tree compiler
    #[arg(long, env = "FELPATCH_DTC", default_value = "dtc", global = true)]
    pub dtc: PathBuf,

    /// FEL flashing tool
    #[arg(long, env = "FELPATCH_XFEL", default_value = "xfel", global = true)]
    pub xfel: PathBuf,
}

/// Reads and parses a device tree source file.
pub fn read_devicetree(path: &Path) -> Result<DeviceTree, Error> {
    let source = fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_owned(),
        source,
    })?;
    let tree = DeviceTree::from_dts(&source).map_err(|source| Error::Parse {
        path: path.to_owned(),
        source,
    })?;
    debug!("parsed {}", path.display());
    Ok(tree)
}

/// Reads the base device tree of `config`, applies its instructions and
/// writes the result to `output`.
///
/// If an instruction aborts the batch, the partially patched tree is still
/// written before the error is returned.
pub fn patch_devicetree(config: &LoadedConfig, output: &Path) -> Result<(), Error> {
    let mut tree = read_devicetree(&config.devicetree)?;
    if let Err(err) = tree.patch(&config.instructions) {
        warn!("{err}; writing the partially patched tree");
        write_file(output, &tree.to_dts())?;
        return Err(err.into());
    }
    write_file(output, &tree.to_dts())
}

pub fn write_file(path: &Path, contents: &str) -> Result<(), Error> {
    fs::write(path, contents).map_err(|source| Error::Write {
        path: path.to_owned(),
        source,
    })?;
    info!("wrote {}", path.display());
    Ok(())
}

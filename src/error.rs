// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::config::ConfigError;
use crate::tools::ToolError;
use felpatch_device_tree::error::ParseError;
use felpatch_device_tree::patch::PatchError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Any error that stops a command.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to parse {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
    #[error(transparent)]
    Patch(#[from] PatchError),
    #[error("failed to read {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to compile the device tree")]
    Compile(#[source] ToolError),
    #[error(
        "flashing failed; the device may not boot until it is flashed again from FEL mode"
    )]
    Flash(#[source] ToolError),
    #[error("{} has no [flash] section", .0.display())]
    NothingToFlash(PathBuf),
    #[error("refusing to flash without --yes; review the summary above")]
    NotConfirmed,
}

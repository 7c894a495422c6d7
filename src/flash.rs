// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The sequence of SPI NAND operations performed over FEL.

use serde::Deserialize;
use std::ffi::OsString;
use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

const MIB: u64 = 1024 * 1024;

/// An image written with the SPL-aware `splwrite` command.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SplWrite {
    pub length: u64,
    pub address: u64,
    pub file: PathBuf,
}

/// An image written verbatim at a flash address.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FirmwareWrite {
    pub address: u64,
    pub file: PathBuf,
}

/// One invocation of the FEL tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashCommand {
    /// What the step does, for progress messages.
    pub description: String,
    pub args: Vec<OsString>,
}

/// Everything written to the device, in order: erase, SPL images, firmware
/// images.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlashPlan {
    /// Number of bytes to erase from the start of the flash, if any.
    pub erase: Option<u64>,
    pub spl_writes: Vec<SplWrite>,
    pub writes: Vec<FirmwareWrite>,
}

impl FlashPlan {
    /// Returns whether the plan does not touch the device at all.
    pub fn is_empty(&self) -> bool {
        self.erase.is_none() && self.spl_writes.is_empty() && self.writes.is_empty()
    }

    /// Returns a human-readable description of the plan.
    pub fn summary(&self) -> String {
        self.to_string()
    }

    /// Returns the FEL tool invocations that carry out the plan.
    pub fn commands(&self) -> Vec<FlashCommand> {
        let mut commands = Vec::new();
        if let Some(size) = self.erase {
            commands.push(FlashCommand {
                description: format!("erasing {} MiB of flash", size / MIB),
                args: args(["spinand", "erase", "0", &size.to_string()]),
            });
        }
        for write in &self.spl_writes {
            let mut args = args([
                "spinand",
                "splwrite",
                &write.length.to_string(),
                &write.address.to_string(),
            ]);
            args.push(write.file.clone().into_os_string());
            commands.push(FlashCommand {
                description: format!("writing SPL image {}", write.file.display()),
                args,
            });
        }
        for write in &self.writes {
            let mut args = args(["spinand", "write", &write.address.to_string()]);
            args.push(write.file.clone().into_os_string());
            commands.push(FlashCommand {
                description: format!("writing firmware {}", write.file.display()),
                args,
            });
        }
        commands
    }
}

impl Display for FlashPlan {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.erase {
            Some(size) => {
                writeln!(f, "Erase flash: yes")?;
                writeln!(f, "Erase size: {} MiB", size / MIB)?;
            }
            None => writeln!(f, "Erase flash: no")?,
        }
        writeln!(f)?;
        writeln!(f, "Data to write:")?;
        if !self.spl_writes.is_empty() {
            writeln!(f, "SPL:")?;
            writeln!(f, "    {:<12}{:<12}file", "address", "length")?;
            for write in &self.spl_writes {
                writeln!(
                    f,
                    "    {:<12}{:<12}{}",
                    format!("{:#x}", write.address),
                    write.length,
                    write.file.display()
                )?;
            }
        }
        if !self.writes.is_empty() {
            writeln!(f, "Firmware:")?;
            writeln!(f, "    {:<12}file", "address")?;
            for write in &self.writes {
                writeln!(
                    f,
                    "    {:<12}{}",
                    format!("{:#x}", write.address),
                    write.file.display()
                )?;
            }
        }
        Ok(())
    }
}

fn args<const N: usize>(args: [&str; N]) -> Vec<OsString> {
    args.into_iter().map(OsString::from).collect()
}

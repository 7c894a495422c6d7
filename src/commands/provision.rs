// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Usage: felpatch provision <CONFIG> [--workdir <DIR>] [--dry-run] [--yes]

use super::{Tools, patch_devicetree};
use crate::config::{self, LoadedConfig};
use crate::error::Error;
use crate::tools::{self, DryRun, Runner, SystemRunner};
use clap::Args;
use log::{info, warn};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const DTS_FILE: &str = "devicetree.dts";
const DTB_FILE: &str = "devicetree.dtb";
const RULE: &str = "----------------------------------------";

#[derive(Debug, Args)]
pub struct ProvisionArgs {
    /// Board configuration file
    pub config: PathBuf,

    /// Directory for the generated device tree and the images to flash
    /// (default: the directory of the configuration file)
    #[arg(long)]
    pub workdir: Option<PathBuf>,

    /// Print the tool invocations instead of running them
    #[arg(long)]
    pub dry_run: bool,

    /// Write to the device; without this only the summary is printed
    #[arg(short, long)]
    pub yes: bool,
}

/// Patches, compiles and flashes a board.
pub fn execute(args: &ProvisionArgs, tools: &Tools) -> Result<(), Error> {
    let config = config::load(&args.config)?;
    if config.flash.is_empty() {
        return Err(Error::NothingToFlash(args.config.clone()));
    }
    let workdir = args
        .workdir
        .clone()
        .unwrap_or_else(|| parent_dir(&args.config));

    let mut runner: Box<dyn Runner> = if args.dry_run {
        Box::new(DryRun::default())
    } else {
        Box::new(SystemRunner)
    };
    provision(
        &config,
        &workdir,
        tools,
        runner.as_mut(),
        args.yes || args.dry_run,
        &mut io::stdout().lock(),
    )
}

/// Writes `devicetree.dts` and `devicetree.dtb` to `workdir`, prints the
/// summary to `out` and, if `confirmed`, flashes the device.
pub fn provision(
    config: &LoadedConfig,
    workdir: &Path,
    paths: &Tools,
    runner: &mut dyn Runner,
    confirmed: bool,
    out: &mut dyn Write,
) -> Result<(), Error> {
    patch_devicetree(config, &workdir.join(DTS_FILE))?;
    tools::compile_devicetree(
        runner,
        &paths.dtc,
        Path::new(DTS_FILE),
        Path::new(DTB_FILE),
        workdir,
    )
    .map_err(Error::Compile)?;

    print_summary(config, out).map_err(|source| Error::Write {
        path: PathBuf::from("<stdout>"),
        source,
    })?;
    if !confirmed {
        return Err(Error::NotConfirmed);
    }

    warn!("flashing; all data on the device will be overwritten");
    tools::flash(runner, &paths.xfel, &config.flash, workdir).map_err(Error::Flash)?;
    info!("flashing complete; disconnect power and restart the device");
    Ok(())
}

fn print_summary(config: &LoadedConfig, out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "{RULE}")?;
    if !config.summary.is_empty() {
        writeln!(out, "Board: {}", config.summary)?;
    }
    writeln!(out, "Device tree: {}", config.devicetree.display())?;
    writeln!(out, "Patch instructions: {}", config.instructions.len())?;
    writeln!(out)?;
    write!(out, "{}", config.flash.summary())?;
    writeln!(out, "{RULE}")?;
    out.flush()
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_owned(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, LoadedConfig) {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("board.dts"), "/dts-v1/;\n/ { a { x = <1>; }; };\n").unwrap();
        let path = dir.path().join("board.toml");
        fs::write(
            &path,
            r#"
summary = "rev B"
devicetree = "board.dts"

[[patch]]
op = "insert_prop"
path = "/a"
name = "y"
value = "<3>"

[flash]
erase_nand = true
erase_size = 134217728

[[flash.write]]
address = 0x100000
file = "devicetree.dtb"
"#,
        )
        .unwrap();
        let config = config::load(&path).unwrap();
        (dir, config)
    }

    fn tool_paths() -> Tools {
        Tools {
            dtc: "dtc".into(),
            xfel: "xfel".into(),
        }
    }

    #[test]
    fn dry_run() {
        let (dir, config) = setup();
        let mut runner = DryRun::default();
        let mut out = Vec::new();

        provision(&config, dir.path(), &tool_paths(), &mut runner, true, &mut out).unwrap();

        assert_eq!(
            runner.commands,
            [
                "dtc -I dts -O dtb devicetree.dts -o devicetree.dtb",
                "xfel spinand erase 0 134217728",
                "xfel spinand write 1048576 devicetree.dtb",
            ]
        );
        let dts = fs::read_to_string(dir.path().join(DTS_FILE)).unwrap();
        assert!(dts.contains("        y = <0x3>;\n"));

        let summary = String::from_utf8(out).unwrap();
        assert!(summary.contains("Board: rev B\n"));
        assert!(summary.contains("Erase size: 128 MiB\n"));
        assert!(summary.contains("    0x100000    devicetree.dtb\n"));
    }

    #[test]
    fn refuses_without_confirmation() {
        let (dir, config) = setup();
        let mut runner = DryRun::default();
        let mut out = Vec::new();

        let err =
            provision(&config, dir.path(), &tool_paths(), &mut runner, false, &mut out).unwrap_err();

        assert!(matches!(err, Error::NotConfirmed));
        assert_eq!(
            runner.commands,
            ["dtc -I dts -O dtb devicetree.dts -o devicetree.dtb"]
        );
        assert!(!out.is_empty());
    }

    #[test]
    fn default_workdir() {
        assert_eq!(parent_dir(Path::new("board.toml")), Path::new("."));
        assert_eq!(
            parent_dir(Path::new("configs/board.toml")),
            Path::new("configs")
        );
    }
}

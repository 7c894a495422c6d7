// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Running `dtc` and `xfel`.

use crate::flash::FlashPlan;
use log::{debug, error, info};
use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::process::Command;
use thiserror::Error;

/// An external tool that could not be run or that reported failure.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("failed to run `{tool}`")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },
    #[error("`{tool}` {}", describe_exit(.code))]
    Failed { tool: String, code: Option<i32> },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with status {code}"),
        None => "was terminated by a signal".to_owned(),
    }
}

/// Executes external commands.
pub trait Runner {
    /// Runs `program` with `args` in `cwd` and waits for it to succeed.
    fn run(&mut self, program: &Path, args: &[OsString], cwd: &Path) -> Result<(), ToolError>;
}

/// Spawns real processes.
#[derive(Debug, Default)]
pub struct SystemRunner;

impl Runner for SystemRunner {
    fn run(&mut self, program: &Path, args: &[OsString], cwd: &Path) -> Result<(), ToolError> {
        debug!("running {}", command_line(program, args));
        let tool = program.display().to_string();
        let status = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .status()
            .map_err(|source| ToolError::Spawn {
                tool: tool.clone(),
                source,
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(ToolError::Failed {
                tool,
                code: status.code(),
            })
        }
    }
}

/// Logs and records commands instead of running them.
#[derive(Debug, Default)]
pub struct DryRun {
    pub commands: Vec<String>,
}

impl Runner for DryRun {
    fn run(&mut self, program: &Path, args: &[OsString], _cwd: &Path) -> Result<(), ToolError> {
        let line = command_line(program, args);
        info!("would run: {line}");
        self.commands.push(line);
        Ok(())
    }
}

fn command_line(program: &Path, args: &[OsString]) -> String {
    let mut line = program.display().to_string();
    for arg in args {
        line.push(' ');
        line.push_str(&arg.to_string_lossy());
    }
    line
}

/// Compiles a source file into a flattened device tree blob with `dtc`.
pub fn compile_devicetree(
    runner: &mut dyn Runner,
    dtc: &Path,
    input: &Path,
    output: &Path,
    cwd: &Path,
) -> Result<(), ToolError> {
    info!("compiling {} to {}", input.display(), output.display());
    let args = [
        OsString::from("-I"),
        OsString::from("dts"),
        OsString::from("-O"),
        OsString::from("dtb"),
        input.as_os_str().to_owned(),
        OsString::from("-o"),
        output.as_os_str().to_owned(),
    ];
    runner.run(dtc, &args, cwd)
}

/// Carries out `plan` with the FEL tool, stopping at the first failure.
///
/// A failure part way through leaves the flash in an unknown state.
pub fn flash(
    runner: &mut dyn Runner,
    xfel: &Path,
    plan: &FlashPlan,
    cwd: &Path,
) -> Result<(), ToolError> {
    for command in plan.commands() {
        info!("{}", command.description);
        runner.run(xfel, &command.args, cwd).inspect_err(|err| {
            error!("{}: {err}", command.description);
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flash::{FirmwareWrite, SplWrite};

    /// Records commands and fails the `fail_at`th one.
    #[derive(Default)]
    struct FailingRunner {
        commands: Vec<String>,
        fail_at: usize,
    }

    impl Runner for FailingRunner {
        fn run(&mut self, program: &Path, args: &[OsString], _cwd: &Path) -> Result<(), ToolError> {
            self.commands.push(command_line(program, args));
            if self.commands.len() == self.fail_at {
                return Err(ToolError::Failed {
                    tool: program.display().to_string(),
                    code: Some(1),
                });
            }
            Ok(())
        }
    }

    fn plan() -> FlashPlan {
        FlashPlan {
            erase: None,
            spl_writes: vec![SplWrite {
                length: 4096,
                address: 0,
                file: "spl.bin".into(),
            }],
            writes: vec![FirmwareWrite {
                address: 0x10_0000,
                file: "devicetree.dtb".into(),
            }],
        }
    }

    #[test]
    fn dtc_invocation() {
        let mut runner = DryRun::default();
        compile_devicetree(
            &mut runner,
            Path::new("dtc"),
            Path::new("devicetree.dts"),
            Path::new("devicetree.dtb"),
            Path::new("."),
        )
        .unwrap();
        assert_eq!(
            runner.commands,
            ["dtc -I dts -O dtb devicetree.dts -o devicetree.dtb"]
        );
    }

    #[test]
    fn flash_runs_every_command() {
        let mut runner = DryRun::default();
        flash(&mut runner, Path::new("xfel"), &plan(), Path::new(".")).unwrap();
        assert_eq!(
            runner.commands,
            [
                "xfel spinand splwrite 4096 0 spl.bin",
                "xfel spinand write 1048576 devicetree.dtb",
            ]
        );
    }

    #[test]
    fn flash_stops_at_first_failure() {
        let mut runner = FailingRunner {
            fail_at: 1,
            ..FailingRunner::default()
        };
        let err = flash(&mut runner, Path::new("xfel"), &plan(), Path::new(".")).unwrap_err();
        assert_eq!(err.to_string(), "`xfel` exited with status 1");
        assert_eq!(runner.commands.len(), 1);
    }

    #[test]
    fn missing_tool() {
        let err = SystemRunner
            .run(
                Path::new("felpatch-no-such-tool"),
                &[],
                Path::new("."),
            )
            .unwrap_err();
        assert!(matches!(err, ToolError::Spawn { .. }));
        assert_eq!(err.to_string(), "failed to run `felpatch-no-such-tool`");
    }
}

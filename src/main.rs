// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Patches board device trees and provisions Allwinner devices over FEL.

mod commands;
mod config;
mod console;
mod error;
mod flash;
mod logger;
mod tools;

use clap::{ArgAction, Parser, Subcommand};
use std::error::Error as _;
use std::io::Write;
use std::process::ExitCode;

use crate::commands::Tools;
use crate::console::SharedConsole;

#[derive(Debug, Parser)]
#[command(name = "felpatch", version)]
#[command(about = "Patch board device trees and provision Allwinner devices over FEL", long_about = None)]
struct Cli {
    /// Print more diagnostics (repeatable)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Print fewer diagnostics (repeatable)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    quiet: u8,

    #[command(flatten)]
    tools: Tools,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply a board configuration and export the patched device tree source
    Patch(commands::patch::PatchArgs),
    /// Keep only the last definition of each property in a source file
    Dedup(commands::dedup::DedupArgs),
    /// Patch, compile and flash a board over FEL
    Provision(commands::provision::ProvisionArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let console = console::init();
    if let Err(e) = logger::init(console, logger::level_filter(cli.verbose, cli.quiet)) {
        let _ = writeln!(&*console, "Error: {e}");
        return ExitCode::FAILURE;
    }

    let result = match &cli.command {
        Commands::Patch(args) => commands::patch::execute(args),
        Commands::Dedup(args) => commands::dedup::execute(args),
        Commands::Provision(args) => commands::provision::execute(args, &cli.tools),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(console, &e);
            ExitCode::FAILURE
        }
    }
}

/// Prints `error` and its causes, skipping causes already included in the
/// message before them.
fn report(console: &SharedConsole<impl Send + Write>, error: &error::Error) {
    let mut console = console;
    let mut message = error.to_string();
    let _ = writeln!(console, "Error: {message}");
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            let _ = writeln!(console, "  caused by: {text}");
        }
        message = text;
        source = cause.source();
    }
}

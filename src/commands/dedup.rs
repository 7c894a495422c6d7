// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Usage: felpatch dedup <INPUT> [OUTPUT]

use super::{read_devicetree, write_file};
use crate::error::Error;
use clap::Args;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct DedupArgs {
    /// Device tree source to clean up
    pub input: PathBuf,

    /// Output file path (default: overwrite the input)
    pub output: Option<PathBuf>,
}

/// Rewrites a source file keeping only the last definition of each property.
pub fn execute(args: &DedupArgs) -> Result<(), Error> {
    let mut tree = read_devicetree(&args.input)?;
    tree.dedup_properties();
    let output = args.output.as_ref().unwrap_or(&args.input);
    write_file(output, &tree.to_dts())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const SOURCE: &str = "/dts-v1/;\n/ {\n    a { x = <1>; y; x = <2>; };\n};\n";
    const DEDUPED: &str = "/dts-v1/;\n\n/ {\n\n    a {\n        y;\n        x = <0x2>;\n    };\n};\n";

    #[test]
    fn in_place() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("board.dts");
        fs::write(&input, SOURCE).unwrap();

        execute(&DedupArgs {
            input: input.clone(),
            output: None,
        })
        .unwrap();

        assert_eq!(fs::read_to_string(&input).unwrap(), DEDUPED);
    }

    #[test]
    fn to_output() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("board.dts");
        let output = dir.path().join("clean.dts");
        fs::write(&input, SOURCE).unwrap();

        execute(&DedupArgs {
            input: input.clone(),
            output: Some(output.clone()),
        })
        .unwrap();

        assert_eq!(fs::read_to_string(&input).unwrap(), SOURCE);
        assert_eq!(fs::read_to_string(&output).unwrap(), DEDUPED);
    }

    #[test]
    fn missing_input() {
        let dir = TempDir::new().unwrap();
        let err = execute(&DedupArgs {
            input: dir.path().join("nope.dts"),
            output: None,
        })
        .unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
    }
}

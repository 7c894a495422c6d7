// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Board configuration files.
//!
//! A configuration names the base device tree source, the patch
//! instructions to apply to it and, optionally, the flash plan:
//!
//! ```toml
//! summary = "Board rev B, 800x480 panel"
//! devicetree = "board.dts"
//!
//! [[patch]]
//! op = "delete_node"
//! path = "/soc"
//! name = "lcd@0"
//!
//! [[patch]]
//! op = "insert_prop"
//! path = "/soc/uart@1c28000"
//! name = "status"
//! value = '"okay"'
//!
//! [flash]
//! erase_nand = true
//! erase_size = 134217728
//! ```
//!
//! Paths to the device tree and to node fragments are relative to the
//! configuration file.

use crate::flash::{FirmwareWrite, FlashPlan, SplWrite};
use felpatch_device_tree::error::ParseError;
use felpatch_device_tree::model::PropertyValue;
use felpatch_device_tree::patch::Instruction;
use log::debug;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A configuration file that could not be loaded. Nothing is applied when
/// loading fails.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid configuration {}", .path.display())]
    Syntax {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("patch #{index}: unknown instruction `{op}`")]
    UnknownInstruction { index: usize, op: String },
    #[error("patch #{index}: invalid instruction")]
    Instruction {
        index: usize,
        #[source]
        source: toml::de::Error,
    },
    #[error("patch #{index} (insert_node): one of `fragment` or `source` is required")]
    MissingFragment { index: usize },
    #[error("patch #{index} (insert_node): `fragment` and `source` are mutually exclusive")]
    ConflictingFragment { index: usize },
    #[error("patch #{index}: failed to read fragment {}", .path.display())]
    Fragment {
        index: usize,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("patch #{index}: invalid value for property `{name}`")]
    Value {
        index: usize,
        name: String,
        #[source]
        source: ParseError,
    },
    #[error("[flash] sets erase_nand but not erase_size")]
    MissingEraseSize,
}

/// A fully loaded configuration, ready to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedConfig {
    /// Free-form description of the board variant.
    pub summary: String,
    /// Path of the base device tree source.
    pub devicetree: PathBuf,
    pub instructions: Vec<Instruction>,
    pub flash: FlashPlan,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    summary: String,
    devicetree: PathBuf,
    #[serde(default)]
    patch: Vec<toml::Table>,
    #[serde(default)]
    flash: RawFlash,
}

/// A `[[patch]]` table, tagged by its `op` field.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum RawInstruction {
    DeleteNode(Target),
    InsertNode(NodeFragment),
    #[serde(alias = "delete_property")]
    DeleteProp(Target),
    #[serde(alias = "insert_property")]
    InsertProp(Assignment),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Target {
    path: String,
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NodeFragment {
    path: String,
    fragment: Option<PathBuf>,
    source: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Assignment {
    path: String,
    name: String,
    value: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFlash {
    #[serde(default)]
    erase_nand: bool,
    erase_size: Option<u64>,
    #[serde(default)]
    splwrite: Vec<SplWrite>,
    #[serde(default)]
    write: Vec<FirmwareWrite>,
}

/// Loads the configuration at `path`, reading any fragment files it refers
/// to.
pub fn load(path: &Path) -> Result<LoadedConfig, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_owned(),
        source,
    })?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
    let raw: RawConfig = toml::from_str(&text).map_err(|source| ConfigError::Syntax {
        path: path.to_owned(),
        source,
    })?;

    let instructions = raw
        .patch
        .into_iter()
        .enumerate()
        .map(|(index, table)| instruction(index, table, base_dir))
        .collect::<Result<Vec<_>, _>>()?;
    debug!(
        "loaded {} patch instructions from {}",
        instructions.len(),
        path.display()
    );

    Ok(LoadedConfig {
        summary: raw.summary,
        devicetree: base_dir.join(raw.devicetree),
        instructions,
        flash: raw.flash.into_plan()?,
    })
}

/// Deserializes the `[[patch]]` table at `index`, keeping its `op` for the
/// unknown instruction error.
fn instruction(
    index: usize,
    table: toml::Table,
    base_dir: &Path,
) -> Result<Instruction, ConfigError> {
    let op = table
        .get("op")
        .and_then(toml::Value::as_str)
        .unwrap_or_default()
        .to_owned();
    let raw = toml::Value::Table(table)
        .try_into::<RawInstruction>()
        .map_err(|source| ConfigError::Instruction { index, source })?;
    raw.into_instruction(index, op, base_dir)
}

impl RawInstruction {
    fn into_instruction(
        self,
        index: usize,
        op: String,
        base_dir: &Path,
    ) -> Result<Instruction, ConfigError> {
        match self {
            Self::DeleteNode(Target { path, name }) => Ok(Instruction::DeleteNode {
                parent: path,
                name,
            }),
            Self::InsertNode(NodeFragment {
                path,
                fragment,
                source,
            }) => {
                let fragment = match (fragment, source) {
                    (Some(_), Some(_)) => return Err(ConfigError::ConflictingFragment { index }),
                    (Some(file), None) => {
                        let path = base_dir.join(file);
                        fs::read_to_string(&path)
                            .map_err(|source| ConfigError::Fragment { index, path, source })?
                    }
                    (None, Some(source)) => source,
                    (None, None) => return Err(ConfigError::MissingFragment { index }),
                };
                Ok(Instruction::InsertNode {
                    parent: path,
                    fragment,
                })
            }
            Self::DeleteProp(Target { path, name }) => {
                Ok(Instruction::DeleteProperty { path, name })
            }
            Self::InsertProp(Assignment { path, name, value }) => {
                let value = match value {
                    Some(value) => value.parse::<PropertyValue>().map_err(|source| {
                        ConfigError::Value {
                            index,
                            name: name.clone(),
                            source,
                        }
                    })?,
                    None => PropertyValue::empty(),
                };
                Ok(Instruction::InsertProperty { path, name, value })
            }
            Self::Unknown => Err(ConfigError::UnknownInstruction { index, op }),
        }
    }
}

impl RawFlash {
    fn into_plan(self) -> Result<FlashPlan, ConfigError> {
        let erase = if self.erase_nand {
            Some(self.erase_size.ok_or(ConfigError::MissingEraseSize)?)
        } else {
            None
        };
        Ok(FlashPlan {
            erase,
            spl_writes: self.splwrite,
            writes: self.write,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, text: &str) -> PathBuf {
        let path = dir.path().join("board.toml");
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn loads_every_instruction() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("nodes")).unwrap();
        fs::write(dir.path().join("nodes/panel.dts"), "panel { };\n").unwrap();
        let path = write_config(
            &dir,
            r#"
summary = "rev B"
devicetree = "board.dts"

[[patch]]
op = "delete_node"
path = "/soc"
name = "lcd@0"

[[patch]]
op = "insert_node"
path = "/soc"
fragment = "nodes/panel.dts"

[[patch]]
op = "insert_node"
path = "/"
source = "leds { };"

[[patch]]
op = "delete_property"
path = "/soc/uart"
name = "status"

[[patch]]
op = "insert_prop"
path = "/soc/uart"
name = "status"
value = '"okay"'

[[patch]]
op = "insert_prop"
path = "/soc/uart"
name = "dma-coherent"
"#,
        );

        let config = load(&path).unwrap();

        assert_eq!(config.summary, "rev B");
        assert_eq!(config.devicetree, dir.path().join("board.dts"));
        assert_eq!(
            config.instructions,
            [
                Instruction::DeleteNode {
                    parent: "/soc".into(),
                    name: "lcd@0".into(),
                },
                Instruction::InsertNode {
                    parent: "/soc".into(),
                    fragment: "panel { };\n".into(),
                },
                Instruction::InsertNode {
                    parent: "/".into(),
                    fragment: "leds { };".into(),
                },
                Instruction::DeleteProperty {
                    path: "/soc/uart".into(),
                    name: "status".into(),
                },
                Instruction::InsertProperty {
                    path: "/soc/uart".into(),
                    name: "status".into(),
                    value: PropertyValue::string("okay"),
                },
                Instruction::InsertProperty {
                    path: "/soc/uart".into(),
                    name: "dma-coherent".into(),
                    value: PropertyValue::empty(),
                },
            ]
        );
        assert!(config.flash.is_empty());
    }

    #[test]
    fn loads_flash_plan() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
devicetree = "board.dts"

[flash]
erase_nand = true
erase_size = 134217728

[[flash.splwrite]]
length = 1048576
address = 0
file = "u-boot-sunxi-with-spl.bin"

[[flash.write]]
address = 0x100000
file = "devicetree.dtb"
"#,
        );

        let config = load(&path).unwrap();

        assert!(config.instructions.is_empty());
        assert_eq!(
            config.flash,
            FlashPlan {
                erase: Some(134_217_728),
                spl_writes: vec![SplWrite {
                    length: 1_048_576,
                    address: 0,
                    file: "u-boot-sunxi-with-spl.bin".into(),
                }],
                writes: vec![FirmwareWrite {
                    address: 0x10_0000,
                    file: "devicetree.dtb".into(),
                }],
            }
        );
    }

    #[test]
    fn unknown_instruction() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
devicetree = "board.dts"

[[patch]]
op = "delete_prop"
path = "/a"
name = "x"

[[patch]]
op = "rename_node"
path = "/a"
name = "b"
"#,
        );

        let err = load(&path).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnknownInstruction { index: 1, ref op } if op == "rename_node"
        ));
        assert_eq!(err.to_string(), "patch #1: unknown instruction `rename_node`");
    }

    #[test]
    fn invalid_instructions() {
        let dir = TempDir::new().unwrap();
        let cases = [
            (
                "op = \"insert_node\"\npath = \"/\"",
                "patch #0 (insert_node): one of `fragment` or `source` is required",
            ),
            (
                "op = \"insert_node\"\npath = \"/\"\nsource = \"a { };\"\nfragment = \"a.dts\"",
                "patch #0 (insert_node): `fragment` and `source` are mutually exclusive",
            ),
            (
                "op = \"insert_prop\"\npath = \"/\"\nname = \"x\"\nvalue = \"<1\"",
                "patch #0: invalid value for property `x`",
            ),
        ];

        for (patch, message) in cases {
            let path = write_config(
                &dir,
                &format!("devicetree = \"board.dts\"\n[[patch]]\n{patch}\n"),
            );
            assert_eq!(load(&path).unwrap_err().to_string(), message, "{patch}");
        }

        let fields = [
            ("op = \"delete_node\"\npath = \"/\"", "missing field `name`"),
            (
                "op = \"delete_prop\"\npath = \"/\"\nname = \"x\"\nvalue = \"<1>\"",
                "unknown field `value`",
            ),
            ("path = \"/\"\nname = \"x\"", "missing field `op`"),
        ];
        for (patch, detail) in fields {
            let path = write_config(
                &dir,
                &format!("devicetree = \"board.dts\"\n[[patch]]\n{patch}\n"),
            );
            let err = load(&path).unwrap_err();
            assert_eq!(err.to_string(), "patch #0: invalid instruction", "{patch}");
            let ConfigError::Instruction { index: 0, source } = err else {
                panic!("unexpected error: {err:?}");
            };
            assert!(source.to_string().contains(detail), "{patch}: {source}");
        }

        let path = write_config(
            &dir,
            "devicetree = \"board.dts\"\n[[patch]]\nop = \"insert_node\"\npath = \"/\"\nfragment = \"missing.dts\"\n",
        );
        let err = load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Fragment { index: 0, .. }));
        assert_eq!(
            err.to_string(),
            format!(
                "patch #0: failed to read fragment {}",
                dir.path().join("missing.dts").display()
            )
        );
    }

    #[test]
    fn erase_needs_size() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "devicetree = \"a.dts\"\n[flash]\nerase_nand = true\n");
        assert!(matches!(load(&path), Err(ConfigError::MissingEraseSize)));
    }

    #[test]
    fn syntax_errors() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "devicetree = \"a.dts\"\nbogus = 1\n");
        assert!(matches!(load(&path), Err(ConfigError::Syntax { .. })));

        let missing = dir.path().join("nope.toml");
        assert!(matches!(load(&missing), Err(ConfigError::Read { .. })));
    }
}

// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Ordered structural edits of a device tree.
//!
//! A patch is a list of [`Instruction`]s applied in order with
//! [`DeviceTree::patch`] or [`DeviceTree::apply_patches`]. Application is
//! best-effort and sequential, with abort-on-error and no rollback:
//!
//! - An instruction whose target path does not resolve is skipped. One
//!   instruction list commonly serves several board variants, so a missing
//!   node means "this edit does not apply here".
//! - A fatal error (a malformed node fragment) stops the batch. Instructions
//!   that already ran stay applied, so the tree may be partially patched.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use log::{debug, info, warn};

use crate::dts;
use crate::model::{DeviceTree, DeviceTreeProperty, PropertyValue};

mod error;

pub use error::{PatchError, PatchErrorKind};

/// A single structural edit, addressed by node path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// Removes the first child of `parent` named `name`.
    ///
    /// A trailing `@0` is stripped from `name` first, see
    /// [`normalize_child_name`].
    DeleteNode {
        /// Path of the parent node.
        parent: String,
        /// Name of the child to remove.
        name: String,
    },
    /// Parses `fragment` as device tree source and appends every node it
    /// defines as a child of `parent`.
    InsertNode {
        /// Path of the parent node.
        parent: String,
        /// Device tree source of the nodes to insert.
        fragment: String,
    },
    /// Removes the first property of the node at `path` named `name`.
    DeleteProperty {
        /// Path of the node.
        path: String,
        /// Name of the property to remove.
        name: String,
    },
    /// Appends a property to the node at `path`, even if one with the same
    /// name already exists.
    InsertProperty {
        /// Path of the node.
        path: String,
        /// Name of the new property.
        name: String,
        /// Value of the new property. Empty for a presence-only property.
        value: PropertyValue,
    },
}

impl Instruction {
    /// Returns the tag naming this kind of instruction.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Self::DeleteNode { .. } => "delete_node",
            Self::InsertNode { .. } => "insert_node",
            Self::DeleteProperty { .. } => "delete_prop",
            Self::InsertProperty { .. } => "insert_prop",
        }
    }

    /// Returns the path of the node this instruction resolves.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::DeleteNode { parent, .. } | Self::InsertNode { parent, .. } => parent,
            Self::DeleteProperty { path, .. } | Self::InsertProperty { path, .. } => path,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeleteNode { parent, name } => write!(f, "delete_node {parent} {name}"),
            Self::InsertNode { parent, .. } => write!(f, "insert_node {parent} <fragment>"),
            Self::DeleteProperty { path, name } => write!(f, "delete_prop {path} {name}"),
            Self::InsertProperty { path, name, value } if value.is_empty() => {
                write!(f, "insert_prop {path} {name}")
            }
            Self::InsertProperty { path, name, value } => {
                write!(f, "insert_prop {path} {name} = {value}")
            }
        }
    }
}

/// What applying a single instruction did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The tree was modified.
    Applied,
    /// The instruction's path did not resolve; the tree is unchanged.
    Skipped,
    /// The path resolved but the node or property to delete was absent.
    Unmatched,
}

/// The outcomes of a batch of instructions, in instruction order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchReport {
    outcomes: Vec<Outcome>,
}

impl PatchReport {
    /// Returns the outcome of every instruction, in order.
    #[must_use]
    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    /// Returns the number of instructions that modified the tree.
    #[must_use]
    pub fn applied(&self) -> usize {
        self.count(Outcome::Applied)
    }

    /// Returns the number of instructions skipped because their path did not
    /// resolve.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(Outcome::Skipped)
    }

    /// Returns the number of deletions that found nothing to delete.
    #[must_use]
    pub fn unmatched(&self) -> usize {
        self.count(Outcome::Unmatched)
    }

    fn count(&self, outcome: Outcome) -> usize {
        self.outcomes.iter().filter(|&&o| o == outcome).count()
    }
}

/// Normalizes a child name given to a `DeleteNode` instruction.
///
/// Only the literal suffix `@0` is stripped, so `foo@0` selects a child
/// named `foo`. Other unit addresses such as `foo@1` are left alone and must
/// match exactly. Existing instruction lists rely on this legacy rule.
///
/// # Examples
///
/// ```
/// # use felpatch_device_tree::patch::normalize_child_name;
/// assert_eq!(normalize_child_name("foo@0"), "foo");
/// assert_eq!(normalize_child_name("foo@1"), "foo@1");
/// assert_eq!(normalize_child_name("foo@10"), "foo@10");
/// ```
#[must_use]
pub fn normalize_child_name(name: &str) -> &str {
    name.strip_suffix("@0").unwrap_or(name)
}

impl DeviceTree {
    /// Normalizes the tree and then applies `instructions` in order.
    ///
    /// [`DeviceTree::dedup_properties`] runs once, before the first
    /// instruction. Nodes inserted by the batch are not deduplicated
    /// afterwards and `InsertProperty` may add a duplicate, so call
    /// [`DeviceTree::dedup_properties`] again if a clean tree is needed.
    ///
    /// # Errors
    ///
    /// See [`DeviceTree::apply_patches`].
    pub fn patch(&mut self, instructions: &[Instruction]) -> Result<PatchReport, PatchError> {
        self.dedup_properties();
        self.apply_patches(instructions)
    }

    /// Applies `instructions` in order, without normalizing the tree first.
    ///
    /// # Examples
    ///
    /// ```
    /// # use felpatch_device_tree::model::{DeviceTree, PropertyValue};
    /// # use felpatch_device_tree::patch::{Instruction, Outcome};
    /// let mut tree = DeviceTree::from_dts("/dts-v1/; / { a { }; };").unwrap();
    /// let report = tree
    ///     .apply_patches(&[
    ///         Instruction::InsertProperty {
    ///             path: "/a".into(),
    ///             name: "y".into(),
    ///             value: PropertyValue::cells([3]),
    ///         },
    ///         Instruction::DeleteNode {
    ///             parent: "/missing".into(),
    ///             name: "b".into(),
    ///         },
    ///     ])
    ///     .unwrap();
    /// assert_eq!(report.outcomes(), [Outcome::Applied, Outcome::Skipped]);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error at the first instruction that fails fatally. The
    /// instructions before it stay applied and none after it are run.
    pub fn apply_patches(
        &mut self,
        instructions: &[Instruction],
    ) -> Result<PatchReport, PatchError> {
        info!("applying {} patch instructions", instructions.len());
        let mut report = PatchReport::default();
        for (index, instruction) in instructions.iter().enumerate() {
            let outcome = self.apply_instruction(instruction).map_err(|kind| {
                warn!(
                    "aborting patch at instruction #{index} ({}): {kind}; {index} instructions stay applied",
                    instruction.tag()
                );
                PatchError::new(kind, index)
            })?;
            match outcome {
                Outcome::Applied => debug!("#{index} {instruction}"),
                Outcome::Skipped => debug!(
                    "#{index} {instruction}: skipped, {} not found",
                    instruction.path()
                ),
                Outcome::Unmatched => debug!("#{index} {instruction}: nothing to delete"),
            }
            report.outcomes.push(outcome);
        }
        info!(
            "patched: {} applied, {} skipped, {} unmatched",
            report.applied(),
            report.skipped(),
            report.unmatched()
        );
        Ok(report)
    }

    /// Applies a single instruction.
    ///
    /// # Errors
    ///
    /// Returns [`PatchErrorKind::MalformedFragment`] if the fragment of an
    /// `InsertNode` instruction does not parse. The fragment is parsed before
    /// its parent is resolved, so a corrupt fragment is reported even when
    /// the parent is absent.
    pub fn apply_instruction(
        &mut self,
        instruction: &Instruction,
    ) -> Result<Outcome, PatchErrorKind> {
        match instruction {
            Instruction::DeleteNode { parent, name } => {
                let Some(node) = self.find_node_mut(parent) else {
                    return Ok(Outcome::Skipped);
                };
                Ok(removed(node.remove_child(normalize_child_name(name)).is_some()))
            }
            Instruction::InsertNode { parent, fragment } => {
                let nodes =
                    dts::parse_fragment(fragment).map_err(PatchErrorKind::MalformedFragment)?;
                let Some(node) = self.find_node_mut(parent) else {
                    return Ok(Outcome::Skipped);
                };
                for child in nodes {
                    node.add_child(child);
                }
                Ok(Outcome::Applied)
            }
            Instruction::DeleteProperty { path, name } => {
                let Some(node) = self.find_node_mut(path) else {
                    return Ok(Outcome::Skipped);
                };
                Ok(removed(node.remove_property(name).is_some()))
            }
            Instruction::InsertProperty { path, name, value } => {
                let Some(node) = self.find_node_mut(path) else {
                    return Ok(Outcome::Skipped);
                };
                node.add_property(DeviceTreeProperty::new(name.clone(), value.clone()));
                Ok(Outcome::Applied)
            }
        }
    }
}

fn removed(found: bool) -> Outcome {
    if found {
        Outcome::Applied
    } else {
        Outcome::Unmatched
    }
}

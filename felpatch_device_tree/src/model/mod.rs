// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A read-write, in-memory representation of a device tree.
//!
//! This module provides the [`DeviceTree`], [`DeviceTreeNode`], and
//! [`DeviceTreeProperty`] structs, which can be used to create or modify a
//! device tree in memory. The [`DeviceTree`] can be parsed from and printed
//! back to device tree source.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Display;
use core::str::FromStr;

use crate::error::ParseError;
use crate::memreserve::MemoryReservation;
use crate::{dts, writer};
mod node;
mod property;
pub use node::{DeviceTreeNode, DeviceTreeNodeBuilder};
pub use property::{Cell, DeviceTreeProperty, PropertyValue, Reference, ValueChunk};

/// A mutable, in-memory representation of a device tree.
///
/// The tree exclusively owns its root node and, through it, every other node
/// and property.
///
/// # Examples
///
/// ```
/// # use felpatch_device_tree::model::{DeviceTree, DeviceTreeNode};
/// let root = DeviceTreeNode::new("");
/// let mut tree = DeviceTree::new(root);
/// tree.root_mut().add_child(DeviceTreeNode::new("child"));
/// let child = tree.find_node_mut("/child").unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTree {
    pub(self) root: DeviceTreeNode,
    /// The `/memreserve/` entries of this device tree.
    pub memory_reservations: Vec<MemoryReservation>,
}

impl DeviceTree {
    /// Creates a new `DeviceTree` with the given root node.
    #[must_use]
    pub fn new(root: DeviceTreeNode) -> Self {
        Self {
            root,
            memory_reservations: Vec::new(),
        }
    }

    /// Parses a `DeviceTree` from device tree source.
    ///
    /// Repeated root blocks and `&label { ... };` blocks are merged into the
    /// tree in source order. Duplicate properties are kept as written; see
    /// [`DeviceTree::dedup_properties`].
    ///
    /// # Examples
    ///
    /// ```
    /// # use felpatch_device_tree::model::DeviceTree;
    /// let tree = DeviceTree::from_dts("/dts-v1/; / { a { x = <1>; }; };").unwrap();
    /// assert!(tree.find_node("/a").is_some());
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if the source is malformed, uses an unsupported
    /// construct, or does not define a root node.
    pub fn from_dts(source: &str) -> Result<Self, ParseError> {
        dts::parse(source)
    }

    /// Prints the device tree as device tree source.
    ///
    /// This always reflects the current state of the tree and may be called
    /// any number of times.
    #[must_use]
    pub fn to_dts(&self) -> String {
        writer::to_dts(self)
    }

    /// Returns a reference to the root node of the device tree.
    #[must_use]
    pub fn root(&self) -> &DeviceTreeNode {
        &self.root
    }

    /// Returns a mutable reference to the root node of the device tree.
    pub fn root_mut(&mut self) -> &mut DeviceTreeNode {
        &mut self.root
    }

    /// Finds a node by its path.
    ///
    /// `/` always resolves to the root. Any other path is a `/`-separated
    /// sequence of node names; for each segment the first child with exactly
    /// that name is taken. Returns `None` if the path is relative or any
    /// segment is missing.
    #[must_use]
    pub fn find_node(&self, path: &str) -> Option<&DeviceTreeNode> {
        if !path.starts_with('/') {
            return None;
        }
        let mut current_node = &self.root;
        if path == "/" {
            return Some(current_node);
        }
        for component in path.split('/').filter(|s| !s.is_empty()) {
            current_node = current_node.child(component)?;
        }
        Some(current_node)
    }

    /// Finds a node by its path and returns a mutable reference to it.
    ///
    /// # Performance
    ///
    /// Each segment is a linear scan over the children of the current node.
    ///
    /// # Examples
    ///
    /// ```
    /// # use felpatch_device_tree::model::{DeviceTree, DeviceTreeNode};
    /// let mut tree = DeviceTree::new(DeviceTreeNode::new(""));
    /// tree.root_mut().add_child(DeviceTreeNode::new("child"));
    /// let child = tree.find_node_mut("/child").unwrap();
    /// assert_eq!(child.name(), "child");
    /// ```
    pub fn find_node_mut(&mut self, path: &str) -> Option<&mut DeviceTreeNode> {
        if !path.starts_with('/') {
            return None;
        }
        let mut current_node = &mut self.root;
        if path == "/" {
            return Some(current_node);
        }
        for component in path.split('/').filter(|s| !s.is_empty()) {
            match current_node.child_mut(component) {
                Some(node) => current_node = node,
                None => return None,
            }
        }
        Some(current_node)
    }

    /// Finds the first node, in depth-first order, carrying the given label.
    #[must_use]
    pub fn find_label(&self, label: &str) -> Option<&DeviceTreeNode> {
        let chain = self.root.find_label(label)?;
        let mut node = &self.root;
        for index in chain {
            node = node.children.get(index)?;
        }
        Some(node)
    }

    /// Finds the first node carrying the given label and returns a mutable
    /// reference to it.
    pub fn find_label_mut(&mut self, label: &str) -> Option<&mut DeviceTreeNode> {
        let chain = self.root.find_label(label)?;
        self.root.descendant_mut(&chain)
    }

    /// Collapses repeated properties in every node of the tree, keeping the
    /// last definition of each name.
    ///
    /// See [`DeviceTreeNode::dedup_properties`].
    pub fn dedup_properties(&mut self) {
        self.root.dedup_properties();
    }

    /// Calls `f` for every node of the tree in depth-first order.
    pub fn for_each_node<F>(&self, f: &mut F)
    where
        F: FnMut(&DeviceTreeNode),
    {
        self.root.for_each_node(f);
    }
}

impl FromStr for DeviceTree {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_dts(s)
    }
}

impl Display for DeviceTree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writer::write_tree(f, self)
    }
}

// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use super::property::DeviceTreeProperty;
use alloc::{string::String, vec::Vec};
use indexmap::IndexMap;
use twox_hash::xxhash64;

/// A mutable, in-memory representation of a device tree node.
///
/// Children and properties are stored in [`Vec`]s: source order is
/// significant and names are not required to be unique. Lookups by name are
/// linear scans that return the first match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceTreeNode {
    name: String,
    labels: Vec<String>,
    pub(crate) properties: Vec<DeviceTreeProperty>,
    pub(crate) children: Vec<DeviceTreeNode>,
}

impl DeviceTreeNode {
    /// Creates a new [`DeviceTreeNode`] with the given name.
    ///
    /// # Examples
    ///
    /// ```
    /// # use felpatch_device_tree::model::DeviceTreeNode;
    /// let node = DeviceTreeNode::new("my-node");
    /// assert_eq!(node.name(), "my-node");
    /// ```
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Creates a new [`DeviceTreeNodeBuilder`] with the given name.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> DeviceTreeNodeBuilder {
        DeviceTreeNodeBuilder::new(name)
    }

    /// Returns the name of this node, including any unit address.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the labels attached to this node.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Attaches a label to this node, unless it is already present.
    pub fn add_label(&mut self, label: impl Into<String>) {
        let label = label.into();
        if !self.labels.contains(&label) {
            self.labels.push(label);
        }
    }

    /// Returns an iterator over the properties of this node, in order.
    pub fn properties(&self) -> impl Iterator<Item = &DeviceTreeProperty> {
        self.properties.iter()
    }

    /// Returns a mutable iterator over the properties of this node.
    pub fn properties_mut(&mut self) -> impl Iterator<Item = &mut DeviceTreeProperty> {
        self.properties.iter_mut()
    }

    /// Finds the first property with the given name.
    ///
    /// # Examples
    ///
    /// ```
    /// # use felpatch_device_tree::model::{DeviceTreeNode, DeviceTreeProperty, PropertyValue};
    /// let mut node = DeviceTreeNode::new("my-node");
    /// node.add_property(DeviceTreeProperty::new("my-prop", PropertyValue::cells([1])));
    /// let prop = node.property("my-prop").unwrap();
    /// assert_eq!(prop.value().as_u32(), Some(1));
    /// ```
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&DeviceTreeProperty> {
        self.properties.iter().find(|p| p.name() == name)
    }

    /// Finds the first property with the given name and returns a mutable
    /// reference to it.
    #[must_use]
    pub fn property_mut(&mut self, name: &str) -> Option<&mut DeviceTreeProperty> {
        self.properties.iter_mut().find(|p| p.name() == name)
    }

    /// Appends a property to this node.
    ///
    /// No check for an existing property of the same name is made, so this
    /// may introduce a duplicate. See [`Self::dedup_properties`].
    pub fn add_property(&mut self, property: DeviceTreeProperty) {
        self.properties.push(property);
    }

    /// Removes the first property with the given name.
    ///
    /// # Performance
    ///
    /// This is a linear-time operation, as it needs to scan for the property
    /// and shift the elements after it.
    ///
    /// # Examples
    ///
    /// ```
    /// # use felpatch_device_tree::model::{DeviceTreeNode, DeviceTreeProperty};
    /// let mut node = DeviceTreeNode::new("my-node");
    /// node.add_property(DeviceTreeProperty::flag("my-prop"));
    /// assert!(node.remove_property("my-prop").is_some());
    /// assert!(node.property("my-prop").is_none());
    /// ```
    pub fn remove_property(&mut self, name: &str) -> Option<DeviceTreeProperty> {
        let index = self.properties.iter().position(|p| p.name() == name)?;
        Some(self.properties.remove(index))
    }

    /// Returns an iterator over the children of this node, in order.
    pub fn children(&self) -> impl Iterator<Item = &DeviceTreeNode> {
        self.children.iter()
    }

    /// Returns a mutable iterator over the children of this node.
    pub fn children_mut(&mut self) -> impl Iterator<Item = &mut DeviceTreeNode> {
        self.children.iter_mut()
    }

    /// Finds the first child with exactly the given name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&DeviceTreeNode> {
        self.children.iter().find(|c| c.name() == name)
    }

    /// Finds the first child with exactly the given name and returns a
    /// mutable reference to it.
    #[must_use]
    pub fn child_mut(&mut self, name: &str) -> Option<&mut DeviceTreeNode> {
        self.children.iter_mut().find(|c| c.name() == name)
    }

    /// Appends a child to this node.
    pub fn add_child(&mut self, child: DeviceTreeNode) {
        self.children.push(child);
    }

    /// Removes the first child with exactly the given name. Later siblings
    /// keep their relative order.
    ///
    /// # Examples
    ///
    /// ```
    /// # use felpatch_device_tree::model::DeviceTreeNode;
    /// let mut node = DeviceTreeNode::new("my-node");
    /// node.add_child(DeviceTreeNode::new("child"));
    /// let child = node.remove_child("child").unwrap();
    /// assert_eq!(child.name(), "child");
    /// assert!(node.child("child").is_none());
    /// ```
    pub fn remove_child(&mut self, name: &str) -> Option<DeviceTreeNode> {
        let index = self.children.iter().position(|c| c.name() == name)?;
        Some(self.children.remove(index))
    }

    /// Collapses repeated properties in this node and all of its
    /// descendants.
    ///
    /// When several properties share a name, only the last one is kept, at
    /// its own position. All surviving properties keep their relative order.
    ///
    /// # Examples
    ///
    /// ```
    /// # use felpatch_device_tree::model::{DeviceTreeNode, DeviceTreeProperty, PropertyValue};
    /// let mut node = DeviceTreeNode::builder("a")
    ///     .property(DeviceTreeProperty::new("x", PropertyValue::cells([1])))
    ///     .property(DeviceTreeProperty::new("y", PropertyValue::cells([2])))
    ///     .property(DeviceTreeProperty::new("x", PropertyValue::cells([3])))
    ///     .build();
    /// node.dedup_properties();
    /// let names: Vec<_> = node.properties().map(|p| p.name()).collect();
    /// assert_eq!(names, ["y", "x"]);
    /// assert_eq!(node.property("x").unwrap().value().as_u32(), Some(3));
    /// ```
    pub fn dedup_properties(&mut self) {
        let keep: Vec<bool> = {
            let mut last_index: IndexMap<&str, usize, xxhash64::State> =
                IndexMap::with_capacity_and_hasher(
                    self.properties.len(),
                    xxhash64::State::with_seed(0xdead_cafe),
                );
            for (index, property) in self.properties.iter().enumerate() {
                last_index.insert(property.name(), index);
            }
            self.properties
                .iter()
                .enumerate()
                .map(|(index, property)| last_index.get(property.name()) == Some(&index))
                .collect()
        };
        if keep.contains(&false) {
            let mut keep = keep.into_iter();
            self.properties.retain(|_| keep.next().unwrap_or(true));
        }

        for child in &mut self.children {
            child.dedup_properties();
        }
    }

    /// Merges `other` into this node the way repeated node definitions in
    /// device tree source are combined.
    ///
    /// Labels are added, properties are appended (duplicates are left for
    /// [`Self::dedup_properties`], which keeps the later definition), and
    /// children with a matching name are merged recursively.
    pub fn merge(&mut self, other: DeviceTreeNode) {
        for label in other.labels {
            self.add_label(label);
        }
        self.properties.extend(other.properties);
        for child in other.children {
            self.merge_child(child);
        }
    }

    fn merge_child(&mut self, child: DeviceTreeNode) {
        if let Some(existing) = self.child_mut(child.name()) {
            existing.merge(child);
        } else {
            self.children.push(child);
        }
    }

    pub(crate) fn for_each_node<F>(&self, f: &mut F)
    where
        F: FnMut(&DeviceTreeNode),
    {
        f(self);
        for child in &self.children {
            child.for_each_node(f);
        }
    }

    /// Returns the chain of child indices leading to the first node, in
    /// depth-first order, that carries `label`.
    pub(crate) fn find_label(&self, label: &str) -> Option<Vec<usize>> {
        if self.labels.iter().any(|l| l == label) {
            return Some(Vec::new());
        }
        for (index, child) in self.children.iter().enumerate() {
            if let Some(mut chain) = child.find_label(label) {
                chain.insert(0, index);
                return Some(chain);
            }
        }
        None
    }

    pub(crate) fn descendant_mut(&mut self, chain: &[usize]) -> Option<&mut DeviceTreeNode> {
        let mut node = self;
        for &index in chain {
            node = node.children.get_mut(index)?;
        }
        Some(node)
    }
}

/// A builder for creating [`DeviceTreeNode`]s.
#[derive(Debug, Default)]
pub struct DeviceTreeNodeBuilder {
    node: DeviceTreeNode,
}

impl DeviceTreeNodeBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            node: DeviceTreeNode::new(name),
        }
    }

    /// Adds a label to the node.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.node.add_label(label);
        self
    }

    /// Adds a property to the node.
    #[must_use]
    pub fn property(mut self, property: DeviceTreeProperty) -> Self {
        self.node.add_property(property);
        self
    }

    /// Adds a child to the node.
    #[must_use]
    pub fn child(mut self, child: DeviceTreeNode) -> Self {
        self.node.add_child(child);
        self
    }

    /// Builds the `DeviceTreeNode`.
    #[must_use]
    pub fn build(self) -> DeviceTreeNode {
        self.node
    }
}

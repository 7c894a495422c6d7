// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Reading device tree source (DTS) text.
//!
//! The accepted syntax is what `dtc` accepts after the C preprocessor has
//! run: `/dts-v1/;`, `/memreserve/`, root blocks, `&label { ... };`
//! extensions, `/delete-node/` and `/delete-property/`, labels, and property
//! values made of strings, cell lists, byte strings and references.
//! `/include/`, preprocessor directives and `/plugin/` overlays are rejected.

use alloc::borrow::ToOwned;
use alloc::vec;
use alloc::vec::Vec;

use crate::error::{ParseError, ParseErrorKind};
use crate::model::{DeviceTree, DeviceTreeNode, PropertyValue, Reference};

mod parser;

use parser::{BodyItem, Parser, TopItem};

/// Parses a complete device tree source file.
///
/// Node blocks are combined in source order: repeated definitions of a node
/// append their properties and merge their children. Repeated properties are
/// left in place for [`DeviceTree::dedup_properties`].
///
/// # Errors
///
/// Returns an error if the source is malformed, refers to an undefined label
/// or path, uses an unsupported construct, or has no root node.
pub fn parse(source: &str) -> Result<DeviceTree, ParseError> {
    let mut parser = Parser::new(source);
    let mut tree = DeviceTree::new(DeviceTreeNode::new(""));
    let mut has_root = false;

    while let Some((offset, item)) = parser.top_item()? {
        match item {
            TopItem::Version => {}
            TopItem::MemReserve(reservation) => tree.memory_reservations.push(reservation),
            TopItem::Root(items) => {
                apply_items(tree.root_mut(), items);
                has_root = true;
            }
            TopItem::Extend { target, items } => {
                let chain = resolve(tree.root(), &target)
                    .ok_or_else(|| unresolved(&parser, &target, offset))?;
                let node = tree
                    .root_mut()
                    .descendant_mut(&chain)
                    .ok_or_else(|| unresolved(&parser, &target, offset))?;
                apply_items(node, items);
            }
            TopItem::DeleteNode(target) => {
                let chain = resolve(tree.root(), &target)
                    .ok_or_else(|| unresolved(&parser, &target, offset))?;
                let Some((&index, parent)) = chain.split_last() else {
                    return Err(parser.error_at(
                        ParseErrorKind::Unsupported("deleting the root node"),
                        offset,
                    ));
                };
                if let Some(parent) = tree.root_mut().descendant_mut(parent) {
                    parent.children.remove(index);
                }
            }
            TopItem::Node { .. } => {
                return Err(parser.error_at(ParseErrorKind::Expected("`/` root node"), offset));
            }
        }
    }

    if !has_root {
        return Err(parser.error_at(ParseErrorKind::MissingRoot, source.len()));
    }
    Ok(tree)
}

/// Parses a standalone source fragment into the nodes it defines.
///
/// A fragment is either one or more top-level `[label:] name { ... };` nodes
/// or a `/ { ... };` block whose children are taken. The nodes are detached:
/// they cannot refer to labels or paths of the tree they will be inserted
/// into.
///
/// # Examples
///
/// ```
/// # use felpatch_device_tree::dts::parse_fragment;
/// let nodes = parse_fragment("panel: panel@0 { compatible = \"simple-panel\"; };").unwrap();
/// assert_eq!(nodes.len(), 1);
/// assert_eq!(nodes[0].name(), "panel@0");
/// assert_eq!(nodes[0].labels(), ["panel"]);
/// ```
///
/// # Errors
///
/// Returns an error if the fragment is malformed, contains references,
/// memory reservations or root properties, or defines no node at all.
pub fn parse_fragment(source: &str) -> Result<Vec<DeviceTreeNode>, ParseError> {
    let mut parser = Parser::new(source);
    let mut scratch = DeviceTreeNode::new("");

    while let Some((offset, item)) = parser.top_item()? {
        match item {
            TopItem::Version => {}
            TopItem::Root(items) => apply_items(&mut scratch, items),
            TopItem::Node {
                name,
                labels,
                items,
            } => apply_items(
                &mut scratch,
                vec![BodyItem::Child {
                    name,
                    labels,
                    items,
                }],
            ),
            TopItem::MemReserve(_) => {
                return Err(parser.error_at(
                    ParseErrorKind::Unsupported("/memreserve/ in a fragment"),
                    offset,
                ));
            }
            TopItem::Extend { .. } | TopItem::DeleteNode(_) => {
                return Err(parser.error_at(
                    ParseErrorKind::Unsupported("references in a fragment"),
                    offset,
                ));
            }
        }
    }

    if !scratch.properties.is_empty() {
        return Err(parser.error_at(
            ParseErrorKind::Unsupported("properties outside of a node in a fragment"),
            0,
        ));
    }
    if scratch.children.is_empty() {
        return Err(parser.error_at(ParseErrorKind::EmptyFragment, source.len()));
    }
    Ok(scratch.children)
}

/// Parses the right-hand side of a property assignment.
pub(crate) fn parse_value(source: &str) -> Result<PropertyValue, ParseError> {
    let mut parser = Parser::new(source);
    if parser.at_end()? {
        return Ok(PropertyValue::empty());
    }
    let value = parser.value()?;
    if parser.at_end()? {
        Ok(value)
    } else {
        Err(parser.unexpected())
    }
}

fn apply_items(node: &mut DeviceTreeNode, items: Vec<BodyItem>) {
    for item in items {
        match item {
            BodyItem::Property(property) => node.add_property(property),
            BodyItem::DeleteProperty(name) => node.properties.retain(|p| p.name() != name),
            BodyItem::DeleteNode(name) => node.children.retain(|c| c.name() != name),
            BodyItem::Child {
                name,
                labels,
                items,
            } => {
                let index = if let Some(index) = node.children.iter().position(|c| c.name() == name)
                {
                    index
                } else {
                    node.children.push(DeviceTreeNode::new(name));
                    node.children.len() - 1
                };
                let child = &mut node.children[index];
                for label in labels {
                    child.add_label(label);
                }
                apply_items(child, items);
            }
        }
    }
}

/// Resolves a reference to the chain of child indices leading to the node.
fn resolve(root: &DeviceTreeNode, target: &Reference) -> Option<Vec<usize>> {
    match target {
        Reference::Label(label) => root.find_label(label),
        Reference::Path(path) => {
            let mut chain = Vec::new();
            let mut node = root;
            for segment in path.split('/').filter(|s| !s.is_empty()) {
                let index = node.children.iter().position(|c| c.name() == segment)?;
                chain.push(index);
                node = &node.children[index];
            }
            Some(chain)
        }
    }
}

fn unresolved(parser: &Parser<'_>, target: &Reference, offset: usize) -> ParseError {
    let kind = match target {
        Reference::Label(label) => ParseErrorKind::UnknownLabel(label.to_owned()),
        Reference::Path(path) => ParseErrorKind::UnknownPath(path.to_owned()),
    };
    parser.error_at(kind, offset)
}

// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use alloc::string::{String, ToString};
use core::fmt;

use crate::model::{DeviceTree, DeviceTreeNode, DeviceTreeProperty};

const INDENT: usize = 4;

pub(crate) fn to_dts(tree: &DeviceTree) -> String {
    tree.to_string()
}

pub(crate) fn write_tree(f: &mut fmt::Formatter<'_>, tree: &DeviceTree) -> fmt::Result {
    writeln!(f, "/dts-v1/;")?;
    for reservation in &tree.memory_reservations {
        writeln!(f, "{reservation}")?;
    }
    writeln!(f)?;
    write_node(f, tree.root(), 0)
}

fn write_labels(f: &mut fmt::Formatter<'_>, labels: &[String]) -> fmt::Result {
    for label in labels {
        write!(f, "{label}: ")?;
    }
    Ok(())
}

fn write_node(f: &mut fmt::Formatter<'_>, node: &DeviceTreeNode, indent: usize) -> fmt::Result {
    write!(f, "{:indent$}", "", indent = indent)?;
    write_labels(f, node.labels())?;
    if node.name().is_empty() {
        writeln!(f, "/ {{")?;
    } else {
        writeln!(f, "{} {{", node.name())?;
    }

    for prop in node.properties() {
        write_property(f, prop, indent + INDENT)?;
    }

    for child in node.children() {
        writeln!(f)?;
        write_node(f, child, indent + INDENT)?;
    }

    writeln!(f, "{:indent$}}};", "", indent = indent)
}

fn write_property(
    f: &mut fmt::Formatter<'_>,
    prop: &DeviceTreeProperty,
    indent: usize,
) -> fmt::Result {
    write!(f, "{:indent$}", "", indent = indent)?;
    write_labels(f, prop.labels())?;
    if prop.value().is_empty() {
        writeln!(f, "{};", prop.name())
    } else {
        writeln!(f, "{} = {};", prop.name(), prop.value())
    }
}

#[cfg(test)]
mod tests {
    use crate::memreserve::MemoryReservation;
    use crate::model::{DeviceTree, DeviceTreeNode, DeviceTreeProperty, PropertyValue};

    #[test]
    fn prints_labels_and_reservations() {
        let mut tree = DeviceTree::new(
            DeviceTreeNode::builder("")
                .property(DeviceTreeProperty::new("model", PropertyValue::string("board")))
                .child(
                    DeviceTreeNode::builder("serial@1c28000")
                        .label("uart0")
                        .property(DeviceTreeProperty::flag("dma-coherent"))
                        .build(),
                )
                .build(),
        );
        tree.memory_reservations
            .push(MemoryReservation::new(0x4000_0000, 0x1000));

        assert_eq!(
            tree.to_dts(),
            r#"/dts-v1/;
/memreserve/ 0x40000000 0x1000;

/ {
    model = "board";

    uart0: serial@1c28000 {
        dma-coherent;
    };
};
"#
        );
    }
}

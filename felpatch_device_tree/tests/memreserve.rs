// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use felpatch_device_tree::MemoryReservation;
use felpatch_device_tree::model::DeviceTree;

#[test]
fn memreserve() {
    let source = r#"/dts-v1/;
/memreserve/ 0x1000 0x100;
/memreserve/ 8192 0x200;

/ {
};
"#;
    let tree = DeviceTree::from_dts(source).unwrap();

    assert_eq!(
        tree.memory_reservations,
        &[
            MemoryReservation::new(0x1000, 0x100),
            MemoryReservation::new(0x2000, 0x200)
        ]
    );

    let dts = tree.to_dts();
    assert!(dts.contains("/memreserve/ 0x1000 0x100;"));
    assert!(dts.contains("/memreserve/ 0x2000 0x200;"));

    let reparsed = DeviceTree::from_dts(&dts).unwrap();
    assert_eq!(reparsed, tree);
}

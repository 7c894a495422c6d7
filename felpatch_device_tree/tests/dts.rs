// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use felpatch_device_tree::dts::parse_fragment;
use felpatch_device_tree::error::ParseErrorKind;
use felpatch_device_tree::model::{Cell, DeviceTree, PropertyValue, Reference, ValueChunk};

const BOARD: &str = r#"/dts-v1/;

/ {
    #address-cells = <1>;
    #size-cells = <1>;
    model = "Example Board";
    compatible = "vendor,board", "allwinner,suniv-f1c100s";

    chosen {
        stdout-path = "serial0:115200n8";
    };

    soc {
        ranges;

        uart0: serial@1c25000 {
            compatible = "snps,dw-apb-uart";
            reg = <0x1c25000 0x400>;
            interrupts = <(1 + 0)>;
            clocks = <&ccu 38>;
            status = "disabled";
        };

        lcd@0 {
            mac-address = [00 11 22 33 44 55];
            widths = /bits/ 8 <1 2 'a'>;
        };
    };
};

&uart0 {
    status = "okay";
};

/ {
    aliases {
        serial0 = &uart0;
        mmc0 = &{/soc/lcd@0};
    };
};
"#;

#[test]
fn parses_board_source() {
    let tree = DeviceTree::from_dts(BOARD).unwrap();

    let root = tree.root();
    assert_eq!(root.property("#address-cells").unwrap().value().as_u32(), Some(1));
    assert_eq!(
        root.property("compatible").unwrap().value().chunks(),
        [
            ValueChunk::String("vendor,board".into()),
            ValueChunk::String("allwinner,suniv-f1c100s".into()),
        ]
    );

    let uart = tree.find_node("/soc/serial@1c25000").unwrap();
    assert_eq!(uart.labels(), ["uart0"]);
    assert_eq!(
        uart.property("reg").unwrap().value(),
        &PropertyValue::cells([0x1c2_5000, 0x400])
    );
    assert_eq!(
        uart.property("interrupts").unwrap().value().chunks(),
        [ValueChunk::Cells {
            bits: 32,
            cells: vec![Cell::Expression("(1 + 0)".into())],
        }]
    );
    assert_eq!(
        uart.property("clocks").unwrap().value().chunks(),
        [ValueChunk::Cells {
            bits: 32,
            cells: vec![Cell::Reference(Reference::Label("ccu".into())), Cell::Number(38)],
        }]
    );

    // The `&uart0` block appends a second `status`, which wins after dedup.
    let statuses: Vec<_> = uart
        .properties()
        .filter(|p| p.name() == "status")
        .map(|p| p.value().as_str().unwrap())
        .collect();
    assert_eq!(statuses, ["disabled", "okay"]);

    let lcd = tree.find_node("/soc/lcd@0").unwrap();
    assert_eq!(
        lcd.property("mac-address").unwrap().value(),
        &PropertyValue::bytes([0x00, 0x11, 0x22, 0x33, 0x44, 0x55])
    );
    assert_eq!(
        lcd.property("widths").unwrap().value().chunks(),
        [ValueChunk::Cells {
            bits: 8,
            cells: vec![Cell::Number(1), Cell::Number(2), Cell::Number(0x61)],
        }]
    );

    // The second root block merges into the first.
    let aliases = tree.find_node("/aliases").unwrap();
    assert_eq!(
        aliases.property("serial0").unwrap().value().chunks(),
        [ValueChunk::Reference(Reference::Label("uart0".into()))]
    );
    assert_eq!(
        aliases.property("mmc0").unwrap().value().chunks(),
        [ValueChunk::Reference(Reference::Path("/soc/lcd@0".into()))]
    );
    assert_eq!(root.children().count(), 3);
}

#[test]
fn round_trips_through_printer() {
    let tree = DeviceTree::from_dts(BOARD).unwrap();
    let printed = tree.to_dts();
    let reparsed = DeviceTree::from_dts(&printed).unwrap();
    assert_eq!(reparsed, tree);
    assert_eq!(reparsed.to_dts(), printed);
}

#[test]
fn strings_need_not_be_utf8() {
    let tree = DeviceTree::from_dts("/dts-v1/;\n/ { a { mac = \"\\xff\\x01\"; s = \"\\377\"; }; };")
        .unwrap();
    let node = tree.find_node("/a").unwrap();
    assert_eq!(
        node.property("mac").unwrap().value().chunks(),
        [ValueChunk::String(vec![0xff, 0x01])]
    );
    assert_eq!(node.property("mac").unwrap().value().as_str(), None);
    assert_eq!(
        node.property("s").unwrap().value().chunks(),
        [ValueChunk::String(vec![0xff])]
    );

    let printed = tree.to_dts();
    assert!(printed.contains(r#"mac = "\xff\x01";"#));
    assert!(printed.contains(r#"s = "\xff";"#));
    assert_eq!(DeviceTree::from_dts(&printed).unwrap(), tree);
}

#[test]
fn delete_directives() {
    let tree = DeviceTree::from_dts(
        r#"/dts-v1/;
/ {
    a: a { x = <1>; y = <2>; };
    b { };
    c { };
};
/ {
    a { /delete-property/ x; };
    /delete-node/ b;
};
/delete-node/ &{/c};
"#,
    )
    .unwrap();

    let a = tree.find_node("/a").unwrap();
    assert!(a.property("x").is_none());
    assert!(a.property("y").is_some());
    assert!(tree.find_node("/b").is_none());
    assert!(tree.find_node("/c").is_none());
}

#[test]
fn parse_errors() {
    let err = DeviceTree::from_dts("/dts-v1/;\n/ {\n    a = <1>\n};\n").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::Expected("`;` after property"));
    assert_eq!(err.line(), 4);

    let err = DeviceTree::from_dts("/dts-v1/;").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::MissingRoot);

    let err = DeviceTree::from_dts("/dts-v1/; / { a { };").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::UnexpectedEof);

    let err = DeviceTree::from_dts("/dts-v1/; / { }; &nope { };").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::UnknownLabel("nope".into()));

    let err = DeviceTree::from_dts("/dts-v1/; /plugin/; / { };").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::Unsupported("/plugin/ overlays"));

    let err = DeviceTree::from_dts("/dts-v1/; / { a = [123]; };").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::OddByteString);

    let err = DeviceTree::from_dts("/dts-v1/; / { a = /bits/ 12 <1>; };").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::InvalidBits(12));
}

#[test]
fn fragments() {
    let nodes = parse_fragment(
        r#"/dts-v1/;
panel: panel@0 {
    compatible = "simple-panel";
    port { };
};
backlight { };
"#,
    )
    .unwrap();
    let names: Vec<_> = nodes.iter().map(|n| n.name()).collect();
    assert_eq!(names, ["panel@0", "backlight"]);
    assert!(nodes[0].child("port").is_some());

    let nodes = parse_fragment("/ { leds { }; keys { }; };").unwrap();
    assert_eq!(nodes.len(), 2);

    let err = parse_fragment("/dts-v1/;").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::EmptyFragment);

    let err = parse_fragment("<malformed>").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::Expected("node"));

    let err = parse_fragment("&uart0 { };").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::Unsupported("references in a fragment"));
}

#[test]
fn property_values_from_str() {
    assert_eq!("".parse::<PropertyValue>().unwrap(), PropertyValue::empty());
    assert_eq!("<3>".parse::<PropertyValue>().unwrap(), PropertyValue::cells([3]));
    assert_eq!(
        r#""okay""#.parse::<PropertyValue>().unwrap(),
        PropertyValue::string("okay")
    );
    assert_eq!(
        "<1>, \"a\"".parse::<PropertyValue>().unwrap().to_string(),
        "<0x1>, \"a\""
    );
    assert!("<3".parse::<PropertyValue>().is_err());
    assert!("<3>;".parse::<PropertyValue>().is_err());
}

// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A library for parsing, patching and printing device tree source (DTS).
//!
//! This library provides:
//!
//! - A reader for device tree source text ([`dts`]).
//! - A read-write, in-memory tree model ([`model`]) with path addressing.
//! - Property deduplication that keeps the last definition of each name.
//! - A patch engine applying ordered structural edits ([`patch`]).
//! - Printing the tree back to device tree source.
//!
//! The library is written purely in Rust and is `#![no_std]` compatible, but
//! requires `alloc`.
//!
//! # Examples
//!
//! ```
//! use felpatch_device_tree::model::{DeviceTree, PropertyValue};
//! use felpatch_device_tree::patch::Instruction;
//!
//! let mut tree = DeviceTree::from_dts(
//!     "/dts-v1/;
//!      / {
//!          a {
//!              x = <1>;
//!              x = <2>;
//!          };
//!      };",
//! )
//! .unwrap();
//!
//! tree.patch(&[
//!     Instruction::DeleteProperty { path: "/a".into(), name: "x".into() },
//!     Instruction::InsertProperty {
//!         path: "/a".into(),
//!         name: "y".into(),
//!         value: PropertyValue::cells([3]),
//!     },
//! ])
//! .unwrap();
//!
//! let a = tree.find_node("/a").unwrap();
//! assert!(a.property("x").is_none());
//! assert_eq!(a.property("y").unwrap().value().as_u32(), Some(3));
//!
//! // Print the DTS
//! println!("{}", tree);
//! ```

#![no_std]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

extern crate alloc;

pub mod dts;
pub mod error;
pub mod memreserve;
pub mod model;
pub mod patch;
mod writer;

pub use memreserve::MemoryReservation;

// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::str::FromStr;

use crate::dts;
use crate::error::ParseError;

/// A mutable, in-memory representation of a device tree property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTreeProperty {
    name: String,
    labels: Vec<String>,
    value: PropertyValue,
}

impl DeviceTreeProperty {
    /// Creates a new `DeviceTreeProperty` with the given name and value.
    ///
    /// # Examples
    ///
    /// ```
    /// # use felpatch_device_tree::model::{DeviceTreeProperty, PropertyValue};
    /// let prop = DeviceTreeProperty::new("reg", PropertyValue::cells([0x1000, 0x100]));
    /// assert_eq!(prop.name(), "reg");
    /// assert_eq!(prop.value().to_string(), "<0x1000 0x100>");
    /// ```
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Self {
            name: name.into(),
            labels: Vec::new(),
            value: value.into(),
        }
    }

    /// Creates a presence-only (boolean) property.
    ///
    /// # Examples
    ///
    /// ```
    /// # use felpatch_device_tree::model::DeviceTreeProperty;
    /// let prop = DeviceTreeProperty::flag("dma-coherent");
    /// assert!(prop.value().is_empty());
    /// ```
    #[must_use]
    pub fn flag(name: impl Into<String>) -> Self {
        Self::new(name, PropertyValue::empty())
    }

    /// Returns the name of this property.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the labels attached to this property.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Attaches a label to this property, unless it is already present.
    pub fn add_label(&mut self, label: impl Into<String>) {
        let label = label.into();
        if !self.labels.contains(&label) {
            self.labels.push(label);
        }
    }

    /// Returns the value of this property.
    #[must_use]
    pub fn value(&self) -> &PropertyValue {
        &self.value
    }

    /// Sets the value of this property.
    pub fn set_value(&mut self, value: impl Into<PropertyValue>) {
        self.value = value.into();
    }
}

/// The value of a property: a sequence of comma-separated chunks.
///
/// An empty value is a presence-only property such as `dma-coherent;`. The
/// value is carried through parsing and printing without being interpreted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyValue {
    chunks: Vec<ValueChunk>,
}

impl PropertyValue {
    /// Returns an empty value.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns a value consisting of a single `<...>` list of 32-bit cells.
    #[must_use]
    pub fn cells(cells: impl IntoIterator<Item = u64>) -> Self {
        ValueChunk::Cells {
            bits: 32,
            cells: cells.into_iter().map(Cell::Number).collect(),
        }
        .into()
    }

    /// Returns a value consisting of a single string.
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        ValueChunk::String(value.into().into_bytes()).into()
    }

    /// Returns a value consisting of a single byte string.
    #[must_use]
    pub fn bytes(value: impl Into<Vec<u8>>) -> Self {
        ValueChunk::Bytes(value.into()).into()
    }

    /// Returns the chunks of this value.
    #[must_use]
    pub fn chunks(&self) -> &[ValueChunk] {
        &self.chunks
    }

    /// Returns whether this is a presence-only value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Appends a chunk to this value.
    pub fn push(&mut self, chunk: ValueChunk) {
        self.chunks.push(chunk);
    }

    /// Returns the value as a string, if it consists of exactly one string
    /// and that string is valid UTF-8.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self.chunks.as_slice() {
            [ValueChunk::String(s)] => core::str::from_utf8(s).ok(),
            _ => None,
        }
    }

    /// Returns the value as a `u32`, if it is a single 32-bit numeric cell.
    #[must_use]
    pub fn as_u32(&self) -> Option<u32> {
        match self.chunks.as_slice() {
            [
                ValueChunk::Cells {
                    bits: 32,
                    cells,
                },
            ] => match cells.as_slice() {
                [Cell::Number(n)] => u32::try_from(*n).ok(),
                _ => None,
            },
            _ => None,
        }
    }
}

impl From<ValueChunk> for PropertyValue {
    fn from(chunk: ValueChunk) -> Self {
        Self {
            chunks: alloc::vec![chunk],
        }
    }
}

impl From<Vec<ValueChunk>> for PropertyValue {
    fn from(chunks: Vec<ValueChunk>) -> Self {
        Self { chunks }
    }
}

impl FromStr for PropertyValue {
    type Err = ParseError;

    /// Parses the right-hand side of a property assignment, e.g. `<1 2>,
    /// "okay"`. An empty or blank string yields an empty value.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        dts::parse_value(s)
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, chunk) in self.chunks.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{chunk}")?;
        }
        Ok(())
    }
}

/// One comma-separated part of a property value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueChunk {
    /// A `<...>` cell list, with the element width given by `/bits/`.
    Cells {
        /// The width of each element in bits: 8, 16, 32 or 64.
        bits: u8,
        /// The elements.
        cells: Vec<Cell>,
    },
    /// A quoted string, as the bytes its escapes produce. These need not be
    /// valid UTF-8.
    String(Vec<u8>),
    /// A `[...]` byte string.
    Bytes(Vec<u8>),
    /// A reference outside of a cell list, which expands to a path string.
    Reference(Reference),
}

impl fmt::Display for ValueChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cells { bits, cells } => {
                if *bits != 32 {
                    write!(f, "/bits/ {bits} ")?;
                }
                write!(f, "<")?;
                for (i, cell) in cells.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{cell}")?;
                }
                write!(f, ">")
            }
            Self::String(s) => {
                write!(f, "\"")?;
                for chunk in s.utf8_chunks() {
                    for ch in chunk.valid().chars() {
                        match ch {
                            '"' => write!(f, "\\\"")?,
                            '\\' => write!(f, "\\\\")?,
                            '\n' => write!(f, "\\n")?,
                            '\t' => write!(f, "\\t")?,
                            '\r' => write!(f, "\\r")?,
                            c if c.is_ascii_control() => write!(f, "\\x{:02x}", u32::from(c))?,
                            c => write!(f, "{c}")?,
                        }
                    }
                    for byte in chunk.invalid() {
                        write!(f, "\\x{byte:02x}")?;
                    }
                }
                write!(f, "\"")
            }
            Self::Bytes(bytes) => {
                write!(f, "[")?;
                for (i, byte) in bytes.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{byte:02x}")?;
                }
                write!(f, "]")
            }
            Self::Reference(reference) => write!(f, "{reference}"),
        }
    }
}

/// A single element of a `<...>` cell list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    /// An integer literal.
    Number(u64),
    /// A phandle reference.
    Reference(Reference),
    /// A parenthesized expression or an unexpanded identifier, kept verbatim.
    Expression(String),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n:#x}"),
            Self::Reference(reference) => write!(f, "{reference}"),
            Self::Expression(expr) => write!(f, "{expr}"),
        }
    }
}

/// A reference to another node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// `&label`
    Label(String),
    /// `&{/path/to/node}`
    Path(String),
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Label(label) => write!(f, "&{label}"),
            Self::Path(path) => write!(f, "&{{{path}}}"),
        }
    }
}

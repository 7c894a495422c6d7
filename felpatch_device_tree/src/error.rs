// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Error types for the `felpatch_device_tree` crate.

use alloc::string::String;
use core::fmt;

/// An error that can occur when parsing device tree source.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct ParseError {
    offset: usize,
    line: usize,
    /// The type of the error that has occurred.
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub(crate) fn new(kind: ParseErrorKind, source: &str, offset: usize) -> Self {
        let offset = offset.min(source.len());
        let line = source.as_bytes()[..offset]
            .iter()
            .filter(|&&b| b == b'\n')
            .count()
            + 1;
        Self { offset, line, kind }
    }

    /// Returns the byte offset in the source at which the error was detected.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the 1-based line number at which the error was detected.
    #[must_use]
    pub fn line(&self) -> usize {
        self.line
    }
}

/// The kind of an error that can occur when parsing device tree source.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseErrorKind {
    /// The input ended in the middle of a construct.
    UnexpectedEof,
    /// A character that cannot start or continue the current construct.
    UnexpectedChar(char),
    /// A specific token was expected but something else was found.
    Expected(&'static str),
    /// An integer literal could not be parsed or does not fit.
    InvalidNumber,
    /// A string literal contains an invalid escape sequence.
    InvalidEscape,
    /// A `/bits/` directive with a width other than 8, 16, 32 or 64.
    InvalidBits(u64),
    /// A byte string has an odd number of hex digits.
    OddByteString,
    /// A `/.../` directive that is not known.
    UnknownDirective(String),
    /// A construct this parser intentionally does not handle.
    Unsupported(&'static str),
    /// A reference to a label that is not defined in the tree.
    UnknownLabel(String),
    /// A reference to a path that does not exist in the tree.
    UnknownPath(String),
    /// The source does not define a root node.
    MissingRoot,
    /// A fragment does not contain any node.
    EmptyFragment,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at line {} (offset {})",
            self.kind, self.line, self.offset
        )
    }
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof => write!(f, "unexpected end of input"),
            Self::UnexpectedChar(ch) => write!(f, "unexpected character {ch:?}"),
            Self::Expected(what) => write!(f, "expected {what}"),
            Self::InvalidNumber => write!(f, "invalid integer literal"),
            Self::InvalidEscape => write!(f, "invalid escape sequence"),
            Self::InvalidBits(bits) => write!(f, "invalid /bits/ width {bits}"),
            Self::OddByteString => write!(f, "odd number of digits in byte string"),
            Self::UnknownDirective(name) => write!(f, "unknown directive `{name}`"),
            Self::Unsupported(what) => write!(f, "{what} is not supported"),
            Self::UnknownLabel(label) => write!(f, "reference to undefined label `{label}`"),
            Self::UnknownPath(path) => write!(f, "reference to non-existent node `{path}`"),
            Self::MissingRoot => write!(f, "no root node"),
            Self::EmptyFragment => write!(f, "fragment contains no node"),
        }
    }
}

impl core::error::Error for ParseError {}

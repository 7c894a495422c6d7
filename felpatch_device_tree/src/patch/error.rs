// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use core::fmt;

use crate::error::ParseError;

/// An error that aborted a batch of patch instructions.
///
/// Instructions before [`PatchError::index`] have been applied and are not
/// rolled back; no instruction after it has run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct PatchError {
    index: usize,
    /// The type of the error that has occurred.
    pub kind: PatchErrorKind,
}

impl PatchError {
    pub(crate) fn new(kind: PatchErrorKind, index: usize) -> Self {
        Self { index, kind }
    }

    /// Returns the zero-based position of the failing instruction, which is
    /// also the number of instructions that were applied before it.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }
}

/// The kind of an error that can occur while applying a patch instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PatchErrorKind {
    /// The source fragment of an `InsertNode` instruction could not be
    /// parsed.
    MalformedFragment(ParseError),
}

impl fmt::Display for PatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "patch instruction #{} failed: {}", self.index, self.kind)
    }
}

impl fmt::Display for PatchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedFragment(err) => write!(f, "malformed node fragment: {err}"),
        }
    }
}

impl core::error::Error for PatchError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match &self.kind {
            PatchErrorKind::MalformedFragment(err) => Some(err),
        }
    }
}

// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A recursive-descent reader for device tree source text.

use alloc::borrow::ToOwned;
use alloc::string::String;
use alloc::vec::Vec;

use crate::error::{ParseError, ParseErrorKind};
use crate::memreserve::MemoryReservation;
use crate::model::{Cell, DeviceTreeProperty, PropertyValue, Reference, ValueChunk};

const PREPROCESSOR_DIRECTIVES: [&str; 11] = [
    "include", "define", "undef", "if", "ifdef", "ifndef", "elif", "else", "endif", "error",
    "pragma",
];

/// A statement inside a `{ ... }` node body, applied in order.
#[derive(Debug)]
pub(super) enum BodyItem {
    Property(DeviceTreeProperty),
    Child {
        name: String,
        labels: Vec<String>,
        items: Vec<BodyItem>,
    },
    DeleteProperty(String),
    DeleteNode(String),
}

/// A statement at the top level of a source file.
#[derive(Debug)]
pub(super) enum TopItem {
    Version,
    MemReserve(MemoryReservation),
    Root(Vec<BodyItem>),
    Extend {
        target: Reference,
        items: Vec<BodyItem>,
    },
    DeleteNode(Reference),
    /// A bare `name { ... };` node, only valid in fragments.
    Node {
        name: String,
        labels: Vec<String>,
        items: Vec<BodyItem>,
    },
}

#[derive(Debug)]
pub(super) struct Parser<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    pub(super) fn new(source: &'a str) -> Self {
        Self { source, pos: 0 }
    }

    pub(super) fn error_at(&self, kind: ParseErrorKind, offset: usize) -> ParseError {
        ParseError::new(kind, self.source, offset)
    }

    fn error(&self, kind: ParseErrorKind) -> ParseError {
        self.error_at(kind, self.pos)
    }

    /// An error describing whatever is at the current position.
    pub(super) fn unexpected(&self) -> ParseError {
        match self.rest().chars().next() {
            Some(ch) => self.error(ParseErrorKind::UnexpectedChar(ch)),
            None => self.error(ParseErrorKind::UnexpectedEof),
        }
    }

    fn expected(&self, what: &'static str) -> ParseError {
        if self.pos >= self.source.len() {
            self.error(ParseErrorKind::UnexpectedEof)
        } else {
            self.error(ParseErrorKind::Expected(what))
        }
    }

    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn peek_byte(&self) -> Option<u8> {
        self.source.as_bytes().get(self.pos).copied()
    }

    /// Skips whitespace, comments and `cpp` line markers.
    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            let rest = self.rest();
            let trimmed = rest.trim_start();
            self.pos += rest.len() - trimmed.len();

            if trimmed.starts_with("//") {
                self.pos += trimmed.find('\n').unwrap_or(trimmed.len());
            } else if let Some(comment) = trimmed.strip_prefix("/*") {
                let end = comment
                    .find("*/")
                    .ok_or_else(|| self.error_at(ParseErrorKind::UnexpectedEof, self.source.len()))?;
                self.pos += end + 4;
            } else if let Some(after) = trimmed.strip_prefix('#') {
                if after.starts_with([' ', '\t']) || after.starts_with(|c: char| c.is_ascii_digit())
                {
                    // # 12 "board.dts" 2
                    self.pos += trimmed.find('\n').unwrap_or(trimmed.len());
                } else if is_preprocessor_directive(after) {
                    return Err(self.error(ParseErrorKind::Unsupported(
                        "C preprocessor directives",
                    )));
                } else {
                    return Ok(());
                }
            } else {
                return Ok(());
            }
        }
    }

    /// Returns whether only trivia remains.
    pub(super) fn at_end(&mut self) -> Result<bool, ParseError> {
        self.skip_trivia()?;
        Ok(self.pos >= self.source.len())
    }

    fn peek(&mut self) -> Result<Option<u8>, ParseError> {
        self.skip_trivia()?;
        Ok(self.peek_byte())
    }

    fn eat(&mut self, byte: u8) -> Result<bool, ParseError> {
        if self.peek()? == Some(byte) {
            self.pos += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, byte: u8, what: &'static str) -> Result<(), ParseError> {
        if self.eat(byte)? {
            Ok(())
        } else {
            Err(self.expected(what))
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let len = rest.find(|c: char| !pred(c)).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    /// Takes at most `max` ASCII bytes matching `pred`.
    fn take_ascii(&mut self, max: usize, pred: impl Fn(u8) -> bool) -> &'a str {
        let rest = self.rest();
        let len = rest.bytes().take(max).take_while(|&b| pred(b)).count();
        self.pos += len;
        &rest[..len]
    }

    /// Consumes a `/name/` directive if one is next and returns its name.
    fn directive(&mut self) -> Result<Option<&'a str>, ParseError> {
        self.skip_trivia()?;
        let Some(after) = self.rest().strip_prefix('/') else {
            return Ok(None);
        };
        if !after.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return Ok(None);
        }
        let len = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
            .unwrap_or(after.len());
        if after.as_bytes().get(len) != Some(&b'/') {
            return Err(self.error_at(
                ParseErrorKind::Expected("`/` closing a directive"),
                self.pos + 1 + len,
            ));
        }
        self.pos += len + 2;
        Ok(Some(&after[..len]))
    }

    fn name(&mut self, what: &'static str) -> Result<&'a str, ParseError> {
        self.skip_trivia()?;
        let name = self.take_while(is_name_char);
        if name.is_empty() {
            Err(self.expected(what))
        } else {
            Ok(name)
        }
    }

    /// Reads any number of `label:` prefixes.
    fn labels(&mut self) -> Result<Vec<String>, ParseError> {
        let mut labels = Vec::new();
        loop {
            self.skip_trivia()?;
            let start = self.pos;
            let label = self.take_while(is_label_char);
            if !label.is_empty()
                && !label.starts_with(|c: char| c.is_ascii_digit())
                && self.peek_byte() == Some(b':')
            {
                self.pos += 1;
                labels.push(label.to_owned());
            } else {
                self.pos = start;
                return Ok(labels);
            }
        }
    }

    fn reference(&mut self) -> Result<Reference, ParseError> {
        self.expect(b'&', "`&`")?;
        if self.peek_byte() == Some(b'{') {
            self.pos += 1;
            let path = self.take_while(|c| c != '}');
            if self.peek_byte() != Some(b'}') {
                return Err(self.error(ParseErrorKind::UnexpectedEof));
            }
            self.pos += 1;
            Ok(Reference::Path(path.to_owned()))
        } else {
            let label = self.take_while(is_label_char);
            if label.is_empty() {
                return Err(self.expected("label after `&`"));
            }
            Ok(Reference::Label(label.to_owned()))
        }
    }

    fn number(&mut self) -> Result<u64, ParseError> {
        self.skip_trivia()?;
        let start = self.pos;
        let literal = self.take_while(|c| c.is_ascii_alphanumeric());
        if literal.is_empty() {
            return Err(self.expected("integer"));
        }
        parse_integer(literal).ok_or_else(|| self.error_at(ParseErrorKind::InvalidNumber, start))
    }

    /// Reads the rest of an escape sequence, after the backslash.
    fn escape(&mut self) -> Result<u8, ParseError> {
        let start = self.pos;
        let Some(ch) = self.rest().chars().next() else {
            return Err(self.error(ParseErrorKind::UnexpectedEof));
        };
        self.pos += ch.len_utf8();
        let invalid = |parser: &Self| parser.error_at(ParseErrorKind::InvalidEscape, start);
        let byte = match ch {
            'n' => b'\n',
            't' => b'\t',
            'r' => b'\r',
            'a' => 0x07,
            'b' => 0x08,
            'f' => 0x0c,
            'v' => 0x0b,
            '\\' => b'\\',
            '"' => b'"',
            '\'' => b'\'',
            'x' => {
                let digits = self.take_ascii(2, |b| b.is_ascii_hexdigit());
                u8::from_str_radix(digits, 16).map_err(|_| invalid(self))?
            }
            '0'..='7' => {
                self.pos = start;
                let digits = self.take_ascii(3, |b| (b'0'..=b'7').contains(&b));
                u8::from_str_radix(digits, 8).map_err(|_| invalid(self))?
            }
            _ => return Err(invalid(self)),
        };
        Ok(byte)
    }

    fn char_literal(&mut self) -> Result<u64, ParseError> {
        let start = self.pos;
        self.expect(b'\'', "`'`")?;
        let value = match self.rest().chars().next() {
            Some('\\') => {
                self.pos += 1;
                u64::from(self.escape()?)
            }
            Some('\'') | None => return Err(self.error_at(ParseErrorKind::InvalidNumber, start)),
            Some(ch) => {
                self.pos += ch.len_utf8();
                u64::from(u32::from(ch))
            }
        };
        if self.peek_byte() != Some(b'\'') {
            return Err(self.error(ParseErrorKind::Expected("closing `'`")));
        }
        self.pos += 1;
        Ok(value)
    }

    /// Reads a quoted string. Escapes may produce any byte, so the result
    /// need not be UTF-8.
    fn string(&mut self) -> Result<Vec<u8>, ParseError> {
        self.skip_trivia()?;
        self.expect(b'"', "string")?;
        let mut bytes = Vec::new();
        loop {
            let Some(ch) = self.rest().chars().next() else {
                return Err(self.error(ParseErrorKind::UnexpectedEof));
            };
            self.pos += ch.len_utf8();
            match ch {
                '"' => break,
                '\\' => bytes.push(self.escape()?),
                '\n' => {
                    return Err(
                        self.error_at(ParseErrorKind::Expected("closing `\"`"), self.pos - 1)
                    );
                }
                ch => {
                    let mut buf = [0; 4];
                    bytes.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                }
            }
        }
        Ok(bytes)
    }

    /// Reads a parenthesized expression verbatim.
    fn expression(&mut self) -> Result<&'a str, ParseError> {
        let start = self.pos;
        let mut depth = 0usize;
        for (i, b) in self.rest().bytes().enumerate() {
            match b {
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        self.pos = start + i + 1;
                        return Ok(&self.source[start..self.pos]);
                    }
                }
                _ => {}
            }
        }
        Err(self.error_at(ParseErrorKind::UnexpectedEof, self.source.len()))
    }

    fn cells(&mut self, bits: u8) -> Result<ValueChunk, ParseError> {
        self.expect(b'<', "`<`")?;
        let mut cells = Vec::new();
        loop {
            match self.peek()? {
                None => return Err(self.error(ParseErrorKind::UnexpectedEof)),
                Some(b'>') => {
                    self.pos += 1;
                    break;
                }
                Some(b'&') => cells.push(Cell::Reference(self.reference()?)),
                Some(b'(') => cells.push(Cell::Expression(self.expression()?.to_owned())),
                Some(b'\'') => cells.push(Cell::Number(self.char_literal()?)),
                Some(b) if b.is_ascii_digit() => cells.push(Cell::Number(self.number()?)),
                Some(b) if b.is_ascii_alphabetic() || b == b'_' => {
                    let ident = self.take_while(is_label_char);
                    cells.push(Cell::Expression(ident.to_owned()));
                }
                Some(_) => return Err(self.unexpected()),
            }
        }
        Ok(ValueChunk::Cells { bits, cells })
    }

    fn byte_string(&mut self) -> Result<ValueChunk, ParseError> {
        self.expect(b'[', "`[`")?;
        let mut bytes = Vec::new();
        loop {
            match self.peek()? {
                None => return Err(self.error(ParseErrorKind::UnexpectedEof)),
                Some(b']') => {
                    self.pos += 1;
                    break;
                }
                Some(b) if b.is_ascii_hexdigit() => {
                    let start = self.pos;
                    let digits = self.take_while(|c| c.is_ascii_hexdigit());
                    if digits.len() % 2 != 0 {
                        return Err(self.error_at(ParseErrorKind::OddByteString, start));
                    }
                    for i in (0..digits.len()).step_by(2) {
                        let byte = u8::from_str_radix(&digits[i..i + 2], 16)
                            .map_err(|_| self.error_at(ParseErrorKind::InvalidNumber, start + i))?;
                        bytes.push(byte);
                    }
                }
                Some(_) => return Err(self.unexpected()),
            }
        }
        Ok(ValueChunk::Bytes(bytes))
    }

    fn chunk(&mut self) -> Result<ValueChunk, ParseError> {
        let start = self.pos;
        if let Some(directive) = self.directive()? {
            if directive != "bits" {
                return Err(self.error_at(
                    ParseErrorKind::UnknownDirective(directive.to_owned()),
                    start,
                ));
            }
            let width_offset = self.pos;
            let bits = match self.number()? {
                8 => 8,
                16 => 16,
                32 => 32,
                64 => 64,
                other => {
                    return Err(self.error_at(ParseErrorKind::InvalidBits(other), width_offset));
                }
            };
            return self.cells(bits);
        }
        match self.peek()? {
            Some(b'"') => Ok(ValueChunk::String(self.string()?)),
            Some(b'<') => self.cells(32),
            Some(b'[') => self.byte_string(),
            Some(b'&') => Ok(ValueChunk::Reference(self.reference()?)),
            _ => Err(self.unexpected()),
        }
    }

    /// Reads a comma-separated property value.
    pub(super) fn value(&mut self) -> Result<PropertyValue, ParseError> {
        let mut value = PropertyValue::empty();
        loop {
            value.push(self.chunk()?);
            if !self.eat(b',')? {
                return Ok(value);
            }
        }
    }

    fn node_body(&mut self) -> Result<Vec<BodyItem>, ParseError> {
        self.expect(b'{', "`{`")?;
        let mut items = Vec::new();
        loop {
            match self.peek()? {
                None => return Err(self.error(ParseErrorKind::UnexpectedEof)),
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(items);
                }
                Some(_) => items.push(self.body_item()?),
            }
        }
    }

    fn body_item(&mut self) -> Result<BodyItem, ParseError> {
        self.skip_trivia()?;
        let start = self.pos;
        if let Some(directive) = self.directive()? {
            return match directive {
                "delete-property" => {
                    let name = self.name("property name")?.to_owned();
                    self.expect(b';', "`;`")?;
                    Ok(BodyItem::DeleteProperty(name))
                }
                "delete-node" => {
                    let name = self.name("node name")?.to_owned();
                    self.expect(b';', "`;`")?;
                    Ok(BodyItem::DeleteNode(name))
                }
                "omit-if-no-ref" => self.body_item(),
                other => Err(self.error_at(ParseErrorKind::UnknownDirective(other.to_owned()), start)),
            };
        }

        let labels = self.labels()?;
        let name = self.name("node or property name")?.to_owned();
        match self.peek()? {
            Some(b'{') => {
                let items = self.node_body()?;
                self.expect(b';', "`;` after node")?;
                Ok(BodyItem::Child {
                    name,
                    labels,
                    items,
                })
            }
            Some(b'=') => {
                self.pos += 1;
                let value = self.value()?;
                self.expect(b';', "`;` after property")?;
                Ok(BodyItem::Property(labelled_property(name, labels, value)))
            }
            Some(b';') => {
                self.pos += 1;
                Ok(BodyItem::Property(labelled_property(
                    name,
                    labels,
                    PropertyValue::empty(),
                )))
            }
            _ => Err(self.expected("`{`, `=` or `;`")),
        }
    }

    /// Reads the next top-level statement, with its offset.
    pub(super) fn top_item(&mut self) -> Result<Option<(usize, TopItem)>, ParseError> {
        let Some(next) = self.peek()? else {
            return Ok(None);
        };
        let start = self.pos;
        let item = if let Some(directive) = self.directive()? {
            match directive {
                "dts-v1" => {
                    self.expect(b';', "`;`")?;
                    TopItem::Version
                }
                "memreserve" => {
                    let address = self.number()?;
                    let size = self.number()?;
                    self.expect(b';', "`;`")?;
                    TopItem::MemReserve(MemoryReservation::new(address, size))
                }
                "delete-node" => {
                    let target = self.reference()?;
                    self.expect(b';', "`;`")?;
                    TopItem::DeleteNode(target)
                }
                "omit-if-no-ref" => return self.top_item(),
                "plugin" => {
                    return Err(self.error_at(ParseErrorKind::Unsupported("/plugin/ overlays"), start));
                }
                "include" => {
                    return Err(self.error_at(ParseErrorKind::Unsupported("/include/"), start));
                }
                other => {
                    return Err(
                        self.error_at(ParseErrorKind::UnknownDirective(other.to_owned()), start)
                    );
                }
            }
        } else if next == b'/' {
            self.pos += 1;
            let items = self.node_body()?;
            self.expect(b';', "`;` after node")?;
            TopItem::Root(items)
        } else if next == b'&' {
            let target = self.reference()?;
            let items = self.node_body()?;
            self.expect(b';', "`;` after node")?;
            TopItem::Extend { target, items }
        } else {
            let labels = self.labels()?;
            let name = self.name("node")?.to_owned();
            let items = self.node_body()?;
            self.expect(b';', "`;` after node")?;
            TopItem::Node {
                name,
                labels,
                items,
            }
        };
        Ok(Some((start, item)))
    }
}

fn labelled_property(name: String, labels: Vec<String>, value: PropertyValue) -> DeviceTreeProperty {
    let mut property = DeviceTreeProperty::new(name, value);
    for label in labels {
        property.add_label(label);
    }
    property
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, ',' | '.' | '_' | '+' | '*' | '#' | '?' | '@' | '-')
}

fn is_label_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_preprocessor_directive(after_hash: &str) -> bool {
    PREPROCESSOR_DIRECTIVES.iter().any(|directive| {
        after_hash
            .strip_prefix(directive)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(|c: char| c.is_ascii_whitespace()))
    })
}

/// Parses a C-style integer literal: decimal, `0x` hex or `0` octal, with
/// optional `U`/`L` suffixes.
fn parse_integer(literal: &str) -> Option<u64> {
    let digits = literal.trim_end_matches(['u', 'U', 'l', 'L']);
    let (digits, radix) = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        (hex, 16)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (&digits[1..], 8)
    } else {
        (digits, 10)
    };
    if digits.is_empty() {
        return None;
    }
    u64::from_str_radix(digits, radix).ok()
}

//! PDF object parser.
//!
//! Parses one PDF object starting at a given position, returning the object
//! and leaving the cursor just past it. The parser is a small state machine
//! over (buffer, cursor, fill callback) and works in two modes:
//!
//! - closed: over an in-memory byte slice (object stream payloads),
//! - incremental: over a random-access file, pulling more bytes into the
//!   buffer on demand so a dictionary followed by a multi-megabyte stream
//!   payload never requires buffering the whole file up front.
//!
//! Errors name the byte offset at which parsing stopped.

use std::io::{Read, Seek, SeekFrom};

use crate::error::{Error, Result};
use crate::object::{is_regular, is_whitespace, Dict, Object, ObjectRef, Stream};

/// Read the object at the given byte offset of a random-access file.
pub(crate) fn read_object_at<F: Read + Seek>(file: &mut F, offset: u64) -> Result<Object> {
    let mut parser = Parser::from_reader(file, offset)?;
    parser.parse_object()
}

/// Read the first object in the byte slice, returning it together with the
/// number of bytes consumed.
pub(crate) fn read_object_from(data: &[u8]) -> Result<(Object, usize)> {
    let mut parser = Parser::from_slice(data);
    let obj = parser.parse_object()?;
    Ok((obj, parser.offset()))
}

/// Fill callback: appends freshly read bytes to the buffer and returns how
/// many were added. Zero means end of input.
type FillFn<'a> = Box<dyn FnMut(&mut Vec<u8>) -> Result<usize> + 'a>;

/// Resumable object parser.
pub(crate) struct Parser<'a> {
    buf: Vec<u8>,
    pos: usize,
    offset: usize,
    fill: Option<FillFn<'a>>,
}

impl Parser<'static> {
    /// Parser over a closed in-memory slice.
    pub(crate) fn from_slice(data: &[u8]) -> Parser<'static> {
        Parser {
            buf: data.to_vec(),
            pos: 0,
            offset: 0,
            fill: None,
        }
    }
}

impl<'a> Parser<'a> {
    /// Parser over a random-access file, starting at `offset`. The file is
    /// read in small chunks as the parser needs more bytes.
    pub(crate) fn from_reader<F: Read + Seek>(file: &'a mut F, offset: u64) -> Result<Parser<'a>> {
        file.seek(SeekFrom::Start(offset))?;
        let mut chunk = [0u8; 256];
        Ok(Parser {
            buf: Vec::new(),
            pos: 0,
            offset: offset as usize,
            fill: Some(Box::new(move |buf: &mut Vec<u8>| {
                let n = file.read(&mut chunk)?;
                buf.extend_from_slice(&chunk[..n]);
                Ok(n)
            })),
        })
    }

    /// Absolute offset of the next unconsumed byte.
    pub(crate) fn offset(&self) -> usize {
        self.offset
    }

    fn err(&self, reason: impl Into<String>) -> Error {
        Error::Parse {
            offset: self.offset,
            reason: reason.into(),
        }
    }

    fn avail(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn fill_more(&mut self) -> Result<bool> {
        match &mut self.fill {
            None => Ok(false),
            Some(f) => Ok(f(&mut self.buf)? > 0),
        }
    }

    /// Make sure the byte at lookahead index `i` is buffered. Returns false
    /// if the input ends first.
    fn ensure(&mut self, i: usize) -> Result<bool> {
        while self.avail() <= i {
            if !self.fill_more()? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Require `n` buffered bytes.
    fn extend(&mut self, n: usize) -> Result<()> {
        if n == 0 || self.ensure(n - 1)? {
            Ok(())
        } else {
            Err(self.err("unexpected end of file"))
        }
    }

    fn skip(&mut self, n: usize) {
        self.pos += n;
        self.offset += n;
    }

    fn skip_whitespace(&mut self) -> Result<()> {
        loop {
            self.extend(1)?;
            if !is_whitespace(self.buf[self.pos]) {
                return Ok(());
            }
            self.skip(1);
        }
    }

    /// Skip whitespace; returns false if the input ended instead.
    fn skip_whitespace_opt(&mut self) -> Result<bool> {
        loop {
            if !self.ensure(0)? {
                return Ok(false);
            }
            if !is_whitespace(self.buf[self.pos]) {
                return Ok(true);
            }
            self.skip(1);
        }
    }

    /// Whether the keyword is next, terminated by a non-regular byte or the
    /// end of input. Does not consume.
    fn keyword_ahead(&mut self, kw: &[u8]) -> Result<bool> {
        let have_delim = self.ensure(kw.len())?;
        if self.avail() < kw.len() || &self.buf[self.pos..self.pos + kw.len()] != kw {
            return Ok(false);
        }
        if have_delim && is_regular(self.buf[self.pos + kw.len()]) {
            return Ok(false);
        }
        Ok(true)
    }

    /// Parse one object.
    pub(crate) fn parse_object(&mut self) -> Result<Object> {
        loop {
            self.extend(1)?;
            match self.buf[self.pos] {
                b if is_whitespace(b) => self.skip(1),
                b'%' => self.skip_comment()?,
                b'(' => {
                    self.skip(1);
                    return self.parse_literal_string();
                },
                b'<' => {
                    self.extend(2)?;
                    if self.buf[self.pos + 1] == b'<' {
                        self.skip(2);
                        return self.parse_dict();
                    }
                    self.skip(1);
                    return self.parse_hex_string();
                },
                b'>' => return Err(self.err("unexpected >")),
                b'/' => {
                    self.skip(1);
                    return self.parse_name();
                },
                b'[' => {
                    self.skip(1);
                    return self.parse_array();
                },
                b']' => return Err(self.err("unexpected ]")),
                b'-' | b'+' | b'0'..=b'9' => return self.parse_number_or_ref(),
                _ => return self.parse_word(),
            }
        }
    }

    fn skip_comment(&mut self) -> Result<()> {
        loop {
            if let Some(idx) = self.buf[self.pos..]
                .iter()
                .position(|&b| b == b'\r' || b == b'\n')
            {
                if self.buf[self.pos + idx] == b'\n' {
                    self.skip(idx + 1);
                } else if self.ensure(idx + 1)? && self.buf[self.pos + idx + 1] == b'\n' {
                    self.skip(idx + 2);
                } else {
                    self.skip(idx + 1);
                }
                return Ok(());
            }
            if !self.fill_more()? {
                return Err(self.err("unexpected end of file in comment"));
            }
        }
    }

    fn parse_literal_string(&mut self) -> Result<Object> {
        let mut accum = Vec::new();
        let mut parens = 1u32;
        loop {
            self.extend(1)?;
            let b = self.buf[self.pos];
            self.skip(1);
            match b {
                b'(' => {
                    parens += 1;
                    accum.push(b);
                },
                b')' => {
                    parens -= 1;
                    if parens == 0 {
                        return Ok(Object::String(accum));
                    }
                    accum.push(b);
                },
                b'\\' => self.parse_string_escape(&mut accum)?,
                b'\r' => {
                    // A lone CR (or CRLF) inside a string reads as LF.
                    if self.ensure(0)? && self.buf[self.pos] == b'\n' {
                        self.skip(1);
                    }
                    accum.push(b'\n');
                },
                _ => accum.push(b),
            }
        }
    }

    fn parse_string_escape(&mut self, accum: &mut Vec<u8>) -> Result<()> {
        self.extend(1)?;
        let b = self.buf[self.pos];
        self.skip(1);
        match b {
            b'n' => accum.push(b'\n'),
            b'r' => accum.push(b'\r'),
            b't' => accum.push(b'\t'),
            b'b' => accum.push(8),
            b'f' => accum.push(12),
            b'\r' => {
                // Escaped line break elides; swallow an LF after CR.
                if self.ensure(0)? && self.buf[self.pos] == b'\n' {
                    self.skip(1);
                }
            },
            b'\n' => {},
            b'0'..=b'7' => {
                // One to three octal digits; the value wraps modulo 256.
                let mut value = (b - b'0') as u32;
                for _ in 0..2 {
                    if !self.ensure(0)? {
                        break;
                    }
                    let d = self.buf[self.pos];
                    if !(b'0'..=b'7').contains(&d) {
                        break;
                    }
                    value = value * 8 + (d - b'0') as u32;
                    self.skip(1);
                }
                accum.push(value as u8);
            },
            _ => accum.push(b),
        }
        Ok(())
    }

    fn parse_hex_string(&mut self) -> Result<Object> {
        let mut accum = Vec::new();
        loop {
            self.extend(1)?;
            if self.buf[self.pos] == b'>' {
                self.skip(1);
                return Ok(Object::HexString(accum));
            }
            self.extend(2)?;
            let hi = hex_val(self.buf[self.pos])
                .ok_or_else(|| self.err("invalid character in hex string"))?;
            let lo = hex_val(self.buf[self.pos + 1])
                .ok_or_else(|| self.err("invalid character in hex string"))?;
            accum.push(hi * 16 + lo);
            self.skip(2);
        }
    }

    fn parse_name(&mut self) -> Result<Object> {
        let mut accum = Vec::new();
        loop {
            if !self.ensure(0)? {
                return Ok(Object::Name(accum));
            }
            let b = self.buf[self.pos];
            if !is_regular(b) {
                return Ok(Object::Name(accum));
            }
            if b == b'#' {
                self.extend(3)?;
                let hi = hex_val(self.buf[self.pos + 1])
                    .ok_or_else(|| self.err("invalid character in hex escape in /Name"))?;
                let lo = hex_val(self.buf[self.pos + 2])
                    .ok_or_else(|| self.err("invalid character in hex escape in /Name"))?;
                accum.push(hi * 16 + lo);
                self.skip(3);
            } else {
                accum.push(b);
                self.skip(1);
            }
        }
    }

    fn parse_array(&mut self) -> Result<Object> {
        let mut items = Vec::new();
        loop {
            self.skip_whitespace()?;
            if self.buf[self.pos] == b']' {
                self.skip(1);
                return Ok(Object::Array(items));
            }
            items.push(self.parse_object()?);
        }
    }

    fn parse_dict(&mut self) -> Result<Object> {
        let mut dict = Dict::new();
        loop {
            self.skip_whitespace()?;
            self.extend(2)?;
            if self.buf[self.pos] == b'>' && self.buf[self.pos + 1] == b'>' {
                self.skip(2);
                break;
            }
            let key = match self.parse_object()? {
                Object::Name(n) => n,
                _ => return Err(self.err("expected /Name in dictionary")),
            };
            let value = self.parse_object()?;
            if dict
                .insert(key.clone(), value)
                .is_some()
            {
                return Err(self.err(format!(
                    "duplicate key /{} in dictionary",
                    String::from_utf8_lossy(&key)
                )));
            }
        }
        // The dict may be the head of a stream. The keyword must be
        // followed by LF or CRLF; a bare CR demotes this back to a dict.
        if !self.skip_whitespace_opt()? {
            return Ok(Object::Dictionary(dict));
        }
        if !self.ensure(7)? {
            return Ok(Object::Dictionary(dict));
        }
        if &self.buf[self.pos..self.pos + 6] != b"stream" {
            return Ok(Object::Dictionary(dict));
        }
        match self.buf[self.pos + 6] {
            b'\n' => self.skip(7),
            b'\r' if self.buf[self.pos + 7] == b'\n' => self.skip(8),
            _ => return Ok(Object::Dictionary(dict)),
        }
        self.parse_stream_payload(dict)
    }

    fn parse_stream_payload(&mut self, dict: Dict) -> Result<Object> {
        // The parser has no resolver, so /Length must be a plain integer.
        let size = match dict.get(b"Length") {
            Some(Object::Integer(n)) if *n >= 0 => *n as usize,
            Some(Object::Reference(_)) => {
                return Err(self.err("stream /Length is an indirect reference"))
            },
            _ => return Err(self.err("invalid Length for stream")),
        };
        self.extend(size)?;
        let data = self.buf[self.pos..self.pos + size].to_vec();
        self.skip(size);
        // Skip the expected newline before "endstream".
        if self.ensure(0)? {
            if self.buf[self.pos] == b'\r' {
                if self.ensure(1)? && self.buf[self.pos + 1] == b'\n' {
                    self.skip(2);
                } else {
                    self.skip(1);
                }
            } else if self.buf[self.pos] == b'\n' {
                self.skip(1);
            }
        }
        if !self.keyword_ahead(b"endstream")? {
            return Err(self.err("expected \"endstream\" at end of stream"));
        }
        self.skip(9);
        Ok(Object::Stream(Stream::new(dict, data)))
    }

    fn parse_word(&mut self) -> Result<Object> {
        if self.keyword_ahead(b"null")? {
            self.skip(4);
            return Ok(Object::Null);
        }
        if self.keyword_ahead(b"true")? {
            self.skip(4);
            return Ok(Object::Boolean(true));
        }
        if self.keyword_ahead(b"false")? {
            self.skip(5);
            return Ok(Object::Boolean(false));
        }
        Err(self.err("unexpected bare word"))
    }

    /// A byte that starts a number may begin an integer, a real, a
    /// reference (`N G R`), or a numbered object (`N G obj … endobj`).
    /// Look ahead to decide.
    fn parse_number_or_ref(&mut self) -> Result<Object> {
        if self.buf[self.pos].is_ascii_digit() {
            if let Some((number, generation, len, is_obj)) = self.scan_ref_or_obj()? {
                self.skip(len);
                if !is_obj {
                    return Ok(Object::Reference(ObjectRef::new(number, generation)));
                }
                let obj = self.parse_object()?;
                self.skip_whitespace_opt()?;
                if self.keyword_ahead(b"endobj")? {
                    self.skip(6);
                    return Ok(obj);
                }
                return Err(self.err("expected \"endobj\" after indirect object"));
            }
        }
        self.parse_number()
    }

    /// Match `uint WS uint WS (R|obj) <delim>` ahead of the cursor without
    /// consuming. Returns the numbers, the byte length up to and including
    /// the keyword, and whether the keyword was `obj`.
    fn scan_ref_or_obj(&mut self) -> Result<Option<(u32, u16, usize, bool)>> {
        let mut i = 0;
        let start = i;
        loop {
            if !self.ensure(i)? || !self.buf[self.pos + i].is_ascii_digit() {
                break;
            }
            i += 1;
        }
        if i == start {
            return Ok(None);
        }
        let number: u32 = match std::str::from_utf8(&self.buf[self.pos..self.pos + i])
            .ok()
            .and_then(|s| s.parse().ok())
        {
            Some(n) => n,
            None => return Ok(None),
        };
        let ws = i;
        loop {
            if !self.ensure(i)? || !is_whitespace(self.buf[self.pos + i]) {
                break;
            }
            i += 1;
        }
        if i == ws {
            return Ok(None);
        }
        let gen_start = i;
        loop {
            if !self.ensure(i)? || !self.buf[self.pos + i].is_ascii_digit() {
                break;
            }
            i += 1;
        }
        if i == gen_start {
            return Ok(None);
        }
        let generation: u16 = match std::str::from_utf8(&self.buf[self.pos + gen_start..self.pos + i])
            .ok()
            .and_then(|s| s.parse().ok())
        {
            Some(g) => g,
            None => return Ok(None),
        };
        let ws2 = i;
        loop {
            if !self.ensure(i)? || !is_whitespace(self.buf[self.pos + i]) {
                break;
            }
            i += 1;
        }
        if i == ws2 || !self.ensure(i)? {
            return Ok(None);
        }
        match self.buf[self.pos + i] {
            b'R' => {
                if !self.ensure(i + 1)? || is_regular(self.buf[self.pos + i + 1]) {
                    return Ok(None);
                }
                Ok(Some((number, generation, i + 1, false)))
            },
            b'o' => {
                if !self.ensure(i + 2)? || &self.buf[self.pos + i..self.pos + i + 3] != b"obj" {
                    return Ok(None);
                }
                if !self.ensure(i + 3)? || is_regular(self.buf[self.pos + i + 3]) {
                    return Ok(None);
                }
                Ok(Some((number, generation, i + 3, true)))
            },
            _ => Ok(None),
        }
    }

    fn parse_number(&mut self) -> Result<Object> {
        let mut i = 0;
        loop {
            if !self.ensure(i)? || !is_regular(self.buf[self.pos + i]) {
                break;
            }
            i += 1;
        }
        let text = std::str::from_utf8(&self.buf[self.pos..self.pos + i])
            .map_err(|_| self.err("invalid numeric constant"))?;
        if let Ok(n) = text.parse::<i64>() {
            self.skip(i);
            return Ok(Object::Integer(n));
        }
        if let Ok(f) = text.parse::<f64>() {
            self.skip(i);
            return Ok(Object::Real(f));
        }
        Err(self.err("invalid numeric constant"))
    }
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'A'..=b'F' => Some(b - b'A' + 10),
        b'a'..=b'f' => Some(b - b'a' + 10),
        _ => None,
    }
}

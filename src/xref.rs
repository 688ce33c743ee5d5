//! Cross-reference resolution.
//!
//! A PDF carries one or more cross-reference sections chained newest to
//! oldest through `/Prev`: classic tables (20-byte text records) and, from
//! PDF 1.5 on, compressed xref streams. All sections merge into one dense
//! table under a first-read-wins rule, so the newest update wins. Trailer
//! and xref-stream dictionary keys merge into the document `Info` under the
//! same rule, except the keys that belong to xref mechanics.

use std::io::{Read, Seek};

use lazy_static::lazy_static;

use crate::document::Pdf;
use crate::error::{Error, Result};
use crate::object::Object;
use crate::parser;

/// One slot of the cross-reference table, indexed by object number.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum XrefSlot {
    /// No section supplied an entry for this object number.
    Absent,
    /// Free-list entry.
    Free {
        /// Object number of the next free slot
        next: u32,
        /// Generation the slot will have when reused
        generation: u16,
    },
    /// Object stored directly in the file.
    Direct {
        /// Byte offset of the object
        offset: u64,
        /// Generation number
        generation: u16,
        /// Parsed object, populated on first access
        cache: Option<Object>,
    },
    /// Object compressed inside an object stream.
    InStream {
        /// Object number of the containing stream
        stream: u32,
        /// Index of the object within the stream
        index: u32,
        /// Parsed object, populated on first access
        cache: Option<Object>,
    },
    /// Object created or updated in memory, not yet written.
    Pending(Object),
}

/// Dictionary keys that belong to xref/stream mechanics and are never
/// merged into the document `Info`.
const INFO_SKIP_KEYS: &[&[u8]] = &[
    b"Type",
    b"Length",
    b"Filter",
    b"DecodeParms",
    b"F",
    b"FFilter",
    b"FDecodeParms",
    b"DL",
    b"Prev",
    b"XRefStm",
    b"Index",
    b"W",
];

lazy_static! {
    /// `startxref <n> %%EOF` at the end of the file, any line terminators.
    static ref STARTXREF_RE: regex::bytes::Regex = regex::bytes::Regex::new(
        r"(?:\r\n|\r|\n)startxref(?:\r\n|\r|\n)(\d+)(?:\r\n|\r|\n)%%EOF(?:\r\n|\r|\n)?$"
    )
    .unwrap();
}

impl<F: Read + Seek> Pdf<F> {
    /// Read every cross-reference section and build the merged table.
    pub(crate) fn read_xref(&mut self) -> Result<()> {
        self.read_startxref()?;
        let mut addr = self.start;
        let mut depth = 0;
        while addr != 0 {
            depth += 1;
            if depth > 100 {
                return Err(Error::Structure(
                    "xref /Prev chain depth exceeded 100".to_string(),
                ));
            }
            addr = self.read_xref_section(addr)?;
        }
        Ok(())
    }

    /// Find the `startxref` keyword near the end of the file and read the
    /// offset of the newest cross-reference section.
    pub(crate) fn read_startxref(&mut self) -> Result<()> {
        let end = self.file.seek(std::io::SeekFrom::End(0))?;
        let take = end.min(64);
        let mut buf = vec![0u8; take as usize];
        self.read_at(&mut buf, end - take)?;
        let caps = STARTXREF_RE.captures(&buf).ok_or_else(|| {
            Error::Structure("no \"startxref\" found at end of file".to_string())
        })?;
        self.start = std::str::from_utf8(&caps[1])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| Error::Structure("invalid startxref offset".to_string()))?;
        Ok(())
    }

    /// Read the section at `addr`, returning the address of the next older
    /// section (zero for the oldest).
    fn read_xref_section(&mut self, addr: u64) -> Result<u64> {
        let mut buf = [0u8; 5];
        let n = self.read_at(&mut buf, addr)?;
        if n < 5 {
            return Err(Error::Structure(format!(
                "truncated xref section at offset {}",
                addr
            )));
        }
        if &buf[..4] == b"xref" && (buf[4] == b'\r' || buf[4] == b'\n') {
            log::debug!("classic xref table at offset {}", addr);
            self.read_xref_table(addr)
        } else {
            log::debug!("xref stream at offset {}", addr);
            self.read_xref_stream(addr)
        }
    }

    /// Read a classic cross-reference table and its trailer.
    fn read_xref_table(&mut self, addr: u64) -> Result<u64> {
        let mut addr = addr;
        let mut buf = [0u8; 20];
        // Skip the "xref" line.
        if self.read_at(&mut buf[..6], addr)? < 6 {
            return Err(Error::Structure(format!(
                "truncated xref table at offset {}",
                addr
            )));
        }
        addr += if buf[4] == b'\r' && buf[5] == b'\n' { 6 } else { 5 };
        // Subsections until the "trailer" keyword.
        loop {
            let n = self.read_at(&mut buf, addr)?;
            if n >= 8 && buf.starts_with(b"trailer") && (buf[7] == b'\r' || buf[7] == b'\n') {
                addr += if buf[7] == b'\r' && n >= 9 && buf[8] == b'\n' {
                    9
                } else {
                    8
                };
                break;
            }
            if n < 20 {
                return Err(Error::Structure(format!(
                    "truncated xref table at offset {}",
                    addr
                )));
            }
            addr = self.read_xref_table_section(addr, &buf)?;
        }
        // Merge the trailer dictionary into Info, except the keys that are
        // xref mechanics. Prev is returned; XRefStm points at an xref
        // stream that is read here but does not advance the chain.
        let obj = parser::read_object_at(&mut self.file, addr)
            .map_err(|e| Error::Structure(format!("reading trailer dict at offset {}: {}", addr, e)))?;
        let dict = match obj {
            Object::Dictionary(d) => d,
            _ => {
                return Err(Error::Structure(format!(
                    "expected dict after \"trailer\" at offset {}",
                    addr
                )))
            },
        };
        let mut prev = 0;
        for (key, val) in dict.iter() {
            match key.as_slice() {
                b"Prev" => {
                    prev = val.expect_integer(&format!(
                        "value of /Prev in trailer dict at offset {}",
                        addr
                    ))? as u64;
                },
                b"XRefStm" => {
                    let at = val.expect_integer(&format!(
                        "value of /XRefStm in trailer dict at offset {}",
                        addr
                    ))? as u64;
                    self.read_xref_stream(at)?;
                },
                k if INFO_SKIP_KEYS.iter().any(|s| *s == k) => {},
                _ => self.merge_info(key, val),
            }
        }
        Ok(prev)
    }

    /// Read one table subsection: a `firstObjNum count` header line
    /// followed by exactly `count` 20-byte records.
    fn read_xref_table_section(&mut self, addr: u64, header: &[u8; 20]) -> Result<u64> {
        let eol = header
            .iter()
            .position(|&b| b == b'\r' || b == b'\n')
            .ok_or_else(|| {
                Error::Structure(format!(
                    "invalid cross-reference table section header at offset {}",
                    addr
                ))
            })?;
        let text = std::str::from_utf8(&header[..eol]).map_err(|_| {
            Error::Structure(format!(
                "invalid cross-reference table section header at offset {}",
                addr
            ))
        })?;
        let mut parts = text.split_whitespace();
        let (start, count) = match (
            parts.next().and_then(|s| s.parse::<usize>().ok()),
            parts.next().and_then(|s| s.parse::<usize>().ok()),
        ) {
            (Some(s), Some(c)) => (s, c),
            _ => {
                return Err(Error::Structure(format!(
                    "invalid cross-reference table section header at offset {}",
                    addr
                )))
            },
        };
        let mut addr = addr
            + eol as u64
            + if header[eol] == b'\r' && eol + 1 < header.len() && header[eol + 1] == b'\n' {
                2
            } else {
                1
            };
        if self.xref.len() < start + count {
            self.xref.resize(start + count, XrefSlot::Absent);
        }
        for i in 0..count {
            // Entries already present come from a newer section and win.
            if !matches!(self.xref[start + i], XrefSlot::Absent) {
                addr += 20;
                continue;
            }
            let mut line = [0u8; 20];
            let n = self.read_at(&mut line, addr)?;
            if n < 18 {
                return Err(Error::Structure(format!(
                    "reading cross-reference table entry at offset {}",
                    addr
                )));
            }
            let first = parse_decimal(&line[..10]).ok_or_else(|| {
                Error::Structure(format!(
                    "invalid cross-reference table entry at offset {}",
                    addr
                ))
            })?;
            let generation = parse_decimal(&line[11..16]).ok_or_else(|| {
                Error::Structure(format!(
                    "invalid cross-reference table entry at offset {}",
                    addr
                ))
            })? as u16;
            self.xref[start + i] = match line[17] {
                b'n' => XrefSlot::Direct {
                    offset: first,
                    generation,
                    cache: None,
                },
                b'f' => XrefSlot::Free {
                    next: first as u32,
                    generation,
                },
                _ => {
                    return Err(Error::Structure(format!(
                        "invalid cross-reference table entry at offset {}",
                        addr
                    )))
                },
            };
            addr += 20;
        }
        Ok(addr)
    }

    /// Read a cross-reference stream and merge its entries.
    fn read_xref_stream(&mut self, addr: u64) -> Result<u64> {
        let obj = parser::read_object_at(&mut self.file, addr).map_err(|e| {
            Error::Structure(format!("reading xref stream at offset {}: {}", addr, e))
        })?;
        let mut stream = match obj {
            Object::Stream(s) => s,
            _ => {
                return Err(Error::Structure(format!(
                    "expected xref stream at offset {}",
                    addr
                )))
            },
        };
        if stream.dict.get(b"Type").and_then(|o| o.as_name()) != Some(&b"XRef"[..]) {
            return Err(Error::Structure(format!(
                "expected /Type /XRef in xref stream at offset {}",
                addr
            )));
        }
        let mut prev = 0u64;
        let mut index: Option<Vec<u64>> = None;
        let mut size: Option<u64> = None;
        let mut widths: Option<[usize; 3]> = None;
        for (key, val) in stream.dict.iter() {
            match key.as_slice() {
                b"Prev" => {
                    prev = val.expect_integer(&format!(
                        "value of /Prev in xref stream at offset {}",
                        addr
                    ))? as u64;
                },
                b"Index" => {
                    let list = val.as_array().ok_or_else(|| {
                        Error::Structure(format!(
                            "value of /Index should be an array in xref stream at offset {}",
                            addr
                        ))
                    })?;
                    let mut pairs = Vec::with_capacity(list.len());
                    for entry in list {
                        let v = entry.as_integer().filter(|v| *v >= 0).ok_or_else(|| {
                            Error::Structure(format!(
                                "element of /Index is not a non-negative integer in xref stream at offset {}",
                                addr
                            ))
                        })?;
                        pairs.push(v as u64);
                    }
                    if pairs.len() < 2 || pairs.len() % 2 != 0 {
                        return Err(Error::Structure(format!(
                            "invalid number of elements in /Index in xref stream at offset {}",
                            addr
                        )));
                    }
                    index = Some(pairs);
                },
                b"Size" => {
                    size = Some(val.expect_integer(&format!(
                        "value of /Size in xref stream at offset {}",
                        addr
                    ))? as u64);
                    self.merge_info(key, val);
                },
                b"W" => {
                    let list = val.as_array().ok_or_else(|| {
                        Error::Structure(format!(
                            "value of /W should be an array in xref stream at offset {}",
                            addr
                        ))
                    })?;
                    if list.len() != 3 {
                        return Err(Error::Structure(format!(
                            "value of /W should be an array of length 3 in xref stream at offset {}",
                            addr
                        )));
                    }
                    let mut w = [0usize; 3];
                    for (slot, entry) in w.iter_mut().zip(list) {
                        *slot = entry.as_integer().filter(|v| *v >= 0).ok_or_else(|| {
                            Error::Structure(format!(
                                "element of /W is not a non-negative integer in xref stream at offset {}",
                                addr
                            ))
                        })? as usize;
                    }
                    widths = Some(w);
                },
                k if INFO_SKIP_KEYS.iter().any(|s| *s == k) => {},
                _ => self.merge_info(key, val),
            }
        }
        let widths = widths.ok_or_else(|| {
            Error::Structure(format!("missing /W in xref stream at offset {}", addr))
        })?;
        let index = match index {
            Some(pairs) => pairs,
            None => {
                let size = size.ok_or_else(|| {
                    Error::Structure(format!(
                        "missing both /Index and /Size in xref stream at offset {}",
                        addr
                    ))
                })?;
                vec![0, size]
            },
        };
        let row = widths[0] + widths[1] + widths[2];
        stream.decode(row).map_err(|e| {
            Error::Structure(format!(
                "decompressing xref stream at offset {}: {}",
                addr, e
            ))
        })?;
        // Grow the table to cover the highest object number referenced.
        let max = index
            .chunks(2)
            .map(|pair| (pair[0] + pair[1]) as usize)
            .max()
            .unwrap_or(0);
        if self.xref.len() < max {
            self.xref.resize(max, XrefSlot::Absent);
        }
        let data = stream.data.clone();
        let mut pos = 0usize;
        for pair in index.chunks(2) {
            let (start, count) = (pair[0] as usize, pair[1] as usize);
            for i in start..start + count {
                if pos + row > data.len() {
                    return Err(Error::Structure(format!(
                        "truncated cross-reference stream at offset {}",
                        addr
                    )));
                }
                // A zero-width type field defaults to 1 (a direct object).
                let xtype = stream_field(&data, &mut pos, widths[0], 1);
                let f2 = stream_field(&data, &mut pos, widths[1], 0);
                let f3 = stream_field(&data, &mut pos, widths[2], 0);
                let slot = match xtype {
                    0 => XrefSlot::Free {
                        next: f2 as u32,
                        generation: f3 as u16,
                    },
                    1 => XrefSlot::Direct {
                        offset: f2,
                        generation: f3 as u16,
                        cache: None,
                    },
                    2 => XrefSlot::InStream {
                        stream: f2 as u32,
                        index: f3 as u32,
                        cache: None,
                    },
                    t => {
                        return Err(Error::Structure(format!(
                            "invalid type {} in xref stream at offset {}, index {}",
                            t, addr, i
                        )))
                    },
                };
                if matches!(self.xref[i], XrefSlot::Absent) {
                    self.xref[i] = slot;
                }
            }
        }
        if pos != data.len() {
            return Err(Error::Structure(format!(
                "extra data left in cross-reference stream at offset {}",
                addr
            )));
        }
        Ok(prev)
    }

    /// First-write-wins merge into the document `Info`.
    fn merge_info(&mut self, key: &[u8], val: &Object) {
        if self.info.get(key).is_none() {
            self.info.insert(key.to_vec(), val.clone());
        }
    }
}

/// Parse an unsigned ASCII decimal field (possibly zero-padded).
fn parse_decimal(bytes: &[u8]) -> Option<u64> {
    std::str::from_utf8(bytes).ok()?.parse().ok()
}

/// Read one fixed-width big-endian field of an xref stream entry, using
/// `default` when the width is zero.
fn stream_field(data: &[u8], pos: &mut usize, width: usize, default: u64) -> u64 {
    if width == 0 {
        return default;
    }
    let mut value = 0u64;
    for _ in 0..width {
        value = (value << 8) | data[*pos] as u64;
        *pos += 1;
    }
    value
}

//! The PDF object store.
//!
//! [`Pdf`] wraps a random-access file and exposes the document as a lazy
//! graph of indirect objects: objects are parsed from the file the first
//! time they are referenced, cached in the cross-reference table, and
//! transparently unpacked from compressed object streams.
//!
//! The store is a single-owner, synchronous component. All operations run
//! on the caller's control flow; the only blocking points are the file
//! reads and writes the current call performs.

use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom};

use crate::error::{Error, Result};
use crate::object::{Dict, Object, ObjectRef, Stream};
use crate::parser::{self, Parser};
use crate::xref::XrefSlot;

/// An open PDF document.
///
/// The file handle is held for the lifetime of the store; the caller closes
/// it after the last call. Opening requires read and random access, and
/// [`Pdf::write`] additionally requires the handle to be writable.
#[derive(Debug)]
pub struct Pdf<F> {
    pub(crate) file: F,
    /// Byte offset of the newest cross-reference section.
    pub(crate) start: u64,
    pub(crate) xref: Vec<XrefSlot>,
    /// Trailer metadata merged from every xref section, newest wins.
    pub info: Dict,
    /// The document catalog (the dictionary `Info["Root"]` points at).
    pub catalog: Dict,
    pub(crate) updates: HashMap<ObjectRef, Object>,
}

impl<F: Read + Seek> Pdf<F> {
    /// Open a PDF file: verify the header, resolve the cross-reference
    /// sections, and load the document catalog.
    pub fn open(file: F) -> Result<Self> {
        let mut pdf = Pdf {
            file,
            start: 0,
            xref: Vec::new(),
            info: Dict::new(),
            catalog: Dict::new(),
            updates: HashMap::new(),
        };
        pdf.verify_signature()?;
        pdf.read_xref()?;
        let root = match pdf.info.get(b"Root") {
            Some(Object::Reference(r)) => *r,
            Some(other) => {
                return Err(Error::Structure(format!(
                    "document Root is {}, not a Reference",
                    other.type_name()
                )))
            },
            None => {
                return Err(Error::Structure(
                    "document Root is missing, not a Reference".to_string(),
                ))
            },
        };
        match pdf
            .get(root)
            .map_err(|e| Error::Structure(format!("reading document catalog: {}", e)))?
        {
            Object::Dictionary(d) => pdf.catalog = d,
            other => {
                return Err(Error::Structure(format!(
                    "document catalog is {}, not a Dictionary",
                    other.type_name()
                )))
            },
        }
        Ok(pdf)
    }

    /// Consume the store and hand back the underlying file handle.
    pub fn into_file(self) -> F {
        self.file
    }

    fn verify_signature(&mut self) -> Result<()> {
        let mut buf = [0u8; 5];
        self.file.seek(SeekFrom::Start(0))?;
        self.file.read_exact(&mut buf).map_err(|_| Error::NotPdf)?;
        if &buf != b"%PDF-" {
            return Err(Error::NotPdf);
        }
        Ok(())
    }

    /// Read up to `buf.len()` bytes at the given offset. Returns the number
    /// of bytes read, which is smaller only at end of file.
    pub(crate) fn read_at(&mut self, buf: &mut [u8], offset: u64) -> Result<usize> {
        self.file.seek(SeekFrom::Start(offset))?;
        let mut total = 0;
        while total < buf.len() {
            let n = self.file.read(&mut buf[total..])?;
            if n == 0 {
                break;
            }
            total += n;
        }
        Ok(total)
    }

    /// Return the object the reference points at.
    ///
    /// Objects registered with [`Pdf::update`] or [`Pdf::create`] are
    /// visible here before they are written. Everything else is read from
    /// the file on first use and cached; the returned object is a clone of
    /// the cached one (stream payloads share storage).
    pub fn get(&mut self, r: ObjectRef) -> Result<Object> {
        if let Some(obj) = self.updates.get(&r) {
            return Ok(obj.clone());
        }
        let n = r.number as usize;
        if r.number < 1 || n >= self.xref.len() {
            return Err(Error::OutOfRange {
                number: r.number,
                max: self.xref.len().saturating_sub(1) as u32,
            });
        }
        enum Fetch {
            Direct(u64),
            InStream(u32, u32),
        }
        let fetch = match &self.xref[n] {
            XrefSlot::Absent => return Ok(Object::Null),
            XrefSlot::Free { .. } => return Err(Error::FreeObject(r.number)),
            XrefSlot::Pending(obj) => return Ok(obj.clone()),
            XrefSlot::Direct {
                offset,
                generation,
                cache,
            } => {
                if *generation != r.generation {
                    return Err(Error::GenerationMismatch {
                        number: r.number,
                        have: *generation,
                        requested: r.generation,
                    });
                }
                if let Some(cached) = cache {
                    return Ok(cached.clone());
                }
                Fetch::Direct(*offset)
            },
            XrefSlot::InStream {
                stream,
                index,
                cache,
            } => {
                if r.generation != 0 {
                    return Err(Error::CompressedGeneration(r.number));
                }
                if let Some(cached) = cache {
                    return Ok(cached.clone());
                }
                Fetch::InStream(*stream, *index)
            },
        };
        let obj = match fetch {
            Fetch::Direct(offset) => parser::read_object_at(&mut self.file, offset)?,
            Fetch::InStream(stream_num, index) => {
                let container = self.get(ObjectRef::new(stream_num, 0)).map_err(|e| {
                    Error::Structure(format!(
                        "reading stream {} containing object {}: {}",
                        stream_num, r.number, e
                    ))
                })?;
                let mut stream = match container {
                    Object::Stream(s) => s,
                    other => {
                        return Err(Error::Structure(format!(
                            "reading stream {} containing object {}: object {} is {}, not a Stream",
                            stream_num,
                            r.number,
                            stream_num,
                            other.type_name()
                        )))
                    },
                };
                stream.decode(0)?;
                extract_object_from_stream(&stream, index).map_err(|e| {
                    Error::Structure(format!(
                        "extracting object {} from stream {} at index {}: {}",
                        r.number, stream_num, index, e
                    ))
                })?
            },
        };
        match &mut self.xref[n] {
            XrefSlot::Direct { cache, .. } | XrefSlot::InStream { cache, .. } => {
                *cache = Some(obj.clone())
            },
            _ => {},
        }
        Ok(obj)
    }

    /// Get the array the reference points at.
    pub fn get_array(&mut self, r: ObjectRef) -> Result<Vec<Object>> {
        match self.get(r)? {
            Object::Array(a) => Ok(a),
            other => Err(Error::ObjectType {
                expected: "Array",
                found: other.type_name(),
            }),
        }
    }

    /// Get the dictionary the reference points at.
    pub fn get_dict(&mut self, r: ObjectRef) -> Result<Dict> {
        match self.get(r)? {
            Object::Dictionary(d) => Ok(d),
            other => Err(Error::ObjectType {
                expected: "Dictionary",
                found: other.type_name(),
            }),
        }
    }

    /// Get the stream the reference points at.
    pub fn get_stream(&mut self, r: ObjectRef) -> Result<Stream> {
        match self.get(r)? {
            Object::Stream(s) => Ok(s),
            other => Err(Error::ObjectType {
                expected: "Stream",
                found: other.type_name(),
            }),
        }
    }

    /// Get the literal string the reference points at.
    pub fn get_string(&mut self, r: ObjectRef) -> Result<Vec<u8>> {
        match self.get(r)? {
            Object::String(s) => Ok(s),
            other => Err(Error::ObjectType {
                expected: "String",
                found: other.type_name(),
            }),
        }
    }
}

/// Locate and parse one object inside a decoded object stream.
///
/// The payload begins with `N` pairs of integers `(objNum, relativeOffset)`;
/// the object at `index` starts at `First + relativeOffset`.
fn extract_object_from_stream(stream: &Stream, index: u32) -> Result<Object> {
    match stream.dict.get(b"Type").and_then(|o| o.as_name()) {
        Some(b"ObjStm") => {},
        _ => return Err(Error::Structure("stream is not an object stream".to_string())),
    }
    let n = stream
        .dict
        .get(b"N")
        .and_then(|o| o.as_integer())
        .ok_or_else(|| Error::Structure("object stream missing N value".to_string()))?;
    if (index as i64) >= n {
        return Err(Error::Structure(
            "index out of range for object stream".to_string(),
        ));
    }
    let first = stream
        .dict
        .get(b"First")
        .and_then(|o| o.as_integer())
        .ok_or_else(|| Error::Structure("object stream missing First value".to_string()))?
        as usize;
    let mut header = Parser::from_slice(&stream.data);
    for _ in 0..(2 * index + 1) {
        let at = header.offset();
        if header.parse_object()?.as_integer().is_none() {
            return Err(Error::Structure(format!(
                "expected integer in object stream header at offset {}",
                at
            )));
        }
    }
    let at = header.offset();
    let rel = header.parse_object()?.as_integer().ok_or_else(|| {
        Error::Structure(format!(
            "expected integer in object stream header at offset {}",
            at
        ))
    })? as usize;
    let start = first + rel;
    if start > stream.data.len() {
        return Err(Error::Structure(
            "object offset is past the end of the object stream".to_string(),
        ));
    }
    let (obj, _) = parser::read_object_from(&stream.data[start..])?;
    Ok(obj)
}

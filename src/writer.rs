//! Incremental updates.
//!
//! Updated and newly created objects are collected in a dirty set and
//! appended to the end of the file as one incremental revision: the object
//! bodies, an xref stream describing them, and a new `startxref` tail. The
//! original bytes of the file are never touched.

use std::io::{Read, Seek, SeekFrom, Write};

use crate::document::Pdf;
use crate::error::Result;
use crate::object::{is_regular, Object, ObjectRef};
use crate::xref::XrefSlot;

impl<F: Read + Seek> Pdf<F> {
    /// Register new content for the object with the given reference. The
    /// new content is written when [`Pdf::write`] is called.
    pub fn update(&mut self, r: ObjectRef, obj: Object) {
        // Keep a pending slot (a created object) in step with its newest
        // content so lookups through the table agree with the dirty set.
        if let Some(slot) = self.xref.get_mut(r.number as usize) {
            if matches!(slot, XrefSlot::Pending(_)) {
                *slot = XrefSlot::Pending(obj.clone());
            }
        }
        self.updates.insert(r, obj);
    }

    /// Create a new object with the given content and return a reference
    /// to it. The object is written when [`Pdf::write`] is called.
    pub fn create(&mut self, obj: Object) -> ObjectRef {
        let r = ObjectRef::new(self.xref.len() as u32, 0);
        self.xref.push(XrefSlot::Pending(obj.clone()));
        self.updates.insert(r, obj);
        r
    }

    /// Number of objects in the dirty set.
    pub fn pending_updates(&self) -> usize {
        self.updates.len()
    }
}

impl<F: Read + Seek + Write> Pdf<F> {
    /// Append one incremental revision holding every object registered
    /// with [`Pdf::update`] or [`Pdf::create`].
    ///
    /// The revision consists of `num gen obj … endobj` records in
    /// ascending object number, an xref stream, and the trailing
    /// `startxref` marker. Callers that need further revisions should
    /// reopen the file.
    pub fn write(&mut self) -> Result<()> {
        if self.updates.is_empty() {
            return Ok(());
        }
        let mut offset = self.file.seek(SeekFrom::End(0))?;
        let mut entries: Vec<(ObjectRef, Object)> = self
            .updates
            .iter()
            .map(|(r, obj)| (*r, obj.clone()))
            .collect();
        entries.sort_by_key(|(r, _)| r.number);
        let mut offsets = Vec::with_capacity(entries.len());
        for (r, obj) in &entries {
            offsets.push(offset);
            let mut buf = Vec::new();
            buf.extend_from_slice(format!("{} {} obj ", r.number, r.generation).as_bytes());
            serialize_object(&mut buf, obj);
            buf.extend_from_slice(b" endobj\r\n");
            self.file.write_all(&buf)?;
            offset += buf.len() as u64;
        }
        let xref_offset = offset;
        let xref_num = self.xref.len() as u32;

        let mut buf = Vec::new();
        buf.extend_from_slice(format!("{} 0 obj ", xref_num).as_bytes());
        serialize_object(&mut buf, &Object::Dictionary(self.xref_stream_dict(&entries, xref_num)));
        buf.extend_from_slice(b" stream\r\n");
        for ((r, _), off) in entries.iter().zip(&offsets) {
            buf.push(1);
            buf.extend_from_slice(&(*off as u32).to_be_bytes());
            buf.push(r.generation as u8);
        }
        buf.push(1);
        buf.extend_from_slice(&(xref_offset as u32).to_be_bytes());
        buf.push(0);
        buf.extend_from_slice(b"\r\nendstream endobj\r\n");
        buf.extend_from_slice(format!("startxref\r\n{}\r\n%%EOF\r\n", xref_offset).as_bytes());
        self.file.write_all(&buf)?;
        self.file.flush()?;
        Ok(())
    }

    /// Build the dictionary of the appended xref stream: the document
    /// `Info` plus the bookkeeping entries for this revision.
    fn xref_stream_dict(&self, entries: &[(ObjectRef, Object)], xref_num: u32) -> crate::object::Dict {
        let mut dict = self.info.clone();
        // The second element of /ID is per-save; refresh it only where an
        // ID pair already exists.
        if let Some(Object::Array(id)) = dict.get_mut(b"ID") {
            if id.len() == 2 {
                id[1] = Object::HexString(uuid::Uuid::new_v4().into_bytes().to_vec());
            }
        }
        dict.insert("Prev", Object::Integer(self.start as i64));
        dict.insert(
            "Length",
            Object::Integer(6 * (entries.len() as i64 + 1)),
        );
        dict.insert("Type", Object::Name(b"XRef".to_vec()));
        let mut index = Vec::with_capacity(2 * (entries.len() + 1));
        for (r, _) in entries {
            index.push(Object::Integer(r.number as i64));
            index.push(Object::Integer(1));
        }
        index.push(Object::Integer(xref_num as i64));
        index.push(Object::Integer(1));
        dict.insert("Index", Object::Array(index));
        dict.insert("Size", Object::Integer(xref_num as i64 + 1));
        dict.insert(
            "W",
            Object::Array(vec![
                Object::Integer(1),
                Object::Integer(4),
                Object::Integer(1),
            ]),
        );
        dict
    }
}

/// Serialize one object in PDF syntax.
pub(crate) fn serialize_object(out: &mut Vec<u8>, obj: &Object) {
    match obj {
        Object::Null => out.extend_from_slice(b"null"),
        Object::Boolean(true) => out.extend_from_slice(b"true"),
        Object::Boolean(false) => out.extend_from_slice(b"false"),
        Object::Integer(i) => out.extend_from_slice(i.to_string().as_bytes()),
        Object::Real(r) => out.extend_from_slice(format!("{:.6}", r).as_bytes()),
        Object::String(s) => encode_string(out, s),
        Object::HexString(h) => {
            out.push(b'<');
            for b in h {
                out.extend_from_slice(format!("{:02x}", b).as_bytes());
            }
            out.push(b'>');
        },
        Object::Name(n) => encode_name(out, n),
        Object::Array(items) => {
            out.extend_from_slice(b"[ ");
            for (i, item) in items.iter().enumerate() {
                if i != 0 {
                    out.push(b' ');
                }
                serialize_object(out, item);
            }
            out.extend_from_slice(b" ]");
        },
        Object::Dictionary(dict) => serialize_dict(out, dict),
        Object::Stream(stream) => {
            let mut dict = stream.dict.clone();
            dict.insert("Length", Object::Integer(stream.data.len() as i64));
            serialize_dict(out, &dict);
            out.extend_from_slice(b" stream\n");
            out.extend_from_slice(&stream.data);
            out.extend_from_slice(b"\nendstream");
        },
        Object::Reference(r) => {
            out.extend_from_slice(format!("{} {} R", r.number, r.generation).as_bytes())
        },
    }
}

fn serialize_dict(out: &mut Vec<u8>, dict: &crate::object::Dict) {
    out.extend_from_slice(b"<<");
    for (key, value) in dict.iter() {
        out.push(b' ');
        encode_name(out, key);
        out.push(b' ');
        serialize_object(out, value);
    }
    out.extend_from_slice(b" >>");
}

/// Encode a literal string: CRs, backslashes, and parentheses escaped,
/// everything else literal, the whole parenthesized.
pub(crate) fn encode_string(out: &mut Vec<u8>, s: &[u8]) {
    out.push(b'(');
    for &b in s {
        match b {
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\\' | b'(' | b')' => {
                out.push(b'\\');
                out.push(b);
            },
            _ => out.push(b),
        }
    }
    out.push(b')');
}

/// Encode a name: slash-prefixed, `#HH` for bytes outside the regular set
/// (and for `#` itself, so parse and encode round-trip).
pub(crate) fn encode_name(out: &mut Vec<u8>, name: &[u8]) {
    out.push(b'/');
    for &b in name {
        if is_regular(b) && b != b'#' {
            out.push(b);
        } else {
            out.extend_from_slice(format!("#{:02X}", b).as_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Dict, Stream};
    use crate::parser::read_object_from;

    fn serialized(obj: &Object) -> Vec<u8> {
        let mut out = Vec::new();
        serialize_object(&mut out, obj);
        out
    }

    #[test]
    fn test_serialize_scalars() {
        assert_eq!(serialized(&Object::Null), b"null");
        assert_eq!(serialized(&Object::Boolean(true)), b"true");
        assert_eq!(serialized(&Object::Boolean(false)), b"false");
        assert_eq!(serialized(&Object::Integer(-42)), b"-42");
        assert_eq!(serialized(&Object::Real(3.14)), b"3.140000");
    }

    #[test]
    fn test_serialize_string_escapes() {
        assert_eq!(serialized(&Object::String(b"a(b)c\\d".to_vec())), b"(a\\(b\\)c\\\\d)");
        assert_eq!(serialized(&Object::String(b"a\rb".to_vec())), b"(a\\rb)");
        assert_eq!(serialized(&Object::String(b"a\nb".to_vec())), b"(a\nb)");
    }

    #[test]
    fn test_serialize_hex_string() {
        assert_eq!(serialized(&Object::HexString(vec![0xde, 0xad, 0x01])), b"<dead01>");
    }

    #[test]
    fn test_serialize_name_escapes() {
        assert_eq!(serialized(&Object::Name(b"Type".to_vec())), b"/Type");
        assert_eq!(serialized(&Object::Name(b"A B".to_vec())), b"/A#20B");
        assert_eq!(serialized(&Object::Name(b"A#B".to_vec())), b"/A#23B");
        assert_eq!(serialized(&Object::Name(vec![0x0a])), b"/#0A");
    }

    #[test]
    fn test_serialize_array_and_reference() {
        let arr = Object::Array(vec![
            Object::Integer(1),
            Object::Reference(ObjectRef::new(7, 0)),
        ]);
        assert_eq!(serialized(&arr), b"[ 1 7 0 R ]");
    }

    #[test]
    fn test_serialize_stream_forces_length() {
        let mut dict = Dict::new();
        dict.insert("Length", Object::Integer(999));
        let stream = Object::Stream(Stream::new(dict, b"abcd".to_vec()));
        let out = serialized(&stream);
        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("/Length 4"));
        assert!(text.ends_with("stream\nabcd\nendstream"));
    }

    #[test]
    fn test_name_parse_encode_round_trip() {
        for wire in [&b"/A#20B"[..], b"/Simple", b"/A#23B", b"/#00"] {
            let (obj, _) = read_object_from(&[wire, b" "].concat()).unwrap();
            assert_eq!(serialized(&obj), wire, "round-tripping {:?}", wire);
        }
    }

    #[test]
    fn test_string_parse_encode_round_trip() {
        for wire in [&b"(simple)"[..], b"(with \\r cr)", b"(par\\(en\\))", b"(back\\\\slash)"] {
            let (obj, _) = read_object_from(wire).unwrap();
            assert_eq!(serialized(&obj), wire, "round-tripping {:?}", wire);
        }
    }

    #[test]
    fn test_hex_parse_encode_round_trip() {
        let (obj, _) = read_object_from(b"<dead01>").unwrap();
        assert_eq!(serialized(&obj), b"<dead01>");
    }

    #[test]
    fn test_serialized_objects_reparse() {
        let mut dict = Dict::new();
        dict.insert("A", Object::Integer(1));
        dict.insert("Nested", Object::Array(vec![Object::Name(b"X Y".to_vec())]));
        let original = Object::Dictionary(dict);
        let mut out = serialized(&original);
        out.push(b' ');
        let (reparsed, _) = read_object_from(&out).unwrap();
        assert_eq!(reparsed, original);
    }
}

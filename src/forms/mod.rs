//! Interactive form fields.
//!
//! Reads and writes the fillable AcroForm fields of a PDF: hierarchical
//! lookup by dotted field name, value mutation for text, checkbox, radio,
//! and choice fields, and appearance-stream regeneration so edited values
//! render in viewers.

use std::collections::HashMap;
use std::io::{Read, Seek};

use crate::document::Pdf;
use crate::error::{Error, Result};
use crate::object::{Dict, Object, ObjectRef};

mod checkbox;
mod choice;
mod clone;
mod radio;
mod text;

pub use clone::clone_page;

/// Return a map from fully qualified field name (dotted `/T` path) to
/// field value for all fields in the PDF.
pub fn get_fields<F: Read + Seek>(pdf: &mut Pdf<F>) -> Result<HashMap<String, String>> {
    let mut fields = HashMap::new();
    let form = match pdf.catalog.get(b"AcroForm").cloned() {
        None => return Ok(fields),
        Some(Object::Dictionary(d)) => d,
        Some(Object::Reference(r)) => pdf
            .get_dict(r)
            .map_err(|e| Error::Structure(format!("reading form: {}", e)))?,
        Some(_) => {
            return Err(Error::Structure(
                "AcroForm entry in catalog is not a Dict".to_string(),
            ))
        },
    };
    let list = match form.get(b"Fields") {
        None => return Ok(fields),
        Some(Object::Array(a)) => a.clone(),
        Some(_) => {
            return Err(Error::Structure(
                "AcroForm/Fields is not an Array".to_string(),
            ))
        },
    };
    for (i, field) in list.iter().enumerate() {
        collect_field(pdf, &mut fields, field, &mut Vec::new())
            .map_err(|e| Error::Structure(format!("AcroForm/Fields[{}]: {}", i, e)))?;
    }
    Ok(fields)
}

/// Walk one field (and its kids), adding `(name, value)` pairs for each
/// terminal field. The name is the dotted concatenation of the `/T`
/// entries along the path; a field without `/T` contributes nothing.
fn collect_field<F: Read + Seek>(
    pdf: &mut Pdf<F>,
    fields: &mut HashMap<String, String>,
    obj: &Object,
    path: &mut Vec<Dict>,
) -> Result<()> {
    let field = match obj {
        Object::Reference(r) => pdf.get_dict(*r)?,
        Object::Dictionary(d) => d.clone(),
        _ => return Err(Error::Structure("not a Dict".to_string())),
    };
    let kids = match field.get(b"Kids") {
        None => Vec::new(),
        Some(Object::Reference(r)) => {
            let r = *r;
            pdf.get_array(r)
                .map_err(|e| Error::Structure(format!("Kids: {}", e)))?
        },
        Some(Object::Array(a)) => a.clone(),
        Some(_) => return Err(Error::Structure("Kids: not an Array".to_string())),
    };
    path.push(field);
    if !kids.is_empty() {
        for (i, kid) in kids.iter().enumerate() {
            collect_field(pdf, fields, kid, path)
                .map_err(|e| Error::Structure(format!("Kids[{}]: {}", i, e)))?;
        }
        path.pop();
        return Ok(());
    }
    let mut name = String::new();
    let mut value = String::new();
    for (i, f) in path.iter().enumerate() {
        match f.get(b"T") {
            None => {},
            Some(Object::String(t)) => {
                name.push('.');
                name.push_str(&String::from_utf8_lossy(t));
            },
            Some(_) => {
                return Err(Error::Structure(format!("path[{}]/T is not a string", i)))
            },
        }
        match f.get(b"V") {
            None => {},
            Some(Object::String(v)) => value = String::from_utf8_lossy(v).into_owned(),
            Some(Object::Name(v)) => value = String::from_utf8_lossy(v).into_owned(),
            Some(_) => {
                return Err(Error::Structure(format!(
                    "path[{}]/V is not a string or Name",
                    i
                )))
            },
        }
    }
    if !name.is_empty() {
        fields.insert(name[1..].to_string(), value);
    }
    path.pop();
    Ok(())
}

/// Set the value of the named field. The change does not reach the file
/// until [`Pdf::write`] is called.
///
/// `font_size` is used for text fields whose default appearance carries a
/// zero (auto) font size; it is ignored otherwise.
pub fn set_field<F: Read + Seek>(
    pdf: &mut Pdf<F>,
    name: &str,
    value: &str,
    font_size: f64,
) -> Result<()> {
    let form = match pdf.catalog.get(b"AcroForm").cloned() {
        None => return Err(Error::Field("PDF does not have any form fields".to_string())),
        Some(Object::Reference(r)) => pdf
            .get_dict(r)
            .map_err(|e| Error::Structure(format!("AcroForm: {}", e)))?,
        Some(Object::Dictionary(d)) => d,
        Some(_) => return Err(Error::Structure("AcroForm is not a Dict".to_string())),
    };
    let mut fields = match form.get(b"Fields") {
        None => return Err(Error::Field("PDF does not have any form fields".to_string())),
        Some(Object::Reference(r)) => {
            let r = *r;
            pdf.get_array(r)
                .map_err(|e| Error::Structure(format!("AcroForm[Fields]: {}", e)))?
        },
        Some(Object::Array(a)) => a.clone(),
        Some(_) => {
            return Err(Error::Structure(
                "AcroForm[Fields] is not an Array".to_string(),
            ))
        },
    };
    let mut remaining = name;
    'descend: loop {
        for i in 0..fields.len() {
            let field_ref = fields[i].as_reference().ok_or_else(|| {
                Error::Structure("AcroForm[Fields] element is not a Reference".to_string())
            })?;
            let field = pdf
                .get_dict(field_ref)
                .map_err(|e| Error::Structure(format!("AcroForm[Fields][{}]: {}", i, e)))?;
            let t = match field.get(b"T") {
                Some(Object::String(t)) => t.clone(),
                _ => {
                    return Err(Error::Structure(format!(
                        "AcroForm[Fields][{}][T] is not a string",
                        i
                    )))
                },
            };
            let (want, rest) = match remaining.split_once('.') {
                Some((w, r)) => (w, Some(r)),
                None => (remaining, None),
            };
            if t.as_slice() != want.as_bytes() {
                continue;
            }
            if let Some(rest) = rest {
                remaining = rest;
                fields = match field.get(b"Kids") {
                    Some(Object::Array(a)) => a.clone(),
                    Some(Object::Reference(r)) => {
                        let r = *r;
                        pdf.get_array(r)?
                    },
                    _ => {
                        return Err(Error::Structure(
                            "expected hierarchical parent but Kids is not an Array".to_string(),
                        ))
                    },
                };
                continue 'descend;
            }
            let ftype = match field.get(b"FT") {
                Some(Object::Name(n)) => n.clone(),
                _ => {
                    return Err(Error::Structure(format!(
                        "AcroForm[Fields][{}][FT] is not a Name",
                        i
                    )))
                },
            };
            return match ftype.as_slice() {
                b"Btn" => set_button(pdf, field_ref, field, value),
                b"Tx" => text::set_text(pdf, &form, field, field_ref, value, font_size),
                b"Ch" => choice::set_choice(pdf, field_ref, field, value),
                other => Err(Error::Unsupported(format!(
                    "field type \"{}\" is not supported",
                    String::from_utf8_lossy(other)
                ))),
            };
        }
        return Err(Error::Field("no such field in form".to_string()));
    }
}

/// Dispatch a `/Btn` field: push buttons have no value, the radio flag (or
/// the presence of kids) selects radio semantics, everything else is a
/// checkbox.
fn set_button<F: Read + Seek>(
    pdf: &mut Pdf<F>,
    field_ref: ObjectRef,
    field: Dict,
    value: &str,
) -> Result<()> {
    let flags = match field.get(b"Ff") {
        None => 0,
        Some(Object::Integer(f)) => *f,
        Some(_) => return Err(Error::Structure("field[Ff] is not an integer".to_string())),
    };
    if flags & (1 << 16) != 0 {
        return Err(Error::Field(
            "field is a push button and doesn't have a value".to_string(),
        ));
    }
    if flags & (1 << 15) != 0 {
        return radio::set_radio_button(pdf, field_ref, field, value);
    }
    if field.get(b"Kids").is_some() {
        // Some producers put the radio flag on the kids instead of the
        // parent; a button set with kids behaves as a radio group.
        return radio::set_radio_button(pdf, field_ref, field, value);
    }
    checkbox::set_checkbox(pdf, field_ref, field, value)
}

/// The field's `/T` as text, for error messages.
pub(crate) fn field_t(field: &Dict) -> String {
    field
        .get(b"T")
        .and_then(|o| o.as_string())
        .map(|s| String::from_utf8_lossy(s).into_owned())
        .unwrap_or_default()
}

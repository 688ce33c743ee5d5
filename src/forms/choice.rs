//! Choice fields (combo and list boxes).

use std::io::{Read, Seek};

use crate::document::Pdf;
use crate::error::{Error, Result};
use crate::object::{Dict, Object, ObjectRef};

/// Set the value of a choice field.
///
/// Non-editable choices validate the value against `/Opt` when present: an
/// option matches as a plain string, or as the displayed element of a
/// two-element option pair.
pub(crate) fn set_choice<F: Read + Seek>(
    pdf: &mut Pdf<F>,
    field_ref: ObjectRef,
    mut field: Dict,
    value: &str,
) -> Result<()> {
    if let Some(Object::String(v)) = field.get(b"V") {
        if v.as_slice() == value.as_bytes() {
            return Ok(());
        }
    }
    field.insert("V", Object::String(value.as_bytes().to_vec()));
    pdf.update(field_ref, Object::Dictionary(field.clone()));
    // Editable combos accept values outside the option list.
    let flags = match field.get(b"Ff") {
        None => 0,
        Some(Object::Integer(f)) => *f,
        Some(_) => return Err(Error::Structure("field[Ff] is not an integer".to_string())),
    };
    if flags & 0x60000 != 0 {
        return Ok(());
    }
    let opts = match field.get(b"Opt") {
        None => return Ok(()),
        Some(Object::Reference(r)) => {
            let r = *r;
            pdf.get_array(r)
                .map_err(|e| Error::Structure(format!("field[Opt]: {}", e)))?
        },
        Some(Object::Array(a)) => a.clone(),
        Some(_) => return Err(Error::Structure("field[Opt] is not an Array".to_string())),
    };
    for opt in &opts {
        match opt {
            Object::String(s) if s.as_slice() == value.as_bytes() => return Ok(()),
            Object::Array(pair) if pair.len() == 2 => {
                if let Object::String(display) = &pair[1] {
                    if display.as_slice() == value.as_bytes() {
                        return Ok(());
                    }
                }
            },
            _ => {},
        }
    }
    Err(Error::Field(format!(
        "value \"{}\" is not valid for field \"{}\"",
        value,
        super::field_t(&field)
    )))
}

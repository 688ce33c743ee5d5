//! Checkbox fields.
//!
//! A checkbox's value `/V` is either the name `/Yes` or absent (meaning
//! off); `/AS` carries the matching appearance state. Setting the current
//! state again is a no-op, so repeated writes leave a single dirty entry.

use std::io::{Read, Seek};

use crate::document::Pdf;
use crate::error::{Error, Result};
use crate::object::{Dict, Object, ObjectRef};

/// Set a checkbox to `"Yes"` or `"Off"`.
pub(crate) fn set_checkbox<F: Read + Seek>(
    pdf: &mut Pdf<F>,
    field_ref: ObjectRef,
    mut field: Dict,
    value: &str,
) -> Result<()> {
    match value {
        "Off" => {
            match field.get(b"V") {
                None => return Ok(()),
                Some(Object::Name(v)) if v.as_slice() == b"Off" => return Ok(()),
                _ => {},
            }
            field.remove(b"V");
            field.insert("AS", Object::Name(b"Off".to_vec()));
            pdf.update(field_ref, Object::Dictionary(field));
        },
        "Yes" => {
            if let Some(Object::Name(v)) = field.get(b"V") {
                if v.as_slice() == b"Yes" {
                    return Ok(());
                }
            }
            field.insert("V", Object::Name(b"Yes".to_vec()));
            field.insert("AS", Object::Name(b"Yes".to_vec()));
            pdf.update(field_ref, Object::Dictionary(field));
        },
        _ => return Err(Error::Field("value is not valid for field".to_string())),
    }
    Ok(())
}

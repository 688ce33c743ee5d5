//! Radio button sets.
//!
//! A radio set is a parent field holding `/V` plus one kid widget per
//! button. Each kid's `AP/N` dictionary maps appearance-state names to
//! form XObjects; the kid whose `AP/N` has a key equal to the requested
//! value gets `/AS` set to it, every other kid gets `/AS /Off`.

use std::io::{Read, Seek};

use crate::document::Pdf;
use crate::error::{Error, Result};
use crate::object::{Dict, Object, ObjectRef};

enum KidsHome {
    Inline,
    Ref(ObjectRef),
}

/// Set the state of a set of radio buttons: `/V` on the parent field and
/// `/AS` on each of the individual buttons.
pub(crate) fn set_radio_button<F: Read + Seek>(
    pdf: &mut Pdf<F>,
    field_ref: ObjectRef,
    mut field: Dict,
    value: &str,
) -> Result<()> {
    if let Some(Object::Name(v)) = field.get(b"V") {
        if v.as_slice() == value.as_bytes() {
            return Ok(());
        }
    }
    let mut found = false;
    if value == "Off" {
        field.remove(b"V");
        found = true;
    } else {
        field.insert("V", Object::Name(value.as_bytes().to_vec()));
    }
    let (mut kids, home) = match field.get(b"Kids") {
        None => return Err(Error::Field("field[Kids] doesn't exist".to_string())),
        Some(Object::Reference(r)) => {
            let r = *r;
            (
                pdf.get_array(r)
                    .map_err(|e| Error::Structure(format!("field[Kids]: {}", e)))?,
                KidsHome::Ref(r),
            )
        },
        Some(Object::Array(a)) => (a.clone(), KidsHome::Inline),
        Some(_) => return Err(Error::Structure("field[Kids] is not an Array".to_string())),
    };
    pdf.update(field_ref, Object::Dictionary(field.clone()));
    // Update the /AS of each kid; while doing so, make sure the chosen
    // value names an appearance state somewhere in the set.
    let mut inline_dirty = false;
    for i in 0..kids.len() {
        let (mut kid, kid_ref) = match &kids[i] {
            Object::Reference(r) => (
                pdf.get_dict(*r)
                    .map_err(|e| Error::Structure(format!("field[Kids][{}]: {}", i, e)))?,
                Some(*r),
            ),
            Object::Dictionary(d) => (d.clone(), None),
            _ => {
                return Err(Error::Structure(format!(
                    "field[Kids][{}] is not a Dict",
                    i
                )))
            },
        };
        let ap = match kid.get(b"AP") {
            Some(Object::Reference(r)) => pdf
                .get_dict(*r)
                .map_err(|e| Error::Structure(format!("field[Kids][{}][AP]: {}", i, e)))?,
            Some(Object::Dictionary(d)) => d.clone(),
            _ => {
                return Err(Error::Structure(format!(
                    "field[Kids][{}][AP] is not a Dict",
                    i
                )))
            },
        };
        let apn = match ap.get(b"N") {
            Some(Object::Reference(r)) => pdf
                .get_dict(*r)
                .map_err(|e| Error::Structure(format!("field[Kids][{}][AP][N]: {}", i, e)))?,
            Some(Object::Dictionary(d)) => d.clone(),
            _ => {
                return Err(Error::Structure(format!(
                    "field[Kids][{}][AP][N] is not a Dict",
                    i
                )))
            },
        };
        let changed = if apn.contains_key(value.as_bytes()) {
            found = true;
            kid.insert("AS", Object::Name(value.as_bytes().to_vec()));
            true
        } else if kid.get(b"AS") != Some(&Object::Name(b"Off".to_vec())) {
            kid.insert("AS", Object::Name(b"Off".to_vec()));
            true
        } else {
            false
        };
        if changed {
            match kid_ref {
                Some(r) => pdf.update(r, Object::Dictionary(kid)),
                None => {
                    kids[i] = Object::Dictionary(kid);
                    inline_dirty = true;
                },
            }
        }
    }
    if inline_dirty {
        match home {
            KidsHome::Inline => {
                field.insert("Kids", Object::Array(kids));
                pdf.update(field_ref, Object::Dictionary(field.clone()));
            },
            KidsHome::Ref(r) => pdf.update(r, Object::Array(kids)),
        }
    }
    if !found {
        return Err(Error::Field(format!(
            "value \"{}\" is not valid for field \"{}\"",
            value,
            super::field_t(&field)
        )));
    }
    Ok(())
}

//! Text fields.
//!
//! Setting a text field's value means updating `/V`, then regenerating the
//! normal appearance of every widget of the field: a content stream drawn
//! from the widget rectangle, the font named in the default appearance
//! string, and a Form XObject registered as `AP/N`.

use std::io::{Read, Seek};

use lazy_static::lazy_static;
use regex::Regex;

use crate::document::Pdf;
use crate::error::{Error, Result};
use crate::object::{Dict, Object, ObjectRef, Stream};
use crate::writer::encode_string;

lazy_static! {
    /// The font selection in a default appearance string: `/<name> <size> Tf`.
    static ref DA_FONT_RE: Regex = Regex::new(r"/(\S+)\s*([0-9]+(?:\.[0-9]*)?)\s*Tf\b").unwrap();
}

// Line placement would ideally come from real font metrics. A fixed
// ascender-to-em ratio is close enough for form fields.
const ASCENDER_TO_TOTAL_RATIO: f64 = 0.8;

/// Set the value of a text field and regenerate its widget appearances.
pub(crate) fn set_text<F: Read + Seek>(
    pdf: &mut Pdf<F>,
    form: &Dict,
    mut field: Dict,
    field_ref: ObjectRef,
    value: &str,
    font_size: f64,
) -> Result<()> {
    // If the value isn't changing, there is nothing to do.
    if let Some(Object::String(v)) = field.get(b"V") {
        if v.as_slice() == value.as_bytes() {
            return Ok(());
        }
    }
    field.insert("V", Object::String(value.as_bytes().to_vec()));
    pdf.update(field_ref, Object::Dictionary(field.clone()));
    let (font_name, size) = font_name_size(pdf, &field, font_size)?;
    let font_ref = resources_font(pdf, form, &font_name)?;
    // The annotation widgets of the field: usually the field itself, but
    // a multi-widget field lists them under /Kids.
    let kids = match field.get(b"Kids") {
        None => vec![Object::Reference(field_ref)],
        Some(Object::Reference(r)) => {
            let r = *r;
            pdf.get_array(r)
                .map_err(|e| Error::Structure(format!("field[Kids]: {}", e)))?
        },
        Some(Object::Array(a)) => a.clone(),
        Some(_) => return Err(Error::Structure("field[Kids] is not an Array".to_string())),
    };
    for (i, kid) in kids.iter().enumerate() {
        let (widget, widget_ref, is_self) = match kid {
            Object::Reference(r) if *r == field_ref => (field.clone(), field_ref, true),
            Object::Reference(r) => (
                pdf.get_dict(*r)
                    .map_err(|e| Error::Structure(format!("field[Kids][{}]: {}", i, e)))?,
                *r,
                false,
            ),
            _ => {
                return Err(Error::Structure(format!(
                    "field[Kids][{}] is not a Reference",
                    i
                )))
            },
        };
        let (bbox, bbox_array) = widget_bbox(pdf, &widget)
            .map_err(|e| Error::Structure(format!("field[Kids][{}]: {}", i, e)))?;
        let cstream = content_stream(&bbox, value, &font_name, size);
        let updated = write_appearance(pdf, widget_ref, widget, bbox_array, &font_name, font_ref, cstream)
            .map_err(|e| Error::Structure(format!("field[Kids][{}]: {}", i, e)))?;
        if is_self {
            field = updated;
        }
    }
    Ok(())
}

/// The font name and size from the field's default appearance string. A
/// zero size in the string means auto; the caller-supplied size is used.
fn font_name_size<F: Read + Seek>(
    pdf: &mut Pdf<F>,
    field: &Dict,
    default_size: f64,
) -> Result<(String, f64)> {
    let da = match field.get(b"DA") {
        None => return Err(Error::Field("field[DA] is not set".to_string())),
        Some(Object::Reference(r)) => pdf
            .get_string(*r)
            .map_err(|e| Error::Structure(format!("field[DA]: {}", e)))?,
        Some(Object::String(s)) => s.clone(),
        Some(_) => return Err(Error::Structure("field[DA] is not a string".to_string())),
    };
    let da = String::from_utf8_lossy(&da).into_owned();
    let caps = DA_FONT_RE
        .captures(&da)
        .ok_or_else(|| Error::Field("field[DA] does not contain a font setting".to_string()))?;
    let name = caps[1].to_string();
    let mut size: f64 = caps[2].parse().unwrap_or(0.0);
    if size == 0.0 {
        size = default_size;
    }
    Ok((name, size))
}

/// The font dictionary reference for the named font in `AcroForm/DR/Font`.
fn resources_font<F: Read + Seek>(
    pdf: &mut Pdf<F>,
    form: &Dict,
    font_name: &str,
) -> Result<ObjectRef> {
    let dr = match form.get(b"DR") {
        None => return Err(Error::Field("AcroForm[DR] is not present".to_string())),
        Some(Object::Reference(r)) => pdf
            .get_dict(*r)
            .map_err(|e| Error::Structure(format!("AcroForm[DR]: {}", e)))?,
        Some(Object::Dictionary(d)) => d.clone(),
        Some(_) => return Err(Error::Structure("AcroForm[DR] is not a Dict".to_string())),
    };
    let font = match dr.get(b"Font") {
        None => return Err(Error::Field("AcroForm[DR][Font] is not present".to_string())),
        Some(Object::Reference(r)) => pdf
            .get_dict(*r)
            .map_err(|e| Error::Structure(format!("AcroForm[DR][Font]: {}", e)))?,
        Some(Object::Dictionary(d)) => d.clone(),
        Some(_) => {
            return Err(Error::Structure(
                "AcroForm[DR][Font] is not a Dict".to_string(),
            ))
        },
    };
    match font.get(font_name.as_bytes()) {
        None => Err(Error::Field(format!(
            "field[DA] references font \"{}\" which is not defined in AcroForm[DR][Font]",
            font_name
        ))),
        Some(Object::Reference(r)) => Ok(*r),
        Some(_) => Err(Error::Structure(format!(
            "AcroForm[DR][Font][{}] is not a Reference",
            font_name
        ))),
    }
}

/// The appearance bounding box for a widget: its `/Rect` translated to the
/// origin. Returned both as coordinates and as a PDF array.
fn widget_bbox<F: Read + Seek>(pdf: &mut Pdf<F>, widget: &Dict) -> Result<([f64; 4], Vec<Object>)> {
    let rect = match widget.get(b"Rect") {
        None => return Err(Error::Field("widget[Rect] is not set".to_string())),
        Some(Object::Reference(r)) => pdf
            .get_array(*r)
            .map_err(|e| Error::Structure(format!("widget[Rect]: {}", e)))?,
        Some(Object::Array(a)) => a.clone(),
        Some(_) => return Err(Error::Structure("widget[Rect] is not an Array".to_string())),
    };
    if rect.len() != 4 {
        return Err(Error::Structure(
            "widget[Rect] is not an Array of length 4".to_string(),
        ));
    }
    let mut coords = [0f64; 4];
    for (slot, entry) in coords.iter_mut().zip(&rect) {
        *slot = match entry {
            Object::Integer(v) => *v as f64,
            Object::Real(v) => *v,
            _ => {
                return Err(Error::Structure(
                    "widget[Rect] is not an Array of 4 numbers".to_string(),
                ))
            },
        };
    }
    let bbox = [0.0, 0.0, coords[2] - coords[0], coords[3] - coords[1]];
    let bbox_array = bbox.iter().map(|v| Object::Real(*v)).collect();
    Ok((bbox, bbox_array))
}

/// Build the appearance content stream for a text widget.
fn content_stream(bbox: &[f64; 4], value: &str, font_name: &str, font_size: f64) -> Vec<u8> {
    // Room for two lines or more makes the field multiline.
    let multiline = bbox[3] >= 2.35 * font_size + 4.0;
    let leading = font_size * 1.2;
    let topline = if multiline {
        // Start 2 units plus an ascender down from the top.
        bbox[3] - 2.0 - ASCENDER_TO_TOTAL_RATIO * font_size
    } else {
        // Center a single line in the box.
        bbox[3] / 2.0 + font_size / 2.0 - ASCENDER_TO_TOTAL_RATIO * font_size
    };
    // Begin marked content for /Tx; save graphics state; clip to a path
    // inset one unit from the box; begin text; set font, a dark blue
    // color, leading, and the initial position.
    let mut out = Vec::new();
    out.extend_from_slice(
        format!(
            "/Tx BMC q 1 1 {:.6} {:.6} re W n BT /{} {:.6} Tf 0 0 0.6 rg {:.6} TL 2 {:.6} Td ",
            bbox[2] - 2.0,
            bbox[3] - 2.0,
            font_name,
            font_size,
            leading,
            topline
        )
        .as_bytes(),
    );
    if multiline {
        for line in value.split('\n') {
            encode_string(&mut out, line.as_bytes());
            out.extend_from_slice(b" Tj T* ");
        }
    } else {
        encode_string(&mut out, value.as_bytes());
        out.extend_from_slice(b" Tj ");
    }
    out.extend_from_slice(b"ET Q EMC\n");
    out
}

/// Store the rendered appearance as the widget's `AP/N`, creating or
/// updating objects as needed. Returns the widget dictionary as updated.
fn write_appearance<F: Read + Seek>(
    pdf: &mut Pdf<F>,
    widget_ref: ObjectRef,
    mut widget: Dict,
    bbox_array: Vec<Object>,
    font_name: &str,
    font_ref: ObjectRef,
    cstream: Vec<u8>,
) -> Result<Dict> {
    let mut apn_dict = Dict::new();
    apn_dict.insert("Type", Object::Name(b"XObject".to_vec()));
    apn_dict.insert("Subtype", Object::Name(b"Form".to_vec()));
    apn_dict.insert("BBox", Object::Array(bbox_array));
    let mut fonts = Dict::new();
    fonts.insert(font_name.as_bytes().to_vec(), Object::Reference(font_ref));
    let mut resources = Dict::new();
    resources.insert("Font", Object::Dictionary(fonts));
    resources.insert(
        "ProcSet",
        Object::Array(vec![
            Object::Name(b"PDF".to_vec()),
            Object::Name(b"Text".to_vec()),
        ]),
    );
    apn_dict.insert("Resources", Object::Dictionary(resources));
    let apn = Object::Stream(Stream::new(apn_dict, cstream));
    // N must be a separate indirect object; most viewers won't render an
    // inline appearance stream.
    match widget.get(b"AP").cloned() {
        None => {
            let mut ap = Dict::new();
            ap.insert("N", Object::Reference(pdf.create(apn)));
            widget.insert("AP", Object::Dictionary(ap));
            pdf.update(widget_ref, Object::Dictionary(widget.clone()));
        },
        Some(Object::Reference(ap_ref)) => {
            let mut ap = pdf
                .get_dict(ap_ref)
                .map_err(|e| Error::Structure(format!("widget[AP]: {}", e)))?;
            match ap.get(b"N").and_then(|o| o.as_reference()) {
                Some(n_ref) => pdf.update(n_ref, apn),
                None => {
                    ap.insert("N", Object::Reference(pdf.create(apn)));
                    pdf.update(ap_ref, Object::Dictionary(ap));
                },
            }
        },
        Some(Object::Dictionary(mut ap)) => {
            match ap.get(b"N").and_then(|o| o.as_reference()) {
                Some(n_ref) => pdf.update(n_ref, apn),
                None => {
                    ap.insert("N", Object::Reference(pdf.create(apn)));
                    widget.insert("AP", Object::Dictionary(ap));
                    pdf.update(widget_ref, Object::Dictionary(widget.clone()));
                },
            }
        },
        Some(_) => return Err(Error::Structure("widget[AP] is not a Dict".to_string())),
    }
    Ok(widget)
}

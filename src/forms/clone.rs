//! Page and field-subtree cloning.
//!
//! Clones a page and the form-field widgets on it: the copy becomes the
//! next sibling in the page tree, and the cloned widgets are re-parented
//! under a fresh field subtree so their names pick up a prefix. Works only
//! on documents whose page tree is a single flat level.

use std::collections::HashMap;
use std::io::{Read, Seek};

use crate::document::Pdf;
use crate::error::{Error, Result};
use crate::object::{Dict, Object, ObjectRef, Stream};

/// Clone the page at zero-based index `page_num`, inserting the copy
/// immediately after the original. Fillable fields on the page are cloned
/// under a new field subtree named `prefix`, so a field `Name` becomes
/// `prefix.Name`. The result is not applied until [`Pdf::write`].
pub fn clone_page<F: Read + Seek>(pdf: &mut Pdf<F>, page_num: usize, prefix: &str) -> Result<()> {
    let (mut new_page, new_page_ref, old_page_ref) = copy_page(pdf, page_num)?;
    let (fields, mut new_list, new_list_ref) = new_field_list(pdf, prefix)?;
    let widgets = clone_fields(pdf, &fields, old_page_ref, new_page_ref, new_list_ref)?;
    new_list.insert("Kids", Object::Array(widgets.clone()));
    new_page.insert("Annots", Object::Array(widgets));
    pdf.update(new_list_ref, Object::Dictionary(new_list));
    pdf.update(new_page_ref, Object::Dictionary(new_page));
    Ok(())
}

/// Create a copy of the page with everything except its annotations, and
/// splice it into `Pages/Kids` right after the original.
fn copy_page<F: Read + Seek>(
    pdf: &mut Pdf<F>,
    page_num: usize,
) -> Result<(Dict, ObjectRef, ObjectRef)> {
    let pages_ref = pdf
        .catalog
        .get(b"Pages")
        .and_then(|o| o.as_reference())
        .ok_or_else(|| Error::Structure("/Pages is not a reference".to_string()))?;
    let mut pages = pdf.get_dict(pages_ref)?;
    let count = pages
        .get(b"Count")
        .and_then(|o| o.as_integer())
        .ok_or_else(|| Error::Structure("Pages/Count is not an integer".to_string()))?;
    let (mut kids, kids_ref) = match pages.get(b"Kids") {
        Some(Object::Array(a)) => (a.clone(), None),
        Some(Object::Reference(r)) => {
            let r = *r;
            (pdf.get_array(r)?, Some(r))
        },
        _ => return Err(Error::Structure("Pages/Kids is not an Array".to_string())),
    };
    if page_num >= kids.len() {
        return Err(Error::Field("not that many pages".to_string()));
    }
    let old_page_ref = kids[page_num].as_reference().ok_or_else(|| {
        Error::Structure("Pages/Kids element is not a reference".to_string())
    })?;
    let old_page = pdf.get_dict(old_page_ref)?;
    if old_page.get(b"Type").and_then(|o| o.as_name()) == Some(&b"Pages"[..]) {
        return Err(Error::Unsupported(
            "nested page trees are not supported".to_string(),
        ));
    }
    let new_page_ref = pdf.create(Object::Dictionary(Dict::new()));
    pages.insert("Count", Object::Integer(count + 1));
    kids.insert(page_num + 1, Object::Reference(new_page_ref));
    match kids_ref {
        None => {
            pages.insert("Kids", Object::Array(kids));
        },
        Some(r) => pdf.update(r, Object::Array(kids)),
    }
    pdf.update(pages_ref, Object::Dictionary(pages));
    // Deep-copy the page dictionary. The page tree node maps to itself so
    // the copy's Parent stays shared; Annots is replaced later with the
    // cloned widget list.
    let mut clones = HashMap::new();
    clones.insert(old_page_ref, new_page_ref);
    clones.insert(pages_ref, pages_ref);
    let mut new_page = Dict::new();
    for (key, val) in old_page.iter() {
        if key.as_slice() == b"Annots" {
            continue;
        }
        new_page.insert(key.clone(), clone_object(pdf, val, &mut clones)?);
    }
    Ok((new_page, new_page_ref, old_page_ref))
}

/// Create a new field-tree node named `name` as a child of the top-level
/// field list. Returns the (updated) top-level list, the node, and its
/// reference.
fn new_field_list<F: Read + Seek>(
    pdf: &mut Pdf<F>,
    name: &str,
) -> Result<(Vec<Object>, Dict, ObjectRef)> {
    let form_ref = pdf
        .catalog
        .get(b"AcroForm")
        .and_then(|o| o.as_reference())
        .ok_or_else(|| Error::Structure("AcroForm is not a reference".to_string()))?;
    let mut form = pdf.get_dict(form_ref)?;
    let mut new_field = Dict::new();
    new_field.insert("T", Object::String(name.as_bytes().to_vec()));
    let new_field_ref = pdf.create(Object::Dictionary(new_field.clone()));
    let fields = match form.get(b"Fields") {
        Some(Object::Array(a)) => {
            let mut fields = a.clone();
            fields.push(Object::Reference(new_field_ref));
            form.insert("Fields", Object::Array(fields.clone()));
            pdf.update(form_ref, Object::Dictionary(form));
            fields
        },
        Some(Object::Reference(r)) => {
            let r = *r;
            let mut fields = pdf.get_array(r)?;
            fields.push(Object::Reference(new_field_ref));
            pdf.update(r, Object::Array(fields.clone()));
            fields
        },
        _ => {
            return Err(Error::Structure(
                "AcroForm/Fields is not an array".to_string(),
            ))
        },
    };
    Ok((fields, new_field, new_field_ref))
}

/// Clone every top-level field whose `/P` is the old page. The clones get
/// the new page as `/P` and the new subtree as `/Parent`; every reference
/// inside the cloned graph is translated through the clone map, so data
/// shared with other pages stays shared.
fn clone_fields<F: Read + Seek>(
    pdf: &mut Pdf<F>,
    fields: &[Object],
    old_page_ref: ObjectRef,
    new_page_ref: ObjectRef,
    new_tree_ref: ObjectRef,
) -> Result<Vec<Object>> {
    let mut clones = HashMap::new();
    clones.insert(old_page_ref, new_page_ref);
    let mut list = Vec::new();
    for entry in fields {
        let old_ref = entry.as_reference().ok_or_else(|| {
            Error::Structure("AcroForm/Fields element is not a reference".to_string())
        })?;
        let old_field = pdf.get_dict(old_ref)?;
        match old_field.get(b"P") {
            Some(Object::Reference(p)) if *p == old_page_ref => {},
            _ => continue,
        }
        let mut new_field = clone_dict(pdf, &old_field, &mut clones)?;
        new_field.insert("P", Object::Reference(new_page_ref));
        new_field.insert("Parent", Object::Reference(new_tree_ref));
        let new_ref = pdf.create(Object::Dictionary(new_field));
        clones.insert(old_ref, new_ref);
        list.push(Object::Reference(new_ref));
    }
    Ok(list)
}

fn clone_object<F: Read + Seek>(
    pdf: &mut Pdf<F>,
    obj: &Object,
    clones: &mut HashMap<ObjectRef, ObjectRef>,
) -> Result<Object> {
    match obj {
        Object::Null
        | Object::Boolean(_)
        | Object::Integer(_)
        | Object::Real(_)
        | Object::String(_)
        | Object::HexString(_)
        | Object::Name(_) => Ok(obj.clone()),
        Object::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(clone_object(pdf, item, clones)?);
            }
            Ok(Object::Array(out))
        },
        Object::Dictionary(dict) => Ok(Object::Dictionary(clone_dict(pdf, dict, clones)?)),
        Object::Stream(stream) => Ok(Object::Stream(Stream {
            dict: clone_dict(pdf, &stream.dict, clones)?,
            data: stream.data.clone(),
        })),
        Object::Reference(r) => Ok(Object::Reference(clone_reference(pdf, *r, clones)?)),
    }
}

fn clone_dict<F: Read + Seek>(
    pdf: &mut Pdf<F>,
    dict: &Dict,
    clones: &mut HashMap<ObjectRef, ObjectRef>,
) -> Result<Dict> {
    let mut out = Dict::new();
    for (key, val) in dict.iter() {
        out.insert(key.clone(), clone_object(pdf, val, clones)?);
    }
    Ok(out)
}

/// Clone the object behind a reference. A pending slot is reserved and
/// entered into the clone map before the target is cloned, so reference
/// cycles resolve to the reserved slot on the second visit.
fn clone_reference<F: Read + Seek>(
    pdf: &mut Pdf<F>,
    old: ObjectRef,
    clones: &mut HashMap<ObjectRef, ObjectRef>,
) -> Result<ObjectRef> {
    if let Some(existing) = clones.get(&old) {
        return Ok(*existing);
    }
    let target = pdf.get(old)?;
    let new_ref = pdf.create(Object::Null);
    clones.insert(old, new_ref);
    let cloned = clone_object(pdf, &target, clones)?;
    pdf.update(new_ref, cloned);
    Ok(new_ref)
}

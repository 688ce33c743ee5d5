//! Stream filter pipeline.
//!
//! Reverses the encodings named by a stream's `/Filter` entry, left to
//! right. The only supported filter is `FlateDecode`, optionally followed
//! by a PNG predictor named in `/DecodeParms`.

mod flate;
mod predictor;

pub use flate::flate_decode;
pub use predictor::unpredict_png;

use crate::error::{Error, Result};
use crate::object::{Dict, Object, Stream};

/// Decode the stream payload in place according to `/Filter` and
/// `/DecodeParms`.
///
/// `row_size` is the size in bytes of one row of the decoded data; it is
/// required (nonzero) whenever a PNG predictor is present and ignored
/// otherwise. On success the `/Filter` key is removed so decoding twice is
/// a no-op.
pub(crate) fn apply_filters(stream: &mut Stream, row_size: usize) -> Result<()> {
    let mut filters: Vec<Vec<u8>> = Vec::new();
    let mut parms: Vec<Option<Dict>> = Vec::new();

    match stream.dict.get(b"Filter") {
        None => return Ok(()),
        Some(Object::Name(name)) => {
            filters.push(name.clone());
            match stream.dict.get(b"DecodeParms") {
                None => parms.push(None),
                Some(Object::Dictionary(d)) => parms.push(Some(d.clone())),
                Some(_) => {
                    return Err(Error::Structure(
                        "stream /DecodeParms is not a dictionary".to_string(),
                    ))
                },
            }
        },
        Some(Object::Array(list)) => {
            for entry in list {
                match entry {
                    Object::Name(name) => filters.push(name.clone()),
                    _ => {
                        return Err(Error::Structure(
                            "stream /Filter entry is not a /Name".to_string(),
                        ))
                    },
                }
            }
            match stream.dict.get(b"DecodeParms") {
                None => parms.resize(filters.len(), None),
                Some(Object::Array(plist)) => {
                    if plist.len() != filters.len() {
                        return Err(Error::Structure(
                            "stream /DecodeParms is an array with the wrong length".to_string(),
                        ));
                    }
                    for entry in plist {
                        match entry {
                            Object::Dictionary(d) => parms.push(Some(d.clone())),
                            Object::Null => parms.push(None),
                            _ => {
                                return Err(Error::Structure(
                                    "stream /DecodeParms entry is not a dictionary".to_string(),
                                ))
                            },
                        }
                    }
                },
                Some(_) => {
                    return Err(Error::Structure(
                        "stream /DecodeParms is not an array".to_string(),
                    ))
                },
            }
        },
        Some(_) => {
            return Err(Error::Structure(
                "stream /Filter is not a /Name or array".to_string(),
            ))
        },
    }

    for (filter, parm) in filters.iter().zip(parms.iter()) {
        match filter.as_slice() {
            b"FlateDecode" => {
                let inflated = flate_decode(&stream.data)?;
                stream.data = apply_predictor(inflated, parm.as_ref(), row_size)?.into();
            },
            other => {
                return Err(Error::Unsupported(format!(
                    "stream /Filter encoding /{} is not supported",
                    String::from_utf8_lossy(other)
                )))
            },
        }
    }
    stream.dict.remove(b"Filter");
    Ok(())
}

/// Reverse the predictor named in the decode parameters, if any.
fn apply_predictor(data: Vec<u8>, parms: Option<&Dict>, row_size: usize) -> Result<Vec<u8>> {
    let parms = match parms {
        Some(p) => p,
        None => return Ok(data),
    };
    match parms.get(b"Predictor") {
        None => Ok(data),
        Some(Object::Integer(1)) => Ok(data),
        Some(Object::Integer(p @ 10..=15)) => {
            // PNG predictor family. Which member doesn't matter: each row
            // carries its own filter byte.
            log::debug!("reversing PNG predictor {} with row size {}", p, row_size);
            if row_size == 0 {
                return Err(Error::Decode(
                    "row size is needed for stream decoding and was not provided".to_string(),
                ));
            }
            unpredict_png(data, row_size)
        },
        Some(Object::Integer(p)) => Err(Error::Unsupported(format!(
            "FlateDecode predictor {} is not supported",
            p
        ))),
        Some(_) => Err(Error::Structure(
            "FlateDecode predictor is not an integer".to_string(),
        )),
    }
}

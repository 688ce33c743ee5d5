//! FlateDecode (zlib) implementation.
//!
//! The most common PDF stream encoding. Decoding is strict: a stream
//! labeled `/FlateDecode` that does not inflate is an error.

use std::io::Read;

use flate2::read::ZlibDecoder;

use crate::error::{Error, Result};

/// Inflate a zlib-wrapped deflate stream.
pub fn flate_decode(input: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(input);
    let mut output = Vec::new();
    decoder
        .read_to_end(&mut output)
        .map_err(|e| Error::Decode(format!("running FlateDecode on stream: {}", e)))?;
    Ok(output)
}

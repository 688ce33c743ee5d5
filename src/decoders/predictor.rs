//! PNG predictor reversal for PDF stream decoding.
//!
//! PNG-predicted data prefixes every row with one filter byte. Cross
//! reference streams in practice use only filters 0 (None) and 2 (Up);
//! anything else is an error.

use crate::error::{Error, Result};

/// Reverse the PNG predictor algorithm on `data`.
///
/// Each row of `row_size` bytes is preceded by a byte saying how that row
/// was encoded, so the input length must be a multiple of `row_size + 1`.
pub fn unpredict_png(data: Vec<u8>, row_size: usize) -> Result<Vec<u8>> {
    if data.len() % (row_size + 1) != 0 {
        return Err(Error::Decode(
            "stream length is not a multiple of row length".to_string(),
        ));
    }
    let rows = data.len() / (row_size + 1);
    let mut out = Vec::with_capacity(rows * row_size);
    for row in 0..rows {
        let start = row * (row_size + 1);
        let filter = data[start];
        let encoded = &data[start + 1..start + 1 + row_size];
        match filter {
            0 => {
                // Not encoded, copy through.
                out.extend_from_slice(encoded);
            },
            2 => {
                // Up filter: each byte was subtracted from the byte above.
                if row == 0 {
                    out.extend_from_slice(encoded);
                } else {
                    let prev_start = out.len() - row_size;
                    for (i, &b) in encoded.iter().enumerate() {
                        let up = out[prev_start + i];
                        out.push(b.wrapping_add(up));
                    }
                }
            },
            other => {
                return Err(Error::Unsupported(format!(
                    "unexpected PNG filter type {}",
                    other
                )))
            },
        }
    }
    Ok(out)
}

//! # pdf-fill
//!
//! Reading, traversing, and incrementally updating PDF documents at the
//! object-structure level, plus a form layer that fills interactive
//! AcroForm fields (text, checkbox, radio, choice) and regenerates their
//! appearance streams so edited values render in viewers.
//!
//! The library does not understand page content; it knows how to locate,
//! parse, update, add, and clone objects, and how the form dictionaries
//! are wired together.
//!
//! ## Quick start
//!
//! ```ignore
//! use std::fs::OpenOptions;
//! use pdf_fill::{forms, Pdf};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let file = OpenOptions::new().read(true).write(true).open("form.pdf")?;
//! let mut pdf = Pdf::open(file)?;
//!
//! for (name, value) in forms::get_fields(&mut pdf)? {
//!     println!("{} = {}", name, value);
//! }
//!
//! forms::set_field(&mut pdf, "Name", "Alice", 12.0)?;
//! pdf.write()?;
//! # Ok(())
//! # }
//! ```
//!
//! Updates are appended to the file as an incremental revision; the
//! original bytes are never rewritten.

#![warn(missing_docs)]

pub mod error;

pub mod document;
pub mod object;
mod parser;
mod xref;

pub mod decoders;

mod writer;

pub mod forms;

pub use document::Pdf;
pub use error::{Error, Result};
pub use object::{Dict, Object, ObjectRef, Stream};

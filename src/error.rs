//! Error types for the PDF library.
//!
//! Every failure surfaces to the caller at the call that triggered it;
//! nothing is logged and swallowed internally. Parse errors carry the byte
//! offset where parsing stopped, structural errors carry the path of the
//! offending dictionary entry.

/// Result type alias for PDF library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during PDF processing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The file does not begin with a `%PDF-` header
    #[error("not a PDF file")]
    NotPdf,

    /// Malformed syntax at a specific byte offset
    #[error("failed to parse object at byte {offset}: {reason}")]
    Parse {
        /// Byte offset where the error occurred
        offset: usize,
        /// Reason for the parse failure
        reason: String,
    },

    /// An object was of the wrong variant for its role
    #[error("invalid object type: expected {expected}, found {found}")]
    ObjectType {
        /// Expected object type
        expected: &'static str,
        /// Actual object type found
        found: &'static str,
    },

    /// Structurally invalid PDF data (wrong variant at a named path)
    #[error("invalid PDF structure: {0}")]
    Structure(String),

    /// Object number out of range of the cross-reference table
    #[error("object number {number} is out of range for document (max {max})")]
    OutOfRange {
        /// Requested object number
        number: u32,
        /// Highest object number in the table
        max: u32,
    },

    /// The referenced object is on the free list
    #[error("object number {0} is on the free list")]
    FreeObject(u32),

    /// The requested generation does not match the stored one
    #[error("object number {number} has generation {have} but {requested} was requested")]
    GenerationMismatch {
        /// Object number
        number: u32,
        /// Generation recorded in the cross-reference table
        have: u16,
        /// Generation the caller asked for
        requested: u16,
    },

    /// Nonzero generation requested for an object inside an object stream
    #[error("object number {0} is in an object stream but has a nonzero generation number")]
    CompressedGeneration(u32),

    /// Stream decoding failed
    #[error("stream decoding error: {0}")]
    Decode(String),

    /// Unsupported feature (filter, predictor, field type, page tree shape)
    #[error("unsupported feature: {0}")]
    Unsupported(String),

    /// Form-layer error (missing field, invalid value, wrong field kind)
    #[error("form field error: {0}")]
    Field(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_names_offset() {
        let err = Error::Parse {
            offset: 1234,
            reason: "unexpected >".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("1234"));
        assert!(msg.contains("unexpected >"));
    }

    #[test]
    fn test_object_type_error() {
        let err = Error::ObjectType {
            expected: "Dictionary",
            found: "Array",
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Dictionary"));
        assert!(msg.contains("Array"));
    }

    #[test]
    fn test_generation_mismatch_message() {
        let err = Error::GenerationMismatch {
            number: 12,
            have: 0,
            requested: 1,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("12"));
        assert!(msg.contains("generation 0"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}

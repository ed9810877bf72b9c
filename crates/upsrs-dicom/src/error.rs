//! Error types for the DICOM data model.

use thiserror::Error;

/// Errors raised by the attribute model and the DICOM+JSON codec.
#[derive(Debug, Error)]
pub enum Error {
    /// A tag string was not eight hex digits.
    #[error("invalid tag: {0:?}")]
    InvalidTag(String),

    /// An unknown VR code was encountered.
    #[error("invalid VR: {0:?}")]
    InvalidVr(String),

    /// A search or filter key named neither a keyword nor a tag.
    #[error("unknown attribute keyword: {0:?}")]
    UnknownKeyword(String),

    /// A UID failed validation.
    #[error("invalid UID: {0:?}")]
    InvalidUid(String),

    /// A JSON value did not fit the element's VR.
    #[error("malformed DICOM+JSON for tag {tag}: {reason}")]
    MalformedJson {
        /// The offending tag (wire form).
        tag: String,
        /// What went wrong.
        reason: String,
    },

    /// The request body was not a DICOM+JSON dataset.
    #[error("malformed request body: {0}")]
    MalformedBody(String),
}

//! Errors raised while building or reading messages.

use std::string::FromUtf8Error;

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure to encode, assemble or parse a message.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A header name or value would corrupt the header block.
    #[error("Header cannot be written: {0}")]
    InvalidHeader(String),

    /// A `Content-Type` value is malformed.
    #[error("Malformed Content-Type: {0}")]
    InvalidContentType(String),

    /// Quoted-printable or RFC 2047 data is malformed.
    #[error("Malformed encoded data: {0}")]
    InvalidEncoding(String),

    /// Base64 data is malformed.
    #[error("Invalid base64 data: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// Decoded bytes are not UTF-8 text.
    #[error("Decoded text is not UTF-8: {0}")]
    Utf8Decode(#[from] FromUtf8Error),

    /// A multipart `Content-Type` has no boundary parameter.
    #[error("Multipart Content-Type has no boundary")]
    MissingBoundary,

    /// A multipart body cannot be written or split into parts.
    #[error("Malformed multipart body: {0}")]
    InvalidMultipart(String),

    /// The message structure is malformed.
    #[error("Malformed message: {0}")]
    Parse(String),
}

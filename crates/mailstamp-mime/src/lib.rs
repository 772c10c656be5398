//! # mailstamp-mime
//!
//! MIME generation and parsing for templated email.
//!
//! ## Features
//!
//! - **Encoding/Decoding**: Quoted-Printable bodies, RFC 2047 header words, Base64
//! - **Headers**: ordered header blocks written with CRLF line endings
//! - **Multipart**: `multipart/alternative` messages with text and HTML parts
//! - **Parsing**: read generated messages back for inspection
//!
//! The sending path only writes. The read-back side ([`Message::parse`],
//! [`Message::text_part`], [`Part::body_text`],
//! [`encoding::decode_rfc2047`]) exists so callers and tests can check what
//! went on the wire, e.g. a relay transcript or a dry-run output.
//!
//! ## Building a Message
//!
//! ```ignore
//! use mailstamp_mime::{ContentType, Headers, Message, Part};
//!
//! let mut headers = Headers::new();
//! headers.add("Subject", "Welcome")?;
//! headers.add("Content-Type", ContentType::multipart_alternative("mimeboundary").to_string())?;
//!
//! let parts = vec![
//!     Part::quoted_printable(&ContentType::text_plain(), "Hello Jane")?,
//!     Part::quoted_printable(&ContentType::text_html(), "<p>Hello Jane</p>")?,
//! ];
//!
//! let wire = Message::multipart(headers, parts).to_wire()?;
//! ```
//!
//! ## Encoding
//!
//! ```ignore
//! use mailstamp_mime::encoding::{decode_quoted_printable, encode_quoted_printable};
//!
//! let encoded = encode_quoted_printable("Héllo, Wørld!");
//! assert_eq!(decode_quoted_printable(&encoded)?, "Héllo, Wørld!");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod content_type;
mod error;
mod header;
mod message;

pub mod encoding;

pub use content_type::ContentType;
pub use error::{Error, Result};
pub use header::{Headers, format_date};
pub use message::{Message, Part, TransferEncoding};

//! MIME message structure: generation and parsing of multipart messages.

use crate::content_type::ContentType;
use crate::encoding::{decode_base64, decode_quoted_printable, encode_quoted_printable};
use crate::error::{Error, Result};
use crate::header::Headers;
use std::fmt;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    SevenBit,
    /// 8-bit text.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
}

impl TransferEncoding {
    /// Parses transfer encoding from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            _ => Self::SevenBit,
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
        }
    }
}

/// One body part of a multipart message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// Part headers.
    pub headers: Headers,
    /// Encoded body as it appears on the wire.
    pub body: String,
}

impl Part {
    /// Creates a quoted-printable text part of the given content type.
    ///
    /// # Errors
    ///
    /// Returns an error if the content type cannot be written as a header.
    pub fn quoted_printable(content_type: &ContentType, text: &str) -> Result<Self> {
        let mut headers = Headers::new();
        headers.add("Content-Type", content_type.to_string())?;
        headers.add(
            "Content-Transfer-Encoding",
            TransferEncoding::QuotedPrintable.to_string(),
        )?;
        Ok(Self {
            headers,
            body: encode_quoted_printable(text),
        })
    }

    /// Gets the content type, defaulting to `text/plain`.
    ///
    /// # Errors
    ///
    /// Returns an error if the content type header is invalid.
    pub fn content_type(&self) -> Result<ContentType> {
        self.headers
            .get("Content-Type")
            .map_or_else(|| Ok(ContentType::text_plain()), ContentType::parse)
    }

    /// Gets the transfer encoding.
    #[must_use]
    pub fn transfer_encoding(&self) -> TransferEncoding {
        self.headers
            .get("Content-Transfer-Encoding")
            .map_or(TransferEncoding::SevenBit, TransferEncoding::parse)
    }

    /// Decodes the body according to its transfer encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding or UTF-8 conversion fails.
    pub fn body_text(&self) -> Result<String> {
        match self.transfer_encoding() {
            TransferEncoding::QuotedPrintable => decode_quoted_printable(&self.body),
            TransferEncoding::Base64 => {
                let cleaned: String = self.body.chars().filter(|c| !c.is_whitespace()).collect();
                String::from_utf8(decode_base64(&cleaned)?).map_err(Into::into)
            }
            TransferEncoding::SevenBit | TransferEncoding::EightBit => Ok(self.body.clone()),
        }
    }
}

/// A multipart MIME message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Top-level headers, including the multipart `Content-Type`.
    pub headers: Headers,
    /// Body parts in order.
    pub parts: Vec<Part>,
}

impl Message {
    /// Creates a multipart message.
    #[must_use]
    pub const fn multipart(headers: Headers, parts: Vec<Part>) -> Self {
        Self { headers, parts }
    }

    /// Gets the content type.
    ///
    /// # Errors
    ///
    /// Returns an error if the header is missing or invalid.
    pub fn content_type(&self) -> Result<ContentType> {
        let value = self
            .headers
            .get("Content-Type")
            .ok_or_else(|| Error::Parse("Missing Content-Type header".into()))?;
        ContentType::parse(value)
    }

    /// Returns the multipart boundary.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingBoundary`] if the content type has no boundary.
    pub fn boundary(&self) -> Result<String> {
        self.content_type()?
            .boundary()
            .map(ToString::to_string)
            .ok_or(Error::MissingBoundary)
    }

    /// Gets the Subject header.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.headers.get("Subject")
    }

    /// Gets the Message-ID header.
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        self.headers.get("Message-ID")
    }

    /// Serializes the message with CRLF line endings.
    ///
    /// The output ends with the closing delimiter and no trailing line break.
    ///
    /// # Errors
    ///
    /// Returns an error if the boundary is missing, there are no parts, or
    /// a line of a part body starts with the boundary delimiter.
    pub fn to_wire(&self) -> Result<String> {
        let boundary = self.boundary()?;
        let delimiter = format!("--{boundary}");

        if self.parts.is_empty() {
            return Err(Error::InvalidMultipart("Message has no parts".into()));
        }

        let mut out = self.headers.to_string();
        out.push_str("\r\n");
        for part in &self.parts {
            if part.body.split('\n').any(|line| line.starts_with(&delimiter)) {
                return Err(Error::InvalidMultipart(format!(
                    "Part body contains the delimiter {delimiter}"
                )));
            }
            out.push_str(&delimiter);
            out.push_str("\r\n");
            out.push_str(&part.headers.to_string());
            out.push_str("\r\n");
            out.push_str(&part.body);
            out.push_str("\r\n");
        }
        out.push_str(&delimiter);
        out.push_str("--");

        Ok(out)
    }

    /// Parses a multipart message, the inverse of [`Message::to_wire`].
    ///
    /// Not used when sending; this is the read-back side for inspecting
    /// composed or relayed messages. The preamble and epilogue are discarded.
    ///
    /// # Errors
    ///
    /// Returns an error if the headers are malformed, the message is not
    /// multipart, or the closing delimiter is missing.
    pub fn parse(raw: &str) -> Result<Self> {
        let (head, body) = split_head_body(raw)?;
        let headers = Headers::parse(head)?;
        let content_type = headers
            .get("Content-Type")
            .ok_or_else(|| Error::Parse("Missing Content-Type header".into()))
            .and_then(ContentType::parse)?;

        if !content_type.is_multipart() {
            return Err(Error::InvalidMultipart(format!(
                "Not a multipart message: {content_type}"
            )));
        }
        let boundary = content_type.boundary().ok_or(Error::MissingBoundary)?;
        let delimiter = format!("--{boundary}");

        let mut sections = delimiter_sections(body, &delimiter).into_iter();
        sections.next();

        let mut parts = Vec::new();
        let mut closed = false;
        for section in sections {
            if section.starts_with("--") {
                closed = true;
                break;
            }
            let section = strip_line_break_prefix(section);
            // The line break before a delimiter belongs to the delimiter
            let section = section
                .strip_suffix("\r\n")
                .or_else(|| section.strip_suffix('\n'))
                .unwrap_or(section);

            let (part_head, part_body) = split_head_body(section)?;
            parts.push(Part {
                headers: Headers::parse(part_head)?,
                body: part_body.to_string(),
            });
        }

        if !closed {
            return Err(Error::InvalidMultipart(format!(
                "Missing closing delimiter {delimiter}--"
            )));
        }

        Ok(Self { headers, parts })
    }

    /// Decodes the first part with the given content type.
    ///
    /// # Errors
    ///
    /// Returns an error if no such part exists or decoding fails.
    pub fn part_text(&self, main_type: &str, sub_type: &str) -> Result<String> {
        for part in &self.parts {
            if part.content_type()?.is(main_type, sub_type) {
                return part.body_text();
            }
        }

        Err(Error::Parse(format!("No {main_type}/{sub_type} part found")))
    }

    /// Decodes the first `text/plain` part.
    ///
    /// # Errors
    ///
    /// Returns an error if no text part is found or decoding fails.
    pub fn text_part(&self) -> Result<String> {
        self.part_text("text", "plain")
    }

    /// Decodes the first `text/html` part.
    ///
    /// # Errors
    ///
    /// Returns an error if no HTML part is found or decoding fails.
    pub fn html_part(&self) -> Result<String> {
        self.part_text("text", "html")
    }
}

/// Splits a multipart body at delimiters that open a line; the same text
/// mid-line is content.
fn delimiter_sections<'a>(body: &'a str, delimiter: &str) -> Vec<&'a str> {
    let mut sections = Vec::new();
    let mut start = 0;
    let mut search = 0;
    while let Some(found) = body[search..].find(delimiter) {
        let at = search + found;
        if at == 0 || body.as_bytes()[at - 1] == b'\n' {
            sections.push(&body[start..at]);
            start = at + delimiter.len();
        }
        search = at + delimiter.len();
    }
    sections.push(&body[start..]);
    sections
}

fn strip_line_break_prefix(text: &str) -> &str {
    text.strip_prefix("\r\n")
        .or_else(|| text.strip_prefix('\n'))
        .unwrap_or(text)
}

/// Splits an entity at the blank line separating headers from body.
fn split_head_body(raw: &str) -> Result<(&str, &str)> {
    if let Some(body) = raw.strip_prefix("\r\n").or_else(|| raw.strip_prefix('\n')) {
        return Ok(("", body));
    }
    if let Some((head, body)) = raw.split_once("\r\n\r\n") {
        return Ok((head, body));
    }
    raw.split_once("\n\n")
        .ok_or_else(|| Error::Parse("Missing blank line after headers".into()))
}

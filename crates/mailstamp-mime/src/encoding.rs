//! MIME encoding and decoding utilities.
//!
//! Quoted-Printable bodies (RFC 2045) and RFC 2047 encoded-word headers.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt::Write as _;

/// Maximum encoded line length for Quoted-Printable, soft break included.
const MAX_LINE_LENGTH: usize = 76;

/// Largest UTF-8 payload per encoded word, keeping each word within 75 characters.
const ENCODED_WORD_MAX_BYTES: usize = 45;

/// Encodes data as Base64.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decodes Base64 data.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    STANDARD.decode(data).map_err(Into::into)
}

/// Encodes text using Quoted-Printable encoding (RFC 2045).
///
/// CRLF pairs are kept as hard line breaks. Every other byte outside
/// printable ASCII, including a lone CR or LF, is written as `=XX`, as is
/// whitespace that would otherwise end a line and a `-` that would start
/// one, so no encoded line can be mistaken for a multipart delimiter. Decoding the output with
/// [`decode_quoted_printable`] yields the input unchanged.
#[must_use]
pub fn encode_quoted_printable(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut result = String::with_capacity(bytes.len() + bytes.len() / 2);
    let mut line_length = 0;
    let mut i = 0;

    while i < bytes.len() {
        let byte = bytes[i];

        if byte == b'\r' && bytes.get(i + 1) == Some(&b'\n') {
            result.push_str("\r\n");
            line_length = 0;
            i += 2;
            continue;
        }

        let ends_line = match bytes.get(i + 1) {
            None => true,
            Some(b'\r') => bytes.get(i + 2) == Some(&b'\n'),
            Some(_) => false,
        };
        // A line opening with '-' could read as a multipart delimiter
        let is_literal = |at_line_start: bool| match byte {
            b'-' => !at_line_start,
            b'!'..=b'<' | b'>'..=b'~' => true,
            b' ' | b'\t' => !ends_line,
            _ => false,
        };
        let mut literal = is_literal(line_length == 0);
        let mut width = if literal { 1 } else { 3 };

        // Leave room for the trailing '=' of a soft line break
        if line_length + width > MAX_LINE_LENGTH - 1 {
            result.push_str("=\r\n");
            line_length = 0;
            literal = is_literal(true);
            width = if literal { 1 } else { 3 };
        }

        if literal {
            result.push(char::from(byte));
        } else {
            let _ = write!(result, "={byte:02X}");
        }
        line_length += width;
        i += 1;
    }

    result
}

/// Decodes Quoted-Printable text (RFC 2045).
///
/// # Errors
///
/// Returns an error if the input contains invalid escape sequences or the
/// decoded bytes are not UTF-8.
pub fn decode_quoted_printable(text: &str) -> Result<String> {
    String::from_utf8(decode_quoted_printable_bytes(text)?).map_err(Into::into)
}

fn decode_quoted_printable_bytes(text: &str) -> Result<Vec<u8>> {
    let bytes = text.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'=' {
            result.push(bytes[i]);
            i += 1;
            continue;
        }

        let rest = &bytes[i + 1..];
        if rest.starts_with(b"\r\n") {
            i += 3;
        } else if rest.starts_with(b"\n") {
            i += 2;
        } else {
            let [high, low] = rest
                .get(..2)
                .and_then(|pair| <[u8; 2]>::try_from(pair).ok())
                .ok_or_else(|| Error::InvalidEncoding("Incomplete escape sequence".into()))?;
            let byte = match (hex_value(high), hex_value(low)) {
                (Some(h), Some(l)) => (h << 4) | l,
                _ => {
                    return Err(Error::InvalidEncoding(format!(
                        "Invalid hex escape: ={}{}",
                        char::from(high),
                        char::from(low)
                    )));
                }
            };
            result.push(byte);
            i += 3;
        }
    }

    Ok(result)
}

const fn hex_value(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        _ => None,
    }
}

/// Encodes a header value using RFC 2047 `B` encoded words when needed.
///
/// Plain ASCII values are returned unchanged. Longer values are split
/// into several encoded words on character boundaries.
#[must_use]
pub fn encode_rfc2047(text: &str) -> String {
    let needs_encoding = text.contains("=?")
        || text
            .chars()
            .any(|c| !c.is_ascii() || (c.is_ascii_control() && c != '\t'));
    if !needs_encoding {
        return text.to_string();
    }

    let mut words = Vec::new();
    let mut chunk_start = 0;
    for (idx, ch) in text.char_indices() {
        if idx > chunk_start && idx + ch.len_utf8() - chunk_start > ENCODED_WORD_MAX_BYTES {
            words.push(encoded_word(&text[chunk_start..idx]));
            chunk_start = idx;
        }
    }
    words.push(encoded_word(&text[chunk_start..]));
    words.join(" ")
}

fn encoded_word(chunk: &str) -> String {
    format!("=?utf-8?B?{}?=", encode_base64(chunk.as_bytes()))
}

/// Decodes a header value that may contain RFC 2047 encoded words, the
/// read-back counterpart of [`encode_rfc2047`].
///
/// Whitespace between adjacent encoded words is dropped; other runs of
/// whitespace collapse to a single space.
///
/// # Errors
///
/// Returns an error if an encoded word is malformed.
pub fn decode_rfc2047(text: &str) -> Result<String> {
    let mut result = String::with_capacity(text.len());
    let mut previous_encoded = false;

    for (i, token) in text.split_whitespace().enumerate() {
        let decoded = decode_encoded_word(token)?;
        let is_encoded = decoded.is_some();
        if i > 0 && !(is_encoded && previous_encoded) {
            result.push(' ');
        }
        result.push_str(decoded.as_deref().unwrap_or(token));
        previous_encoded = is_encoded;
    }

    Ok(result)
}

fn decode_encoded_word(token: &str) -> Result<Option<String>> {
    let Some(inner) = token.strip_prefix("=?").and_then(|t| t.strip_suffix("?=")) else {
        return Ok(None);
    };

    let mut fields = inner.splitn(3, '?');
    let (Some(_charset), Some(encoding), Some(payload)) =
        (fields.next(), fields.next(), fields.next())
    else {
        return Err(Error::InvalidEncoding(format!(
            "Invalid RFC 2047 word: {token}"
        )));
    };

    let bytes = match encoding {
        "B" | "b" => decode_base64(payload)?,
        "Q" | "q" => decode_quoted_printable_bytes(&payload.replace('_', " "))?,
        other => {
            return Err(Error::InvalidEncoding(format!(
                "Unknown encoding: {other}"
            )));
        }
    };

    String::from_utf8(bytes).map(Some).map_err(Into::into)
}

//! Server replies.

use crate::error::Error;
use std::fmt;

/// A complete, possibly multi-line, server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Three-digit reply code shared by every line.
    pub code: ReplyCode,
    /// Text of each line with the code and separator removed.
    pub message: Vec<String>,
}

impl Reply {
    /// Creates a reply from its code and text lines.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(code: ReplyCode, message: Vec<String>) -> Self {
        Self { code, message }
    }

    /// Returns true for a positive completion (2xx).
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code.is_success()
    }

    /// Reply text with the lines joined by spaces.
    #[must_use]
    pub fn message_text(&self) -> String {
        self.message.join(" ")
    }

    /// Converts an unexpected reply into [`Error::Smtp`].
    #[must_use]
    pub fn to_error(&self) -> Error {
        Error::smtp(self.code.as_u16(), self.message_text())
    }
}

/// Three-digit SMTP reply code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReplyCode(u16);

impl ReplyCode {
    /// 221, the server is closing the connection.
    pub const CLOSING: Self = Self(221);
    /// 250, requested action completed.
    pub const OK: Self = Self(250);
    /// 354, send the message content.
    pub const START_DATA: Self = Self(354);

    /// Wraps a numeric code.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Numeric value.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Returns true for 2xx codes.
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 / 100 == 2
    }
}

impl fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

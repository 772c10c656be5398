//! Envelope addresses.

use crate::error::{Error, Result};
use std::fmt;

/// A checked `local@domain` mailbox for `MAIL FROM` and `RCPT TO`.
///
/// Anything that could end the command line early or smuggle a second
/// command (whitespace, controls, angle brackets) is refused up front.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    /// Checks and wraps `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] describing the first problem found.
    pub fn new(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into();
        check(&addr).map_err(|reason| Error::InvalidAddress(format!("{reason}: {addr:?}")))?;
        Ok(Self(addr))
    }

    /// The address text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn check(addr: &str) -> std::result::Result<(), &'static str> {
    if addr.is_empty() {
        return Err("empty address");
    }
    if addr
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '<' | '>'))
    {
        return Err("forbidden character in address");
    }

    let mut halves = addr.split('@');
    match (halves.next(), halves.next(), halves.next()) {
        (Some(local), Some(domain), None) if !local.is_empty() && !domain.is_empty() => Ok(()),
        (Some(_), Some(_), None) => Err("empty local part or domain"),
        (_, None, _) => Err("missing @"),
        _ => Err("more than one @"),
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

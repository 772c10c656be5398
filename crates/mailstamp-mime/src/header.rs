//! MIME header handling.

use crate::error::{Error, Result};
use chrono::{DateTime, TimeZone};
use std::fmt;

/// `Date` header layout from RFC 5322 section 3.3.
const DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// Ordered collection of email headers.
///
/// Headers keep insertion order and are written exactly as added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeader`] if the name is not a valid field
    /// name or the value contains a CR or LF.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let name = name.into();
        let value = value.into();

        if name.is_empty() || !name.bytes().all(|b| b.is_ascii_graphic() && b != b':') {
            return Err(Error::InvalidHeader(format!("Invalid field name: {name:?}")));
        }
        if value.contains(['\r', '\n']) {
            return Err(Error::InvalidHeader(format!(
                "Line break in value of {name}"
            )));
        }

        self.entries.push((name, value));
        Ok(())
    }

    /// Gets the first value for a header, ignoring name case.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the number of header lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no headers are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns an iterator over all headers in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Parses a header block, unfolding continuation lines.
    ///
    /// Parsing stops at the first empty line.
    ///
    /// # Errors
    ///
    /// Returns an error if a line is neither a field nor a continuation.
    pub fn parse(text: &str) -> Result<Self> {
        let mut entries: Vec<(String, String)> = Vec::new();

        for line in text.lines() {
            if line.is_empty() {
                break;
            }

            if line.starts_with([' ', '\t']) {
                let (_, value) = entries.last_mut().ok_or_else(|| {
                    Error::Parse(format!("Continuation without a header: {line}"))
                })?;
                value.push(' ');
                value.push_str(line.trim());
                continue;
            }

            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| Error::Parse(format!("Malformed header line: {line}")))?;
            entries.push((name.trim().to_string(), value.trim().to_string()));
        }

        Ok(Self { entries })
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.entries {
            write!(f, "{name}: {value}\r\n")?;
        }
        Ok(())
    }
}

/// Formats a timestamp for the `Date` header, e.g. `Mon, 02 Jan 2006 15:04:05 -0700`.
#[must_use]
pub fn format_date<Tz: TimeZone>(date: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    date.format(DATE_FORMAT).to_string()
}

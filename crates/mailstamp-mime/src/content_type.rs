//! `Content-Type` values.

use crate::error::{Error, Result};
use std::fmt;

/// A `type/subtype` pair plus its parameters, kept in written order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    mime_type: String,
    slash: usize,
    params: Vec<(String, String)>,
}

impl ContentType {
    /// Builds `top/sub` without parameters.
    #[must_use]
    pub fn new(top: impl Into<String>, sub: impl Into<String>) -> Self {
        let mut mime_type = top.into();
        let slash = mime_type.len();
        mime_type.push('/');
        mime_type.push_str(&sub.into());
        Self {
            mime_type,
            slash,
            params: Vec::new(),
        }
    }

    /// `text/plain; charset="UTF-8"`.
    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text", "plain").with_parameter("charset", "UTF-8")
    }

    /// `text/html; charset="UTF-8"`.
    #[must_use]
    pub fn text_html() -> Self {
        Self::new("text", "html").with_parameter("charset", "UTF-8")
    }

    /// `multipart/alternative` delimited by `boundary`.
    #[must_use]
    pub fn multipart_alternative(boundary: impl Into<String>) -> Self {
        Self::new("multipart", "alternative").with_parameter("boundary", boundary)
    }

    /// Appends a parameter.
    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// The top-level type, e.g. `text`.
    #[must_use]
    pub fn top_level(&self) -> &str {
        &self.mime_type[..self.slash]
    }

    /// The subtype, e.g. `html`.
    #[must_use]
    pub fn subtype(&self) -> &str {
        &self.mime_type[self.slash + 1..]
    }

    /// Looks up a parameter; names compare case-insensitively.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find_map(|(n, v)| n.eq_ignore_ascii_case(name).then_some(v.as_str()))
    }

    /// The `charset` parameter.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameter("charset")
    }

    /// The `boundary` parameter.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameter("boundary")
    }

    /// True for any `multipart/*`.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.top_level().eq_ignore_ascii_case("multipart")
    }

    /// True if this is `top/sub`, ignoring case.
    #[must_use]
    pub fn is(&self, top: &str, sub: &str) -> bool {
        self.top_level().eq_ignore_ascii_case(top) && self.subtype().eq_ignore_ascii_case(sub)
    }

    /// Parses a header value such as `text/plain; charset="utf-8"`.
    ///
    /// Parameter names are lowercased; surrounding quotes on values are
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContentType`] when the type or subtype is
    /// empty, or a parameter has no `=`.
    pub fn parse(value: &str) -> Result<Self> {
        let (essence, rest) = value.split_once(';').unwrap_or((value, ""));
        let Some((top, sub)) = essence
            .split_once('/')
            .map(|(top, sub)| (top.trim(), sub.trim()))
            .filter(|(top, sub)| !top.is_empty() && !sub.is_empty())
        else {
            return Err(Error::InvalidContentType(format!(
                "Expected type/subtype: {value}"
            )));
        };

        let params = rest
            .split(';')
            .map(str::trim)
            .filter(|param| !param.is_empty())
            .map(|param| {
                let (name, raw) = param.split_once('=').ok_or_else(|| {
                    Error::InvalidContentType(format!("Parameter without value: {param}"))
                })?;
                let raw = raw.trim();
                let unquoted = raw
                    .strip_prefix('"')
                    .and_then(|v| v.strip_suffix('"'))
                    .unwrap_or(raw);
                Ok((name.trim().to_ascii_lowercase(), unquoted.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            params,
            ..Self::new(top, sub)
        })
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.mime_type)?;
        self.params
            .iter()
            .try_for_each(|(name, value)| write!(f, "; {name}=\"{value}\""))
    }
}

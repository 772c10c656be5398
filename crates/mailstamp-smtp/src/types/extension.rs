//! EHLO capability keywords.

/// A capability line from the EHLO reply.
///
/// Keywords that change how a submission proceeds get their own variant;
/// everything else is kept verbatim in [`Extension::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Extension {
    /// `STARTTLS`: the connection can be upgraded to TLS.
    StartTls,
    /// `AUTH`: supported SASL mechanisms we know how to name.
    Auth(Vec<AuthMechanism>),
    /// `SIZE`: the server checks declared sizes, with an optional limit.
    Size(Option<usize>),
    /// Any other capability line.
    Other(String),
}

impl Extension {
    /// Parses one capability line.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let mut words = line.split_whitespace();
        match words.next() {
            Some(kw) if kw.eq_ignore_ascii_case("STARTTLS") => Self::StartTls,
            Some(kw) if kw.eq_ignore_ascii_case("AUTH") => {
                Self::Auth(words.filter_map(AuthMechanism::from_name).collect())
            }
            Some(kw) if kw.eq_ignore_ascii_case("SIZE") => {
                Self::Size(words.next().and_then(|limit| limit.parse().ok()))
            }
            _ => Self::Other(line.trim().to_string()),
        }
    }
}

/// SASL mechanism names that can appear after `AUTH`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMechanism {
    /// `PLAIN` (RFC 4616).
    Plain,
    /// `LOGIN`.
    Login,
    /// `XOAUTH2`.
    XOAuth2,
}

impl AuthMechanism {
    /// Looks up a mechanism by its case-insensitive name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        [Self::Plain, Self::Login, Self::XOAuth2]
            .into_iter()
            .find(|mechanism| mechanism.name().eq_ignore_ascii_case(name))
    }

    /// Name as written on the wire.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::Login => "LOGIN",
            Self::XOAuth2 => "XOAUTH2",
        }
    }
}

//! SMTP connection management with type-state pattern.

mod client;
mod stream;

pub use client::{Authenticated, Client, Connected, Data, MailTransaction, RecipientAdded, Ready};
pub use stream::SmtpStream;

use crate::types::{AuthMechanism, Extension};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Transport security for a submission connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Security {
    /// No encryption (local relays and tests only).
    None,
    /// Implicit TLS (connect directly with TLS).
    Tls,
    /// STARTTLS upgrade after plaintext connect.
    #[default]
    StartTls,
}

impl Security {
    /// Conventional submission port for the security mode.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::None => 25,
            Self::Tls => 465,
            Self::StartTls => 587,
        }
    }
}

/// Server capabilities from the EHLO response.
#[derive(Debug, Clone, Default)]
pub struct ServerInfo {
    /// Server hostname from greeting.
    pub hostname: String,
    /// Supported extensions.
    pub extensions: HashSet<Extension>,
}

impl ServerInfo {
    /// Checks if the server supports an extension.
    #[must_use]
    pub fn supports(&self, ext: &Extension) -> bool {
        self.extensions.contains(ext)
    }

    /// Checks if STARTTLS is supported.
    #[must_use]
    pub fn supports_starttls(&self) -> bool {
        self.supports(&Extension::StartTls)
    }

    /// Returns the SIZE extension, with its limit if one was advertised.
    #[must_use]
    pub fn size_extension(&self) -> Option<Option<usize>> {
        self.extensions.iter().find_map(|ext| match ext {
            Extension::Size(limit) => Some(*limit),
            _ => None,
        })
    }

    /// Returns supported authentication mechanisms.
    #[must_use]
    pub fn auth_mechanisms(&self) -> &[AuthMechanism] {
        self.extensions
            .iter()
            .find_map(|ext| match ext {
                Extension::Auth(mechanisms) => Some(mechanisms.as_slice()),
                _ => None,
            })
            .unwrap_or_default()
    }
}

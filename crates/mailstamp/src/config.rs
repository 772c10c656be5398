//! Mailer configuration.
//!
//! The configuration is plain data: it can be built in code or read from a
//! JSON file with [`Config::from_json_file`]. Secrets are kept out of
//! `Debug` output.

use crate::error::{Error, Result};
use mailstamp_smtp::Security;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Settings for sending templated email.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Envelope sender address used for `MAIL FROM`.
    pub from_address: String,
    /// Full `From`/`Sender` header value, e.g. `Acme <noreply@acme.test>`.
    pub from_display: String,
    /// Domain placed after the `@` of generated Message-IDs.
    pub send_domain: String,
    /// Directory holding one subdirectory per named template.
    pub template_path: PathBuf,
    /// SMTP relay settings.
    #[serde(default)]
    pub smtp: SmtpSettings,
}

impl Config {
    /// Reads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Checks that the fields every message needs are set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] naming the first empty field.
    pub fn validate(&self) -> Result<()> {
        if self.from_display.is_empty() {
            return Err(Error::InvalidConfig {
                field: "from_display",
            });
        }
        if self.send_domain.is_empty() {
            return Err(Error::InvalidConfig {
                field: "send_domain",
            });
        }
        Ok(())
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("from_address", &self.from_address)
            .field("from_display", &self.from_display)
            .field("send_domain", &self.send_domain)
            .field("template_path", &self.template_path)
            .field("smtp", &self.smtp)
            .finish()
    }
}

/// SMTP relay connection settings.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmtpSettings {
    /// Relay hostname.
    pub host: String,
    /// Relay port; `0` selects the default for the security mode.
    #[serde(default)]
    pub port: u16,
    /// Transport security.
    #[serde(default)]
    pub security: Security,
    /// Username for AUTH PLAIN; authentication is skipped when empty.
    #[serde(default)]
    pub username: String,
    /// Password for AUTH PLAIN.
    #[serde(default)]
    pub password: String,
}

impl SmtpSettings {
    /// Port to connect to, falling back to the conventional one.
    #[must_use]
    pub const fn port(&self) -> u16 {
        if self.port == 0 {
            self.security.default_port()
        } else {
            self.port
        }
    }

    /// Whether credentials should be sent to the relay.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty()
    }
}

impl fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let password = if self.password.is_empty() {
            ""
        } else {
            "<redacted>"
        };
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("security", &self.security)
            .field("username", &self.username)
            .field("password", &password)
            .finish()
    }
}

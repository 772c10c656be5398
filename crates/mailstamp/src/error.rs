//! Error types for rendering and sending templated email.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while composing or sending a message.
#[derive(Debug, Error)]
pub enum Error {
    /// A required configuration field is empty.
    #[error("Required configuration field not set: {field}")]
    InvalidConfig {
        /// Name of the offending field.
        field: &'static str,
    },

    /// The named template does not exist under the template root.
    #[error("Template not found: {name}")]
    TemplateMissing {
        /// Requested template name.
        name: String,
    },

    /// One of the files making up a template is absent.
    #[error("Template file missing: {}", path.display())]
    TemplateMissingFile {
        /// Path of the missing file.
        path: PathBuf,
    },

    /// A template failed to parse or execute.
    #[error(transparent)]
    Render(#[from] minijinja::Error),

    /// Reading a template or configuration file failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid JSON for [`crate::Config`].
    #[error("Invalid configuration file: {0}")]
    ConfigFormat(#[from] serde_json::Error),

    /// Building the MIME message failed.
    #[error(transparent)]
    Mime(#[from] mailstamp_mime::Error),

    /// The SMTP exchange failed.
    #[error(transparent)]
    Transport(#[from] mailstamp_smtp::Error),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

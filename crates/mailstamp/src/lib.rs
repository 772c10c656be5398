//! # mailstamp
//!
//! Templated transactional email.
//!
//! A [`Mailer`] renders a named template directory into a subject, a plain
//! text body and an HTML body, wraps both bodies in a
//! `multipart/alternative` message with quoted-printable encoding, and
//! submits it through an authenticated SMTP relay.
//!
//! ## Sending
//!
//! ```ignore
//! use mailstamp::{Config, FuncMap, Mailer, TemplateData, Value};
//!
//! let config = Config::from_json_file("mailstamp.json")?;
//! let mailer = Mailer::new(config);
//!
//! let mut data = TemplateData::new();
//! data.insert("name".into(), Value::from("Jane"));
//!
//! let result = mailer
//!     .send_mail("Jane Doe", "jane@example.com", "welcome", &data, &FuncMap::new(), &FuncMap::new())
//!     .await?;
//! println!("{}", result.message_id);
//! ```
//!
//! ## Template layout
//!
//! ```text
//! templates/base.html              shared layout
//! templates/welcome/subject.txt
//! templates/welcome/template.txt
//! templates/welcome/template.html   {% extends "base.html" %} ...
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
mod error;
pub mod mailer;
pub mod render;
pub mod transport;

pub use config::{Config, SmtpSettings};
pub use error::{Error, Result};
pub use mailer::{BOUNDARY, ComposedMessage, EmailResult, Mailer};
pub use render::{
    FuncMap, HtmlPolicy, RenderContext, RenderPolicy, Rendered, Renderer, Source, TemplateData,
    TemplatePaths, TextPolicy,
};
pub use transport::{Envelope, SmtpTransport, Transport};

pub use mailstamp_smtp::Security;
pub use minijinja::Value;

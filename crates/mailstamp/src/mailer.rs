//! Message assembly and submission.

use crate::config::Config;
use crate::error::Result;
use crate::render::{FuncMap, Rendered, Renderer, TemplateData};
use crate::transport::{Envelope, SmtpTransport, Transport};
use chrono::{DateTime, Local};
use mailstamp_mime::encoding::encode_rfc2047;
use mailstamp_mime::{ContentType, Headers, Message, Part, format_date};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Boundary separating the text and HTML parts.
pub const BOUNDARY: &str = "mimeboundary";

/// Largest random suffix of a generated Message-ID.
const MESSAGE_ID_SUFFIX_MAX: u32 = 999_999;

/// Outcome of a successful send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailResult {
    /// Message-ID without angle brackets.
    #[serde(rename = "messageID")]
    pub message_id: String,
}

/// A fully assembled message that has not been sent.
#[derive(Debug, Clone)]
pub struct ComposedMessage {
    /// Message-ID without angle brackets.
    pub message_id: String,
    /// Envelope the message would be submitted with.
    pub envelope: Envelope,
    /// Rendered template outputs.
    pub rendered: Rendered,
    /// Wire form of the message, CRLF line endings.
    pub raw: Vec<u8>,
}

/// Renders named templates and sends the result.
#[derive(Debug, Clone)]
pub struct Mailer<T = SmtpTransport> {
    config: Config,
    renderer: Renderer,
    transport: T,
}

impl Mailer<SmtpTransport> {
    /// Creates a mailer that submits through the configured SMTP relay.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let transport = SmtpTransport::new(config.smtp.clone());
        Self::with_transport(config, transport)
    }
}

impl<T> Mailer<T> {
    /// Creates a mailer with a custom transport.
    #[must_use]
    pub fn with_transport(config: Config, transport: T) -> Self {
        let renderer = Renderer::new(config.template_path.clone());
        Self {
            config,
            renderer,
            transport,
        }
    }

    /// Mailer configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Renders a named template without assembling a message.
    ///
    /// # Errors
    ///
    /// Returns the renderer's error, see [`Renderer::render`].
    pub async fn render(
        &self,
        to_email: &str,
        template_name: &str,
        data: &TemplateData,
        text_functions: &FuncMap,
        html_functions: &FuncMap,
    ) -> Result<Rendered> {
        self.renderer
            .render(to_email, template_name, data, text_functions, html_functions)
            .await
    }

    /// Renders and assembles a message without sending it.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::InvalidConfig`] if `from_display` or `send_domain` is empty
    /// - any rendering error, see [`Renderer::render`]
    /// - [`crate::Error::Mime`] if the message cannot be encoded
    pub async fn compose(
        &self,
        to_name: &str,
        to_email: &str,
        template_name: &str,
        data: &TemplateData,
        text_functions: &FuncMap,
        html_functions: &FuncMap,
    ) -> Result<ComposedMessage> {
        self.config.validate()?;

        let rendered = self
            .render(to_email, template_name, data, text_functions, html_functions)
            .await?;

        let text_part = Part::quoted_printable(&ContentType::text_plain(), &rendered.text)?;
        let html_part = Part::quoted_printable(&ContentType::text_html(), &rendered.html)?;

        let now = Local::now();
        let message_id = generate_message_id(&now, &self.config.send_domain);

        let mut headers = Headers::new();
        headers.add("From", &self.config.from_display)?;
        headers.add("To", display_recipient(to_name, to_email))?;
        headers.add("Subject", encode_rfc2047(&rendered.subject))?;
        headers.add("Sender", &self.config.from_display)?;
        headers.add("Message-ID", format!("<{message_id}>"))?;
        headers.add("Date", format_date(&now))?;
        headers.add("MIME-Version", "1.0")?;
        headers.add(
            "Content-Type",
            ContentType::multipart_alternative(BOUNDARY).to_string(),
        )?;

        let raw = Message::multipart(headers, vec![text_part, html_part])
            .to_wire()?
            .into_bytes();

        Ok(ComposedMessage {
            message_id,
            envelope: Envelope::new(&self.config.from_address, to_email),
            rendered,
            raw,
        })
    }
}

impl<T: Transport> Mailer<T> {
    /// Renders a named template and sends it to one recipient.
    ///
    /// `to_name` may be empty, in which case the `To` header carries the
    /// bare address.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Mailer::compose`], or
    /// [`crate::Error::Transport`] if the relay does not accept the message.
    pub async fn send_mail(
        &self,
        to_name: &str,
        to_email: &str,
        template_name: &str,
        data: &TemplateData,
        text_functions: &FuncMap,
        html_functions: &FuncMap,
    ) -> Result<EmailResult> {
        let composed = self
            .compose(
                to_name,
                to_email,
                template_name,
                data,
                text_functions,
                html_functions,
            )
            .await?;

        self.transport
            .send(&composed.envelope, &composed.raw)
            .await?;
        tracing::info!(
            message_id = %composed.message_id,
            template = template_name,
            "Email sent"
        );

        Ok(EmailResult {
            message_id: composed.message_id,
        })
    }
}

/// Builds `<unix seconds>.<random 0..=999999>@<send_domain>`.
fn generate_message_id(now: &DateTime<Local>, send_domain: &str) -> String {
    let suffix = rand::rng().random_range(0..=MESSAGE_ID_SUFFIX_MAX);
    format!("{}.{suffix}@{send_domain}", now.timestamp())
}

/// Formats the `To` header value.
fn display_recipient(to_name: &str, to_email: &str) -> String {
    if to_name.is_empty() {
        to_email.to_string()
    } else {
        format!("{} <{to_email}>", encode_rfc2047(to_name))
    }
}

//! Message delivery.
//!
//! [`Transport`] is the seam between message assembly and delivery.
//! [`SmtpTransport`] submits to a relay; tests substitute their own
//! implementation to capture what would have been sent.

use crate::config::SmtpSettings;
use mailstamp_smtp::{Address, Client, Error, Result, Security, SmtpStream};

/// Envelope addresses for one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Reverse path for `MAIL FROM`.
    pub from: String,
    /// Forward paths for `RCPT TO`.
    pub to: Vec<String>,
}

impl Envelope {
    /// Creates an envelope with a single recipient.
    #[must_use]
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: vec![to.into()],
        }
    }
}

/// Delivers an assembled message.
pub trait Transport: Send + Sync {
    /// Submits `message` for the envelope recipients.
    ///
    /// # Errors
    ///
    /// Returns an error if the message was not accepted.
    fn send(
        &self,
        envelope: &Envelope,
        message: &[u8],
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Submits messages to an SMTP relay, one connection per message.
#[derive(Debug, Clone)]
pub struct SmtpTransport {
    settings: SmtpSettings,
    client_hostname: String,
}

impl SmtpTransport {
    /// Creates a transport for the given relay.
    #[must_use]
    pub fn new(settings: SmtpSettings) -> Self {
        Self {
            settings,
            client_hostname: "localhost".to_string(),
        }
    }

    /// Sets the name announced in EHLO.
    #[must_use]
    pub fn with_client_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.client_hostname = hostname.into();
        self
    }

    /// Relay settings.
    #[must_use]
    pub const fn settings(&self) -> &SmtpSettings {
        &self.settings
    }
}

impl Transport for SmtpTransport {
    async fn send(&self, envelope: &Envelope, message: &[u8]) -> Result<()> {
        let from = Address::new(envelope.from.as_str())?;
        let mut recipients = envelope
            .to
            .iter()
            .map(|to| Address::new(to.as_str()))
            .collect::<Result<Vec<_>>>()?
            .into_iter();
        let first = recipients
            .next()
            .ok_or_else(|| Error::InvalidAddress("No recipients specified".into()))?;

        let host = self.settings.host.as_str();
        let port = self.settings.port();
        tracing::debug!(
            host,
            port,
            security = ?self.settings.security,
            "Connecting to SMTP relay"
        );

        let stream = SmtpStream::connect(host, port, self.settings.security).await?;
        let client = Client::from_stream(stream)
            .await?
            .ehlo(&self.client_hostname)
            .await?;
        let client = if self.settings.security == Security::StartTls {
            client.starttls(host).await?
        } else {
            client
        };

        let client = if self.settings.has_credentials() {
            client
                .auth_plain(&self.settings.username, &self.settings.password)
                .await?
                .mail_from(from, message.len())
                .await?
        } else {
            client.mail_from(from, message.len()).await?
        };

        let mut client = client.rcpt_to(first).await?;
        for to in recipients {
            client = client.rcpt_to(to).await?;
        }
        let client = client.data().await?.send_message(message).await?;

        // The relay already owns the message at this point
        if let Err(e) = client.quit().await {
            tracing::warn!(error = %e, "QUIT failed after message was accepted");
        }
        Ok(())
    }
}

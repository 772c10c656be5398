//! Type-state SMTP client.

use super::{ServerInfo, SmtpStream};
use crate::command::Command;
use crate::error::{Error, Result};
use crate::parser::{is_last_reply_line, parse_reply};
use crate::types::{Address, AuthMechanism, Extension, Reply, ReplyCode};
use base64::Engine;
use std::marker::PhantomData;

/// Type-state marker for connected state.
#[derive(Debug)]
pub struct Connected;

/// Type-state marker for authenticated state.
#[derive(Debug)]
pub struct Authenticated;

/// Type-state marker for mail transaction started.
#[derive(Debug)]
pub struct MailTransaction;

/// Type-state marker for recipient added.
#[derive(Debug)]
pub struct RecipientAdded;

/// Type-state marker for data mode.
#[derive(Debug)]
pub struct Data;

/// States in which a mail transaction may be started.
pub trait Ready: sealed::Sealed {}

impl Ready for Connected {}
impl Ready for Authenticated {}

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Connected {}
    impl Sealed for super::Authenticated {}
}

/// SMTP client with type-state pattern.
#[derive(Debug)]
pub struct Client<State> {
    stream: SmtpStream,
    server_info: ServerInfo,
    client_hostname: String,
    _state: PhantomData<State>,
}

impl Client<Connected> {
    /// Creates a client from a stream and reads the server greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the greeting fails or the server refuses service.
    pub async fn from_stream(mut stream: SmtpStream) -> Result<Self> {
        let greeting = expect_success(read_reply(&mut stream).await?)?;

        let hostname = greeting
            .message
            .first()
            .and_then(|msg| msg.split_whitespace().next())
            .unwrap_or("unknown")
            .to_string();
        tracing::debug!(server = %hostname, "SMTP greeting received");

        Ok(Self {
            stream,
            server_info: ServerInfo {
                hostname,
                ..ServerInfo::default()
            },
            client_hostname: String::new(),
            _state: PhantomData,
        })
    }

    /// Sends EHLO and discovers server capabilities.
    ///
    /// # Errors
    ///
    /// Returns an error if the EHLO command fails.
    pub async fn ehlo(mut self, client_hostname: &str) -> Result<Self> {
        client_hostname.clone_into(&mut self.client_hostname);
        self.discover_extensions().await?;
        Ok(self)
    }

    /// Upgrades the connection to TLS using STARTTLS, then repeats EHLO.
    ///
    /// # Errors
    ///
    /// Returns an error if STARTTLS is not advertised or the upgrade fails.
    pub async fn starttls(mut self, server_hostname: &str) -> Result<Self> {
        if !self.server_info.supports_starttls() {
            return Err(Error::NotSupported("STARTTLS".into()));
        }

        expect_success(self.send_command(Command::StartTls).await?)?;
        self.stream = self.stream.upgrade_to_tls(server_hostname).await?;
        tracing::debug!(server = server_hostname, "TLS established via STARTTLS");

        // Capabilities learned before TLS must be discarded
        self.discover_extensions().await?;
        Ok(self)
    }

    /// Authenticates using the PLAIN mechanism.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not offer AUTH PLAIN or rejects
    /// the credentials.
    pub async fn auth_plain(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<Authenticated>> {
        if !self
            .server_info
            .auth_mechanisms()
            .contains(&AuthMechanism::Plain)
        {
            return Err(Error::NotSupported("AUTH PLAIN".into()));
        }

        let credentials = format!("\0{username}\0{password}");
        let cmd = Command::Auth {
            mechanism: AuthMechanism::Plain,
            initial_response: base64::engine::general_purpose::STANDARD
                .encode(credentials.as_bytes()),
        };
        expect_success(self.send_command(cmd).await?)?;
        tracing::debug!(username, "SMTP authentication succeeded");

        Ok(self.transition())
    }

    async fn discover_extensions(&mut self) -> Result<()> {
        let cmd = Command::Ehlo {
            hostname: self.client_hostname.clone(),
        };
        let reply = expect_success(self.send_command(cmd).await?)?;

        // First line is the server's greeting, the rest are keywords
        self.server_info.extensions = reply
            .message
            .iter()
            .skip(1)
            .map(|line| Extension::parse(line))
            .collect();
        Ok(())
    }
}

impl<S: Ready> Client<S> {
    /// Starts a mail transaction.
    ///
    /// When the server advertises SIZE, the declared size is sent and
    /// checked against the advertised limit first.
    ///
    /// # Errors
    ///
    /// Returns an error if the message is too large or MAIL FROM is rejected.
    pub async fn mail_from(
        mut self,
        from: Address,
        size: usize,
    ) -> Result<Client<MailTransaction>> {
        let size = match self.server_info.size_extension() {
            Some(Some(limit)) if limit > 0 && size > limit => {
                return Err(Error::MessageTooLarge { size, limit });
            }
            Some(_) => Some(size),
            None => None,
        };

        expect_success(self.send_command(Command::MailFrom { from, size }).await?)?;
        Ok(self.transition())
    }
}

impl Client<MailTransaction> {
    /// Adds a recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RCPT TO command fails.
    pub async fn rcpt_to(mut self, to: Address) -> Result<Client<RecipientAdded>> {
        expect_success(self.send_command(Command::RcptTo { to }).await?)?;
        Ok(self.transition())
    }
}

impl Client<RecipientAdded> {
    /// Adds another recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RCPT TO command fails.
    pub async fn rcpt_to(mut self, to: Address) -> Result<Self> {
        expect_success(self.send_command(Command::RcptTo { to }).await?)?;
        Ok(self)
    }

    /// Begins sending message data.
    ///
    /// # Errors
    ///
    /// Returns an error if the DATA command is not answered with 354.
    pub async fn data(mut self) -> Result<Client<Data>> {
        let reply = self.send_command(Command::Data).await?;

        if reply.code != ReplyCode::START_DATA {
            return Err(reply.to_error());
        }

        Ok(self.transition())
    }
}

impl Client<Data> {
    /// Sends the message content and completes the transaction.
    ///
    /// Line endings are normalized to CRLF, lines starting with `.` are
    /// dot-stuffed, and the terminating `.` line is appended.
    ///
    /// # Errors
    ///
    /// Returns an error if sending fails or the server rejects the message.
    pub async fn send_message(mut self, message: &[u8]) -> Result<Client<Connected>> {
        self.stream.write_all(&encode_data(message)).await?;

        let reply = expect_success(read_reply(&mut self.stream).await?)?;
        tracing::debug!(reply = %reply.message_text(), "Message accepted");

        Ok(self.transition())
    }
}

// Common implementation for all states
impl<S> Client<S> {
    /// Returns the server information.
    #[must_use]
    pub const fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Sends QUIT and closes the connection (available in any state).
    ///
    /// # Errors
    ///
    /// Returns an error if the QUIT command fails.
    pub async fn quit(mut self) -> Result<()> {
        let reply = self.send_command(Command::Quit).await?;

        if !reply.is_success() && reply.code != ReplyCode::CLOSING {
            return Err(reply.to_error());
        }

        Ok(())
    }

    async fn send_command(&mut self, cmd: Command) -> Result<Reply> {
        tracing::debug!(command = cmd.verb(), "SMTP >>");
        self.stream.write_all(&cmd.serialize()).await?;
        let reply = read_reply(&mut self.stream).await?;
        tracing::debug!(code = %reply.code, "SMTP <<");
        Ok(reply)
    }

    fn transition<T>(self) -> Client<T> {
        Client {
            stream: self.stream,
            server_info: self.server_info,
            client_hostname: self.client_hostname,
            _state: PhantomData,
        }
    }
}

async fn read_reply(stream: &mut SmtpStream) -> Result<Reply> {
    let mut lines = Vec::new();
    loop {
        let line = stream.read_line().await?;
        let is_last = is_last_reply_line(&line);
        lines.push(line);

        if is_last {
            break;
        }
    }

    parse_reply(&lines)
}

fn expect_success(reply: Reply) -> Result<Reply> {
    if reply.is_success() {
        Ok(reply)
    } else {
        Err(reply.to_error())
    }
}

/// Builds the DATA payload: CRLF lines, dot-stuffed, ending in `.`.
fn encode_data(message: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(message.len() + 64);
    let body = message.strip_suffix(b"\n").unwrap_or(message);

    if !body.is_empty() {
        for line in body.split(|&b| b == b'\n') {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if line.first() == Some(&b'.') {
                out.push(b'.');
            }
            out.extend_from_slice(line);
            out.extend_from_slice(b"\r\n");
        }
    }

    out.extend_from_slice(b".\r\n");
    out
}

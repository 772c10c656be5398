//! Buffered connection to the relay, plain or TLS.

use super::Security;
use crate::error::{Error, Result};
use rustls::pki_types::ServerName;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::{
    TlsConnector,
    rustls::{ClientConfig, RootCertStore},
};

/// Line-oriented connection to an SMTP server.
#[derive(Debug)]
pub struct SmtpStream {
    reader: BufReader<Socket>,
}

#[derive(Debug)]
enum Socket {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl SmtpStream {
    /// Opens a connection for the given security mode.
    ///
    /// `Security::Tls` performs the TLS handshake immediately; the other
    /// modes start in plain text.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or TLS handshake fails.
    pub async fn connect(hostname: &str, port: u16, security: Security) -> Result<Self> {
        let tcp = TcpStream::connect((hostname, port)).await?;
        let socket = match security {
            Security::Tls => tls_handshake(tcp, hostname).await?,
            Security::StartTls | Security::None => Socket::Plain(tcp),
        };
        Ok(Self::new(socket))
    }

    fn new(socket: Socket) -> Self {
        Self {
            reader: BufReader::new(socket),
        }
    }

    /// Returns true once the connection is encrypted.
    #[must_use]
    pub fn is_tls(&self) -> bool {
        matches!(self.reader.get_ref(), Socket::Tls(_))
    }

    /// Reads one line with the line ending stripped.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or the server closed the connection.
    pub async fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Err(Error::Protocol("Connection closed by server".into()));
        }
        line.truncate(line.trim_end_matches(['\r', '\n']).len());
        Ok(line)
    }

    /// Writes data and flushes it.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let socket = self.reader.get_mut();
        socket.write_all(data).await?;
        socket.flush().await?;
        Ok(())
    }

    /// Upgrades a plain connection to TLS after STARTTLS was accepted.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is already encrypted, the server
    /// sent data ahead of the handshake, or the handshake fails.
    pub async fn upgrade_to_tls(self, hostname: &str) -> Result<Self> {
        // Bytes read before the handshake would be trusted as if encrypted
        if !self.reader.buffer().is_empty() {
            return Err(Error::Protocol(
                "Server sent data before the TLS handshake".into(),
            ));
        }

        match self.reader.into_inner() {
            Socket::Plain(tcp) => Ok(Self::new(tls_handshake(tcp, hostname).await?)),
            Socket::Tls(_) => Err(Error::Protocol("Already using TLS".into())),
        }
    }
}

async fn tls_handshake(tcp: TcpStream, hostname: &str) -> Result<Socket> {
    let server_name = ServerName::try_from(hostname.to_string())
        .map_err(|_| Error::Protocol(format!("Invalid hostname: {hostname}")))?;

    let tls = tls_connector().connect(server_name, tcp).await?;
    Ok(Socket::Tls(Box::new(tls)))
}

/// TLS connector trusting the bundled web PKI roots.
fn tls_connector() -> TlsConnector {
    let roots = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };
    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    TlsConnector::from(Arc::new(config))
}

impl AsyncRead for Socket {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(tcp) => Pin::new(tcp).poll_read(cx, buf),
            Self::Tls(tls) => Pin::new(tls.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Socket {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Plain(tcp) => Pin::new(tcp).poll_write(cx, buf),
            Self::Tls(tls) => Pin::new(tls.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(tcp) => Pin::new(tcp).poll_flush(cx),
            Self::Tls(tls) => Pin::new(tls.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(tcp) => Pin::new(tcp).poll_shutdown(cx),
            Self::Tls(tls) => Pin::new(tls.as_mut()).poll_shutdown(cx),
        }
    }
}

//! # mailstamp-smtp
//!
//! An SMTP submission client implementing the parts of RFC 5321 needed to
//! hand one message to a relay.
//!
//! ## Features
//!
//! - **Type-state connection management**: Compile-time enforcement of valid
//!   SMTP state transitions
//! - **TLS support**: Both implicit TLS (port 465) and STARTTLS (port 587)
//! - **Authentication**: AUTH PLAIN with initial response
//! - **Extensions**: SIZE checks before the transaction starts
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailstamp_smtp::{Address, Client, Security, SmtpStream};
//!
//! let stream = SmtpStream::connect("smtp.example.com", 587, Security::StartTls).await?;
//! let client = Client::from_stream(stream)
//!     .await?
//!     .ehlo("client.example.com")
//!     .await?
//!     .starttls("smtp.example.com")
//!     .await?
//!     .auth_plain("user@example.com", "password")
//!     .await?;
//!
//! let message = b"Subject: Test\r\n\r\nHello, World!\r\n";
//! let client = client
//!     .mail_from(Address::new("sender@example.com")?, message.len())
//!     .await?
//!     .rcpt_to(Address::new("recipient@example.com")?)
//!     .await?
//!     .data()
//!     .await?
//!     .send_message(message)
//!     .await?;
//!
//! client.quit().await?;
//! ```
//!
//! ## Connection States
//!
//! ```text
//! ┌──────────────┐
//! │  Connected   │ ─── auth_plain() ───→ Authenticated
//! └──────────────┘
//!        │                                     │
//!        └─── mail_from() ───→ MailTransaction ←┘
//!                                  │
//!                   rcpt_to() ───→ RecipientAdded ─── data() ───→ Data
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use connection::{
    Authenticated, Client, Connected, Data, MailTransaction, Ready, RecipientAdded, Security,
    ServerInfo, SmtpStream,
};
pub use error::{Error, Result};
pub use types::{Address, AuthMechanism, Extension, Reply, ReplyCode};

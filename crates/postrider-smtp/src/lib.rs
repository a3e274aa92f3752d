//! # postrider-smtp
//!
//! An event-driven SMTP submission client implementing RFC 5321 for the
//! one-message-per-session case.
//!
//! ## Features
//!
//! - **Reply-driven state machine**: every server reply is routed to the
//!   handler named by the current session state
//! - **Incremental reply parser**: multi-line replies reassembled from
//!   arbitrarily split byte chunks
//! - **Streaming DATA transfer**: dot-stuffing with a cross-chunk carry
//!   and backpressure via drain notifications
//! - **Authentication**: PLAIN, LOGIN, XOAUTH2
//! - **TLS via rustls**: implicit TLS with `webpki-roots` or a
//!   caller-supplied CA bundle
//! - **Transport-agnostic core**: the protocol engine drives an abstract
//!   duplex; a tokio adapter is included
//!
//! ## Quick Start
//!
//! ```ignore
//! use postrider_smtp::{
//!     connection, Credentials, Envelope, EventHandler, SmtpClient, SmtpOptions,
//! };
//! use postrider_smtp::connection::SocketHandle;
//!
//! struct Submit;
//!
//! impl EventHandler<SocketHandle> for Submit {
//!     fn on_idle(&mut self, client: &mut SmtpClient<SocketHandle>) {
//!         if client.envelope().is_none() {
//!             let env = Envelope::new(
//!                 "sender@example.com",
//!                 vec!["rcpt@example.com".into()],
//!             );
//!             client.use_envelope(env).expect("idle");
//!         } else {
//!             client.quit();
//!         }
//!     }
//!
//!     fn on_ready(&mut self, client: &mut SmtpClient<SocketHandle>, _failed: &[String]) {
//!         client.send(b"Subject: hello\r\n\r\nHi!\r\n");
//!         client.end(None);
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> postrider_smtp::Result<()> {
//!     let options = SmtpOptions::builder("smtp.example.com")
//!         .auth(Credentials::new("user@example.com", "password"))
//!         .build();
//!     connection::run(options, &mut Submit).await
//! }
//! ```
//!
//! ## Session States
//!
//! The active state names the handler for the next server reply:
//!
//! ```text
//! Connecting → Greeting → Ehlo ─┬─→ (auth states) → Idle
//!                               └─→ Helo ──────────↗  │
//!        Idle ← Streaming ← Data ← Rcpt ← Mail ←──────┘
//! ```
//!
//! ## Modules
//!
//! - [`auth`]: SASL mechanism encoders
//! - [`client`]: the facade, its options, events, and the dot-stuffer
//! - [`command`]: SMTP command builders
//! - [`connection`]: tokio transport adapter and session driver
//! - [`log`]: bounded transfer log
//! - [`parser`]: incremental reply parser
//! - [`transport`]: the transport abstraction the core consumes
//! - [`types`]: core SMTP types (replies, envelopes)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod auth;
pub mod client;
pub mod command;
pub mod connection;
mod error;
pub mod log;
pub mod parser;
pub mod transport;
pub mod types;

pub use auth::{AuthMechanism, Credentials};
pub use client::{
    CollectingHandler, DotStuffer, EventHandler, LoggingHandler, NoopHandler, SessionEvent,
    SessionState, SmtpClient, SmtpOptions, SmtpOptionsBuilder,
};
pub use error::{Error, Result};
pub use log::{Direction, LogEntry, TransferLog};
pub use parser::ReplyParser;
pub use transport::{MemoryTransport, ReadyState, Transport};
pub use types::{Envelope, Reply, ReplyCode};

/// Protocol version implemented.
pub const SMTP_VERSION: &str = "SMTP/ESMTP (RFC 5321)";

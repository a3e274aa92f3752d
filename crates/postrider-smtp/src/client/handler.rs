//! Caller-facing session events.
//!
//! The client surfaces its lifecycle through this trait rather than
//! return values: the machine is reply-driven, so readiness, completion,
//! and failure arrive whenever the server answers. Every callback
//! receives the client handle and may re-enter it (submit an envelope,
//! stream body bytes, quit); the machine commits its state transition
//! before emitting, so re-entry observes the new state.

use crate::client::SmtpClient;
use crate::error::Error;
use crate::transport::Transport;

/// Handler for session events.
///
/// All methods default to no-ops; implement the ones the caller needs.
pub trait EventHandler<T: Transport> {
    /// The session is idle: an envelope may be submitted or the session
    /// closed. Emitted after greeting/authentication completes and after
    /// each finished transaction.
    fn on_idle(&mut self, client: &mut SmtpClient<T>) {
        let _ = client;
    }

    /// The server accepted DATA; body bytes may be streamed. `failed`
    /// lists recipients the server rejected during RCPT negotiation.
    fn on_ready(&mut self, client: &mut SmtpClient<T>, failed: &[String]) {
        let _ = (client, failed);
    }

    /// The server acknowledged the message body.
    fn on_done(&mut self, client: &mut SmtpClient<T>, success: bool) {
        let _ = (client, success);
    }

    /// The transport flushed its write queue; more body bytes are
    /// welcome.
    fn on_drain(&mut self, client: &mut SmtpClient<T>) {
        let _ = client;
    }

    /// The session failed. The client closes itself right after this.
    fn on_error(&mut self, client: &mut SmtpClient<T>, error: &Error) {
        let _ = (client, error);
    }

    /// The session ended; emitted exactly once.
    fn on_close(&mut self, client: &mut SmtpClient<T>) {
        let _ = client;
    }
}

/// A handler that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandler;

impl<T: Transport> EventHandler<T> for NoopHandler {}

/// A handler that logs every event using tracing.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl<T: Transport> EventHandler<T> for LoggingHandler {
    fn on_idle(&mut self, _client: &mut SmtpClient<T>) {
        tracing::debug!("idle");
    }

    fn on_ready(&mut self, _client: &mut SmtpClient<T>, failed: &[String]) {
        tracing::debug!(?failed, "ready for message data");
    }

    fn on_done(&mut self, _client: &mut SmtpClient<T>, success: bool) {
        tracing::info!(success, "message accepted");
    }

    fn on_drain(&mut self, _client: &mut SmtpClient<T>) {
        tracing::trace!("drain");
    }

    fn on_error(&mut self, _client: &mut SmtpClient<T>, error: &Error) {
        tracing::error!(%error, "session error");
    }

    fn on_close(&mut self, _client: &mut SmtpClient<T>) {
        tracing::debug!("closed");
    }
}

/// A handler that records events for later inspection.
///
/// Useful for testing or batch processing.
#[derive(Debug, Default, Clone)]
pub struct CollectingHandler {
    /// Recorded events, in emission order.
    pub events: Vec<SessionEvent>,
}

impl CollectingHandler {
    /// Creates an empty collecting handler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes all recorded events, leaving the handler empty.
    pub fn take(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }
}

impl<T: Transport> EventHandler<T> for CollectingHandler {
    fn on_idle(&mut self, _client: &mut SmtpClient<T>) {
        self.events.push(SessionEvent::Idle);
    }

    fn on_ready(&mut self, _client: &mut SmtpClient<T>, failed: &[String]) {
        self.events.push(SessionEvent::Ready(failed.to_vec()));
    }

    fn on_done(&mut self, _client: &mut SmtpClient<T>, success: bool) {
        self.events.push(SessionEvent::Done(success));
    }

    fn on_drain(&mut self, _client: &mut SmtpClient<T>) {
        self.events.push(SessionEvent::Drain);
    }

    fn on_error(&mut self, _client: &mut SmtpClient<T>, error: &Error) {
        self.events.push(SessionEvent::Error(error.to_string()));
    }

    fn on_close(&mut self, _client: &mut SmtpClient<T>) {
        self.events.push(SessionEvent::Close);
    }
}

/// An event recorded by [`CollectingHandler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// `on_idle`
    Idle,
    /// `on_ready` with the rejected recipients.
    Ready(Vec<String>),
    /// `on_done` with the server's verdict.
    Done(bool),
    /// `on_drain`
    Drain,
    /// `on_error` with the rendered message.
    Error(String),
    /// `on_close`
    Close,
}

//! Event-driven SMTP submission client.

mod handler;
mod machine;
mod options;
mod stuffer;

pub use handler::{CollectingHandler, EventHandler, LoggingHandler, NoopHandler, SessionEvent};
pub use options::{SmtpOptions, SmtpOptionsBuilder};
pub use stuffer::DotStuffer;

use std::collections::HashSet;

use crate::auth::Credentials;
use crate::command::Command;
use crate::error::{Error, Result};
use crate::log::{Direction, LogEntry, TransferLog};
use crate::parser::ReplyParser;
use crate::transport::{ReadyState, Transport};
use crate::types::Envelope;

/// Protocol state of a session.
///
/// The active state selects the handler for the next server reply; the
/// reply dispatch is a single match over this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport not yet open.
    Connecting,
    /// Awaiting the 220 greeting.
    Greeting,
    /// Awaiting the EHLO (or LHLO) capability response.
    Ehlo,
    /// Awaiting the HELO fallback response.
    Helo,
    /// Awaiting the LOGIN username challenge.
    AuthLoginUser,
    /// Awaiting the LOGIN password challenge.
    AuthLoginPass,
    /// Awaiting the XOAUTH2 verdict or error challenge.
    AuthXOauth2,
    /// Awaiting the final authentication verdict.
    AuthComplete,
    /// Between transactions; caller may submit an envelope or quit.
    Idle,
    /// Awaiting the MAIL FROM reply.
    Mail,
    /// Awaiting a RCPT TO reply.
    Rcpt,
    /// Awaiting the DATA go-ahead.
    Data,
    /// Body terminator sent; awaiting the server's verdict.
    Streaming,
    /// Awaiting the RSET reply.
    Rset,
    /// QUIT sent; any reply closes the session.
    Quit,
    /// Session over; replies are discarded.
    Closed,
}

/// SMTP submission client driving one message per session.
///
/// The client owns the protocol state and a [`Transport`] handle. Bytes
/// from the wire enter through [`on_data`](Self::on_data); the caller's
/// view of the session arrives through an [`EventHandler`]. Callbacks
/// receive the client and may re-enter it; every transition is committed
/// before its event is emitted.
#[derive(Debug)]
pub struct SmtpClient<T: Transport> {
    options: SmtpOptions,
    transport: T,
    parser: ReplyParser,
    stuffer: DotStuffer,
    log: TransferLog,
    state: SessionState,
    supported_auth: HashSet<String>,
    authenticated_as: Option<String>,
    envelope: Option<Envelope>,
    data_mode: bool,
    destroyed: bool,
}

impl<T: Transport> SmtpClient<T> {
    /// Creates a client over a transport that is connecting or open.
    #[must_use]
    pub fn new(transport: T, options: SmtpOptions) -> Self {
        let stuffer = DotStuffer::new(!options.disable_escaping);
        let log = TransferLog::new(options.log_length);
        Self {
            options,
            transport,
            parser: ReplyParser::new(),
            stuffer,
            log,
            state: SessionState::Connecting,
            supported_auth: HashSet::new(),
            authenticated_as: None,
            envelope: None,
            data_mode: false,
            destroyed: false,
        }
    }

    /// Current protocol state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Identity confirmed by the server, once authentication completed.
    #[must_use]
    pub fn authenticated_as(&self) -> Option<&str> {
        self.authenticated_as.as_deref()
    }

    /// The active envelope, if a transaction is in progress.
    #[must_use]
    pub const fn envelope(&self) -> Option<&Envelope> {
        self.envelope.as_ref()
    }

    /// Returns true if the session has been torn down.
    #[must_use]
    pub const fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Returns true if body bytes are currently accepted.
    #[must_use]
    pub const fn is_data_mode(&self) -> bool {
        self.data_mode
    }

    /// Mechanisms advertised by the server, canonicalized to upper case.
    #[must_use]
    pub const fn supported_auth(&self) -> &HashSet<String> {
        &self.supported_auth
    }

    /// Captured transfer-log entries, oldest first.
    pub fn transfer_log(&self) -> impl Iterator<Item = &LogEntry> {
        self.log.entries()
    }

    /// The transport handle owned by this session.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    // ---- transport events -------------------------------------------------

    /// The transport finished connecting; the greeting is expected next.
    pub fn on_open(&mut self) {
        if self.destroyed {
            return;
        }
        tracing::debug!(host = %self.options.host, "connected");
        self.state = SessionState::Greeting;
    }

    /// Bytes arrived from the server.
    pub fn on_data<H: EventHandler<T>>(&mut self, bytes: &[u8], handler: &mut H) {
        if self.destroyed {
            return;
        }
        self.log.push(Direction::Server, bytes);
        let replies = self.parser.feed(bytes);
        for reply in replies {
            if self.destroyed {
                break;
            }
            tracing::debug!(code = %reply.code, line = %reply.status_line(), "S:");
            self.dispatch(reply, handler);
        }
    }

    /// The transport flushed its write queue.
    pub fn on_drain<H: EventHandler<T>>(&mut self, handler: &mut H) {
        if self.destroyed {
            return;
        }
        handler.on_drain(self);
    }

    /// The transport failed; the error is rethrown to the caller and the
    /// session collapses.
    pub fn on_error<H: EventHandler<T>>(&mut self, error: Error, handler: &mut H) {
        if self.destroyed {
            return;
        }
        self.emit_error(error, handler);
    }

    /// The transport closed.
    pub fn on_close<H: EventHandler<T>>(&mut self, handler: &mut H) {
        self.destroy(handler);
    }

    // ---- caller operations ------------------------------------------------

    /// Starts a mail transaction for the given envelope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] unless the session is idle.
    pub fn use_envelope(&mut self, envelope: Envelope) -> Result<()> {
        if self.destroyed || self.state != SessionState::Idle {
            return Err(Error::InvalidState(
                "envelope can only be submitted while idle".into(),
            ));
        }
        let from = envelope.from.clone();
        self.envelope = Some(envelope);
        self.stuffer.reset();
        self.send_command(&Command::MailFrom { from });
        self.state = SessionState::Mail;
        Ok(())
    }

    /// Streams a chunk of the message body through the dot-stuffer.
    ///
    /// A no-op outside data mode, including between [`end`](Self::end)
    /// and the server's verdict.
    pub fn send(&mut self, chunk: &[u8]) {
        if self.destroyed || !self.data_mode {
            return;
        }
        let out = self.stuffer.write(chunk);
        if !out.is_empty() {
            self.send_raw(&out);
        }
    }

    /// Finishes the message body, optionally flushing one last chunk,
    /// and awaits the server's verdict.
    pub fn end(&mut self, last: Option<&[u8]>) {
        if self.destroyed || !self.data_mode {
            return;
        }
        if let Some(chunk) = last {
            let out = self.stuffer.write(chunk);
            if !out.is_empty() {
                self.send_raw(&out);
            }
        }
        let terminator = self.stuffer.end();
        self.send_raw(&terminator);
        self.data_mode = false;
        if self.options.lmtp {
            if let Some(env) = self.envelope.as_mut() {
                env.expect_streaming_responses();
            }
        }
        self.state = SessionState::Streaming;
    }

    /// Aborts the current transaction, optionally replacing the
    /// credentials, and re-authenticates.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] after the session was destroyed.
    pub fn reset(&mut self, new_auth: Option<Credentials>) -> Result<()> {
        if self.destroyed {
            return Err(Error::InvalidState("session closed".into()));
        }
        if let Some(credentials) = new_auth {
            self.options.auth = Some(credentials);
        }
        self.envelope = None;
        self.data_mode = false;
        self.stuffer.reset();
        self.send_command(&Command::Rset);
        self.state = SessionState::Rset;
        Ok(())
    }

    /// Pauses delivery of incoming data while the transport is open.
    pub fn suspend(&mut self) {
        if !self.destroyed && self.transport.ready_state() == ReadyState::Open {
            self.transport.suspend();
        }
    }

    /// Resumes delivery of incoming data while the transport is open.
    pub fn resume(&mut self) {
        if !self.destroyed && self.transport.ready_state() == ReadyState::Open {
            self.transport.resume();
        }
    }

    /// Sends QUIT; the session closes on the server's reply.
    pub fn quit(&mut self) {
        if self.destroyed {
            return;
        }
        self.send_command(&Command::Quit);
        self.state = SessionState::Quit;
    }

    /// Aborts the session. Pending replies are discarded; `on_close`
    /// fires once the transport confirms.
    pub fn close<H: EventHandler<T>>(&mut self, handler: &mut H) {
        if self.destroyed {
            return;
        }
        if self.transport.ready_state() == ReadyState::Open {
            self.state = SessionState::Closed;
            self.transport.close();
        } else {
            self.destroy(handler);
        }
    }

    // ---- internals --------------------------------------------------------

    pub(crate) fn send_command(&mut self, command: &Command) {
        let bytes = command.serialize();
        tracing::debug!(line = %String::from_utf8_lossy(&bytes).trim_end(), "C:");
        self.log.push(Direction::Client, &bytes);
        self.transport.send(&bytes);
    }

    /// Sends a bare CRLF-terminated line (authentication continuations).
    pub(crate) fn send_line(&mut self, line: &str) {
        let mut bytes = Vec::with_capacity(line.len() + 2);
        bytes.extend_from_slice(line.as_bytes());
        bytes.extend_from_slice(b"\r\n");
        tracing::debug!(line, "C:");
        self.log.push(Direction::Client, &bytes);
        self.transport.send(&bytes);
    }

    pub(crate) fn send_raw(&mut self, bytes: &[u8]) {
        self.log.push(Direction::Client, bytes);
        self.transport.send(bytes);
    }

    /// Collapses the session: the error is surfaced, then the transport
    /// is closed. Idempotent like [`destroy`](Self::destroy): once the
    /// collapse has started, further errors are swallowed so the caller
    /// sees one `on_error` per session.
    pub(crate) fn emit_error<H: EventHandler<T>>(&mut self, error: Error, handler: &mut H) {
        if self.destroyed || self.state == SessionState::Closed {
            tracing::trace!(%error, "error after collapse discarded");
            return;
        }
        tracing::error!(%error, "session failed");
        self.parser.reset();
        self.envelope = None;
        self.data_mode = false;
        handler.on_error(self, &error);
        if !self.destroyed {
            self.close(handler);
        }
    }

    /// Tears the session down; `on_close` is emitted exactly once.
    pub(crate) fn destroy<H: EventHandler<T>>(&mut self, handler: &mut H) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.state = SessionState::Closed;
        self.parser.reset();
        self.envelope = None;
        self.data_mode = false;
        handler.on_close(self);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;

    fn open_client(options: SmtpOptions) -> SmtpClient<MemoryTransport> {
        let mut client = SmtpClient::new(MemoryTransport::new(), options);
        client.on_open();
        client
    }

    fn idle_client() -> (SmtpClient<MemoryTransport>, CollectingHandler) {
        let mut handler = CollectingHandler::new();
        let mut client = open_client(SmtpOptions::new("mx.example.com", 587));
        client.on_data(b"220 hi\r\n250 ok\r\n", &mut handler);
        assert_eq!(client.state(), SessionState::Idle);
        (client, handler)
    }

    #[test]
    fn open_transitions_to_greeting() {
        let client = open_client(SmtpOptions::new("mx.example.com", 587));
        assert_eq!(client.state(), SessionState::Greeting);
    }

    #[test]
    fn use_envelope_outside_idle_is_rejected() {
        let mut client = open_client(SmtpOptions::new("mx.example.com", 587));
        let envelope = Envelope::new("s@example.com", vec!["r@example.com".to_string()]);
        let err = client.use_envelope(envelope).unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[test]
    fn send_outside_data_mode_is_a_no_op() {
        let (mut client, _handler) = idle_client();
        let writes_before = client.transport().writes.len();
        client.send(b"body bytes");
        assert_eq!(client.transport().writes.len(), writes_before);
    }

    #[test]
    fn send_between_end_and_verdict_is_a_no_op() {
        let (mut client, mut handler) = idle_client();
        client
            .use_envelope(Envelope::new(
                "s@example.com",
                vec!["r@example.com".to_string()],
            ))
            .unwrap();
        client.on_data(b"250 ok\r\n250 ok\r\n354 go\r\n", &mut handler);
        assert!(client.is_data_mode());

        client.end(Some(b"Body"));
        assert_eq!(client.state(), SessionState::Streaming);
        let writes_before = client.transport().writes.len();
        client.send(b"late bytes");
        assert_eq!(client.transport().writes.len(), writes_before);
    }

    #[test]
    fn suspend_and_resume_forward_while_open() {
        let (mut client, _handler) = idle_client();
        client.suspend();
        client.resume();
        assert_eq!(client.transport().suspends, 1);
        assert_eq!(client.transport().resumes, 1);
    }

    #[test]
    fn suspend_after_close_is_ignored() {
        let (mut client, mut handler) = idle_client();
        client.close(&mut handler);
        client.suspend();
        assert_eq!(client.transport().suspends, 0);
    }

    #[test]
    fn quit_then_any_reply_closes() {
        let (mut client, mut handler) = idle_client();
        client.quit();
        assert_eq!(client.state(), SessionState::Quit);
        client.on_data(b"221 bye\r\n", &mut handler);
        // Transport close was requested; the driver confirms it.
        client.on_close(&mut handler);
        assert!(client.is_destroyed());
        assert_eq!(handler.events.last(), Some(&SessionEvent::Close));
    }

    #[test]
    fn on_close_emits_exactly_once() {
        let (mut client, mut handler) = idle_client();
        client.on_close(&mut handler);
        client.on_close(&mut handler);
        client.close(&mut handler);
        let closes = handler
            .events
            .iter()
            .filter(|e| **e == SessionEvent::Close)
            .count();
        assert_eq!(closes, 1);
    }

    #[test]
    fn on_error_emits_exactly_once_per_session() {
        let (mut client, mut handler) = idle_client();
        client.on_error(Error::Protocol("first failure".into()), &mut handler);
        client.on_error(Error::Protocol("second failure".into()), &mut handler);

        let errors = handler
            .events
            .iter()
            .filter(|e| matches!(e, SessionEvent::Error(_)))
            .count();
        assert_eq!(errors, 1);

        // The collapse is underway but the transport close has not been
        // confirmed yet; the driver's confirmation destroys the session.
        assert!(!client.is_destroyed());
        client.on_close(&mut handler);
        assert!(client.is_destroyed());
        assert_eq!(handler.events.last(), Some(&SessionEvent::Close));
    }

    #[test]
    fn operations_after_destroy_are_no_ops() {
        let (mut client, mut handler) = idle_client();
        client.on_close(&mut handler);

        assert!(client
            .use_envelope(Envelope::new("s@example.com", vec![]))
            .is_err());
        assert!(client.reset(None).is_err());
        client.quit();
        client.send(b"ignored");
        assert_eq!(client.state(), SessionState::Closed);
    }

    #[test]
    fn transfer_log_captures_both_directions() {
        let options = SmtpOptions::builder("mx.example.com").log_length(8).build();
        let mut handler = CollectingHandler::new();
        let mut client = open_client(options);
        client.on_data(b"220 hi\r\n", &mut handler);

        let entries: Vec<_> = client.transfer_log().collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].direction, Direction::Server);
        assert_eq!(entries[0].bytes, b"220 hi\r\n");
        assert_eq!(entries[1].direction, Direction::Client);
        assert_eq!(entries[1].bytes, b"EHLO localhost\r\n");
    }

    #[test]
    fn zero_log_length_captures_nothing() {
        let (client, _handler) = idle_client();
        assert_eq!(client.transfer_log().count(), 0);
    }

    #[test]
    fn reset_replaces_credentials_and_sends_rset() {
        let (mut client, mut handler) = idle_client();
        client
            .reset(Some(Credentials::new("other", "secret")))
            .unwrap();
        assert_eq!(client.state(), SessionState::Rset);
        assert!(client.transport().wire().ends_with(b"RSET\r\n"));

        // RSET accepted: authentication restarts with the new credentials.
        client.on_data(b"250 ok\r\n", &mut handler);
        assert_eq!(client.state(), SessionState::AuthComplete);
        let wire = client.transport().wire();
        let tail = String::from_utf8_lossy(&wire);
        assert!(tail.contains("AUTH PLAIN AG90aGVyAHNlY3JldA=="));
    }
}

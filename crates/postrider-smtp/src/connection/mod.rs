//! Tokio session driver.
//!
//! The client core is transport-agnostic; this module supplies the
//! production transport. A [`SocketHandle`] implements [`Transport`] by
//! enqueueing commands on an unbounded channel, and [`run_with_stream`]
//! owns the socket, draining that channel and feeding received bytes
//! back into the facade. Bytes are written in call order and the drain
//! notification fires when the write queue empties.

mod stream;

pub use stream::{SmtpStream, connect, connect_tls};

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::client::{EventHandler, SmtpClient, SmtpOptions};
use crate::error::Result;
use crate::transport::{ReadyState, Transport};

const STATE_CONNECTING: u8 = 0;
const STATE_OPEN: u8 = 1;
const STATE_CLOSING: u8 = 2;
const STATE_CLOSED: u8 = 3;

const READ_BUFFER_SIZE: usize = 4096;

#[derive(Debug)]
enum Cmd {
    Send(Vec<u8>),
    Close,
    Suspend,
    Resume,
}

/// Channel-backed [`Transport`] paired with the driver loop.
#[derive(Debug)]
pub struct SocketHandle {
    tx: mpsc::UnboundedSender<Cmd>,
    state: Arc<AtomicU8>,
}

impl SocketHandle {
    fn pair() -> (Self, mpsc::UnboundedReceiver<Cmd>, Arc<AtomicU8>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let state = Arc::new(AtomicU8::new(STATE_CONNECTING));
        let handle = Self {
            tx,
            state: Arc::clone(&state),
        };
        (handle, rx, state)
    }
}

impl Transport for SocketHandle {
    fn send(&mut self, bytes: &[u8]) {
        let _ = self.tx.send(Cmd::Send(bytes.to_vec()));
    }

    fn close(&mut self) {
        self.state.store(STATE_CLOSING, Ordering::Release);
        let _ = self.tx.send(Cmd::Close);
    }

    fn suspend(&mut self) {
        let _ = self.tx.send(Cmd::Suspend);
    }

    fn resume(&mut self) {
        let _ = self.tx.send(Cmd::Resume);
    }

    fn ready_state(&self) -> ReadyState {
        match self.state.load(Ordering::Acquire) {
            STATE_CONNECTING => ReadyState::Connecting,
            STATE_OPEN => ReadyState::Open,
            STATE_CLOSING => ReadyState::Closing,
            _ => ReadyState::Closed,
        }
    }
}

/// Connects per the options and drives one whole session.
///
/// The handler sees the session lifecycle and steers it: submit an
/// envelope on idle, stream the body on ready, quit on done. Returns
/// when the session has closed.
///
/// # Errors
///
/// Returns an error if establishing the connection fails. Errors after
/// the session is up are delivered through the handler.
pub async fn run<H>(options: SmtpOptions, handler: &mut H) -> Result<()>
where
    H: EventHandler<SocketHandle>,
{
    let stream = if options.use_ssl {
        connect_tls(&options.host, options.port, options.ca.as_deref()).await?
    } else {
        connect(&options.host, options.port).await?
    };
    run_with_stream(stream, options, handler).await
}

/// Drives one whole session over an already-established stream.
///
/// # Errors
///
/// Currently always returns `Ok`; session failures are delivered
/// through the handler's error event.
pub async fn run_with_stream<S, H>(stream: S, options: SmtpOptions, handler: &mut H) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
    H: EventHandler<SocketHandle>,
{
    let (transport, rx, state) = SocketHandle::pair();
    let mut client = SmtpClient::new(transport, options);
    drive(stream, &mut client, rx, &state, handler).await;
    Ok(())
}

async fn drive<S, H>(
    mut stream: S,
    client: &mut SmtpClient<SocketHandle>,
    mut rx: mpsc::UnboundedReceiver<Cmd>,
    state: &Arc<AtomicU8>,
    handler: &mut H,
) where
    S: AsyncRead + AsyncWrite + Unpin,
    H: EventHandler<SocketHandle>,
{
    state.store(STATE_OPEN, Ordering::Release);
    client.on_open();

    let mut suspended = false;
    let mut buf = vec![0u8; READ_BUFFER_SIZE];

    while !client.is_destroyed() {
        tokio::select! {
            biased;

            cmd = rx.recv() => match cmd {
                Some(Cmd::Send(bytes)) => {
                    let written = stream.write_all(&bytes).await;
                    let flushed = match written {
                        Ok(()) => stream.flush().await,
                        Err(e) => Err(e),
                    };
                    if let Err(e) = flushed {
                        // The stream is broken; do not keep draining
                        // queued writes against it.
                        client.on_error(e.into(), handler);
                        break;
                    }
                    if rx.is_empty() {
                        client.on_drain(handler);
                    }
                }
                Some(Cmd::Close) => break,
                Some(Cmd::Suspend) => suspended = true,
                Some(Cmd::Resume) => suspended = false,
                None => break,
            },

            read = stream.read(&mut buf), if !suspended => match read {
                Ok(0) => break,
                Ok(n) => client.on_data(&buf[..n], handler),
                Err(e) => {
                    client.on_error(e.into(), handler);
                    break;
                }
            },
        }
    }

    // Single teardown path for every exit: shut the stream, mark the
    // handle closed, and confirm to the facade. `destroy` is idempotent,
    // so a session that already tore down is unaffected.
    let _ = stream.shutdown().await;
    state.store(STATE_CLOSED, Ordering::Release);
    client.on_close(handler);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::client::SessionEvent;
    use crate::types::Envelope;

    /// Steers a full submission: envelope on idle, body on ready, quit
    /// on done.
    #[derive(Default)]
    struct SubmitHandler {
        events: Vec<SessionEvent>,
    }

    impl EventHandler<SocketHandle> for SubmitHandler {
        fn on_idle(&mut self, client: &mut SmtpClient<SocketHandle>) {
            self.events.push(SessionEvent::Idle);
            if client.envelope().is_none() {
                let envelope =
                    Envelope::new("sender@example.com", vec!["rcpt@example.com".to_string()]);
                client.use_envelope(envelope).unwrap();
            } else {
                client.quit();
            }
        }

        fn on_ready(&mut self, client: &mut SmtpClient<SocketHandle>, failed: &[String]) {
            self.events.push(SessionEvent::Ready(failed.to_vec()));
            client.end(Some(b"Subject: hi\r\n\r\nhello\r\n"));
        }

        fn on_done(&mut self, _client: &mut SmtpClient<SocketHandle>, success: bool) {
            self.events.push(SessionEvent::Done(success));
        }

        fn on_error(&mut self, _client: &mut SmtpClient<SocketHandle>, error: &crate::Error) {
            self.events.push(SessionEvent::Error(error.to_string()));
        }

        fn on_close(&mut self, _client: &mut SmtpClient<SocketHandle>) {
            self.events.push(SessionEvent::Close);
        }
    }

    #[tokio::test]
    async fn full_submission_over_mock_stream() {
        let stream = tokio_test::io::Builder::new()
            .read(b"220 mx.example.com ESMTP\r\n")
            .write(b"EHLO localhost\r\n")
            .read(b"250 mx.example.com\r\n")
            .write(b"MAIL FROM:<sender@example.com>\r\n")
            .read(b"250 ok\r\n")
            .write(b"RCPT TO:<rcpt@example.com>\r\n")
            .read(b"250 ok\r\n")
            .write(b"DATA\r\n")
            .read(b"354 go ahead\r\n")
            .write(b"Subject: hi\r\n\r\nhello\r\n.\r\n")
            .read(b"250 queued\r\n")
            .write(b"QUIT\r\n")
            .read(b"221 bye\r\n")
            .build();

        let options = SmtpOptions::new("mx.example.com", 587);
        let mut handler = SubmitHandler::default();
        run_with_stream(stream, options, &mut handler).await.unwrap();

        assert_eq!(
            handler.events,
            vec![
                SessionEvent::Idle,
                SessionEvent::Ready(vec![]),
                SessionEvent::Done(true),
                SessionEvent::Idle,
                SessionEvent::Close,
            ]
        );
    }

    #[tokio::test]
    async fn transport_eof_destroys_the_session() {
        let stream = tokio_test::io::Builder::new()
            .read(b"220 hi\r\n")
            .write(b"EHLO localhost\r\n")
            .build();

        let options = SmtpOptions::new("mx.example.com", 587);
        let mut handler = SubmitHandler::default();
        run_with_stream(stream, options, &mut handler).await.unwrap();

        assert_eq!(handler.events.last(), Some(&SessionEvent::Close));
    }
}

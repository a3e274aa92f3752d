//! Transport abstraction consumed by the client.
//!
//! The client core never touches a socket. It drives an abstract
//! byte-oriented duplex: outgoing bytes go through [`Transport::send`],
//! and incoming bytes, drain, error, and close notifications enter the
//! facade through its `on_*` methods. The tokio adapter in
//! [`crate::connection`] implements this trait over TCP/TLS; tests use
//! [`MemoryTransport`].

/// Connection lifecycle state of a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadyState {
    /// Connection attempt in progress.
    #[default]
    Connecting,
    /// Connected; bytes may be sent.
    Open,
    /// Close requested but not yet acknowledged.
    Closing,
    /// Fully closed.
    Closed,
}

/// Byte-oriented duplex owned by the client for the session's lifetime.
pub trait Transport {
    /// Queues bytes for delivery, in call order. Must not block; the
    /// driver reports completed flushes through the facade's drain
    /// notification.
    fn send(&mut self, bytes: &[u8]);

    /// Requests an orderly close of the connection.
    fn close(&mut self);

    /// Pauses delivery of incoming data.
    fn suspend(&mut self);

    /// Resumes delivery of incoming data.
    fn resume(&mut self);

    /// Returns the connection lifecycle state.
    fn ready_state(&self) -> ReadyState;
}

/// In-memory transport capturing everything the client sends.
///
/// Intended for tests: scripted replies are fed to the facade directly
/// and the written wire bytes are inspected afterwards.
#[derive(Debug)]
pub struct MemoryTransport {
    /// Each `send` call, in order.
    pub writes: Vec<Vec<u8>>,
    /// Current lifecycle state; starts [`ReadyState::Open`].
    pub state: ReadyState,
    /// Number of times `suspend` was called.
    pub suspends: usize,
    /// Number of times `resume` was called.
    pub resumes: usize,
}

impl MemoryTransport {
    /// Creates an open transport with no captured writes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            writes: Vec::new(),
            state: ReadyState::Open,
            suspends: 0,
            resumes: 0,
        }
    }

    /// Returns all captured writes concatenated.
    #[must_use]
    pub fn wire(&self) -> Vec<u8> {
        self.writes.concat()
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MemoryTransport {
    fn send(&mut self, bytes: &[u8]) {
        self.writes.push(bytes.to_vec());
    }

    fn close(&mut self) {
        self.state = ReadyState::Closed;
    }

    fn suspend(&mut self) {
        self.suspends += 1;
    }

    fn resume(&mut self) {
        self.resumes += 1;
    }

    fn ready_state(&self) -> ReadyState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_transport_captures_writes_in_order() {
        let mut t = MemoryTransport::new();
        t.send(b"EHLO ");
        t.send(b"localhost\r\n");
        assert_eq!(t.writes.len(), 2);
        assert_eq!(t.wire(), b"EHLO localhost\r\n");
    }

    #[test]
    fn memory_transport_close_updates_state() {
        let mut t = MemoryTransport::new();
        assert_eq!(t.ready_state(), ReadyState::Open);
        t.close();
        assert_eq!(t.ready_state(), ReadyState::Closed);
    }
}

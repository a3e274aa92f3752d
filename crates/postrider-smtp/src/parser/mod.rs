//! Incremental SMTP reply parser.
//!
//! The parser consumes arbitrary byte chunks from the transport and
//! reassembles them into complete [`Reply`] values. Lines are delimited
//! by CRLF only; a bare CR is kept in the buffer until its LF arrives.
//! Multi-line replies (`250-...`) accumulate until a terminator line
//! (`250 ...`) is seen, so any split of the byte stream that preserves
//! order yields the same sequence of replies.

use bytes::{Buf, BytesMut};

use crate::types::{Reply, ReplyCode};

/// Reassembles transport bytes into complete SMTP replies.
#[derive(Debug, Default)]
pub struct ReplyParser {
    buf: BytesMut,
    pending: Vec<String>,
}

impl ReplyParser {
    /// Creates an empty parser.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends bytes and returns every reply completed by them.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Reply> {
        self.buf.extend_from_slice(bytes);

        let mut replies = Vec::new();
        while let Some(pos) = find_crlf(&self.buf) {
            let line = String::from_utf8_lossy(&self.buf[..pos]).into_owned();
            self.buf.advance(pos + 2);
            if let Some(reply) = self.push_line(&line) {
                replies.push(reply);
            }
        }
        replies
    }

    /// Discards buffered bytes and any partially accumulated reply.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.pending.clear();
    }

    /// Interprets one complete line; returns a reply if it terminates one.
    fn push_line(&mut self, line: &str) -> Option<Reply> {
        let bytes = line.as_bytes();
        if bytes.len() < 4 || !bytes[..3].iter().all(u8::is_ascii_digit) {
            // Malformed line: flush pending state as a synthetic failure
            // carrying the raw line.
            self.pending.clear();
            return Some(Reply::new(
                ReplyCode::SYNTAX_ERROR,
                vec![line.to_string()],
            ));
        }

        let code: u16 = line[..3].parse().unwrap_or(500);
        let marker = bytes[3];
        self.pending.push(line[4..].to_string());

        if marker == b'-' {
            None
        } else {
            // Space terminates; anything else is tolerated as a terminator.
            let lines = std::mem::take(&mut self.pending);
            Some(Reply::new(ReplyCode::new(code), lines))
        }
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

//! SMTP envelope with recipient bookkeeping.

use std::collections::VecDeque;

/// The sender/recipient set for one mail transaction.
///
/// Mailbox strings are taken literally: the client wraps them in angle
/// brackets on the wire and performs no further quoting or validation.
///
/// While recipients are being negotiated, every address from `to` is in
/// exactly one of the queue, the in-flight slot, the accepted list, or
/// the rejected list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Sender mailbox for `MAIL FROM`.
    pub from: String,
    /// Recipient mailboxes for `RCPT TO`, in submission order.
    pub to: Vec<String>,
    rcpt_queue: VecDeque<String>,
    cur_recipient: Option<String>,
    rcpt_sent: Vec<String>,
    rcpt_failed: Vec<String>,
    response_queue: VecDeque<String>,
    started: bool,
}

impl Envelope {
    /// Creates an envelope; the recipient queue starts as a copy of `to`.
    #[must_use]
    pub fn new(from: impl Into<String>, to: Vec<String>) -> Self {
        let rcpt_queue = to.iter().cloned().collect();
        Self {
            from: from.into(),
            to,
            rcpt_queue,
            cur_recipient: None,
            rcpt_sent: Vec::new(),
            rcpt_failed: Vec::new(),
            response_queue: VecDeque::new(),
            started: false,
        }
    }

    /// Pops the next queued recipient into the in-flight slot.
    pub fn next_recipient(&mut self) -> Option<&str> {
        self.cur_recipient = self.rcpt_queue.pop_front();
        self.cur_recipient.as_deref()
    }

    /// Records the server's verdict for the in-flight recipient.
    pub fn record_recipient(&mut self, accepted: bool) {
        if let Some(rcpt) = self.cur_recipient.take() {
            if accepted {
                self.rcpt_sent.push(rcpt);
            } else {
                self.rcpt_failed.push(rcpt);
            }
        }
    }

    /// Returns true if no recipients remain queued.
    #[must_use]
    pub fn queue_is_empty(&self) -> bool {
        self.rcpt_queue.is_empty()
    }

    /// Returns true if the server rejected every recipient.
    #[must_use]
    pub fn all_rejected(&self) -> bool {
        self.rcpt_failed.len() == self.to.len()
    }

    /// Recipients the server accepted.
    #[must_use]
    pub fn rcpt_sent(&self) -> &[String] {
        &self.rcpt_sent
    }

    /// Recipients the server rejected.
    #[must_use]
    pub fn rcpt_failed(&self) -> &[String] {
        &self.rcpt_failed
    }

    /// Marks the transaction as having entered data transfer.
    pub fn start(&mut self) {
        self.started = true;
    }

    /// Returns true if data transfer has begun.
    #[must_use]
    pub const fn started(&self) -> bool {
        self.started
    }

    /// Queues one post-DATA reply slot per accepted recipient (LMTP).
    pub fn expect_streaming_responses(&mut self) {
        self.response_queue = self.rcpt_sent.iter().cloned().collect();
    }

    /// Takes the recipient owed the next post-DATA reply (LMTP).
    pub fn pop_streaming_response(&mut self) -> Option<String> {
        self.response_queue.pop_front()
    }

    /// Returns true if per-recipient replies are still outstanding (LMTP).
    #[must_use]
    pub fn awaiting_streaming_responses(&self) -> bool {
        !self.response_queue.is_empty()
    }

    /// Records a post-DATA rejection for an accepted recipient (LMTP).
    pub fn fail_streamed_recipient(&mut self, rcpt: String) {
        self.rcpt_failed.push(rcpt);
    }
}

//! Error types for SMTP submission.

use std::io;

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SMTP client error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error surfaced by the transport.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TLS error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// The server's first reply was not a 220 greeting.
    #[error("Invalid greeting: {0}")]
    InvalidGreeting(String),

    /// Server rejected a command; the message is the server's text.
    #[error("{message}")]
    Smtp {
        /// Reply code (e.g. 550).
        code: u16,
        /// Text of the rejecting reply.
        message: String,
    },

    /// Protocol violation (unexpected challenge, malformed reply).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// An envelope was submitted with an empty recipient list.
    #[error("Can't send mail - no recipients defined")]
    NoRecipients,

    /// Every recipient in the envelope was rejected by the server.
    #[error("Can't send mail - all recipients were rejected")]
    AllRecipientsRejected,

    /// A caller operation was invoked in a state that does not allow it.
    #[error("Invalid state for operation: {0}")]
    InvalidState(String),
}

impl Error {
    /// Creates an SMTP error from a reply code and the server's text.
    #[must_use]
    pub fn smtp_error(code: u16, message: impl Into<String>) -> Self {
        Self::Smtp {
            code,
            message: message.into(),
        }
    }

    /// Returns true if this is a permanent server rejection (5xx).
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::Smtp { code, .. } if *code >= 500 && *code < 600)
    }

    /// Returns true if this is a transient server rejection (4xx).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Smtp { code, .. } if *code >= 400 && *code < 500)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn smtp_error_displays_server_text_verbatim() {
        let err = Error::smtp_error(550, "mailbox unavailable");
        assert_eq!(err.to_string(), "mailbox unavailable");
        assert!(err.is_permanent());
        assert!(!err.is_transient());
    }

    #[test]
    fn envelope_errors_have_fixed_messages() {
        assert_eq!(
            Error::NoRecipients.to_string(),
            "Can't send mail - no recipients defined"
        );
        assert_eq!(
            Error::AllRecipientsRejected.to_string(),
            "Can't send mail - all recipients were rejected"
        );
    }

    #[test]
    fn greeting_error_carries_server_text() {
        let err = Error::InvalidGreeting("nope".into());
        assert_eq!(err.to_string(), "Invalid greeting: nope");
    }

    #[test]
    fn transient_classification() {
        assert!(Error::smtp_error(450, "busy").is_transient());
        assert!(!Error::smtp_error(250, "ok").is_transient());
    }
}

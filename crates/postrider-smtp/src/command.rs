//! SMTP command builder.

use crate::auth::AuthMechanism;

/// SMTP command issued by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// HELO - Legacy greeting
    Helo {
        /// Client hostname
        name: String,
    },
    /// EHLO - Extended greeting
    Ehlo {
        /// Client hostname
        name: String,
    },
    /// LHLO - LMTP greeting
    Lhlo {
        /// Client hostname
        name: String,
    },
    /// AUTH - Begin authentication
    Auth {
        /// Authentication mechanism
        mechanism: AuthMechanism,
        /// Initial response (SASL-IR)
        initial_response: Option<String>,
    },
    /// MAIL FROM - Start mail transaction
    MailFrom {
        /// Sender mailbox, sent verbatim inside angle brackets
        from: String,
    },
    /// RCPT TO - Add recipient
    RcptTo {
        /// Recipient mailbox, sent verbatim inside angle brackets
        to: String,
    },
    /// DATA - Begin message data
    Data,
    /// RSET - Reset transaction
    Rset,
    /// QUIT - Close connection
    Quit,
}

impl Command {
    /// Serializes the command to its CRLF-terminated wire form.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();

        match self {
            Self::Helo { name } => {
                buf.extend_from_slice(b"HELO ");
                buf.extend_from_slice(name.as_bytes());
            }
            Self::Ehlo { name } => {
                buf.extend_from_slice(b"EHLO ");
                buf.extend_from_slice(name.as_bytes());
            }
            Self::Lhlo { name } => {
                buf.extend_from_slice(b"LHLO ");
                buf.extend_from_slice(name.as_bytes());
            }
            Self::Auth {
                mechanism,
                initial_response,
            } => {
                buf.extend_from_slice(b"AUTH ");
                buf.extend_from_slice(mechanism.as_str().as_bytes());
                if let Some(resp) = initial_response {
                    buf.push(b' ');
                    buf.extend_from_slice(resp.as_bytes());
                }
            }
            Self::MailFrom { from } => {
                buf.extend_from_slice(b"MAIL FROM:<");
                buf.extend_from_slice(from.as_bytes());
                buf.push(b'>');
            }
            Self::RcptTo { to } => {
                buf.extend_from_slice(b"RCPT TO:<");
                buf.extend_from_slice(to.as_bytes());
                buf.push(b'>');
            }
            Self::Data => {
                buf.extend_from_slice(b"DATA");
            }
            Self::Rset => {
                buf.extend_from_slice(b"RSET");
            }
            Self::Quit => {
                buf.extend_from_slice(b"QUIT");
            }
        }

        buf.extend_from_slice(b"\r\n");
        buf
    }
}

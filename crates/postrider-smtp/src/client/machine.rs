//! Reply dispatch: one action per session state.
//!
//! Each incoming [`Reply`] is routed to the action named by the current
//! [`SessionState`]. An action issues at most one command, transition,
//! or caller event, and always commits the transition before emitting.

use crate::auth::{self, AuthMechanism};
use crate::client::{EventHandler, SessionState, SmtpClient};
use crate::command::Command;
use crate::error::Error;
use crate::transport::Transport;
use crate::types::{Envelope, Reply, ReplyCode};

impl<T: Transport> SmtpClient<T> {
    pub(super) fn dispatch<H: EventHandler<T>>(&mut self, reply: Reply, handler: &mut H) {
        match self.state {
            SessionState::Greeting => self.action_greeting(&reply, handler),
            SessionState::Ehlo => self.action_ehlo(&reply, handler),
            SessionState::Helo => self.action_helo(&reply, handler),
            SessionState::AuthLoginUser => self.action_auth_login_user(&reply, handler),
            SessionState::AuthLoginPass => self.action_auth_login_pass(&reply, handler),
            SessionState::AuthXOauth2 => self.action_auth_xoauth2(&reply, handler),
            SessionState::AuthComplete => self.action_auth_complete(&reply, handler),
            SessionState::Mail => self.action_mail(&reply, handler),
            SessionState::Rcpt => self.action_rcpt(&reply, handler),
            SessionState::Data => self.action_data(&reply, handler),
            SessionState::Streaming => self.action_stream(&reply, handler),
            SessionState::Rset => self.action_rset(&reply, handler),
            SessionState::Quit => self.close(handler),
            SessionState::Connecting | SessionState::Idle | SessionState::Closed => {
                tracing::trace!(state = ?self.state, code = %reply.code, "reply discarded");
            }
        }
    }

    fn action_greeting<H: EventHandler<T>>(&mut self, reply: &Reply, handler: &mut H) {
        if reply.code != ReplyCode::SERVICE_READY {
            self.emit_error(Error::InvalidGreeting(reply.text()), handler);
            return;
        }
        let name = self.options.name.clone();
        let command = if self.options.lmtp {
            Command::Lhlo { name }
        } else {
            Command::Ehlo { name }
        };
        self.send_command(&command);
        self.state = SessionState::Ehlo;
    }

    fn action_ehlo<H: EventHandler<T>>(&mut self, reply: &Reply, handler: &mut H) {
        if !reply.is_success() {
            // LMTP servers have no HELO to fall back to.
            if self.options.lmtp {
                self.emit_error(
                    Error::smtp_error(reply.code.as_u16(), reply.text()),
                    handler,
                );
                return;
            }
            let name = self.options.name.clone();
            self.send_command(&Command::Helo { name });
            self.state = SessionState::Helo;
            return;
        }

        for line in &reply.lines {
            let upper = line.to_uppercase();
            if let Some(rest) = upper.strip_prefix("AUTH") {
                if rest.starts_with(|c: char| c.is_ascii_whitespace()) {
                    for mechanism in rest.split_ascii_whitespace() {
                        self.supported_auth.insert(mechanism.to_string());
                    }
                }
            }
        }
        self.authenticate(handler);
    }

    fn action_helo<H: EventHandler<T>>(&mut self, reply: &Reply, handler: &mut H) {
        if !reply.is_success() {
            self.emit_error(
                Error::smtp_error(reply.code.as_u16(), reply.text()),
                handler,
            );
            return;
        }
        self.authenticate(handler);
    }

    /// Picks a mechanism and issues the opening AUTH command, or goes
    /// straight to idle when authentication is not configured.
    pub(super) fn authenticate<H: EventHandler<T>>(&mut self, handler: &mut H) {
        let Some(credentials) = self.options.auth.clone() else {
            self.state = SessionState::Idle;
            handler.on_idle(self);
            return;
        };

        let mechanism = self.options.auth_method.unwrap_or_else(|| {
            if self.supported_auth.contains("PLAIN") {
                AuthMechanism::Plain
            } else if self.supported_auth.contains("LOGIN") {
                AuthMechanism::Login
            } else {
                AuthMechanism::Plain
            }
        });
        tracing::debug!(mechanism = mechanism.as_str(), "authenticating");

        match mechanism {
            AuthMechanism::Plain => {
                let initial = auth::plain_response(
                    &credentials.user,
                    credentials.pass.as_deref().unwrap_or(""),
                );
                self.send_command(&Command::Auth {
                    mechanism,
                    initial_response: Some(initial),
                });
                self.state = SessionState::AuthComplete;
            }
            AuthMechanism::Login => {
                self.send_command(&Command::Auth {
                    mechanism,
                    initial_response: None,
                });
                self.state = SessionState::AuthLoginUser;
            }
            AuthMechanism::XOauth2 => {
                let initial = auth::xoauth2_response(
                    &credentials.user,
                    credentials.token.as_deref().unwrap_or(""),
                );
                self.send_command(&Command::Auth {
                    mechanism,
                    initial_response: Some(initial),
                });
                self.state = SessionState::AuthXOauth2;
            }
        }
    }

    fn action_auth_login_user<H: EventHandler<T>>(&mut self, reply: &Reply, handler: &mut H) {
        if !login_challenge_matches(reply, b"Username:") {
            self.emit_error(
                Error::Protocol(
                    r#"Invalid login sequence while waiting for "334 VXNlcm5hbWU6""#.into(),
                ),
                handler,
            );
            return;
        }
        let user = self
            .options
            .auth
            .as_ref()
            .map(|c| c.user.clone())
            .unwrap_or_default();
        self.send_line(&auth::login_response(&user));
        self.state = SessionState::AuthLoginPass;
    }

    fn action_auth_login_pass<H: EventHandler<T>>(&mut self, reply: &Reply, handler: &mut H) {
        if !login_challenge_matches(reply, b"Password:") {
            self.emit_error(
                Error::Protocol(
                    r#"Invalid login sequence while waiting for "334 UGFzc3dvcmQ6""#.into(),
                ),
                handler,
            );
            return;
        }
        let pass = self
            .options
            .auth
            .as_ref()
            .and_then(|c| c.pass.clone())
            .unwrap_or_default();
        self.send_line(&auth::login_response(&pass));
        self.state = SessionState::AuthComplete;
    }

    fn action_auth_xoauth2<H: EventHandler<T>>(&mut self, reply: &Reply, handler: &mut H) {
        if reply.is_success() {
            self.action_auth_complete(reply, handler);
            return;
        }
        // A rejected XOAUTH2 attempt arrives as a 334 challenge carrying
        // a Base64 JSON error document. Acknowledge with an empty line;
        // the server then delivers its final verdict.
        if let Ok(payload) = auth::decode_challenge(reply.status_line()) {
            if let Ok(detail) = auth::parse_oauth_error(&payload) {
                tracing::warn!(status = %detail.status, "XOAUTH2 rejected");
            }
        }
        self.send_line("");
        self.state = SessionState::AuthComplete;
    }

    fn action_auth_complete<H: EventHandler<T>>(&mut self, reply: &Reply, handler: &mut H) {
        if !reply.is_success() {
            self.emit_error(
                Error::smtp_error(reply.code.as_u16(), reply.text()),
                handler,
            );
            return;
        }
        self.authenticated_as = self.options.auth.as_ref().map(|c| c.user.clone());
        self.state = SessionState::Idle;
        handler.on_idle(self);
    }

    fn action_mail<H: EventHandler<T>>(&mut self, reply: &Reply, handler: &mut H) {
        if !reply.is_success() {
            self.emit_error(
                Error::smtp_error(reply.code.as_u16(), reply.text()),
                handler,
            );
            return;
        }
        let Some(envelope) = self.envelope.as_mut() else {
            self.emit_error(Error::Protocol("no envelope in progress".into()), handler);
            return;
        };
        match envelope.next_recipient().map(String::from) {
            None => self.emit_error(Error::NoRecipients, handler),
            Some(to) => {
                self.send_command(&Command::RcptTo { to });
                self.state = SessionState::Rcpt;
            }
        }
    }

    fn action_rcpt<H: EventHandler<T>>(&mut self, reply: &Reply, handler: &mut H) {
        let accepted = reply.is_success();
        let Some(envelope) = self.envelope.as_mut() else {
            self.emit_error(Error::Protocol("no envelope in progress".into()), handler);
            return;
        };
        envelope.record_recipient(accepted);

        if let Some(to) = envelope.next_recipient().map(String::from) {
            self.send_command(&Command::RcptTo { to });
            return;
        }
        // Queue drained; failures were recorded, not surfaced, until now.
        if self.envelope.as_ref().is_some_and(Envelope::all_rejected) {
            self.emit_error(Error::AllRecipientsRejected, handler);
            return;
        }
        self.send_command(&Command::Data);
        self.state = SessionState::Data;
    }

    fn action_data<H: EventHandler<T>>(&mut self, reply: &Reply, handler: &mut H) {
        // 354 is the standard go-ahead, but some servers answer 250.
        if reply.code != ReplyCode::START_DATA && reply.code != ReplyCode::OK {
            self.emit_error(
                Error::smtp_error(reply.code.as_u16(), reply.text()),
                handler,
            );
            return;
        }
        let failed = match self.envelope.as_mut() {
            Some(envelope) => {
                envelope.start();
                envelope.rcpt_failed().to_vec()
            }
            None => Vec::new(),
        };
        self.data_mode = true;
        self.state = SessionState::Idle;
        handler.on_ready(self, &failed);
    }

    fn action_stream<H: EventHandler<T>>(&mut self, reply: &Reply, handler: &mut H) {
        let success = reply.is_success();

        if self.options.lmtp {
            if let Some(envelope) = self.envelope.as_mut() {
                if let Some(rcpt) = envelope.pop_streaming_response() {
                    if !success {
                        envelope.fail_streamed_recipient(rcpt);
                    }
                }
                // One reply per accepted recipient; wait for the rest.
                if envelope.awaiting_streaming_responses() {
                    return;
                }
            }
        }

        self.state = SessionState::Idle;
        handler.on_done(self, success);
        // The callback may have re-entered (new envelope, quit); only
        // announce idleness if it left the machine idle.
        if !self.is_destroyed() && self.state == SessionState::Idle {
            handler.on_idle(self);
        }
    }

    fn action_rset<H: EventHandler<T>>(&mut self, reply: &Reply, handler: &mut H) {
        if !reply.is_success() {
            self.emit_error(
                Error::smtp_error(reply.code.as_u16(), reply.text()),
                handler,
            );
            return;
        }
        self.authenticated_as = None;
        self.authenticate(handler);
    }
}

fn login_challenge_matches(reply: &Reply, expected: &[u8]) -> bool {
    reply.code == ReplyCode::AUTH_CONTINUE
        && auth::decode_challenge(reply.status_line()).is_ok_and(|decoded| decoded == expected)
}

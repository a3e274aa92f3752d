//! Session configuration.

use crate::auth::{AuthMechanism, Credentials};

/// Immutable configuration for one submission session.
///
/// Only the credentials may change after construction, via
/// [`SmtpClient::reset`](crate::client::SmtpClient::reset).
#[derive(Debug, Clone)]
pub struct SmtpOptions {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Connect over implicit TLS.
    pub use_ssl: bool,
    /// PEM bundle of additional trust anchors for the TLS collaborator.
    pub ca: Option<Vec<u8>>,
    /// Hostname announced in EHLO/HELO/LHLO.
    pub name: String,
    /// Credentials; `None` disables authentication.
    pub auth: Option<Credentials>,
    /// Mechanism override; otherwise selected from server capabilities.
    pub auth_method: Option<AuthMechanism>,
    /// Disables dot-stuffing of the DATA body.
    pub disable_escaping: bool,
    /// Greets with LHLO instead of EHLO.
    pub lmtp: bool,
    /// Transfer-log ring capacity; 0 disables logging.
    pub log_length: usize,
}

impl SmtpOptions {
    /// Creates options for a plaintext submission session.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            use_ssl: false,
            ca: None,
            name: "localhost".to_string(),
            auth: None,
            auth_method: None,
            disable_escaping: false,
            lmtp: false,
            log_length: 0,
        }
    }

    /// Creates an options builder.
    #[must_use]
    pub fn builder(host: impl Into<String>) -> SmtpOptionsBuilder {
        SmtpOptionsBuilder::new(host)
    }

    /// Returns the conventional submission port for a security mode.
    #[must_use]
    pub const fn default_port(use_ssl: bool) -> u16 {
        if use_ssl { 465 } else { 587 }
    }
}

/// Builder for [`SmtpOptions`].
#[derive(Debug, Clone)]
pub struct SmtpOptionsBuilder {
    host: String,
    port: Option<u16>,
    use_ssl: bool,
    ca: Option<Vec<u8>>,
    name: String,
    auth: Option<Credentials>,
    auth_method: Option<AuthMechanism>,
    disable_escaping: bool,
    lmtp: bool,
    log_length: usize,
}

impl SmtpOptionsBuilder {
    /// Creates a builder with the given server hostname.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            use_ssl: false,
            ca: None,
            name: "localhost".to_string(),
            auth: None,
            auth_method: None,
            disable_escaping: false,
            lmtp: false,
            log_length: 0,
        }
    }

    /// Sets the port; defaults to 587, or 465 under implicit TLS.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Enables implicit TLS.
    #[must_use]
    pub const fn use_ssl(mut self, use_ssl: bool) -> Self {
        self.use_ssl = use_ssl;
        self
    }

    /// Supplies a PEM bundle of trust anchors for the TLS collaborator.
    #[must_use]
    pub fn ca(mut self, pem: impl Into<Vec<u8>>) -> Self {
        self.ca = Some(pem.into());
        self
    }

    /// Sets the hostname announced in the greeting command.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the credentials used to authenticate.
    #[must_use]
    pub fn auth(mut self, credentials: Credentials) -> Self {
        self.auth = Some(credentials);
        self
    }

    /// Forces a specific authentication mechanism.
    #[must_use]
    pub const fn auth_method(mut self, mechanism: AuthMechanism) -> Self {
        self.auth_method = Some(mechanism);
        self
    }

    /// Disables dot-stuffing of the DATA body.
    #[must_use]
    pub const fn disable_escaping(mut self, disable: bool) -> Self {
        self.disable_escaping = disable;
        self
    }

    /// Greets with LHLO instead of EHLO.
    #[must_use]
    pub const fn lmtp(mut self, lmtp: bool) -> Self {
        self.lmtp = lmtp;
        self
    }

    /// Sets the transfer-log ring capacity.
    #[must_use]
    pub const fn log_length(mut self, entries: usize) -> Self {
        self.log_length = entries;
        self
    }

    /// Builds the options.
    #[must_use]
    pub fn build(self) -> SmtpOptions {
        SmtpOptions {
            port: self
                .port
                .unwrap_or_else(|| SmtpOptions::default_port(self.use_ssl)),
            host: self.host,
            use_ssl: self.use_ssl,
            ca: self.ca,
            name: self.name,
            auth: self.auth,
            auth_method: self.auth_method,
            disable_escaping: self.disable_escaping,
            lmtp: self.lmtp,
            log_length: self.log_length,
        }
    }
}

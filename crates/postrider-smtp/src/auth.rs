//! SASL authentication mechanisms.
//!
//! Implements the encoders for:
//! - PLAIN (RFC 4616) - username/password in a single NUL-separated blob
//! - LOGIN - legacy two-step challenge/response
//! - XOAUTH2 (Google/Microsoft proprietary) - `OAuth2` bearer token
//!
//! All encoders operate over raw bytes before Base64 so that 8-bit
//! credentials survive untouched.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::{Error, Result};

/// SASL mechanism selectable for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMechanism {
    /// PLAIN - plaintext authentication
    Plain,
    /// LOGIN - legacy plaintext
    Login,
    /// `XOAUTH2` - `OAuth2` bearer token
    XOauth2,
}

impl AuthMechanism {
    /// Parses a mechanism name, case-insensitively.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PLAIN" => Some(Self::Plain),
            "LOGIN" => Some(Self::Login),
            "XOAUTH2" => Some(Self::XOauth2),
            _ => None,
        }
    }

    /// Returns the canonical mechanism name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::Login => "LOGIN",
            Self::XOauth2 => "XOAUTH2",
        }
    }
}

/// Credentials for session authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Authentication identity.
    pub user: String,
    /// Password, for PLAIN and LOGIN.
    pub pass: Option<String>,
    /// `OAuth2` access token, for XOAUTH2.
    pub token: Option<String>,
}

impl Credentials {
    /// Creates username/password credentials.
    #[must_use]
    pub fn new(user: impl Into<String>, pass: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            pass: Some(pass.into()),
            token: None,
        }
    }

    /// Creates bearer-token credentials for XOAUTH2.
    #[must_use]
    pub fn xoauth2(user: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            pass: None,
            token: Some(token.into()),
        }
    }
}

/// Generates the PLAIN initial response (RFC 4616).
///
/// Format: `\0<username>\0<password>`, Base64 encoded. The leading NUL
/// is the empty authorization identity.
#[must_use]
pub fn plain_response(username: &str, password: &str) -> String {
    let mut blob = Vec::with_capacity(username.len() + password.len() + 2);
    blob.push(0);
    blob.extend_from_slice(username.as_bytes());
    blob.push(0);
    blob.extend_from_slice(password.as_bytes());
    STANDARD.encode(blob)
}

/// Encodes one LOGIN step (the username or the password) as Base64.
#[must_use]
pub fn login_response(value: &str) -> String {
    STANDARD.encode(value.as_bytes())
}

/// Generates the XOAUTH2 initial response.
///
/// Format: `user=<user>\x01auth=Bearer <token>\x01\x01`, Base64 encoded.
#[must_use]
pub fn xoauth2_response(user: &str, token: &str) -> String {
    let blob = format!("user={user}\x01auth=Bearer {token}\x01\x01");
    STANDARD.encode(blob.as_bytes())
}

/// Decodes a 334 challenge payload into raw bytes.
///
/// # Errors
///
/// Returns [`Error::Protocol`] if the payload is not valid Base64.
pub fn decode_challenge(payload: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(payload.trim())
        .map_err(|_| Error::Protocol(format!("Invalid Base64 challenge: {payload}")))
}

/// `OAuth2` error document carried in a 334 challenge after a rejected
/// XOAUTH2 attempt.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct OAuthError {
    /// HTTP status code, as a string.
    pub status: String,
    /// Authentication schemes the server accepts.
    pub schemes: Option<String>,
    /// Scope required for access.
    pub scope: Option<String>,
}

/// Parses the JSON error document of a rejected XOAUTH2 exchange.
///
/// # Errors
///
/// Returns an error if the payload is not the expected JSON shape.
pub fn parse_oauth_error(payload: &[u8]) -> std::result::Result<OAuthError, serde_json::Error> {
    serde_json::from_slice(payload)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::manual_string_new)]
mod tests {
    use super::*;

    #[test]
    fn plain_response_format() {
        let response = plain_response("test", "pass");
        let decoded = STANDARD.decode(&response).unwrap();
        assert_eq!(decoded, b"\0test\0pass");
    }

    #[test]
    fn plain_response_known_vector() {
        assert_eq!(plain_response("abc", "def"), "AGFiYwBkZWY=");
    }

    #[test]
    fn login_response_encodes_value() {
        assert_eq!(login_response("abc"), "YWJj");
        assert_eq!(login_response("def"), "ZGVm");
    }

    #[test]
    fn xoauth2_response_known_vector() {
        assert_eq!(
            xoauth2_response("user@host", "abcde"),
            "dXNlcj11c2VyQGhvc3QBYXV0aD1CZWFyZXIgYWJjZGUBAQ=="
        );
    }

    #[test]
    fn xoauth2_response_format() {
        let response = xoauth2_response("test@test.com", "abc");
        let decoded = STANDARD.decode(&response).unwrap();
        assert_eq!(
            decoded,
            b"user=test@test.com\x01auth=Bearer abc\x01\x01"
        );
    }

    #[test]
    fn decode_challenge_roundtrip() {
        assert_eq!(decode_challenge("VXNlcm5hbWU6").unwrap(), b"Username:");
        assert_eq!(decode_challenge("UGFzc3dvcmQ6").unwrap(), b"Password:");
    }

    #[test]
    fn decode_challenge_rejects_garbage() {
        assert!(decode_challenge("!!not-base64!!").is_err());
    }

    #[test]
    fn mechanism_parse_is_case_insensitive() {
        assert_eq!(AuthMechanism::parse("plain"), Some(AuthMechanism::Plain));
        assert_eq!(AuthMechanism::parse("LOGIN"), Some(AuthMechanism::Login));
        assert_eq!(
            AuthMechanism::parse("XOauth2"),
            Some(AuthMechanism::XOauth2)
        );
        assert_eq!(AuthMechanism::parse("CRAM-MD5"), None);
    }

    #[test]
    fn mechanism_canonical_names() {
        assert_eq!(AuthMechanism::Plain.as_str(), "PLAIN");
        assert_eq!(AuthMechanism::Login.as_str(), "LOGIN");
        assert_eq!(AuthMechanism::XOauth2.as_str(), "XOAUTH2");
    }

    #[test]
    fn parse_oauth_error_document() {
        let json = br#"{"status":"401","schemes":"bearer","scope":"https://mail.google.com/"}"#;
        let error = parse_oauth_error(json).unwrap();
        assert_eq!(error.status, "401");
        assert_eq!(error.schemes.as_deref(), Some("bearer"));
        assert_eq!(error.scope.as_deref(), Some("https://mail.google.com/"));
    }
}

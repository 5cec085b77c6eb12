//! Opaque session token.
//!
//! A token is issued on every successful login, stored against the user as
//! the one currently valid token, and echoed back by the browser in a cookie.
//! A login from elsewhere overwrites the stored value, which is how older
//! sessions learn they were superseded.

use core::fmt;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Number of random bytes behind each token (256 bits).
const TOKEN_BYTES: usize = 32;

/// Errors that can occur when parsing a [`SessionToken`] from client input.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionTokenError {
    /// The value is empty.
    #[error("session token cannot be empty")]
    Empty,
    /// The value is longer than any token we issue.
    #[error("session token must be at most {max} characters")]
    TooLong {
        /// Maximum accepted length.
        max: usize,
    },
    /// The value contains characters outside the URL-safe base64 alphabet.
    #[error("session token contains invalid characters")]
    InvalidCharacters,
}

/// A random, URL-safe session token.
///
/// `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionToken(String);

impl SessionToken {
    /// Maximum accepted length. Issued tokens are 43 characters.
    pub const MAX_LENGTH: usize = 128;

    /// Generate a fresh token from the thread-local CSPRNG.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Parse a token presented by a client or loaded from storage.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionTokenError`] if the value is empty, too long, or
    /// not URL-safe base64.
    pub fn parse(s: &str) -> Result<Self, SessionTokenError> {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return Err(SessionTokenError::Empty);
        }

        if trimmed.len() > Self::MAX_LENGTH {
            return Err(SessionTokenError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if !trimmed
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return Err(SessionTokenError::InvalidCharacters);
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// The encoded token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compare with another token in constant time.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        tokens_match(self.as_str(), other.as_str())
    }
}

/// Constant-time string comparison to prevent timing attacks.
///
/// Only the length leaks; the position of the first differing byte does not.
#[must_use]
pub fn tokens_match(expected: &str, presented: &str) -> bool {
    if expected.len() != presented.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in expected.bytes().zip(presented.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken([REDACTED])")
    }
}

impl std::str::FromStr for SessionToken {
    type Err = SessionTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SessionToken {
    type Error = SessionTokenError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SessionToken> for String {
    fn from(token: SessionToken) -> Self {
        token.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_url_safe_and_unpadded() {
        let token = SessionToken::generate();
        assert_eq!(token.as_str().len(), 43);
        assert!(!token.as_str().contains('='));
        assert!(SessionToken::parse(token.as_str()).is_ok());
    }

    #[test]
    fn test_generate_is_unique() {
        assert_ne!(SessionToken::generate(), SessionToken::generate());
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(SessionToken::parse(""), Err(SessionTokenError::Empty));
        assert_eq!(
            SessionToken::parse("abc;def"),
            Err(SessionTokenError::InvalidCharacters)
        );
        assert!(matches!(
            SessionToken::parse(&"a".repeat(200)),
            Err(SessionTokenError::TooLong { .. })
        ));
    }

    #[test]
    fn test_tokens_match() {
        assert!(tokens_match("hello", "hello"));
        assert!(!tokens_match("hello", "world"));
        assert!(!tokens_match("hello", "hell"));
        assert!(!tokens_match("hello", "helloo"));
    }

    #[test]
    fn test_matches() {
        let token = SessionToken::generate();
        assert!(token.matches(&token.clone()));
        assert!(!token.matches(&SessionToken::generate()));
    }

    #[test]
    fn test_debug_redacts() {
        let token = SessionToken::parse("secret-value").unwrap();
        assert!(!format!("{token:?}").contains("secret"));
    }
}

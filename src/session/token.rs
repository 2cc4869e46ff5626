//! Session token type.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Number of random characters in a generated token.
pub const TOKEN_LENGTH: usize = 20;

/// Opaque, unguessable identifier of a session.
///
/// Generated tokens are 20 random alphanumeric characters drawn from the
/// thread-local CSPRNG. Parsed tokens may be any non-empty run of ASCII word
/// characters (`[A-Za-z0-9_]`), which is the grammar accepted in protocol
/// paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Token(String);

impl Token {
    /// Create a new random token.
    ///
    /// The store only rejects tokens of sessions it still holds. Tokens of
    /// expired sessions are not remembered: with 62^20 possible values a
    /// repeat is treated as impossible.
    pub fn generate() -> Self {
        let token = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LENGTH)
            .map(char::from)
            .collect();
        Self(token)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `s` is a syntactically valid token.
    pub fn is_valid(s: &str) -> bool {
        !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Token {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if Token::is_valid(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(SessionError::InvalidToken(s.to_string()))
        }
    }
}

impl TryFrom<String> for Token {
    type Error = SessionError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if Token::is_valid(&s) {
            Ok(Self(s))
        } else {
            Err(SessionError::InvalidToken(s))
        }
    }
}

impl From<Token> for String {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl Borrow<str> for Token {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

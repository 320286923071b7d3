//! Bearer tokens proving ownership of a lock acquisition.
//!
//! A token is 32 bytes from the thread-local CSPRNG. It renders as lowercase
//! hex so it can travel inside request/response payloads between processes
//! (acquire in one process, extend/release in another).

use crate::error::{DistlockError, Result};
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Number of random bytes in a token.
pub const TOKEN_LEN: usize = 32;

/// Opaque, unguessable ownership credential.
#[derive(Clone, Copy, Eq)]
pub struct Token([u8; TOKEN_LEN]);

impl Token {
    /// Generate a fresh random token.
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_LEN];
        rand::rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Build a token from raw bytes.
    pub fn from_bytes(bytes: [u8; TOKEN_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw token bytes.
    pub fn as_bytes(&self) -> &[u8; TOKEN_LEN] {
        &self.0
    }

    /// Lowercase hex encoding of the token.
    pub fn to_hex(&self) -> String {
        const_hex::encode(self.0)
    }

    /// Parse a token from its hex encoding.
    pub fn from_hex(s: &str) -> Result<Self> {
        let mut bytes = [0u8; TOKEN_LEN];
        const_hex::decode_to_slice(s.trim(), &mut bytes).map_err(|e| {
            DistlockError::InvalidToken(format!(
                "expected {} hex characters: {}",
                TOKEN_LEN * 2,
                e
            ))
        })?;
        Ok(Self(bytes))
    }
}

// Compare without an early exit so timing does not leak a matching prefix.
impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.0
            .iter()
            .zip(other.0.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Only a prefix: tokens end up in logs.
        write!(f, "Token({}…)", &self.to_hex()[..8])
    }
}

impl FromStr for Token {
    type Err = DistlockError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl Serialize for Token {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Token {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Token::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_tokens_are_distinct() {
        let tokens: HashSet<Token> = (0..1000).map(|_| Token::generate()).collect();
        assert_eq!(tokens.len(), 1000);
    }

    #[test]
    fn test_hex_form_is_stable() {
        let token = Token::from_bytes([0xab; TOKEN_LEN]);
        let hex = token.to_hex();

        assert_eq!(hex.len(), TOKEN_LEN * 2);
        assert!(hex.chars().all(|c| c == 'a' || c == 'b'));
        assert_eq!(Token::from_hex(&hex).unwrap(), token);
        assert_eq!(hex.parse::<Token>().unwrap(), token);
    }

    #[test]
    fn test_from_hex_rejects_garbage() {
        assert!(matches!(
            Token::from_hex("not-a-token"),
            Err(DistlockError::InvalidToken(_))
        ));
        // Right alphabet, wrong length
        assert!(Token::from_hex("abcd").is_err());
    }

    #[test]
    fn test_debug_does_not_print_whole_token() {
        let token = Token::generate();
        let debug = format!("{:?}", token);
        assert!(!debug.contains(&token.to_hex()));
        assert!(debug.starts_with("Token("));
    }

    #[test]
    fn test_serde_uses_hex_string() {
        let token = Token::from_bytes([1; TOKEN_LEN]);
        let json = serde_json::to_string(&token).unwrap();
        assert_eq!(json, format!("\"{}\"", "01".repeat(TOKEN_LEN)));

        let parsed: Token = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, token);
    }
}

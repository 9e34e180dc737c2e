//! # Session Tokens
//!
//! Session tokens are 32 random bytes, handed to the client as unpadded
//! base64url and stored only as a SHA-256 hash. Authenticating a request is
//! a hash lookup plus an expiry check (see `Database::get_user_for_token`).
//!
//! This module also produces the short `xxx-xxx` one-time codes mailed for
//! email verification, password reset and email change.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::validator::Validator;

/// Random bytes per token.
pub const TOKEN_BYTES: usize = 32;

/// Encoded plaintext length: `ceil(32 * 4 / 3)` with no padding.
pub const TOKEN_PLAINTEXT_LEN: usize = 43;

const CODE_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// What a token grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenScope {
    Authentication,
}

impl TokenScope {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
        }
    }
}

impl std::fmt::Display for TokenScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A freshly issued token. `plaintext` never touches the database.
#[derive(Debug, Clone)]
pub struct Token {
    pub plaintext: String,
    pub hash: Vec<u8>,
    pub user_id: i64,
    pub expiry: DateTime<Utc>,
    pub scope: TokenScope,
}

impl Token {
    /// Draw a new random token for `user_id` valid for `ttl`.
    #[must_use]
    pub fn generate(user_id: i64, ttl: Duration, scope: TokenScope) -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        let plaintext = URL_SAFE_NO_PAD.encode(bytes);
        let hash = hash_token(&plaintext);

        Self {
            plaintext,
            hash,
            user_id,
            expiry: Utc::now() + ttl,
            scope,
        }
    }
}

/// SHA-256 of the plaintext token.
#[must_use]
pub fn hash_token(plaintext: &str) -> Vec<u8> {
    Sha256::digest(plaintext.as_bytes()).to_vec()
}

/// Shape check applied before any database lookup.
pub fn validate_token_plaintext(v: &mut Validator, plaintext: &str) {
    v.check(!plaintext.is_empty(), "token", "must be provided");
    v.check(
        plaintext.len() == TOKEN_PLAINTEXT_LEN,
        "token",
        "must be 43 bytes long",
    );
}

/// A short human-typeable code such as `k3f-9qa`.
#[must_use]
pub fn one_time_code() -> String {
    let mut rng = rand::thread_rng();
    let mut pick = |n: usize| -> String {
        (0..n)
            .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
            .collect()
    };
    let head = pick(3);
    let tail = pick(3);
    format!("{head}-{tail}")
}

/// Constant-time code comparison. An unset `expected` code never matches.
#[must_use]
pub fn codes_match(expected: Option<&str>, supplied: &str) -> bool {
    match expected {
        Some(expected) if !expected.is_empty() => {
            expected.as_bytes().ct_eq(supplied.as_bytes()).into()
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_token_has_expected_shape() {
        let token = Token::generate(7, Duration::hours(1), TokenScope::Authentication);
        assert_eq!(token.plaintext.len(), TOKEN_PLAINTEXT_LEN);
        assert_eq!(token.hash.len(), 32);
        assert_eq!(token.hash, hash_token(&token.plaintext));
        assert_eq!(token.user_id, 7);
        assert!(token.expiry > Utc::now());

        let mut v = Validator::new();
        validate_token_plaintext(&mut v, &token.plaintext);
        assert!(v.is_valid());
    }

    #[test]
    fn tokens_are_unique() {
        let a = Token::generate(1, Duration::hours(1), TokenScope::Authentication);
        let b = Token::generate(1, Duration::hours(1), TokenScope::Authentication);
        assert_ne!(a.plaintext, b.plaintext);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn malformed_plaintext_fails_validation() {
        let mut v = Validator::new();
        validate_token_plaintext(&mut v, "");
        assert_eq!(v.errors().get("token"), Some("must be provided"));

        let mut v = Validator::new();
        validate_token_plaintext(&mut v, "abc");
        assert_eq!(v.errors().get("token"), Some("must be 43 bytes long"));
    }

    #[test]
    fn one_time_code_format() {
        for _ in 0..50 {
            let code = one_time_code();
            assert_eq!(code.len(), 7);
            let (head, tail) = code.split_once('-').unwrap();
            assert_eq!(head.len(), 3);
            assert_eq!(tail.len(), 3);
            assert!(
                head.chars()
                    .chain(tail.chars())
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
            );
        }
    }

    #[test]
    fn code_comparison() {
        assert!(codes_match(Some("abc-123"), "abc-123"));
        assert!(!codes_match(Some("abc-123"), "abc-124"));
        assert!(!codes_match(Some("abc-123"), "abc-12"));
        assert!(!codes_match(None, ""));
        assert!(!codes_match(Some(""), ""));
    }

    #[test]
    fn scope_names() {
        assert_eq!(TokenScope::Authentication.as_str(), "authentication");
        assert_eq!(TokenScope::Authentication.to_string(), "authentication");
    }
}

//! # Token Storage
//!
//! Only SHA-256 hashes of session tokens are stored.

use chrono::{Duration, Utc};
use rusqlite::params;

use super::Database;
use crate::Result;
use crate::token::{Token, TokenScope};

impl Database {
    /// Store the hash of `token`.
    pub fn insert_token(&self, token: &Token) -> Result<()> {
        self.conn().execute(
            "INSERT INTO tokens (hash, user_id, expiry, scope) VALUES (?1, ?2, ?3, ?4)",
            params![token.hash, token.user_id, token.expiry, token.scope.as_str()],
        )?;
        Ok(())
    }

    /// Issue and store a new token. The returned value carries the plaintext.
    pub fn new_token(&self, user_id: i64, ttl: Duration, scope: TokenScope) -> Result<Token> {
        let token = Token::generate(user_id, ttl, scope);
        self.insert_token(&token)?;
        Ok(token)
    }

    /// Revoke every `scope` token of `user_id`. Returns how many were removed.
    pub fn delete_all_tokens_for_user(&self, scope: TokenScope, user_id: i64) -> Result<usize> {
        let removed = self.conn().execute(
            "DELETE FROM tokens WHERE scope = ?1 AND user_id = ?2",
            params![scope.as_str(), user_id],
        )?;
        Ok(removed)
    }

    /// Drop tokens whose expiry has passed. Returns how many were removed.
    pub fn delete_expired_tokens(&self) -> Result<usize> {
        let removed = self
            .conn()
            .execute("DELETE FROM tokens WHERE expiry <= ?1", params![Utc::now()])?;
        Ok(removed)
    }
}

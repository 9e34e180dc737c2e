//! # Password
//!
//! bcrypt password hashes plus the plaintext rules applied at signup and
//! on every password change.

use crate::Result;
use crate::validator::Validator;

/// Default bcrypt work factor.
pub const DEFAULT_COST: u32 = 12;

/// bcrypt only considers the first 72 bytes of input.
pub const MAX_PASSWORD_BYTES: usize = 72;

pub const MIN_PASSWORD_BYTES: usize = 8;

/// A stored bcrypt hash.
#[derive(Clone, PartialEq, Eq)]
pub struct Password {
    hash: String,
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password(<redacted>)")
    }
}

impl Password {
    /// Hash `plaintext` with the given bcrypt cost.
    pub fn hash(plaintext: &str, cost: u32) -> Result<Self> {
        let hash = bcrypt::hash(plaintext, cost)?;
        Ok(Self { hash })
    }

    /// Wrap a hash loaded from storage.
    #[must_use]
    pub fn from_hash(hash: impl Into<String>) -> Self {
        Self { hash: hash.into() }
    }

    #[must_use]
    pub fn as_hash(&self) -> &str {
        &self.hash
    }

    /// Compare `plaintext` against the stored hash.
    ///
    /// A mismatch is `Ok(false)`; a corrupt hash is an error.
    pub fn matches(&self, plaintext: &str) -> Result<bool> {
        Ok(bcrypt::verify(plaintext, &self.hash)?)
    }
}

/// Rules for a user-supplied password.
pub fn validate_password_plaintext(v: &mut Validator, field: &str, password: &str) {
    v.check(!password.is_empty(), field, "must be provided");
    v.check(
        password.len() >= MIN_PASSWORD_BYTES,
        field,
        "must be at least 8 bytes long",
    );
    v.check(
        password.len() <= MAX_PASSWORD_BYTES,
        field,
        "must not be more than 72 bytes long",
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    // bcrypt minimum.
    const TEST_COST: u32 = 4;

    #[test]
    fn hash_then_match() {
        let password = Password::hash("correct horse", TEST_COST).unwrap();
        assert!(password.matches("correct horse").unwrap());
        assert!(!password.matches("battery staple").unwrap());
    }

    #[test]
    fn hashes_are_salted() {
        let a = Password::hash("same input", TEST_COST).unwrap();
        let b = Password::hash("same input", TEST_COST).unwrap();
        assert_ne!(a.as_hash(), b.as_hash());
    }

    #[test]
    fn corrupt_hash_is_an_error() {
        let password = Password::from_hash("not-a-bcrypt-hash");
        assert!(password.matches("anything").is_err());
    }

    #[test]
    fn debug_does_not_print_hash() {
        let password = Password::hash("secret-pass", TEST_COST).unwrap();
        let printed = format!("{password:?}");
        assert!(!printed.contains(password.as_hash()));
    }

    #[test]
    fn plaintext_rules() {
        let mut v = Validator::new();
        validate_password_plaintext(&mut v, "password", "");
        assert_eq!(v.errors().get("password"), Some("must be provided"));

        let mut v = Validator::new();
        validate_password_plaintext(&mut v, "password", "short");
        assert_eq!(
            v.errors().get("password"),
            Some("must be at least 8 bytes long")
        );

        let mut v = Validator::new();
        validate_password_plaintext(&mut v, "password", &"x".repeat(73));
        assert_eq!(
            v.errors().get("password"),
            Some("must not be more than 72 bytes long")
        );

        let mut v = Validator::new();
        validate_password_plaintext(&mut v, "password", "long enough");
        assert!(v.is_valid());
    }
}

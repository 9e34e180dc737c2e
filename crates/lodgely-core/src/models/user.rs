//! # User
//!
//! Accounts, and the rules for names, emails and profile images.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::password::{Password, validate_password_plaintext};
use crate::validator::{Validator, is_email};

/// A marketplace account.
///
/// Accounts created through OAuth have no password. One-time codes are
/// never serialized.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip)]
    pub password: Option<Password>,
    pub activated: bool,
    #[serde(skip)]
    pub verification_code: Option<String>,
    #[serde(skip)]
    pub reset_code: Option<String>,
    #[serde(skip)]
    pub email_change_code: Option<String>,
}

impl User {
    /// An unsaved, inactive account.
    #[must_use]
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: 0,
            created_at: Utc::now(),
            name: name.into(),
            email: email.into(),
            image: None,
            password: None,
            activated: false,
            verification_code: None,
            reset_code: None,
            email_change_code: None,
        }
    }

    /// Check `plaintext` against the stored hash. Passwordless accounts never match.
    pub fn password_matches(&self, plaintext: &str) -> crate::Result<bool> {
        match &self.password {
            Some(password) => password.matches(plaintext),
            None => Ok(false),
        }
    }
}

pub fn validate_email(v: &mut Validator, field: &str, email: &str) {
    v.check(!email.is_empty(), field, "must be provided");
    v.check(is_email(email), field, "must be a valid email address");
}

/// Signup rules. `plaintext` is the password as typed, when there is one.
pub fn validate_user(v: &mut Validator, user: &User, plaintext: Option<&str>) {
    v.check(!user.name.is_empty(), "name", "must be provided");
    v.check(
        user.name.len() <= 500,
        "name",
        "must not be more than 500 bytes long",
    );
    validate_email(v, "email", &user.email);
    if let Some(plaintext) = plaintext {
        validate_password_plaintext(v, "password", plaintext);
    }
}

/// Profile update rules.
pub fn validate_profile_name(v: &mut Validator, name: &str) {
    v.check(!name.is_empty(), "name", "must be provided");
    v.check(name.len() >= 3, "name", "must be at least 3 bytes long");
    v.check(
        name.len() <= 500,
        "name",
        "must not be more than 500 bytes long",
    );
}

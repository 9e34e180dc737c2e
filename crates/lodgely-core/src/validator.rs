//! # Validator
//!
//! Field-level validation that collects every failing field before the
//! caller decides what to do with them. Handlers turn a non-empty error map
//! into a 422 response.

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

/// W3C HTML5 email address pattern.
pub const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$";

static EMAIL_RX: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(EMAIL_PATTERN).ok());

/// Check whether `value` looks like an email address.
#[must_use]
pub fn is_email(value: &str) -> bool {
    EMAIL_RX.as_ref().is_some_and(|rx| rx.is_match(value))
}

/// Check whether `value` is one of `permitted`.
#[must_use]
pub fn permitted_value<T: PartialEq>(value: &T, permitted: &[T]) -> bool {
    permitted.contains(value)
}

/// Field → message map. Serializes as a flat JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    /// A single-field error set.
    #[must_use]
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = BTreeMap::new();
        errors.insert(field.into(), message.into());
        Self(errors)
    }

    /// Message recorded for `field`, if any.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate `(field, message)` pairs in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Accumulates validation failures.
///
/// Only the first error for a given field is kept, so a missing value
/// reports "must be provided" rather than a follow-up length complaint.
#[derive(Debug, Default)]
pub struct Validator {
    errors: ValidationErrors,
}

impl Validator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no error has been recorded.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Record `message` for `field` unless the field already has an error.
    pub fn add_error(&mut self, field: &str, message: &str) {
        self.errors
            .0
            .entry(field.to_string())
            .or_insert_with(|| message.to_string());
    }

    /// Record `message` for `field` when `ok` is false.
    pub fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.add_error(field, message);
        }
    }

    #[must_use]
    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// `Ok(())` when valid, otherwise the collected errors.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn accepts_plain_addresses() {
        assert!(is_email("alice@example.com"));
        assert!(is_email("a.b+tag@sub.example.co"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(!is_email(""));
        assert!(!is_email("alice"));
        assert!(!is_email("alice@"));
        assert!(!is_email("@example.com"));
        assert!(!is_email("alice@-example.com"));
    }

    #[test]
    fn first_error_per_field_wins() {
        let mut v = Validator::new();
        v.check(false, "name", "must be provided");
        v.check(false, "name", "must be at least 3 bytes long");
        v.check(true, "email", "never recorded");

        assert!(!v.is_valid());
        let errors = v.into_result().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get("name"), Some("must be provided"));
        assert_eq!(errors.get("email"), None);
    }

    #[test]
    fn errors_serialize_as_flat_object() {
        let mut v = Validator::new();
        v.add_error("title", "must be provided");
        v.add_error("price", "must be greater than zero");
        let json = serde_json::to_string(v.errors()).unwrap();
        assert_eq!(
            json,
            r#"{"price":"must be greater than zero","title":"must be provided"}"#
        );
    }

    #[test]
    fn permitted_value_checks_membership() {
        assert!(permitted_value(&"id", &["id", "-id"]));
        assert!(!permitted_value(&"name", &["id", "-id"]));
    }

    proptest! {
        #[test]
        fn local_part_and_domain_make_an_email(
            local in "[a-z0-9]{1,20}",
            domain in "[a-z]{1,20}",
            tld in "[a-z]{2,6}",
        ) {
            let address = format!("{local}@{domain}.{tld}");
            prop_assert!(is_email(&address));
        }

        #[test]
        fn strings_without_at_are_never_emails(s in "[^@]{0,40}") {
            prop_assert!(!is_email(&s));
        }
    }
}

//! # User Storage

use chrono::Utc;
use rusqlite::{OptionalExtension, Row, params};

use super::Database;
use crate::error::{duplicate_email, not_found};
use crate::models::User;
use crate::password::Password;
use crate::token::{TokenScope, hash_token};
use crate::{CoreError, Result};

const USER_COLUMNS: &str = "u.id, u.created_at, u.name, u.email, u.image, u.password_hash, \
     u.activated, u.verification_code, u.reset_code, u.email_change_code";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let password_hash: Option<String> = row.get(5)?;
    Ok(User {
        id: row.get(0)?,
        created_at: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        image: row.get(4)?,
        password: password_hash.map(Password::from_hash),
        activated: row.get(6)?,
        verification_code: row.get(7)?,
        reset_code: row.get(8)?,
        email_change_code: row.get(9)?,
    })
}

/// Empty strings are stored as NULL.
fn nullable(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

impl Database {
    /// Insert `user`, filling in its id. A taken email is [`CoreError::DuplicateEmail`].
    pub fn insert_user(&self, user: &mut User) -> Result<()> {
        let conn = self.conn();
        user.created_at = Utc::now();
        conn.execute(
            "INSERT INTO users (created_at, name, email, image, password_hash, activated,
                                verification_code, reset_code, email_change_code)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                user.created_at,
                user.name,
                user.email,
                nullable(&user.image),
                user.password.as_ref().map(Password::as_hash),
                user.activated,
                nullable(&user.verification_code),
                nullable(&user.reset_code),
                nullable(&user.email_change_code),
            ],
        )
        .map_err(duplicate_email)?;
        user.id = conn.last_insert_rowid();
        Ok(())
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<User> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = ?1");
        self.conn()
            .query_row(&sql, params![id], user_from_row)
            .map_err(not_found)
    }

    /// Email lookup is case-insensitive.
    pub fn get_user_by_email(&self, email: &str) -> Result<User> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users u WHERE u.email = ?1");
        self.conn()
            .query_row(&sql, params![email], user_from_row)
            .map_err(not_found)
    }

    /// Persist every mutable column of `user`.
    pub fn update_user(&self, user: &User) -> Result<()> {
        let changed = self
            .conn()
            .execute(
                "UPDATE users
                 SET name = ?1, email = ?2, image = ?3, password_hash = ?4, activated = ?5,
                     verification_code = ?6, reset_code = ?7, email_change_code = ?8
                 WHERE id = ?9",
                params![
                    user.name,
                    user.email,
                    nullable(&user.image),
                    user.password.as_ref().map(Password::as_hash),
                    user.activated,
                    nullable(&user.verification_code),
                    nullable(&user.reset_code),
                    nullable(&user.email_change_code),
                    user.id,
                ],
            )
            .map_err(duplicate_email)?;
        if changed == 0 {
            return Err(CoreError::NotFound);
        }
        Ok(())
    }

    /// Delete a user. Tokens, listings (with images and bookings) and bookings cascade.
    pub fn delete_user(&self, id: i64) -> Result<()> {
        let changed = self
            .conn()
            .execute("DELETE FROM users WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(CoreError::NotFound);
        }
        Ok(())
    }

    /// Resolve a plaintext session token to its unexpired owner.
    pub fn get_user_for_token(&self, scope: TokenScope, plaintext: &str) -> Result<User> {
        let sql = format!(
            "SELECT {USER_COLUMNS}
             FROM users u
             INNER JOIN tokens t ON u.id = t.user_id
             WHERE t.hash = ?1 AND t.scope = ?2 AND t.expiry > ?3"
        );
        let user = self
            .conn()
            .query_row(
                &sql,
                params![hash_token(plaintext), scope.as_str(), Utc::now()],
                user_from_row,
            )
            .optional()?;
        user.ok_or(CoreError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{create_user, db, unique};
    use super::*;
    use chrono::Duration;

    #[test]
    fn insert_assigns_id_and_timestamp() {
        let db = db();
        let user = create_user(&db);
        assert!(user.id > 0);

        let loaded = db.get_user_by_id(user.id).unwrap();
        assert_eq!(loaded.email, user.email);
        assert_eq!(loaded.name, user.name);
        assert_eq!(loaded.created_at, user.created_at);
        assert!(loaded.activated);
        assert!(loaded.password_matches("pa55word-pa55word").unwrap());
    }

    #[test]
    fn duplicate_email_is_reported() {
        let db = db();
        let email = format!("{}@example.com", unique("dup"));
        let mut first = User::new("First", email.clone());
        db.insert_user(&mut first).unwrap();

        let mut second = User::new("Second", email.to_uppercase());
        let err = db.insert_user(&mut second).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateEmail));
    }

    #[test]
    fn lookup_by_email_ignores_case() {
        let db = db();
        let user = create_user(&db);
        let loaded = db.get_user_by_email(&user.email.to_uppercase()).unwrap();
        assert_eq!(loaded.id, user.id);
    }

    #[test]
    fn missing_user_is_not_found() {
        let db = db();
        assert!(db.get_user_by_id(999).unwrap_err().is_not_found());
        assert!(
            db.get_user_by_email("nobody@example.com")
                .unwrap_err()
                .is_not_found()
        );
    }

    #[test]
    fn update_round_trips_codes_and_clears_empty_values() {
        let db = db();
        let mut user = create_user(&db);
        user.name = "Renamed".into();
        user.image = Some("https://img.example.com/me.png".into());
        user.reset_code = Some("abc-123".into());
        user.verification_code = Some(String::new());
        db.update_user(&user).unwrap();

        let loaded = db.get_user_by_id(user.id).unwrap();
        assert_eq!(loaded.name, "Renamed");
        assert_eq!(loaded.image.as_deref(), Some("https://img.example.com/me.png"));
        assert_eq!(loaded.reset_code.as_deref(), Some("abc-123"));
        assert_eq!(loaded.verification_code, None);
    }

    #[test]
    fn update_to_taken_email_fails() {
        let db = db();
        let a = create_user(&db);
        let mut b = create_user(&db);
        b.email = a.email.clone();
        assert!(matches!(
            db.update_user(&b).unwrap_err(),
            CoreError::DuplicateEmail
        ));
    }

    #[test]
    fn update_missing_user_is_not_found() {
        let db = db();
        let user = User::new("Ghost", "ghost@example.com");
        assert!(db.update_user(&user).unwrap_err().is_not_found());
    }

    #[test]
    fn delete_removes_user() {
        let db = db();
        let user = create_user(&db);
        db.delete_user(user.id).unwrap();
        assert!(db.get_user_by_id(user.id).unwrap_err().is_not_found());
        assert!(db.delete_user(user.id).unwrap_err().is_not_found());
    }

    #[test]
    fn token_lookup_finds_owner() {
        let db = db();
        let user = create_user(&db);
        let token = db
            .new_token(user.id, Duration::hours(1), TokenScope::Authentication)
            .unwrap();

        let found = db
            .get_user_for_token(TokenScope::Authentication, &token.plaintext)
            .unwrap();
        assert_eq!(found.id, user.id);
    }

    #[test]
    fn unknown_or_expired_token_is_not_found() {
        let db = db();
        let user = create_user(&db);
        let expired = db
            .new_token(user.id, Duration::seconds(-5), TokenScope::Authentication)
            .unwrap();

        assert!(
            db.get_user_for_token(TokenScope::Authentication, &expired.plaintext)
                .unwrap_err()
                .is_not_found()
        );
        assert!(
            db.get_user_for_token(TokenScope::Authentication, "x".repeat(43).as_str())
                .unwrap_err()
                .is_not_found()
        );
    }
}

//! User account operations

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::User;

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let created_at: String = row.get(3)?;
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        created_at: parse_datetime(&created_at),
    })
}

impl Database {
    /// Create a new user. Fails with Validation if the email is taken.
    pub fn create_user(&self, email: &str, password_hash: &str) -> Result<i64> {
        let conn = self.conn()?;

        let result = conn.execute(
            "INSERT INTO users (email, password_hash) VALUES (?, ?)",
            params![email, password_hash],
        );

        match result {
            Ok(_) => Ok(conn.last_insert_rowid()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(Error::Validation("Email already registered".into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Look up a user by email (for login)
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn()?;

        conn.query_row(
            "SELECT id, email, password_hash, created_at FROM users WHERE email = ?",
            params![email],
            row_to_user,
        )
        .optional()
        .map_err(|e| e.into())
    }

    /// Look up a user by id (for token validation)
    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        let conn = self.conn()?;

        conn.query_row(
            "SELECT id, email, password_hash, created_at FROM users WHERE id = ?",
            params![id],
            row_to_user,
        )
        .optional()
        .map_err(|e| e.into())
    }
}

//! CRUD operations for [`User`] records.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::database::{parse_timestamp, Database};
use crate::error::{Result, StoreError};
use crate::models::{UpsertUser, User};

const USER_COLUMNS: &str =
    "id, email, first_name, last_name, profile_image_url, created_at, updated_at";

impl Database {
    /// Fetch a single user by id.
    pub fn user(&self, id: &str) -> Result<Option<User>> {
        self.lock()?
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id],
                row_to_user,
            )
            .optional()
            .map_err(StoreError::Sqlite)
    }

    /// Insert-if-absent, else merge.  `created_at` survives merges; the
    /// conflict target is the primary key only, so a duplicate email still
    /// surfaces as a constraint error.
    pub fn upsert_user(&self, user: UpsertUser) -> Result<User> {
        let now = Utc::now().to_rfc3339();
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO users (id, email, first_name, last_name, profile_image_url, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             ON CONFLICT(id) DO UPDATE SET
                 email = excluded.email,
                 first_name = excluded.first_name,
                 last_name = excluded.last_name,
                 profile_image_url = excluded.profile_image_url,
                 updated_at = excluded.updated_at",
            params![
                user.id,
                user.email,
                user.first_name,
                user.last_name,
                user.profile_image_url,
                now,
            ],
        )?;

        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![user.id],
            row_to_user,
        )
        .map_err(StoreError::Sqlite)
    }

    /// Replace the profile image URL.  Fails with [`StoreError::NotFound`]
    /// when the user does not exist.
    pub fn update_profile_image(&self, user_id: &str, url: &str) -> Result<User> {
        let conn = self.lock()?;

        let affected = conn.execute(
            "UPDATE users SET profile_image_url = ?2, updated_at = ?3 WHERE id = ?1",
            params![user_id, url, Utc::now().to_rfc3339()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }

        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![user_id],
            row_to_user,
        )
        .map_err(StoreError::Sqlite)
    }
}

/// Map a `rusqlite::Row` to a [`User`].
fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let created_str: String = row.get(5)?;
    let updated_str: String = row.get(6)?;

    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        profile_image_url: row.get(4)?,
        created_at: parse_timestamp(5, &created_str)?,
        updated_at: parse_timestamp(6, &updated_str)?,
    })
}

//! CRUD operations for [`VirtualNumber`] records.
//!
//! The default-number invariant (exactly one default per owner once any
//! number exists) is enforced here, inside transactions, so concurrent
//! creations cannot observe a half-applied state.

use rusqlite::params;

use crate::database::{parse_timestamp, Database};
use crate::error::{Result, StoreError};
use crate::models::{NewVirtualNumber, VirtualNumber};

impl Database {
    /// All numbers owned by a user, unordered.
    pub fn virtual_numbers_for_user(&self, user_id: &str) -> Result<Vec<VirtualNumber>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, phone_number, purpose, is_default, created_at
             FROM virtual_numbers
             WHERE user_id = ?1",
        )?;

        let rows = stmt.query_map(params![user_id], row_to_number)?;

        let mut numbers = Vec::new();
        for row in rows {
            numbers.push(row?);
        }
        Ok(numbers)
    }

    /// Insert a number; it becomes the default iff the owner had none.
    pub fn create_virtual_number(&self, number: NewVirtualNumber) -> Result<VirtualNumber> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let owned: i64 = tx.query_row(
            "SELECT COUNT(*) FROM virtual_numbers WHERE user_id = ?1",
            params![number.user_id],
            |row| row.get(0),
        )?;
        let is_default = owned == 0;

        tx.execute(
            "INSERT INTO virtual_numbers (id, user_id, phone_number, purpose, is_default, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                number.id,
                number.user_id,
                number.phone_number,
                number.purpose,
                is_default,
                number.created_at.to_rfc3339(),
            ],
        )?;
        tx.commit()?;

        Ok(VirtualNumber {
            id: number.id,
            user_id: number.user_id,
            phone_number: number.phone_number,
            purpose: number.purpose,
            is_default,
            created_at: number.created_at,
        })
    }

    /// Make `number_id` the owner's sole default.  Fails with
    /// [`StoreError::NotFound`] when the number does not belong to
    /// `user_id`, leaving every flag untouched.
    pub fn set_default_virtual_number(&self, user_id: &str, number_id: &str) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let owned: i64 = tx.query_row(
            "SELECT COUNT(*) FROM virtual_numbers WHERE id = ?1 AND user_id = ?2",
            params![number_id, user_id],
            |row| row.get(0),
        )?;
        if owned == 0 {
            return Err(StoreError::NotFound);
        }

        tx.execute(
            "UPDATE virtual_numbers SET is_default = (id = ?2) WHERE user_id = ?1",
            params![user_id, number_id],
        )?;
        tx.commit()?;

        Ok(())
    }
}

/// Map a `rusqlite::Row` to a [`VirtualNumber`].
fn row_to_number(row: &rusqlite::Row<'_>) -> rusqlite::Result<VirtualNumber> {
    let created_str: String = row.get(5)?;

    Ok(VirtualNumber {
        id: row.get(0)?,
        user_id: row.get(1)?,
        phone_number: row.get(2)?,
        purpose: row.get(3)?,
        is_default: row.get(4)?,
        created_at: parse_timestamp(5, &created_str)?,
    })
}

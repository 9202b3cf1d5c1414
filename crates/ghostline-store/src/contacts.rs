//! CRUD operations for [`Contact`] records.

use rusqlite::{params, OptionalExtension};

use crate::database::{parse_timestamp, Database};
use crate::error::{Result, StoreError};
use crate::models::{Contact, ContactPatch, Presence};

const CONTACT_COLUMNS: &str = "id, user_id, name, phone_number, avatar_url, status, created_at";

impl Database {
    /// All contacts owned by a user, unordered.
    pub fn contacts_for_user(&self, user_id: &str) -> Result<Vec<Contact>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts WHERE user_id = ?1"
        ))?;

        let rows = stmt.query_map(params![user_id], row_to_contact)?;

        let mut contacts = Vec::new();
        for row in rows {
            contacts.push(row?);
        }
        Ok(contacts)
    }

    /// Fetch a single contact by id.
    pub fn contact(&self, id: &str) -> Result<Option<Contact>> {
        self.lock()?
            .query_row(
                &format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ?1"),
                params![id],
                row_to_contact,
            )
            .optional()
            .map_err(StoreError::Sqlite)
    }

    pub fn create_contact(&self, contact: Contact) -> Result<Contact> {
        self.lock()?.execute(
            "INSERT INTO contacts (id, user_id, name, phone_number, avatar_url, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                contact.id,
                contact.user_id,
                contact.name,
                contact.phone_number,
                contact.avatar_url,
                contact.status.as_str(),
                contact.created_at.to_rfc3339(),
            ],
        )?;
        Ok(contact)
    }

    /// Apply a partial update.  Fails with [`StoreError::NotFound`] when the
    /// contact does not exist.
    pub fn update_contact(&self, id: &str, patch: ContactPatch) -> Result<Contact> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let mut contact = tx
            .query_row(
                &format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ?1"),
                params![id],
                row_to_contact,
            )
            .optional()?
            .ok_or(StoreError::NotFound)?;

        if let Some(name) = patch.name {
            contact.name = name;
        }
        if let Some(phone_number) = patch.phone_number {
            contact.phone_number = phone_number;
        }
        if let Some(avatar_url) = patch.avatar_url {
            contact.avatar_url = Some(avatar_url);
        }
        if let Some(status) = patch.status {
            contact.status = status;
        }

        tx.execute(
            "UPDATE contacts SET name = ?2, phone_number = ?3, avatar_url = ?4, status = ?5
             WHERE id = ?1",
            params![
                contact.id,
                contact.name,
                contact.phone_number,
                contact.avatar_url,
                contact.status.as_str(),
            ],
        )?;
        tx.commit()?;

        Ok(contact)
    }

    /// Delete a contact.  Idempotent: an absent id is a no-op.
    pub fn delete_contact(&self, id: &str) -> Result<()> {
        self.lock()?
            .execute("DELETE FROM contacts WHERE id = ?1", params![id])?;
        Ok(())
    }
}

/// Map a `rusqlite::Row` to a [`Contact`].
fn row_to_contact(row: &rusqlite::Row<'_>) -> rusqlite::Result<Contact> {
    let status_str: String = row.get(5)?;
    let created_str: String = row.get(6)?;

    let status = Presence::parse(&status_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            rusqlite::types::Type::Text,
            format!("unknown status: {status_str}").into(),
        )
    })?;

    Ok(Contact {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        phone_number: row.get(3)?,
        avatar_url: row.get(4)?,
        status,
        created_at: parse_timestamp(6, &created_str)?,
    })
}

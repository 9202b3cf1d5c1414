use rusqlite::{params, OptionalExtension};

use crate::conversation::conversation_id;
use crate::database::{parse_timestamp, Database};
use crate::error::{Result, StoreError};
use crate::models::{Message, MessageKind};

const MESSAGE_COLUMNS: &str = "id, conversation_id, sender_id, receiver_id, text, image_url, \
                               audio_url, timestamp, read, sent, delivered, reaction, message_type";

impl Database {
    pub fn create_message(&self, message: Message) -> Result<Message> {
        self.lock()?.execute(
            "INSERT INTO messages (id, conversation_id, sender_id, receiver_id, text, image_url,
                                   audio_url, timestamp, read, sent, delivered, reaction, message_type)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                message.id,
                message.conversation_id,
                message.sender_id,
                message.receiver_id,
                message.text,
                message.image_url,
                message.audio_url,
                message.timestamp.to_rfc3339(),
                message.read,
                message.sent,
                message.delivered,
                message.reaction,
                message.message_type.as_str(),
            ],
        )?;
        Ok(message)
    }

    /// Conversation history in ascending timestamp order; the rowid
    /// tie-break preserves insertion order for equal timestamps.
    pub fn messages_for_contact(&self, user_id: &str, contact_id: &str) -> Result<Vec<Message>> {
        let key = conversation_id(user_id, contact_id);
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages
             WHERE conversation_id = ?1
             ORDER BY timestamp ASC, rowid ASC"
        ))?;

        let rows = stmt.query_map(params![key], row_to_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    pub fn last_message_for_contact(
        &self,
        user_id: &str,
        contact_id: &str,
    ) -> Result<Option<Message>> {
        let key = conversation_id(user_id, contact_id);
        self.lock()?
            .query_row(
                &format!(
                    "SELECT {MESSAGE_COLUMNS} FROM messages
                     WHERE conversation_id = ?1
                     ORDER BY timestamp DESC, rowid DESC
                     LIMIT 1"
                ),
                params![key],
                row_to_message,
            )
            .optional()
            .map_err(StoreError::Sqlite)
    }

    pub fn unread_count(&self, user_id: &str, contact_id: &str) -> Result<u64> {
        let key = conversation_id(user_id, contact_id);
        let count: i64 = self.lock()?.query_row(
            "SELECT COUNT(*) FROM messages
             WHERE conversation_id = ?1 AND receiver_id = ?2 AND read = 0",
            params![key, user_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    pub fn mark_messages_read(&self, user_id: &str, contact_id: &str) -> Result<()> {
        let key = conversation_id(user_id, contact_id);
        self.lock()?.execute(
            "UPDATE messages SET read = 1
             WHERE conversation_id = ?1 AND receiver_id = ?2 AND read = 0",
            params![key, user_id],
        )?;
        Ok(())
    }

    pub fn message(&self, id: &str) -> Result<Option<Message>> {
        self.lock()?
            .query_row(
                &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"),
                params![id],
                row_to_message,
            )
            .optional()
            .map_err(StoreError::Sqlite)
    }

    pub fn set_message_reaction(&self, message_id: &str, reaction: Option<&str>) -> Result<Message> {
        let conn = self.lock()?;

        let affected = conn.execute(
            "UPDATE messages SET reaction = ?2 WHERE id = ?1",
            params![message_id, reaction],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }

        conn.query_row(
            &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"),
            params![message_id],
            row_to_message,
        )
        .map_err(StoreError::Sqlite)
    }
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let ts_str: String = row.get(7)?;
    let kind_str: String = row.get(12)?;

    let message_type = MessageKind::parse(&kind_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            12,
            rusqlite::types::Type::Text,
            format!("unknown message type: {kind_str}").into(),
        )
    })?;

    Ok(Message {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        sender_id: row.get(2)?,
        receiver_id: row.get(3)?,
        text: row.get(4)?,
        image_url: row.get(5)?,
        audio_url: row.get(6)?,
        timestamp: parse_timestamp(7, &ts_str)?,
        read: row.get(8)?,
        sent: row.get(9)?,
        delivered: row.get(10)?,
        reaction: row.get(11)?,
        message_type,
    })
}

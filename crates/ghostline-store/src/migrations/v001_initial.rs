//! v001 -- Initial schema creation.
//!
//! Creates the four core tables: `users`, `virtual_numbers`, `contacts`,
//! and `messages`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id                TEXT PRIMARY KEY NOT NULL, -- identity-provider subject
    email             TEXT UNIQUE,
    first_name        TEXT,
    last_name         TEXT,
    profile_image_url TEXT,
    created_at        TEXT NOT NULL,             -- ISO-8601 / RFC-3339
    updated_at        TEXT NOT NULL
);

-- ----------------------------------------------------------------
-- Virtual numbers
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS virtual_numbers (
    id           TEXT PRIMARY KEY NOT NULL,      -- UUID v4
    user_id      TEXT NOT NULL,                  -- FK -> users(id)
    phone_number TEXT NOT NULL,
    purpose      TEXT NOT NULL,
    is_default   INTEGER NOT NULL DEFAULT 0,     -- boolean 0/1
    created_at   TEXT NOT NULL,

    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_numbers_user ON virtual_numbers(user_id);

-- ----------------------------------------------------------------
-- Contacts
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS contacts (
    id           TEXT PRIMARY KEY NOT NULL,      -- UUID v4
    user_id      TEXT NOT NULL,                  -- FK -> users(id)
    name         TEXT NOT NULL,
    phone_number TEXT NOT NULL,                  -- no uniqueness constraint
    avatar_url   TEXT,
    status       TEXT NOT NULL DEFAULT 'offline',
    created_at   TEXT NOT NULL,

    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_contacts_user ON contacts(user_id);

-- ----------------------------------------------------------------
-- Messages
-- ----------------------------------------------------------------
-- conversation_id is the derived "{owner}-{contact}" key; sender/receiver
-- may name either a user or a contact, so there is no FK on them.
CREATE TABLE IF NOT EXISTS messages (
    id              TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    conversation_id TEXT NOT NULL,
    sender_id       TEXT NOT NULL,
    receiver_id     TEXT NOT NULL,
    text            TEXT NOT NULL,
    image_url       TEXT,
    audio_url       TEXT,
    timestamp       TEXT NOT NULL,               -- ISO-8601
    read            INTEGER NOT NULL DEFAULT 0,
    sent            INTEGER NOT NULL DEFAULT 1,
    delivered       INTEGER NOT NULL DEFAULT 0,
    reaction        TEXT,
    message_type    TEXT NOT NULL DEFAULT 'text'
);

CREATE INDEX IF NOT EXISTS idx_messages_conversation_ts
    ON messages(conversation_id, timestamp ASC);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}

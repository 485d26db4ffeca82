//! Database migration runner.
//!
//! Each migration is guarded by the `user_version` pragma so it runs exactly
//! once per database file.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version. Bump this and extend [`run_migrations`] whenever
/// the schema changes.
pub(crate) const CURRENT_VERSION: u32 = 1;

/// SQL executed when upgrading from version 0 to version 1.
const V001_UP_SQL: &str = r#"
-- Known chat titles, populated whenever the channel list loads.
CREATE TABLE IF NOT EXISTS chats (
    title TEXT PRIMARY KEY NOT NULL
);

-- Cached messages. The id is server-assigned and scoped per chat.
CREATE TABLE IF NOT EXISTS messages (
    chat_name  TEXT    NOT NULL,
    id         INTEGER NOT NULL,
    sender     TEXT    NOT NULL,
    recipient  TEXT    NOT NULL,
    text       TEXT,                -- exactly one of text/image_link is set
    image_link TEXT,
    time       TEXT    NOT NULL,    -- millisecond decimal string

    PRIMARY KEY (chat_name, id)
);

CREATE INDEX IF NOT EXISTS idx_messages_chat_name ON messages(chat_name);
"#;

/// Run all pending migrations against the open connection.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    tracing::debug!(
        current_version = current,
        target_version = CURRENT_VERSION,
        "checking cache migrations"
    );

    if current < 1 {
        tracing::info!("applying cache migration v001 (initial schema)");
        conn.execute_batch(V001_UP_SQL)
            .map_err(|e| StoreError::Migration(e.to_string()))?;
        conn.pragma_update(None, "user_version", 1)?;
    }

    Ok(())
}

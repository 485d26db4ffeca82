use client_core::Message;
use rusqlite::params;

use crate::database::Database;
use crate::error::Result;
use crate::models::CachedMessage;

impl Database {
    /// Upsert one message for a chat, replacing any row with the same id.
    pub fn upsert_message(&self, chat_name: &str, message: &Message) -> Result<()> {
        let row = CachedMessage::from_message(chat_name, message);
        self.conn().execute(
            "INSERT OR REPLACE INTO messages
                 (chat_name, id, sender, recipient, text, image_link, time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                row.chat_name,
                row.id,
                row.sender,
                row.recipient,
                row.text,
                row.image_link,
                row.time,
            ],
        )?;
        Ok(())
    }

    /// Full cached history for a chat, ascending by id.
    ///
    /// Ascending is the single ordering convention used everywhere in the
    /// client; it matches the in-memory buffer exposure order.
    pub fn messages_for_chat(&self, chat_name: &str) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(
            "SELECT chat_name, id, sender, recipient, text, image_link, time
             FROM messages
             WHERE chat_name = ?1
             ORDER BY id ASC",
        )?;

        let rows = stmt.query_map(params![chat_name], row_to_cached_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?.into_message()?);
        }
        Ok(messages)
    }
}

fn row_to_cached_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<CachedMessage> {
    Ok(CachedMessage {
        chat_name: row.get(0)?,
        id: row.get(1)?,
        sender: row.get(2)?,
        recipient: row.get(3)?,
        text: row.get(4)?,
        image_link: row.get(5)?,
        time: row.get(6)?,
    })
}

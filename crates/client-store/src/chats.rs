use rusqlite::params;

use crate::database::Database;
use crate::error::Result;

impl Database {
    /// Record a chat title; inserting an already known title is a no-op.
    pub fn upsert_chat(&self, title: &str) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO chats (title) VALUES (?1)",
            params![title],
        )?;
        Ok(())
    }

    /// All known chat titles in insertion-stable alphabetical order.
    pub fn all_chat_titles(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT title FROM chats ORDER BY title ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut titles = Vec::new();
        for row in rows {
            titles.push(row?);
        }
        Ok(titles)
    }
}

//! Chatbot query log

use rusqlite::params;

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::ChatQueryLogEntry;

impl Database {
    /// Record a chatbot query and its outcome
    #[allow(clippy::too_many_arguments)]
    pub fn log_chat_query(
        &self,
        question: &str,
        language: &str,
        generated_sql: Option<&str>,
        success: bool,
        error_message: Option<&str>,
        row_count: i64,
        duration_ms: i64,
    ) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO chat_queries
             (question, language, generated_sql, success, error_message, row_count, duration_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                question,
                language,
                generated_sql,
                success,
                error_message,
                row_count,
                duration_ms,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// List recent chatbot queries, newest first
    pub fn list_chat_queries(&self, limit: i64) -> Result<Vec<ChatQueryLogEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, asked_at, question, language, generated_sql, success,
                    error_message, row_count, duration_ms
             FROM chat_queries ORDER BY id DESC LIMIT ?1",
        )?;
        let entries = stmt
            .query_map(params![limit], |row| {
                let asked_at: String = row.get(1)?;
                Ok(ChatQueryLogEntry {
                    id: row.get(0)?,
                    asked_at: parse_datetime(&asked_at),
                    question: row.get(2)?,
                    language: row.get(3)?,
                    generated_sql: row.get(4)?,
                    success: row.get(5)?,
                    error_message: row.get(6)?,
                    row_count: row.get(7)?,
                    duration_ms: row.get(8)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}

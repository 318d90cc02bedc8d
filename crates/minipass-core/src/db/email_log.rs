//! Outbound email log and payment reminders

use rusqlite::params;

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{EmailLogEntry, EmailResult};

fn row_to_email_log(row: &rusqlite::Row<'_>) -> rusqlite::Result<EmailLogEntry> {
    let sent_at: String = row.get(1)?;
    let result: String = row.get(7)?;
    Ok(EmailLogEntry {
        id: row.get(0)?,
        sent_at: parse_datetime(&sent_at),
        to_email: row.get(2)?,
        subject: row.get(3)?,
        pass_code: row.get(4)?,
        template: row.get(5)?,
        context_json: row.get(6)?,
        result: result.parse().unwrap_or(EmailResult::Failed),
        error_message: row.get(8)?,
    })
}

const EMAIL_LOG_COLS: &str =
    "id, sent_at, to_email, subject, pass_code, template, context_json, result, error_message";

impl Database {
    /// Record an email delivery attempt
    #[allow(clippy::too_many_arguments)]
    pub fn log_email(
        &self,
        to_email: &str,
        subject: &str,
        pass_code: Option<&str>,
        template: Option<&str>,
        context_json: Option<&str>,
        result: EmailResult,
        error_message: Option<&str>,
    ) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO email_logs
             (to_email, subject, pass_code, template, context_json, result, error_message)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                to_email,
                subject,
                pass_code,
                template,
                context_json,
                result.as_str(),
                error_message,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// List recent email log entries, newest first
    pub fn list_email_log(&self, limit: i64) -> Result<Vec<EmailLogEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM email_logs ORDER BY id DESC LIMIT ?1",
            EMAIL_LOG_COLS
        ))?;
        let entries = stmt
            .query_map(params![limit], row_to_email_log)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Emails sent for a given pass code, oldest first
    pub fn list_emails_for_pass(&self, pass_code: &str) -> Result<Vec<EmailLogEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM email_logs WHERE pass_code = ?1 ORDER BY id",
            EMAIL_LOG_COLS
        ))?;
        let entries = stmt
            .query_map(params![pass_code], row_to_email_log)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Recent FAILED email attempts, oldest first (for retry)
    pub fn list_failed_emails(&self, limit: i64) -> Result<Vec<EmailLogEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM email_logs WHERE result = 'FAILED' ORDER BY id DESC LIMIT ?1",
            EMAIL_LOG_COLS
        ))?;
        let mut entries = stmt
            .query_map(params![limit], row_to_email_log)?
            .collect::<std::result::Result<Vec<EmailLogEntry>, _>>()?;
        entries.reverse();
        Ok(entries)
    }

    /// Record that a payment reminder was sent for a passport
    pub fn log_reminder(&self, passport_id: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO reminder_logs (passport_id) VALUES (?1)",
            params![passport_id],
        )?;
        Ok(())
    }

    /// When the most recent reminder for a passport went out, if ever
    pub fn last_reminder_at(&self, passport_id: i64) -> Result<Option<chrono::DateTime<chrono::Utc>>> {
        let conn = self.conn()?;
        let sent_at: Option<String> = conn
            .query_row(
                "SELECT sent_at FROM reminder_logs WHERE passport_id = ?1 ORDER BY id DESC LIMIT 1",
                params![passport_id],
                |row| row.get(0),
            )
            .ok();
        Ok(sent_at.map(|s| parse_datetime(&s)))
    }
}

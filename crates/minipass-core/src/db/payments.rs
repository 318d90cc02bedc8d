//! E-transfer payment log

use rusqlite::params;

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{EbankPayment, MatchResult};

/// A payment log row to be recorded
#[derive(Debug, Clone)]
pub struct NewEbankPayment<'a> {
    pub from_email: Option<&'a str>,
    pub subject: &'a str,
    pub bank_name: &'a str,
    pub bank_amount: f64,
    pub matched_passport_id: Option<i64>,
    pub matched_name: Option<&'a str>,
    pub matched_amount: Option<f64>,
    pub name_score: i64,
    pub result: MatchResult,
    pub marked_paid: bool,
    pub note: Option<&'a str>,
}

impl Database {
    /// Record the outcome of processing one bank notification
    pub fn record_ebank_payment(&self, payment: &NewEbankPayment<'_>) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO ebank_payments
             (from_email, subject, bank_name, bank_amount, matched_passport_id,
              matched_name, matched_amount, name_score, result, marked_paid, note)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                payment.from_email,
                payment.subject,
                payment.bank_name,
                payment.bank_amount,
                payment.matched_passport_id,
                payment.matched_name,
                payment.matched_amount,
                payment.name_score,
                payment.result.as_str(),
                payment.marked_paid,
                payment.note,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// List recent payment log entries, newest first
    pub fn list_ebank_payments(&self, limit: i64) -> Result<Vec<EbankPayment>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, received_at, from_email, subject, bank_name, bank_amount,
                    matched_passport_id, matched_name, matched_amount, name_score,
                    result, marked_paid, note
             FROM ebank_payments ORDER BY id DESC LIMIT ?1",
        )?;
        let payments = stmt
            .query_map(params![limit], |row| {
                let received_at: String = row.get(1)?;
                let result: String = row.get(10)?;
                Ok(EbankPayment {
                    id: row.get(0)?,
                    received_at: parse_datetime(&received_at),
                    from_email: row.get(2)?,
                    subject: row.get(3)?,
                    bank_name: row.get(4)?,
                    bank_amount: row.get(5)?,
                    matched_passport_id: row.get(6)?,
                    matched_name: row.get(7)?,
                    matched_amount: row.get(8)?,
                    name_score: row.get(9)?,
                    result: result.parse().unwrap_or(MatchResult::NoMatch),
                    marked_paid: row.get(11)?,
                    note: row.get(12)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(payments)
    }

    /// Whether a notification with this subject was already processed
    ///
    /// The bot archives handled messages, but a copy failure can leave one in
    /// the inbox; this keeps a re-poll from double-paying a pass.
    pub fn ebank_payment_seen(&self, subject: &str) -> Result<bool> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM ebank_payments WHERE subject = ?1 AND result = 'MATCHED'",
            params![subject],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

//! Passport CRUD, payment marking, redemptions

use chrono::Utc;
use rusqlite::params;

use super::{format_datetime, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{
    EmailLogEntry, NewPassport, PassHistory, Passport, PassportWithMember, Redemption,
};

/// A second scan of the same pass within this window is treated as a
/// duplicate QR read and rejected without decrementing.
const DUPLICATE_SCAN_GUARD_SECS: i64 = 10;

/// Filters for passport listings
#[derive(Debug, Clone, Default)]
pub struct PassportFilter {
    pub activity_id: Option<i64>,
    pub paid: Option<bool>,
    /// Matches holder name, email, or pass code (case-insensitive substring)
    pub search: Option<String>,
    pub limit: Option<i64>,
}

/// Generate a 16-character pass code
pub fn generate_pass_code() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..16].to_uppercase()
}

fn row_to_passport(row: &rusqlite::Row<'_>) -> rusqlite::Result<Passport> {
    let paid_date: Option<String> = row.get(9)?;
    let created_at: String = row.get(13)?;
    Ok(Passport {
        id: row.get(0)?,
        pass_code: row.get(1)?,
        member_id: row.get(2)?,
        activity_id: row.get(3)?,
        passport_type_id: row.get(4)?,
        passport_type_name: row.get(5)?,
        sold_amt: row.get(6)?,
        uses_remaining: row.get(7)?,
        paid: row.get(8)?,
        paid_date: paid_date.map(|s| parse_datetime(&s)),
        marked_paid_by: row.get(10)?,
        created_by: row.get(11)?,
        notes: row.get(12)?,
        created_at: parse_datetime(&created_at),
    })
}

fn row_to_passport_with_member(row: &rusqlite::Row<'_>) -> rusqlite::Result<PassportWithMember> {
    Ok(PassportWithMember {
        passport: row_to_passport(row)?,
        member_name: row.get(14)?,
        member_email: row.get(15)?,
        member_phone: row.get(16)?,
        activity_name: row.get(17)?,
    })
}

const PASSPORT_COLS: &str = "p.id, p.pass_code, p.member_id, p.activity_id, p.passport_type_id, \
     p.passport_type_name, p.sold_amt, p.uses_remaining, p.paid, p.paid_date, \
     p.marked_paid_by, p.created_by, p.notes, p.created_at";

impl Database {
    /// Create a passport (and its fresh member row)
    ///
    /// The passport type name is denormalized at creation time so the label
    /// survives later deletion of the type.
    pub fn create_passport(&self, new: &NewPassport, created_by: Option<&str>) -> Result<Passport> {
        self.get_activity(new.activity_id)?;

        let passport_type_name = match new.passport_type_id {
            Some(type_id) => Some(self.get_passport_type(type_id)?.name),
            None => None,
        };

        let member_id =
            self.insert_member(&new.member_name, &new.member_email, new.member_phone.as_deref())?;

        let pass_code = generate_pass_code();
        let paid_date = new.paid.then(|| format_datetime(Utc::now()));

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO passports
             (pass_code, member_id, activity_id, passport_type_id, passport_type_name,
              sold_amt, uses_remaining, paid, paid_date, created_by, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                pass_code,
                member_id,
                new.activity_id,
                new.passport_type_id,
                passport_type_name,
                new.sold_amt,
                new.uses_remaining,
                new.paid,
                paid_date,
                created_by,
                new.notes,
            ],
        )?;
        let id = conn.last_insert_rowid();
        drop(conn);

        self.get_passport(id)
    }

    /// Get a passport by id
    pub fn get_passport(&self, id: i64) -> Result<Passport> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM passports p WHERE p.id = ?1", PASSPORT_COLS),
            params![id],
            row_to_passport,
        )
        .map_err(|_| Error::NotFound(format!("Passport not found: {}", id)))
    }

    /// Get a passport by its pass code
    pub fn get_passport_by_code(&self, pass_code: &str) -> Result<Passport> {
        let conn = self.conn()?;
        conn.query_row(
            &format!(
                "SELECT {} FROM passports p WHERE p.pass_code = ?1",
                PASSPORT_COLS
            ),
            params![pass_code],
            row_to_passport,
        )
        .map_err(|_| Error::NotFound(format!("Pass not found: {}", pass_code)))
    }

    /// List passports with holder details, newest first
    pub fn list_passports(&self, filter: &PassportFilter) -> Result<Vec<PassportWithMember>> {
        let conn = self.conn()?;

        let mut conditions: Vec<String> = Vec::new();
        let mut query_params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(activity_id) = filter.activity_id {
            query_params.push(Box::new(activity_id));
            conditions.push(format!("p.activity_id = ?{}", query_params.len()));
        }
        if let Some(paid) = filter.paid {
            query_params.push(Box::new(paid));
            conditions.push(format!("p.paid = ?{}", query_params.len()));
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", search.trim().to_lowercase());
            query_params.push(Box::new(pattern));
            conditions.push(format!(
                "(LOWER(m.name) LIKE ?{n} OR LOWER(m.email) LIKE ?{n} OR LOWER(p.pass_code) LIKE ?{n})",
                n = query_params.len()
            ));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        query_params.push(Box::new(filter.limit.unwrap_or(200)));
        let limit_idx = query_params.len();

        let sql = format!(
            "SELECT {}, m.name, m.email, m.phone, a.name
             FROM passports p
             JOIN members m ON m.id = p.member_id
             JOIN activities a ON a.id = p.activity_id
             {}
             ORDER BY p.created_at DESC, p.id DESC
             LIMIT ?{}",
            PASSPORT_COLS, where_clause, limit_idx
        );

        let mut stmt = conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> =
            query_params.iter().map(|p| p.as_ref()).collect();
        let passports = stmt
            .query_map(param_refs.as_slice(), row_to_passport_with_member)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(passports)
    }

    /// All unpaid passports with holder details (payment matching pool)
    pub fn list_unpaid_passports(&self) -> Result<Vec<PassportWithMember>> {
        self.list_passports(&PassportFilter {
            paid: Some(false),
            limit: Some(i64::MAX),
            ..Default::default()
        })
    }

    /// Unpaid passports created more than `older_than_days` days ago
    pub fn list_overdue_passports(&self, older_than_days: i64) -> Result<Vec<PassportWithMember>> {
        let conn = self.conn()?;
        let cutoff = format_datetime(Utc::now() - chrono::Duration::days(older_than_days));
        let sql = format!(
            "SELECT {}, m.name, m.email, m.phone, a.name
             FROM passports p
             JOIN members m ON m.id = p.member_id
             JOIN activities a ON a.id = p.activity_id
             WHERE p.paid = 0 AND p.created_at < ?1
             ORDER BY p.created_at ASC",
            PASSPORT_COLS
        );
        let mut stmt = conn.prepare(&sql)?;
        let passports = stmt
            .query_map(params![cutoff], row_to_passport_with_member)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(passports)
    }

    /// Mark a passport paid
    ///
    /// Idempotent: marking an already-paid pass again is a Conflict so the
    /// caller can surface a useful message instead of silently re-stamping
    /// the payment date.
    pub fn mark_passport_paid(&self, id: i64, marked_by: &str) -> Result<Passport> {
        let passport = self.get_passport(id)?;
        if passport.paid {
            return Err(Error::Conflict(format!(
                "Passport {} is already paid",
                passport.pass_code
            )));
        }

        let conn = self.conn()?;
        conn.execute(
            "UPDATE passports SET paid = 1, paid_date = ?2, marked_paid_by = ?3 WHERE id = ?1",
            params![id, format_datetime(Utc::now()), marked_by],
        )?;
        drop(conn);

        self.get_passport(id)
    }

    /// Redeem one use of a pass
    ///
    /// Rejects exhausted passes. A second redemption within the duplicate-scan
    /// guard window is rejected without decrementing (double QR reads).
    pub fn redeem_passport(&self, pass_code: &str, redeemed_by: Option<&str>) -> Result<Passport> {
        let passport = self.get_passport_by_code(pass_code)?;

        if passport.uses_remaining <= 0 {
            return Err(Error::Conflict(format!(
                "Pass {} has no sessions remaining",
                pass_code
            )));
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let last_redemption: Option<String> = tx
            .query_row(
                "SELECT redeemed_at FROM redemptions
                 WHERE passport_id = ?1 ORDER BY id DESC LIMIT 1",
                params![passport.id],
                |row| row.get(0),
            )
            .ok();
        if let Some(last) = last_redemption {
            let elapsed = Utc::now() - parse_datetime(&last);
            if elapsed.num_seconds() < DUPLICATE_SCAN_GUARD_SECS {
                return Err(Error::Conflict(format!(
                    "Pass {} was just redeemed; ignoring duplicate scan",
                    pass_code
                )));
            }
        }

        tx.execute(
            "UPDATE passports SET uses_remaining = uses_remaining - 1
             WHERE id = ?1 AND uses_remaining > 0",
            params![passport.id],
        )?;
        tx.execute(
            "INSERT INTO redemptions (passport_id, redeemed_at, redeemed_by) VALUES (?1, ?2, ?3)",
            params![passport.id, format_datetime(Utc::now()), redeemed_by],
        )?;
        tx.commit()?;
        drop(conn);

        self.get_passport(passport.id)
    }

    /// List redemptions for a passport, oldest first
    pub fn list_redemptions(&self, passport_id: i64) -> Result<Vec<Redemption>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, passport_id, redeemed_at, redeemed_by
             FROM redemptions WHERE passport_id = ?1 ORDER BY id",
        )?;
        let redemptions = stmt
            .query_map(params![passport_id], |row| {
                let redeemed_at: String = row.get(2)?;
                Ok(Redemption {
                    id: row.get(0)?,
                    passport_id: row.get(1)?,
                    redeemed_at: parse_datetime(&redeemed_at),
                    redeemed_by: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(redemptions)
    }

    /// Update a passport's editable fields
    pub fn update_passport(
        &self,
        id: i64,
        sold_amt: f64,
        uses_remaining: i64,
        notes: Option<&str>,
    ) -> Result<()> {
        if uses_remaining < 0 {
            return Err(Error::InvalidData(
                "uses_remaining cannot be negative".to_string(),
            ));
        }
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE passports SET sold_amt = ?2, uses_remaining = ?3, notes = ?4 WHERE id = ?1",
            params![id, sold_amt, uses_remaining, notes],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Passport not found: {}", id)));
        }
        Ok(())
    }

    /// Full history of a pass: holder, redemptions, reminders, emails
    pub fn get_pass_history(&self, pass_code: &str) -> Result<PassHistory> {
        let passport = self.get_passport_by_code(pass_code)?;
        let member = self.get_member(passport.member_id)?;
        let activity_name = self.get_activity(passport.activity_id)?.name;
        let redemptions = self.list_redemptions(passport.id)?;

        let conn = self.conn()?;
        let reminders_sent: i64 = conn.query_row(
            "SELECT COUNT(*) FROM reminder_logs WHERE passport_id = ?1",
            params![passport.id],
            |row| row.get(0),
        )?;
        drop(conn);

        let emails: Vec<EmailLogEntry> = self.list_emails_for_pass(pass_code)?;

        Ok(PassHistory {
            passport,
            member,
            activity_name,
            redemptions,
            reminders_sent,
            emails,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::generate_pass_code;

    #[test]
    fn test_pass_code_shape() {
        let code = generate_pass_code();
        assert_eq!(code.len(), 16);
        assert!(code.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(code, code.to_uppercase());
    }

    #[test]
    fn test_pass_codes_unique() {
        let a = generate_pass_code();
        let b = generate_pass_code();
        assert_ne!(a, b);
    }
}

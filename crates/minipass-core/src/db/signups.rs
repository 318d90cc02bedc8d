//! Public signups and the approval workflow

use rusqlite::params;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{
    NewPassport, NewSignup, Passport, Signup, SignupStatus, SignupWithMember,
};

/// Filters for signup listings
#[derive(Debug, Clone, Default)]
pub struct SignupFilter {
    pub activity_id: Option<i64>,
    pub status: Option<SignupStatus>,
    pub paid: Option<bool>,
    pub limit: Option<i64>,
}

fn row_to_signup(row: &rusqlite::Row<'_>) -> rusqlite::Result<Signup> {
    let status: String = row.get(7)?;
    let created_at: String = row.get(9)?;
    Ok(Signup {
        id: row.get(0)?,
        member_id: row.get(1)?,
        activity_id: row.get(2)?,
        passport_type_id: row.get(3)?,
        subject: row.get(4)?,
        notes: row.get(5)?,
        paid: row.get(6)?,
        status: status.parse().unwrap_or_default(),
        passport_id: row.get(8)?,
        created_at: parse_datetime(&created_at),
    })
}

const SIGNUP_COLS: &str = "s.id, s.member_id, s.activity_id, s.passport_type_id, s.subject, \
     s.notes, s.paid, s.status, s.passport_id, s.created_at";

impl Database {
    /// Record a public signup for an activity
    ///
    /// Inserts a fresh member row and a pending signup. The subject line
    /// mirrors what the notification email will carry.
    pub fn create_signup(&self, activity_id: i64, new: &NewSignup) -> Result<Signup> {
        let activity = self.get_activity(activity_id)?;

        let passport_type_name = match new.passport_type_id {
            Some(type_id) => Some(self.get_passport_type(type_id)?.name),
            None => None,
        };
        let subject = match passport_type_name {
            Some(ref type_name) => format!("Signup for {} - {}", activity.name, type_name),
            None => format!("Signup for {}", activity.name),
        };

        let member_id = self.insert_member(&new.name, &new.email, new.phone.as_deref())?;

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO signups (member_id, activity_id, passport_type_id, subject, notes)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                member_id,
                activity_id,
                new.passport_type_id,
                subject,
                new.notes.as_deref().map(str::trim).filter(|n| !n.is_empty()),
            ],
        )?;
        let id = conn.last_insert_rowid();
        drop(conn);

        self.get_signup(id)
    }

    /// Get a signup by id
    pub fn get_signup(&self, id: i64) -> Result<Signup> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM signups s WHERE s.id = ?1", SIGNUP_COLS),
            params![id],
            row_to_signup,
        )
        .map_err(|_| Error::NotFound(format!("Signup not found: {}", id)))
    }

    /// List signups with member details, newest first
    pub fn list_signups(&self, filter: &SignupFilter) -> Result<Vec<SignupWithMember>> {
        let conn = self.conn()?;

        let mut conditions: Vec<String> = Vec::new();
        let mut query_params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(activity_id) = filter.activity_id {
            query_params.push(Box::new(activity_id));
            conditions.push(format!("s.activity_id = ?{}", query_params.len()));
        }
        if let Some(status) = filter.status {
            query_params.push(Box::new(status.as_str()));
            conditions.push(format!("s.status = ?{}", query_params.len()));
        }
        if let Some(paid) = filter.paid {
            query_params.push(Box::new(paid));
            conditions.push(format!("s.paid = ?{}", query_params.len()));
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
             FROM signups s
             JOIN members m ON m.id = s.member_id
             JOIN activities a ON a.id = s.activity_id
             {}
             ORDER BY s.created_at DESC, s.id DESC
             LIMIT ?{}",
            SIGNUP_COLS, where_clause, limit_idx
        );

        let mut stmt = conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> =
            query_params.iter().map(|p| p.as_ref()).collect();
        let signups = stmt
            .query_map(param_refs.as_slice(), |row| {
                Ok(SignupWithMember {
                    signup: row_to_signup(row)?,
                    member_name: row.get(10)?,
                    member_email: row.get(11)?,
                    member_phone: row.get(12)?,
                    activity_name: row.get(13)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(signups)
    }

    /// Update a signup's status
    pub fn update_signup_status(&self, id: i64, status: SignupStatus) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE signups SET status = ?2 WHERE id = ?1",
            params![id, status.as_str()],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Signup not found: {}", id)));
        }
        Ok(())
    }

    /// Mark a signup paid (its issued passport, if any, is marked separately)
    pub fn mark_signup_paid(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute("UPDATE signups SET paid = 1 WHERE id = ?1", params![id])?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Signup not found: {}", id)));
        }
        Ok(())
    }

    /// Approve a signup and issue a passport from it
    ///
    /// Passport defaults come from the signup's passport type when present
    /// (price, session count), otherwise from application settings. The
    /// signup is marked approved and linked to the new pass.
    pub fn approve_signup(&self, id: i64, approved_by: Option<&str>) -> Result<Passport> {
        let signup = self.get_signup(id)?;
        if signup.passport_id.is_some() {
            return Err(Error::Conflict(format!(
                "Signup {} already has a passport issued",
                id
            )));
        }
        let member = self.get_member(signup.member_id)?;
        let (sold_amt, uses_remaining, _) =
            self.passport_type_defaults(signup.passport_type_id)?;

        let passport = self.create_passport(
            &NewPassport {
                member_name: member.name,
                member_email: member.email,
                member_phone: member.phone,
                activity_id: signup.activity_id,
                passport_type_id: signup.passport_type_id,
                sold_amt,
                uses_remaining,
                paid: signup.paid,
                notes: signup.notes.clone(),
            },
            approved_by,
        )?;

        let conn = self.conn()?;
        conn.execute(
            "UPDATE signups SET status = 'approved', passport_id = ?2 WHERE id = ?1",
            params![id, passport.id],
        )?;

        Ok(passport)
    }
}

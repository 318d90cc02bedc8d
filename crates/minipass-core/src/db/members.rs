//! Pass holder records

use rusqlite::params;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::Member;

impl Database {
    /// Insert a member record
    ///
    /// Always inserts a fresh row, even when the email already exists;
    /// contact details stay attached to the pass they were given with.
    pub fn insert_member(&self, name: &str, email: &str, phone: Option<&str>) -> Result<i64> {
        let name = name.trim();
        let email = email.trim();
        if name.is_empty() {
            return Err(Error::InvalidData("Member name is required".to_string()));
        }
        if email.is_empty() || !email.contains('@') {
            return Err(Error::InvalidData(format!("Invalid email: {}", email)));
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO members (name, email, phone) VALUES (?1, ?2, ?3)",
            params![name, email, phone.map(str::trim).filter(|p| !p.is_empty())],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Get a member by id
    pub fn get_member(&self, id: i64) -> Result<Member> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, name, email, phone, created_at FROM members WHERE id = ?1",
            params![id],
            |row| {
                let created_at: String = row.get(4)?;
                Ok(Member {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    email: row.get(2)?,
                    phone: row.get(3)?,
                    created_at: parse_datetime(&created_at),
                })
            },
        )
        .map_err(|_| Error::NotFound(format!("Member not found: {}", id)))
    }

    /// Count all member records
    pub fn count_members(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM members", [], |row| row.get(0))?;
        Ok(count)
    }
}

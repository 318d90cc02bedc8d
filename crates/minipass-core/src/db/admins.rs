//! Admin accounts and login sessions

use chrono::{Duration, Utc};
use rusqlite::params;

use super::{format_datetime, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::Admin;

/// How long a login session stays valid
const SESSION_LIFETIME_DAYS: i64 = 30;

impl Database {
    /// Create an admin account with an Argon2id-hashed password
    ///
    /// Fails with `Conflict` if the email is already registered.
    pub fn create_admin(&self, email: &str, password: &str, name: Option<&str>) -> Result<i64> {
        use argon2::{
            password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
            Argon2,
        };

        let email = email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(Error::InvalidData(format!("Invalid email: {}", email)));
        }
        if password.len() < 8 {
            return Err(Error::InvalidData(
                "Password must be at least 8 characters".to_string(),
            ));
        }

        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| Error::Encryption(format!("Failed to hash password: {}", e)))?
            .to_string();

        let conn = self.conn()?;
        let result = conn.execute(
            "INSERT INTO admins (email, password_hash, name) VALUES (?1, ?2, ?3)",
            params![email, hash, name],
        );

        match result {
            Ok(_) => Ok(conn.last_insert_rowid()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(Error::Conflict(format!(
                    "Admin already exists: {}",
                    email
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Verify an email/password pair, returning the admin on success
    pub fn verify_admin_login(&self, email: &str, password: &str) -> Result<Option<Admin>> {
        use argon2::{
            password_hash::{PasswordHash, PasswordVerifier},
            Argon2,
        };

        let conn = self.conn()?;
        let row: Option<(i64, String, String, Option<String>, String)> = conn
            .query_row(
                "SELECT id, email, password_hash, name, created_at
                 FROM admins WHERE email = ?1",
                params![email.trim().to_lowercase()],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                    ))
                },
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;

        let Some((id, email, stored_hash, name, created_at)) = row else {
            return Ok(None);
        };

        let parsed = PasswordHash::new(&stored_hash)
            .map_err(|e| Error::Encryption(format!("Corrupt password hash: {}", e)))?;
        if Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_err()
        {
            return Ok(None);
        }

        Ok(Some(Admin {
            id,
            email,
            name,
            created_at: parse_datetime(&created_at),
        }))
    }

    /// Create a login session for an admin, returning the bearer token
    ///
    /// Expired sessions are purged opportunistically on each login.
    pub fn create_session(&self, admin_id: i64) -> Result<String> {
        let token = format!(
            "{}{}",
            uuid::Uuid::new_v4().simple(),
            uuid::Uuid::new_v4().simple()
        );
        let expires_at = format_datetime(Utc::now() + Duration::days(SESSION_LIFETIME_DAYS));

        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM admin_sessions WHERE expires_at < ?1",
            params![format_datetime(Utc::now())],
        )?;
        conn.execute(
            "INSERT INTO admin_sessions (token, admin_id, expires_at) VALUES (?1, ?2, ?3)",
            params![token, admin_id, expires_at],
        )?;

        Ok(token)
    }

    /// Resolve a session token to its admin, if the session is still valid
    pub fn session_admin(&self, token: &str) -> Result<Option<Admin>> {
        let conn = self.conn()?;
        let result = conn.query_row(
            "SELECT a.id, a.email, a.name, a.created_at
             FROM admin_sessions s
             JOIN admins a ON a.id = s.admin_id
             WHERE s.token = ?1 AND s.expires_at >= ?2",
            params![token, format_datetime(Utc::now())],
            |row| {
                let created_at: String = row.get(3)?;
                Ok(Admin {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    name: row.get(2)?,
                    created_at: parse_datetime(&created_at),
                })
            },
        );

        match result {
            Ok(admin) => Ok(Some(admin)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a session (logout)
    pub fn delete_session(&self, token: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM admin_sessions WHERE token = ?1", params![token])?;
        Ok(())
    }

    /// List all admin accounts
    pub fn list_admins(&self) -> Result<Vec<Admin>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, email, name, created_at FROM admins ORDER BY email")?;
        let admins = stmt
            .query_map([], |row| {
                let created_at: String = row.get(3)?;
                Ok(Admin {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    name: row.get(2)?,
                    created_at: parse_datetime(&created_at),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(admins)
    }

    /// Count admin accounts (used by first-run checks)
    pub fn count_admins(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM admins", [], |row| row.get(0))?;
        Ok(count)
    }
}

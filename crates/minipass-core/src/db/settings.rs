//! Key/value application settings
//!
//! Mail, IMAP, and payment-bot configuration lives here so it can be edited
//! from the admin UI without restarts. Environment variables of the same
//! name act as fallbacks for settings that have never been saved.

use std::collections::BTreeMap;

use rusqlite::params;

use super::Database;
use crate::error::Result;

impl Database {
    /// Get a setting, falling back to the environment, then the default
    pub fn get_setting(&self, key: &str, default: &str) -> Result<String> {
        let conn = self.conn()?;
        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .ok()
            .flatten();

        match value.filter(|v| !v.is_empty()) {
            Some(v) => Ok(v),
            None => Ok(std::env::var(key).unwrap_or_else(|_| default.to_string())),
        }
    }

    /// Get an optional setting (None when unset everywhere)
    pub fn get_setting_opt(&self, key: &str) -> Result<Option<String>> {
        let value = self.get_setting(key, "")?;
        Ok(Some(value).filter(|v| !v.is_empty()))
    }

    /// Get a setting parsed as i64
    pub fn get_setting_i64(&self, key: &str, default: i64) -> Result<i64> {
        let value = self.get_setting(key, "")?;
        Ok(value.parse().unwrap_or(default))
    }

    /// Get a setting parsed as f64
    pub fn get_setting_f64(&self, key: &str, default: f64) -> Result<f64> {
        let value = self.get_setting(key, "")?;
        Ok(value.parse().unwrap_or(default))
    }

    /// Save a setting (empty value deletes the row)
    pub fn save_setting(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn()?;
        if value.is_empty() {
            conn.execute("DELETE FROM settings WHERE key = ?1", params![key])?;
        } else {
            conn.execute(
                "INSERT INTO settings (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?;
        }
        Ok(())
    }

    /// All stored settings as a sorted map
    pub fn list_settings(&self) -> Result<BTreeMap<String, String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT key, value FROM settings ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut map = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            map.insert(key, value);
        }
        Ok(map)
    }
}

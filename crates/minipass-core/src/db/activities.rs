//! Activities and passport types

use rusqlite::params;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{
    Activity, ActivityStatus, NewActivity, NewPassportType, PassportType,
    PassportTypeDependencies,
};

fn row_to_activity(row: &rusqlite::Row<'_>) -> rusqlite::Result<Activity> {
    let status: String = row.get(6)?;
    let created_at: String = row.get(8)?;
    Ok(Activity {
        id: row.get(0)?,
        name: row.get(1)?,
        activity_type: row.get(2)?,
        description: row.get(3)?,
        start_date: row
            .get::<_, Option<String>>(4)?
            .and_then(|s| s.parse().ok()),
        end_date: row
            .get::<_, Option<String>>(5)?
            .and_then(|s| s.parse().ok()),
        status: status.parse().unwrap_or_default(),
        created_by: row.get(7)?,
        created_at: parse_datetime(&created_at),
    })
}

fn row_to_passport_type(row: &rusqlite::Row<'_>) -> rusqlite::Result<PassportType> {
    let kind: String = row.get(3)?;
    let status: String = row.get(8)?;
    let created_at: String = row.get(9)?;
    Ok(PassportType {
        id: row.get(0)?,
        activity_id: row.get(1)?,
        name: row.get(2)?,
        kind: kind.parse().unwrap_or_default(),
        price_per_user: row.get(4)?,
        sessions_included: row.get(5)?,
        target_revenue: row.get(6)?,
        payment_instructions: row.get(7)?,
        status: status.parse().unwrap_or_default(),
        created_at: parse_datetime(&created_at),
    })
}

const ACTIVITY_COLS: &str =
    "id, name, activity_type, description, start_date, end_date, status, created_by, created_at";

const PASSPORT_TYPE_COLS: &str = "id, activity_id, name, kind, price_per_user, sessions_included, \
     target_revenue, payment_instructions, status, created_at";

impl Database {
    /// Create an activity
    pub fn create_activity(&self, new: &NewActivity, created_by: Option<&str>) -> Result<i64> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(Error::InvalidData("Activity name is required".to_string()));
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO activities (name, activity_type, description, start_date, end_date, status, created_by)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                name,
                new.activity_type,
                new.description,
                new.start_date.map(|d| d.to_string()),
                new.end_date.map(|d| d.to_string()),
                new.status.unwrap_or_default().as_str(),
                created_by,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Update an activity
    pub fn update_activity(&self, id: i64, new: &NewActivity) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE activities SET name = ?2, activity_type = ?3, description = ?4,
             start_date = ?5, end_date = ?6, status = ?7 WHERE id = ?1",
            params![
                id,
                new.name.trim(),
                new.activity_type,
                new.description,
                new.start_date.map(|d| d.to_string()),
                new.end_date.map(|d| d.to_string()),
                new.status.unwrap_or_default().as_str(),
            ],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Activity not found: {}", id)));
        }
        Ok(())
    }

    /// Get an activity by id
    pub fn get_activity(&self, id: i64) -> Result<Activity> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM activities WHERE id = ?1", ACTIVITY_COLS),
            params![id],
            row_to_activity,
        )
        .map_err(|_| Error::NotFound(format!("Activity not found: {}", id)))
    }

    /// List activities, optionally filtered by status
    pub fn list_activities(&self, status: Option<ActivityStatus>) -> Result<Vec<Activity>> {
        let conn = self.conn()?;
        let activities = match status {
            Some(status) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM activities WHERE status = ?1 ORDER BY name",
                    ACTIVITY_COLS
                ))?;
                let rows = stmt.query_map(params![status.as_str()], row_to_activity)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM activities ORDER BY name",
                    ACTIVITY_COLS
                ))?;
                let rows = stmt.query_map([], row_to_activity)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            }
        };
        Ok(activities)
    }

    /// Delete an activity
    ///
    /// Refused while passports or signups reference it; sold passes must not
    /// silently lose their parent. Archive the activity instead.
    pub fn delete_activity(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;

        let passport_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM passports WHERE activity_id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        let signup_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM signups WHERE activity_id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        if passport_count > 0 || signup_count > 0 {
            return Err(Error::Conflict(format!(
                "Activity has {} passport(s) and {} signup(s); archive it instead",
                passport_count, signup_count
            )));
        }

        let deleted = conn.execute("DELETE FROM activities WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("Activity not found: {}", id)));
        }
        Ok(())
    }

    /// Create a passport type under an activity
    pub fn create_passport_type(&self, activity_id: i64, new: &NewPassportType) -> Result<i64> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(Error::InvalidData(
                "Passport type name is required".to_string(),
            ));
        }

        // Activity must exist; FK errors surface as opaque constraint failures
        self.get_activity(activity_id)?;

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO passport_types
             (activity_id, name, kind, price_per_user, sessions_included, target_revenue, payment_instructions)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                activity_id,
                name,
                new.kind.as_str(),
                new.price_per_user,
                new.sessions_included,
                new.target_revenue,
                new.payment_instructions,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Update a passport type
    pub fn update_passport_type(&self, id: i64, new: &NewPassportType) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE passport_types SET name = ?2, kind = ?3, price_per_user = ?4,
             sessions_included = ?5, target_revenue = ?6, payment_instructions = ?7
             WHERE id = ?1",
            params![
                id,
                new.name.trim(),
                new.kind.as_str(),
                new.price_per_user,
                new.sessions_included,
                new.target_revenue,
                new.payment_instructions,
            ],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Passport type not found: {}", id)));
        }
        Ok(())
    }

    /// Get a passport type by id
    pub fn get_passport_type(&self, id: i64) -> Result<PassportType> {
        let conn = self.conn()?;
        conn.query_row(
            &format!(
                "SELECT {} FROM passport_types WHERE id = ?1",
                PASSPORT_TYPE_COLS
            ),
            params![id],
            row_to_passport_type,
        )
        .map_err(|_| Error::NotFound(format!("Passport type not found: {}", id)))
    }

    /// List passport types for an activity
    ///
    /// `active_only` hides archived offerings from public signup forms.
    pub fn list_passport_types(
        &self,
        activity_id: i64,
        active_only: bool,
    ) -> Result<Vec<PassportType>> {
        let conn = self.conn()?;
        let sql = if active_only {
            format!(
                "SELECT {} FROM passport_types WHERE activity_id = ?1 AND status = 'active' ORDER BY name",
                PASSPORT_TYPE_COLS
            )
        } else {
            format!(
                "SELECT {} FROM passport_types WHERE activity_id = ?1 ORDER BY name",
                PASSPORT_TYPE_COLS
            )
        };
        let mut stmt = conn.prepare(&sql)?;
        let types = stmt
            .query_map(params![activity_id], row_to_passport_type)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(types)
    }

    /// Count records referencing a passport type (checked before archive/delete)
    pub fn passport_type_dependencies(&self, id: i64) -> Result<PassportTypeDependencies> {
        let conn = self.conn()?;
        let passport_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM passports WHERE passport_type_id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        let signup_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM signups WHERE passport_type_id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        Ok(PassportTypeDependencies {
            passport_count,
            signup_count,
        })
    }

    /// Archive a passport type (hidden from signup forms, history preserved)
    pub fn archive_passport_type(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE passport_types SET status = 'archived' WHERE id = ?1",
            params![id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Passport type not found: {}", id)));
        }
        Ok(())
    }

    /// Delete a passport type
    ///
    /// Existing passports keep their rows: the FK is ON DELETE SET NULL and
    /// the denormalized passport_type_name still labels them.
    pub fn delete_passport_type(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM passport_types WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("Passport type not found: {}", id)));
        }
        Ok(())
    }

    /// Default sold amount and session count for a passport type, if set
    pub fn passport_type_defaults(&self, id: Option<i64>) -> Result<(f64, i64, Option<String>)> {
        match id {
            Some(id) => {
                let pt = self.get_passport_type(id)?;
                Ok((pt.price_per_user, pt.sessions_included, Some(pt.name)))
            }
            None => Ok((
                self.get_setting_f64("DEFAULT_PASS_AMOUNT", 50.0)?,
                self.get_setting_i64("DEFAULT_SESSION_QT", 4)?,
                None,
            )),
        }
    }
}

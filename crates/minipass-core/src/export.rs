//! CSV exports and gzipped full backups

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::db::{Database, PassportFilter, SignupFilter};
use crate::error::{Error, Result};

/// Backup format version, bumped on incompatible schema changes
const BACKUP_VERSION: u32 = 1;

/// Tables included in a full backup, in insert order (FK parents first)
const BACKUP_TABLES: &[&str] = &[
    "admins",
    "members",
    "activities",
    "passport_types",
    "passports",
    "redemptions",
    "signups",
    "incomes",
    "expenses",
    "ebank_payments",
    "reminder_logs",
    "email_logs",
    "settings",
    "audit_log",
    "survey_templates",
    "surveys",
    "survey_responses",
    "chat_queries",
];

/// A complete dump of all application tables
#[derive(Debug, Serialize, Deserialize)]
pub struct FullBackup {
    pub version: u32,
    /// table name -> rows (column name -> value)
    pub tables: BTreeMap<String, Vec<serde_json::Map<String, serde_json::Value>>>,
}

/// Metadata about a written backup file
#[derive(Debug, Clone, Serialize)]
pub struct BackupInfo {
    pub path: String,
    pub size_bytes: u64,
    /// SHA-256 of the compressed file
    pub checksum: String,
    pub row_count: usize,
}

/// Counts from a restore
#[derive(Debug, Clone, Default, Serialize)]
pub struct RestoreStats {
    pub tables: usize,
    pub rows: usize,
}

/// Export passports as CSV
pub fn export_passports_csv(db: &Database, filter: &PassportFilter) -> Result<String> {
    let passports = db.list_passports(filter)?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "pass_code",
        "holder_name",
        "holder_email",
        "holder_phone",
        "activity",
        "passport_type",
        "sold_amt",
        "uses_remaining",
        "paid",
        "paid_date",
        "created_at",
    ])?;

    for entry in passports {
        writer.write_record([
            entry.passport.pass_code.clone(),
            entry.member_name.clone(),
            entry.member_email.clone(),
            entry.member_phone.clone().unwrap_or_default(),
            entry.activity_name.clone(),
            entry.passport.passport_type_name.clone().unwrap_or_default(),
            format!("{:.2}", entry.passport.sold_amt),
            entry.passport.uses_remaining.to_string(),
            if entry.passport.paid { "yes" } else { "no" }.to_string(),
            entry
                .passport
                .paid_date
                .map(|d| d.to_rfc3339())
                .unwrap_or_default(),
            entry.passport.created_at.to_rfc3339(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| Error::InvalidData(format!("CSV flush failed: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| Error::InvalidData(format!("CSV not UTF-8: {}", e)))
}

/// Export signups as CSV
pub fn export_signups_csv(db: &Database, filter: &SignupFilter) -> Result<String> {
    let signups = db.list_signups(filter)?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "id",
        "name",
        "email",
        "phone",
        "activity",
        "subject",
        "status",
        "paid",
        "created_at",
    ])?;

    for entry in signups {
        writer.write_record([
            entry.signup.id.to_string(),
            entry.member_name.clone(),
            entry.member_email.clone(),
            entry.member_phone.clone().unwrap_or_default(),
            entry.activity_name.clone(),
            entry.signup.subject.clone(),
            entry.signup.status.as_str().to_string(),
            if entry.signup.paid { "yes" } else { "no" }.to_string(),
            entry.signup.created_at.to_rfc3339(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| Error::InvalidData(format!("CSV flush failed: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| Error::InvalidData(format!("CSV not UTF-8: {}", e)))
}

/// Dump every application table into a backup structure
pub fn create_backup(db: &Database) -> Result<FullBackup> {
    let conn = db.conn()?;
    let mut tables = BTreeMap::new();

    for table in BACKUP_TABLES {
        let mut stmt = conn.prepare(&format!("SELECT * FROM {}", table))?;
        let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();

        let mut rows = Vec::new();
        let mut raw_rows = stmt.query([])?;
        while let Some(row) = raw_rows.next()? {
            let mut object = serde_json::Map::new();
            for (i, name) in columns.iter().enumerate() {
                let value = match row.get_ref(i)? {
                    rusqlite::types::ValueRef::Null => serde_json::Value::Null,
                    rusqlite::types::ValueRef::Integer(v) => serde_json::Value::from(v),
                    rusqlite::types::ValueRef::Real(v) => serde_json::Value::from(v),
                    rusqlite::types::ValueRef::Text(v) => {
                        serde_json::Value::from(String::from_utf8_lossy(v).into_owned())
                    }
                    rusqlite::types::ValueRef::Blob(v) => serde_json::Value::from(hex::encode(v)),
                };
                object.insert(name.clone(), value);
            }
            rows.push(object);
        }

        tables.insert(table.to_string(), rows);
    }

    Ok(FullBackup {
        version: BACKUP_VERSION,
        tables,
    })
}

/// Serialize a full backup as gzipped JSON
pub fn backup_to_gz_bytes(db: &Database) -> Result<Vec<u8>> {
    let backup = create_backup(db)?;
    let json = serde_json::to_vec(&backup)?;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json)?;
    Ok(encoder.finish()?)
}

/// Write a gzipped full backup to a file
///
/// Writes to a temp file first and renames into place so an interrupted
/// backup never leaves a truncated file behind.
pub fn write_backup_gz(db: &Database, path: &Path) -> Result<BackupInfo> {
    let backup = create_backup(db)?;
    let row_count = backup.tables.values().map(|rows| rows.len()).sum();

    let json = serde_json::to_vec(&backup)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json)?;
    let bytes = encoder.finish()?;

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(&bytes)?;
    tmp.persist(path)
        .map_err(|e| Error::Backup(format!("Could not write backup: {}", e)))?;

    let checksum = hex::encode(Sha256::digest(&bytes));
    info!(path = %path.display(), size = bytes.len(), "Backup written");

    Ok(BackupInfo {
        path: path.display().to_string(),
        size_bytes: bytes.len() as u64,
        checksum,
        row_count,
    })
}

/// Restore a gzipped full backup
///
/// With `clear`, existing application data is erased first (admin accounts
/// and settings included, since the backup carries its own).
pub fn restore_backup_gz(db: &Database, path: &Path, clear: bool) -> Result<RestoreStats> {
    let file = std::fs::File::open(path)?;
    let mut decoder = GzDecoder::new(file);
    let mut json = Vec::new();
    decoder.read_to_end(&mut json)?;

    let backup: FullBackup = serde_json::from_slice(&json)?;
    if backup.version != BACKUP_VERSION {
        return Err(Error::Backup(format!(
            "Unsupported backup version: {}",
            backup.version
        )));
    }

    let mut conn = db.conn()?;
    let tx = conn.transaction()?;

    if clear {
        // Children first so FK constraints hold
        for table in BACKUP_TABLES.iter().rev() {
            tx.execute(&format!("DELETE FROM {}", table), [])?;
        }
    }

    let mut stats = RestoreStats::default();
    for table in BACKUP_TABLES {
        let Some(rows) = backup.tables.get(*table) else {
            continue;
        };
        if rows.is_empty() {
            continue;
        }
        stats.tables += 1;

        for row in rows {
            let columns: Vec<&str> = row.keys().map(|k| k.as_str()).collect();
            let placeholders: Vec<String> =
                (1..=columns.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table,
                columns.join(", "),
                placeholders.join(", ")
            );

            let values: Vec<Box<dyn rusqlite::ToSql>> = row
                .values()
                .map(|v| -> Box<dyn rusqlite::ToSql> {
                    match v {
                        serde_json::Value::Null => Box::new(None::<String>),
                        serde_json::Value::Bool(b) => Box::new(*b),
                        serde_json::Value::Number(n) => {
                            if let Some(i) = n.as_i64() {
                                Box::new(i)
                            } else {
                                Box::new(n.as_f64().unwrap_or(0.0))
                            }
                        }
                        serde_json::Value::String(s) => Box::new(s.clone()),
                        other => Box::new(other.to_string()),
                    }
                })
                .collect();
            let value_refs: Vec<&dyn rusqlite::ToSql> =
                values.iter().map(|v| v.as_ref()).collect();
            tx.execute(&sql, value_refs.as_slice())?;
            stats.rows += 1;
        }
    }

    tx.commit()?;
    info!(tables = stats.tables, rows = stats.rows, "Backup restored");
    Ok(stats)
}

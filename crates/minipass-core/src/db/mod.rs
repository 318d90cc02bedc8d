//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `admins` - Admin accounts and login sessions
//! - `members` - Pass holder records
//! - `activities` - Activities and passport types
//! - `passports` - Passport CRUD, payment marking, redemptions
//! - `signups` - Public signups and approval workflow
//! - `finance` - Income/expense CRUD and the monthly financial summary view
//! - `payments` - E-transfer payment log
//! - `surveys` - Survey templates, surveys, responses
//! - `settings` - Key/value application settings
//! - `email_log` - Outbound email log and payment reminders
//! - `kpi` - Activity and global dashboard KPIs
//! - `chat_log` - Chatbot query log

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::info;

use crate::error::{Error, Result};

mod activities;
mod admins;
mod chat_log;
mod email_log;
mod finance;
mod kpi;
mod members;
mod passports;
mod payments;
mod settings;
mod signups;
mod surveys;

pub use passports::{generate_pass_code, PassportFilter};
pub use payments::NewEbankPayment;
pub use signups::SignupFilter;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Environment variable for database encryption key
pub const DB_KEY_ENV: &str = "MINIPASS_DB_KEY";

/// Derive an encryption key from a passphrase using Argon2
///
/// Uses a fixed application salt so the same passphrase always produces the same key,
/// regardless of database path. This allows moving/renaming/restoring the database freely.
fn derive_key(passphrase: &str) -> Result<String> {
    use argon2::{password_hash::SaltString, Argon2, PasswordHasher};

    // Fixed application salt - changing this would invalidate all existing encrypted databases
    const APP_SALT: &[u8; 16] = b"minipass-salt-v1";

    let salt = SaltString::encode_b64(APP_SALT)
        .map_err(|e| Error::Encryption(format!("Failed to create salt: {}", e)))?;

    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(passphrase.as_bytes(), &salt)
        .map_err(|e| Error::Encryption(format!("Failed to derive key: {}", e)))?;

    // Extract the hash portion for use as SQLCipher key (hex encoded)
    let hash_str = hash
        .hash
        .ok_or_else(|| Error::Encryption("No hash output".to_string()))?;
    Ok(hex::encode(hash_str.as_bytes()))
}

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    // SQLite stores as "YYYY-MM-DD HH:MM:SS" format
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Format a DateTime<Utc> the way SQLite's CURRENT_TIMESTAMP does
pub(crate) fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
}

impl Database {
    /// Create a new database connection pool with encryption
    ///
    /// Requires `MINIPASS_DB_KEY` environment variable to be set.
    /// The database will be encrypted using SQLCipher with a key derived
    /// from the passphrase via Argon2.
    ///
    /// Returns an error if `MINIPASS_DB_KEY` is not set. Use `new_unencrypted()`
    /// for development/testing without encryption.
    pub fn new(path: &str) -> Result<Self> {
        let encryption_key = std::env::var(DB_KEY_ENV).ok();
        match encryption_key {
            Some(key) => Self::new_with_key(path, Some(&key)),
            None => Err(Error::Encryption(format!(
                "Database encryption required. Set {} environment variable with your passphrase, \
                or use --no-encrypt for unencrypted databases (not recommended for production).",
                DB_KEY_ENV
            ))),
        }
    }

    /// Create a new unencrypted database connection pool
    ///
    /// WARNING: This creates an unencrypted database. Only use for development
    /// or testing. For production, use `new()` with `MINIPASS_DB_KEY` set.
    pub fn new_unencrypted(path: &str) -> Result<Self> {
        Self::new_with_key(path, None)
    }

    /// Create a new database with an explicit encryption key
    pub fn new_with_key(path: &str, passphrase: Option<&str>) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);

        let pool = if let Some(pass) = passphrase {
            let key = derive_key(pass)?;
            let key_pragma = format!("PRAGMA key = 'x\"{}\"';", key);

            // Use with_init to set the key on every new connection
            let manager = manager.with_init(move |conn| {
                conn.execute_batch(&key_pragma)?;
                Ok(())
            });

            Pool::builder().max_size(10).build(manager)?
        } else {
            Pool::builder().max_size(10).build(manager)?
        };

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create an in-memory database (for testing)
    ///
    /// Note: Uses a temporary file rather than `:memory:` because SQLCipher
    /// has issues with in-memory databases in the connection pool.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = format!("/tmp/minipass_test_{}_{}.db", std::process::id(), id);

        // Remove any existing file
        let _ = std::fs::remove_file(&path);

        Self::new_unencrypted(&path)
    }

    /// Check if the database is encrypted
    pub fn is_encrypted(&self) -> Result<bool> {
        let conn = self.conn()?;
        // SQLCipher sets cipher_version if encryption is active
        let result: rusqlite::Result<String> =
            conn.query_row("PRAGMA cipher_version;", [], |row| row.get(0));
        Ok(result.is_ok() && std::env::var(DB_KEY_ENV).is_ok())
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Erase application data: clear all operational records but preserve
    /// admin accounts and settings
    ///
    /// Clears: passports, redemptions, signups, members, incomes, expenses,
    ///         ebank_payments, reminder_logs, email_logs, surveys,
    ///         survey_responses, chat_queries, audit_log
    /// Preserves: admins, admin_sessions, settings, survey_templates
    pub fn erase_app_data(&self) -> Result<()> {
        let conn = self.conn()?;

        // Delete in order respecting foreign key constraints
        conn.execute_batch(
            r#"
            DELETE FROM survey_responses;
            DELETE FROM surveys;
            DELETE FROM reminder_logs;
            DELETE FROM redemptions;
            DELETE FROM ebank_payments;
            DELETE FROM email_logs;
            DELETE FROM signups;
            DELETE FROM passports;
            DELETE FROM incomes;
            DELETE FROM expenses;
            DELETE FROM passport_types;
            DELETE FROM activities;
            DELETE FROM members;
            DELETE FROM chat_queries;
            DELETE FROM audit_log;
            "#,
        )?;

        info!("Application data erased");
        Ok(())
    }

    /// Log an admin action to the audit log
    pub fn log_audit(&self, admin_email: &str, action: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO audit_log (admin_email, action) VALUES (?1, ?2)",
            rusqlite::params![admin_email, action],
        )?;
        Ok(())
    }

    /// List recent audit log entries, newest first
    pub fn list_audit_log(&self, limit: i64) -> Result<Vec<AuditEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, admin_email, action
             FROM audit_log ORDER BY id DESC LIMIT ?1",
        )?;
        let entries = stmt
            .query_map([limit], |row| {
                Ok(AuditEntry {
                    id: row.get(0)?,
                    timestamp: row.get(1)?,
                    admin_email: row.get(2)?,
                    action: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- Enable foreign keys
            PRAGMA foreign_keys = ON;

            -- Performance pragmas for local storage (SSD/M.2 recommended)
            -- WAL mode: better concurrency, readers don't block writers
            -- Note: creates -wal and -shm sidecar files alongside the database
            PRAGMA journal_mode = WAL;

            -- Cache size: ~8MB (2000 pages * 4KB default page size)
            PRAGMA cache_size = 2000;

            -- Synchronous NORMAL: good balance of safety and performance
            PRAGMA synchronous = NORMAL;

            -- Store temp tables in memory (faster for complex queries)
            PRAGMA temp_store = MEMORY;

            -- Admin accounts
            CREATE TABLE IF NOT EXISTS admins (
                id INTEGER PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                name TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Admin login sessions (bearer tokens)
            CREATE TABLE IF NOT EXISTS admin_sessions (
                token TEXT PRIMARY KEY,
                admin_id INTEGER NOT NULL REFERENCES admins(id) ON DELETE CASCADE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                expires_at DATETIME NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_admin_sessions_admin ON admin_sessions(admin_id);
            CREATE INDEX IF NOT EXISTS idx_admin_sessions_expires ON admin_sessions(expires_at);

            -- Pass holders
            -- A fresh row is inserted per signup/passport even for repeat emails,
            -- so contact details stay attached to the pass they were given with
            CREATE TABLE IF NOT EXISTS members (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL,
                phone TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_members_email ON members(email);

            -- Activities
            CREATE TABLE IF NOT EXISTS activities (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                activity_type TEXT,
                description TEXT,
                start_date DATE,
                end_date DATE,
                status TEXT NOT NULL DEFAULT 'active',
                created_by TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_activities_status ON activities(status);

            -- Passport types (offerings within an activity)
            CREATE TABLE IF NOT EXISTS passport_types (
                id INTEGER PRIMARY KEY,
                activity_id INTEGER NOT NULL REFERENCES activities(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                kind TEXT NOT NULL DEFAULT 'permanent',
                price_per_user REAL NOT NULL DEFAULT 0,
                sessions_included INTEGER NOT NULL DEFAULT 1,
                target_revenue REAL NOT NULL DEFAULT 0,
                payment_instructions TEXT,
                status TEXT NOT NULL DEFAULT 'active',
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_passport_types_activity ON passport_types(activity_id);
            CREATE INDEX IF NOT EXISTS idx_passport_types_status ON passport_types(status);

            -- Passports (sold passes)
            -- passport_type_id uses ON DELETE SET NULL: deleting a passport type
            -- must not orphan sold passes; passport_type_name keeps the label
            CREATE TABLE IF NOT EXISTS passports (
                id INTEGER PRIMARY KEY,
                pass_code TEXT NOT NULL UNIQUE,
                member_id INTEGER NOT NULL REFERENCES members(id),
                activity_id INTEGER NOT NULL REFERENCES activities(id),
                passport_type_id INTEGER REFERENCES passport_types(id) ON DELETE SET NULL,
                passport_type_name TEXT,
                sold_amt REAL NOT NULL DEFAULT 50,
                uses_remaining INTEGER NOT NULL DEFAULT 4,
                paid BOOLEAN NOT NULL DEFAULT 0,
                paid_date DATETIME,
                marked_paid_by TEXT,
                created_by TEXT,
                notes TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_passports_activity ON passports(activity_id);
            CREATE INDEX IF NOT EXISTS idx_passports_member ON passports(member_id);
            CREATE INDEX IF NOT EXISTS idx_passports_paid ON passports(paid);
            CREATE INDEX IF NOT EXISTS idx_passports_type ON passports(passport_type_id);

            -- Redemptions (one row per pass use)
            CREATE TABLE IF NOT EXISTS redemptions (
                id INTEGER PRIMARY KEY,
                passport_id INTEGER NOT NULL REFERENCES passports(id) ON DELETE CASCADE,
                redeemed_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                redeemed_by TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_redemptions_passport ON redemptions(passport_id);

            -- Signups (public registrations awaiting approval)
            CREATE TABLE IF NOT EXISTS signups (
                id INTEGER PRIMARY KEY,
                member_id INTEGER NOT NULL REFERENCES members(id),
                activity_id INTEGER NOT NULL REFERENCES activities(id) ON DELETE CASCADE,
                passport_type_id INTEGER REFERENCES passport_types(id) ON DELETE SET NULL,
                subject TEXT NOT NULL,
                notes TEXT,
                status TEXT NOT NULL DEFAULT 'pending',
                paid BOOLEAN NOT NULL DEFAULT 0,
                passport_id INTEGER REFERENCES passports(id) ON DELETE SET NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_signups_activity ON signups(activity_id);
            CREATE INDEX IF NOT EXISTS idx_signups_status ON signups(status);

            -- Other income (sponsorships, bar revenue, grants)
            CREATE TABLE IF NOT EXISTS incomes (
                id INTEGER PRIMARY KEY,
                activity_id INTEGER NOT NULL REFERENCES activities(id) ON DELETE CASCADE,
                date DATE NOT NULL,
                amount REAL NOT NULL,
                description TEXT,
                category TEXT,
                payment_status TEXT NOT NULL DEFAULT 'received',
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_incomes_activity ON incomes(activity_id);
            CREATE INDEX IF NOT EXISTS idx_incomes_date ON incomes(date);

            -- Expenses
            -- date is the bill date; due_date/payment_date drive the AP
            -- effective-date fallback in the financial summary view
            CREATE TABLE IF NOT EXISTS expenses (
                id INTEGER PRIMARY KEY,
                activity_id INTEGER NOT NULL REFERENCES activities(id) ON DELETE CASCADE,
                date DATE NOT NULL,
                amount REAL NOT NULL,
                description TEXT,
                category TEXT,
                payment_status TEXT NOT NULL DEFAULT 'paid',
                due_date DATE,
                payment_date DATE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_expenses_activity ON expenses(activity_id);
            CREATE INDEX IF NOT EXISTS idx_expenses_date ON expenses(date);
            CREATE INDEX IF NOT EXISTS idx_expenses_status ON expenses(payment_status);

            -- E-transfer payment log (every processed bank notification)
            CREATE TABLE IF NOT EXISTS ebank_payments (
                id INTEGER PRIMARY KEY,
                received_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                from_email TEXT,
                subject TEXT,
                bank_name TEXT,
                bank_amount REAL,
                matched_passport_id INTEGER REFERENCES passports(id) ON DELETE SET NULL,
                matched_name TEXT,
                matched_amount REAL,
                name_score INTEGER NOT NULL DEFAULT 0,
                result TEXT NOT NULL,
                marked_paid BOOLEAN NOT NULL DEFAULT 0,
                note TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_ebank_payments_result ON ebank_payments(result);
            CREATE INDEX IF NOT EXISTS idx_ebank_payments_received ON ebank_payments(received_at);

            -- Payment reminder log
            CREATE TABLE IF NOT EXISTS reminder_logs (
                id INTEGER PRIMARY KEY,
                passport_id INTEGER NOT NULL REFERENCES passports(id) ON DELETE CASCADE,
                sent_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_reminder_logs_passport ON reminder_logs(passport_id);

            -- Outbound email log
            CREATE TABLE IF NOT EXISTS email_logs (
                id INTEGER PRIMARY KEY,
                sent_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                to_email TEXT NOT NULL,
                subject TEXT NOT NULL,
                pass_code TEXT,
                template TEXT,
                context_json TEXT,
                result TEXT NOT NULL,
                error_message TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_email_logs_result ON email_logs(result);
            CREATE INDEX IF NOT EXISTS idx_email_logs_pass_code ON email_logs(pass_code);

            -- Application settings (mail/IMAP/bot configuration)
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT
            );

            -- Audit log (admin actions)
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY,
                timestamp DATETIME DEFAULT CURRENT_TIMESTAMP,
                admin_email TEXT NOT NULL,
                action TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_audit_log_timestamp ON audit_log(timestamp);

            -- Survey templates (reusable question sets)
            CREATE TABLE IF NOT EXISTS survey_templates (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT,
                questions_json TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Surveys (one instance per activity send-out)
            CREATE TABLE IF NOT EXISTS surveys (
                id INTEGER PRIMARY KEY,
                survey_token TEXT NOT NULL UNIQUE,
                activity_id INTEGER NOT NULL REFERENCES activities(id) ON DELETE CASCADE,
                template_id INTEGER NOT NULL REFERENCES survey_templates(id),
                name TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'open',
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                closed_at DATETIME
            );

            CREATE INDEX IF NOT EXISTS idx_surveys_activity ON surveys(activity_id);
            CREATE INDEX IF NOT EXISTS idx_surveys_token ON surveys(survey_token);

            -- Survey responses
            CREATE TABLE IF NOT EXISTS survey_responses (
                id INTEGER PRIMARY KEY,
                survey_id INTEGER NOT NULL REFERENCES surveys(id) ON DELETE CASCADE,
                response_token TEXT NOT NULL UNIQUE,
                passport_id INTEGER REFERENCES passports(id) ON DELETE SET NULL,
                answers_json TEXT NOT NULL,
                submitted_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_survey_responses_survey ON survey_responses(survey_id);

            -- Chatbot query log
            CREATE TABLE IF NOT EXISTS chat_queries (
                id INTEGER PRIMARY KEY,
                asked_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                question TEXT NOT NULL,
                language TEXT NOT NULL,
                generated_sql TEXT,
                success BOOLEAN NOT NULL,
                error_message TEXT,
                row_count INTEGER NOT NULL DEFAULT 0,
                duration_ms INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_chat_queries_asked ON chat_queries(asked_at);
            "#,
        )?;

        // The view is rebuilt on every startup so schema upgrades that change
        // the view definition take effect without a separate migration step.
        conn.execute_batch(FINANCIAL_SUMMARY_VIEW)?;

        info!("Database schema initialized");
        Ok(())
    }
}

/// The monthly financial summary view
///
/// One row per (month, activity) combining cash and accrual buckets from all
/// three transaction sources (passport sales, other income, expenses).
///
/// Unpaid expenses are bucketed by COALESCE(payment_date, due_date, date):
/// a bill from a prior fiscal year whose payment is scheduled this year shows
/// up in this year's accounts payable, not the year it was billed.
const FINANCIAL_SUMMARY_VIEW: &str = r#"
    DROP VIEW IF EXISTS monthly_financial_summary;

    CREATE VIEW monthly_financial_summary AS
    WITH
    -- All distinct month+activity combinations from all transaction sources
    all_month_activity AS (
        SELECT DISTINCT
            strftime('%Y-%m', paid_date) as month,
            activity_id
        FROM passports
        WHERE paid = 1 AND paid_date IS NOT NULL

        UNION

        SELECT DISTINCT
            strftime('%Y-%m', COALESCE(paid_date, created_at)) as month,
            activity_id
        FROM passports
        WHERE paid = 0

        UNION

        SELECT DISTINCT
            strftime('%Y-%m', date) as month,
            activity_id
        FROM incomes
        WHERE payment_status = 'received'

        UNION

        SELECT DISTINCT
            strftime('%Y-%m', date) as month,
            activity_id
        FROM incomes
        WHERE payment_status = 'pending'

        UNION

        SELECT DISTINCT
            strftime('%Y-%m', date) as month,
            activity_id
        FROM expenses
        WHERE payment_status = 'paid'

        UNION

        -- Unpaid expenses use the effective date (payment_date > due_date > date)
        SELECT DISTINCT
            strftime('%Y-%m', COALESCE(payment_date, due_date, date)) as month,
            activity_id
        FROM expenses
        WHERE payment_status = 'unpaid'
    ),
    monthly_passports_cash AS (
        SELECT
            strftime('%Y-%m', paid_date) as month,
            activity_id,
            SUM(sold_amt) as passport_sales_cash
        FROM passports
        WHERE paid = 1 AND paid_date IS NOT NULL
        GROUP BY month, activity_id
    ),
    monthly_passports_ar AS (
        SELECT
            strftime('%Y-%m', COALESCE(paid_date, created_at)) as month,
            activity_id,
            SUM(sold_amt) as passport_sales_ar
        FROM passports
        WHERE paid = 0
        GROUP BY month, activity_id
    ),
    monthly_income_cash AS (
        SELECT
            strftime('%Y-%m', date) as month,
            activity_id,
            SUM(amount) as other_income_cash
        FROM incomes
        WHERE payment_status = 'received'
        GROUP BY month, activity_id
    ),
    monthly_income_ar AS (
        SELECT
            strftime('%Y-%m', date) as month,
            activity_id,
            SUM(amount) as other_income_ar
        FROM incomes
        WHERE payment_status = 'pending'
        GROUP BY month, activity_id
    ),
    monthly_expenses_cash AS (
        SELECT
            strftime('%Y-%m', date) as month,
            activity_id,
            SUM(amount) as expenses_cash
        FROM expenses
        WHERE payment_status = 'paid'
        GROUP BY month, activity_id
    ),
    monthly_expenses_ap AS (
        SELECT
            strftime('%Y-%m', COALESCE(payment_date, due_date, date)) as month,
            activity_id,
            SUM(amount) as expenses_ap
        FROM expenses
        WHERE payment_status = 'unpaid'
        GROUP BY strftime('%Y-%m', COALESCE(payment_date, due_date, date)), activity_id
    )
    SELECT
        ma.month,
        ma.activity_id,
        a.name as activity_name,

        COALESCE(pc.passport_sales_cash, 0) as passport_sales,
        COALESCE(ic.other_income_cash, 0) as other_income,
        COALESCE(pc.passport_sales_cash, 0) + COALESCE(ic.other_income_cash, 0) as cash_received,
        COALESCE(ec.expenses_cash, 0) as cash_paid,
        (COALESCE(pc.passport_sales_cash, 0) + COALESCE(ic.other_income_cash, 0) - COALESCE(ec.expenses_cash, 0)) as net_cash_flow,

        COALESCE(par.passport_sales_ar, 0) as passport_ar,
        COALESCE(iar.other_income_ar, 0) as other_income_ar,
        COALESCE(par.passport_sales_ar, 0) + COALESCE(iar.other_income_ar, 0) as accounts_receivable,
        COALESCE(eap.expenses_ap, 0) as accounts_payable,

        (COALESCE(pc.passport_sales_cash, 0) + COALESCE(par.passport_sales_ar, 0) +
         COALESCE(ic.other_income_cash, 0) + COALESCE(iar.other_income_ar, 0)) as total_revenue,
        (COALESCE(ec.expenses_cash, 0) + COALESCE(eap.expenses_ap, 0)) as total_expenses,
        ((COALESCE(pc.passport_sales_cash, 0) + COALESCE(par.passport_sales_ar, 0) +
          COALESCE(ic.other_income_cash, 0) + COALESCE(iar.other_income_ar, 0)) -
         (COALESCE(ec.expenses_cash, 0) + COALESCE(eap.expenses_ap, 0))) as net_income

    FROM all_month_activity ma
    JOIN activities a ON ma.activity_id = a.id
    LEFT JOIN monthly_passports_cash pc ON ma.month = pc.month AND ma.activity_id = pc.activity_id
    LEFT JOIN monthly_passports_ar par ON ma.month = par.month AND ma.activity_id = par.activity_id
    LEFT JOIN monthly_income_cash ic ON ma.month = ic.month AND ma.activity_id = ic.activity_id
    LEFT JOIN monthly_income_ar iar ON ma.month = iar.month AND ma.activity_id = iar.activity_id
    LEFT JOIN monthly_expenses_cash ec ON ma.month = ec.month AND ma.activity_id = ec.activity_id
    LEFT JOIN monthly_expenses_ap eap ON ma.month = eap.month AND ma.activity_id = eap.activity_id
    ORDER BY ma.month DESC, a.name
"#;

/// Audit log entry
#[derive(Debug, Clone, serde::Serialize)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: String,
    pub admin_email: String,
    pub action: String,
}

#[cfg(test)]
mod tests;

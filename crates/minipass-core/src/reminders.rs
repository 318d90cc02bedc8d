//! Unpaid-pass payment reminders

use chrono::{Duration, Utc};
use tracing::{info, warn};

use crate::db::Database;
use crate::error::Result;
use crate::mailer::Mailer;

/// Reminder pacing configuration, loaded from settings
#[derive(Debug, Clone)]
pub struct ReminderConfig {
    /// Unpaid passes younger than this are left alone
    pub min_age_days: i64,
    /// Minimum hours between reminders for the same pass
    pub cooldown_hours: i64,
}

impl ReminderConfig {
    pub fn from_settings(db: &Database) -> Result<Self> {
        Ok(Self {
            min_age_days: db.get_setting_i64("REMINDER_MIN_AGE_DAYS", 3)?,
            cooldown_hours: db.get_setting_i64("REMINDER_COOLDOWN_HOURS", 72)?,
        })
    }
}

/// Counts from one reminder run
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ReminderReport {
    pub considered: usize,
    pub sent: usize,
    pub skipped: usize,
}

/// Send payment reminders for overdue unpaid passes
///
/// A pass is reminded when it is older than `min_age_days` and its last
/// reminder (if any) is older than `cooldown_hours`. Send failures are
/// logged and do not stop the run.
pub fn send_unpaid_reminders(
    db: &Database,
    mailer: &Mailer,
    config: &ReminderConfig,
) -> Result<ReminderReport> {
    let mut report = ReminderReport::default();
    let cooldown = Duration::hours(config.cooldown_hours);
    let now = Utc::now();

    let overdue = db.list_overdue_passports(config.min_age_days)?;
    report.considered = overdue.len();

    for entry in overdue {
        if let Some(last) = db.last_reminder_at(entry.passport.id)? {
            if now - last < cooldown {
                report.skipped += 1;
                continue;
            }
        }

        match mailer.send_payment_reminder(db, &entry.passport) {
            Ok(()) => {
                db.log_reminder(entry.passport.id)?;
                report.sent += 1;
            }
            Err(e) => {
                warn!(
                    pass_code = %entry.passport.pass_code,
                    "Reminder email failed: {}",
                    e
                );
                report.skipped += 1;
            }
        }
    }

    info!(
        considered = report.considered,
        sent = report.sent,
        skipped = report.skipped,
        "Reminder run complete"
    );
    Ok(report)
}

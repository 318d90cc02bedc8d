//! Background schedulers for the payment bot and unpaid reminders
//!
//! Both loops are optional and configured via environment variables:
//!
//! - `MINIPASS_BOT_INTERVAL_MINUTES`: how often to poll the inbox for
//!   e-transfer notifications (0/unset disables)
//! - `MINIPASS_REMINDER_INTERVAL_HOURS`: how often to run the unpaid-pass
//!   reminder pass (0/unset disables)
//!
//! Errors inside a tick are logged and never stop the loop.

use std::time::Duration;

use tokio::time::interval;
use tracing::{error, info, warn};

use minipass_core::inbox::{ImapConfig, ImapInbox};
use minipass_core::mailer::Mailer;
use minipass_core::matching::{run_payment_bot, BotConfig};
use minipass_core::reminders::{send_unpaid_reminders, ReminderConfig};
use minipass_core::Database;

/// Scheduler configuration
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Minutes between inbox polls (0 = disabled)
    pub bot_interval_minutes: u64,
    /// Hours between reminder runs (0 = disabled)
    pub reminder_interval_hours: u64,
}

impl SchedulerConfig {
    /// Parse configuration from environment variables
    ///
    /// Returns None when neither scheduler is configured.
    pub fn from_env() -> Option<Self> {
        let bot_interval_minutes: u64 = std::env::var("MINIPASS_BOT_INTERVAL_MINUTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let reminder_interval_hours: u64 = std::env::var("MINIPASS_REMINDER_INTERVAL_HOURS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);

        if bot_interval_minutes == 0 && reminder_interval_hours == 0 {
            return None;
        }

        Some(Self {
            bot_interval_minutes,
            reminder_interval_hours,
        })
    }
}

/// Start the payment bot polling loop as a background task
pub fn start_payment_bot_scheduler(db: Database, config: SchedulerConfig) {
    if config.bot_interval_minutes == 0 {
        return;
    }

    info!(
        "Starting payment bot scheduler: every {} minute(s)",
        config.bot_interval_minutes
    );

    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(config.bot_interval_minutes * 60));

        // Skip the first immediate tick - no point polling on startup
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let db = db.clone();
            let result = tokio::task::spawn_blocking(move || run_bot_once(&db)).await;

            match result {
                Ok(Ok(Some((matched, unmatched)))) => {
                    info!(matched, unmatched, "Scheduled payment bot run complete");
                }
                Ok(Ok(None)) => {
                    // Mail not configured; stay quiet until it is
                }
                Ok(Err(e)) => {
                    error!("Scheduled payment bot run failed: {}", e);
                }
                Err(e) => {
                    error!("Payment bot task panicked: {}", e);
                }
            }
        }
    });
}

/// One scheduled bot run; None when mail is not configured
fn run_bot_once(db: &Database) -> minipass_core::Result<Option<(usize, usize)>> {
    let Some(imap_config) = ImapConfig::from_settings(db)? else {
        return Ok(None);
    };
    let bot_config = BotConfig::from_settings(db)?;
    let mailer = Mailer::from_settings(db)?;

    let mut inbox = ImapInbox::connect(&imap_config)?;
    let report = run_payment_bot(db, &mut inbox, mailer.as_ref(), &bot_config)?;
    Ok(Some((report.matched, report.unmatched)))
}

/// Start the unpaid-reminder loop as a background task
pub fn start_reminder_scheduler(db: Database, config: SchedulerConfig) {
    if config.reminder_interval_hours == 0 {
        return;
    }

    info!(
        "Starting reminder scheduler: every {} hour(s)",
        config.reminder_interval_hours
    );

    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(config.reminder_interval_hours * 3600));

        ticker.tick().await;

        loop {
            ticker.tick().await;

            let db = db.clone();
            let result = tokio::task::spawn_blocking(move || -> minipass_core::Result<_> {
                let Some(mailer) = Mailer::from_settings(&db)? else {
                    return Ok(None);
                };
                let config = ReminderConfig::from_settings(&db)?;
                let report = send_unpaid_reminders(&db, &mailer, &config)?;
                Ok(Some(report))
            })
            .await;

            match result {
                Ok(Ok(Some(report))) => {
                    info!(sent = report.sent, "Scheduled reminder run complete");
                }
                Ok(Ok(None)) => {
                    warn!("Reminder scheduler active but mail is not configured");
                }
                Ok(Err(e)) => {
                    error!("Scheduled reminder run failed: {}", e);
                }
                Err(e) => {
                    error!("Reminder task panicked: {}", e);
                }
            }
        }
    });
}

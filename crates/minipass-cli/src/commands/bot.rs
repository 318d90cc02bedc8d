//! Payment bot and reminder commands

use anyhow::{bail, Result};

use minipass_core::inbox::{ImapConfig, ImapInbox};
use minipass_core::matching::{run_payment_bot, BotConfig};
use minipass_core::reminders::{send_unpaid_reminders, ReminderConfig};
use minipass_core::{Database, Mailer};

pub fn cmd_match_payments(db: &Database) -> Result<()> {
    let Some(imap_config) = ImapConfig::from_settings(db)? else {
        bail!("Mail credentials not configured (set MAIL_USERNAME / MAIL_PASSWORD)");
    };
    let bot_config = BotConfig::from_settings(db)?;
    let mailer = Mailer::from_settings(db)?;

    println!("🔌 Connecting to {}...", imap_config.server);
    let mut inbox = ImapInbox::connect(&imap_config)?;

    let report = run_payment_bot(db, &mut inbox, mailer.as_ref(), &bot_config)?;
    db.log_audit(
        "cli",
        &format!(
            "Payment bot run: {} fetched, {} matched, {} unmatched",
            report.fetched, report.matched, report.unmatched
        ),
    )?;

    println!();
    println!("📬 Notifications fetched: {}", report.fetched);
    println!("   ✅ Matched: {}", report.matched);
    println!("   ❌ No match: {}", report.unmatched);
    println!("   ⏭️  Skipped: {}", report.skipped);
    Ok(())
}

pub fn cmd_remind(db: &Database) -> Result<()> {
    let Some(mailer) = Mailer::from_settings(db)? else {
        bail!("Mail not configured (set MAIL_USERNAME / MAIL_PASSWORD)");
    };
    let config = ReminderConfig::from_settings(db)?;

    let report = send_unpaid_reminders(db, &mailer, &config)?;
    db.log_audit("cli", &format!("Reminder run: {} sent", report.sent))?;

    println!();
    println!("📨 Overdue passes considered: {}", report.considered);
    println!("   Reminders sent: {}", report.sent);
    println!("   Skipped (cooldown/failures): {}", report.skipped);
    Ok(())
}

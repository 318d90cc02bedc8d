//! Signup commands

use anyhow::Result;

use minipass_core::models::SignupStatus;
use minipass_core::{Database, SignupFilter};

use super::truncate;

pub fn cmd_signups_list(db: &Database, status: Option<&str>, limit: i64) -> Result<()> {
    let status = status
        .map(|s| s.parse::<SignupStatus>())
        .transpose()
        .map_err(|e| anyhow::anyhow!(e))?;

    let signups = db.list_signups(&SignupFilter {
        activity_id: None,
        status,
        paid: None,
        limit: Some(limit),
    })?;

    if signups.is_empty() {
        println!("No signups found.");
        return Ok(());
    }

    println!();
    println!(
        "  {:<5} {:<22} {:<28} {:<22} {:<10} {:<6}",
        "ID", "NAME", "EMAIL", "ACTIVITY", "STATUS", "PAID"
    );
    for entry in &signups {
        println!(
            "  {:<5} {:<22} {:<28} {:<22} {:<10} {:<6}",
            entry.signup.id,
            truncate(&entry.member_name, 22),
            truncate(&entry.member_email, 28),
            truncate(&entry.activity_name, 22),
            entry.signup.status,
            if entry.signup.paid { "yes" } else { "no" }
        );
    }
    println!();
    println!("  {} signup(s)", signups.len());
    Ok(())
}

pub fn cmd_signups_approve(db: &Database, id: i64) -> Result<()> {
    let passport = db.approve_signup(id, Some("cli"))?;
    db.log_audit(
        "cli",
        &format!("Signup {} approved; passport {} issued", id, passport.pass_code),
    )?;

    println!("✅ Signup {} approved", id);
    println!("   Passport issued: {}", passport.pass_code);

    if let Ok(Some(mailer)) = minipass_core::Mailer::from_settings(db) {
        match mailer.notify_pass_created(db, &passport) {
            Ok(()) => println!("   📧 Pass email sent"),
            Err(e) => println!("   ⚠️  Pass email failed: {}", e),
        }
    }
    Ok(())
}

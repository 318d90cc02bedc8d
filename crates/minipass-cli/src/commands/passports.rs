//! Passport commands

use anyhow::Result;

use minipass_core::models::NewPassport;
use minipass_core::{Database, PassportFilter};

use super::truncate;

pub fn cmd_passports_list(
    db: &Database,
    unpaid_only: bool,
    activity_id: Option<i64>,
    limit: i64,
) -> Result<()> {
    let passports = db.list_passports(&PassportFilter {
        activity_id,
        paid: if unpaid_only { Some(false) } else { None },
        search: None,
        limit: Some(limit),
    })?;

    if passports.is_empty() {
        println!("No passports found.");
        return Ok(());
    }

    println!();
    println!(
        "  {:<5} {:<17} {:<22} {:<22} {:>8} {:>5} {:<6}",
        "ID", "CODE", "HOLDER", "ACTIVITY", "AMOUNT", "LEFT", "PAID"
    );
    for entry in &passports {
        println!(
            "  {:<5} {:<17} {:<22} {:<22} {:>8} {:>5} {:<6}",
            entry.passport.id,
            entry.passport.pass_code,
            truncate(&entry.member_name, 22),
            truncate(&entry.activity_name, 22),
            format!("${:.2}", entry.passport.sold_amt),
            entry.passport.uses_remaining,
            if entry.passport.paid { "yes" } else { "NO" }
        );
    }
    println!();
    println!("  {} passport(s)", passports.len());
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn cmd_passports_create(
    db: &Database,
    name: &str,
    email: &str,
    activity_id: i64,
    amount: f64,
    sessions: i64,
    paid: bool,
) -> Result<()> {
    let passport = db.create_passport(
        &NewPassport {
            member_name: name.to_string(),
            member_email: email.to_string(),
            member_phone: None,
            activity_id,
            passport_type_id: None,
            sold_amt: amount,
            uses_remaining: sessions,
            paid,
            notes: None,
        },
        Some("cli"),
    )?;
    db.log_audit("cli", &format!("Passport created for {}", name))?;

    println!("✅ Passport created: {}", passport.pass_code);
    println!("   Holder: {} <{}>", name, email);
    println!(
        "   ${:.2}, {} session(s), {}",
        passport.sold_amt,
        passport.uses_remaining,
        if passport.paid { "paid" } else { "UNPAID" }
    );

    if let Ok(Some(mailer)) = minipass_core::Mailer::from_settings(db) {
        match mailer.notify_pass_created(db, &passport) {
            Ok(()) => println!("   📧 Confirmation email sent"),
            Err(e) => println!("   ⚠️  Confirmation email failed: {}", e),
        }
    }

    Ok(())
}

pub fn cmd_passports_show(db: &Database, pass_code: &str) -> Result<()> {
    let history = db.get_pass_history(pass_code)?;
    let passport = &history.passport;

    println!();
    println!("🎫 Pass {}", passport.pass_code);
    println!("   Holder: {} <{}>", history.member.name, history.member.email);
    println!("   Activity: {}", history.activity_name);
    if let Some(ref type_name) = passport.passport_type_name {
        println!("   Type: {}", type_name);
    }
    println!("   Amount: ${:.2}", passport.sold_amt);
    println!("   Sessions remaining: {}", passport.uses_remaining);
    match passport.paid_date {
        Some(date) => println!("   Paid: yes ({})", date.format("%Y-%m-%d")),
        None => println!("   Paid: NO"),
    }
    println!("   Created: {}", passport.created_at.format("%Y-%m-%d"));

    if !history.redemptions.is_empty() {
        println!();
        println!("   Redemptions:");
        for redemption in &history.redemptions {
            println!(
                "   - {} {}",
                redemption.redeemed_at.format("%Y-%m-%d %H:%M"),
                redemption.redeemed_by.as_deref().unwrap_or("")
            );
        }
    }
    if history.reminders_sent > 0 {
        println!("   Reminders sent: {}", history.reminders_sent);
    }
    println!();
    Ok(())
}

pub fn cmd_passports_mark_paid(db: &Database, id: i64) -> Result<()> {
    let passport = db.mark_passport_paid(id, "cli")?;
    db.log_audit("cli", &format!("Passport marked paid: {}", passport.pass_code))?;
    println!("✅ Passport {} marked paid", passport.pass_code);

    if let Ok(Some(mailer)) = minipass_core::Mailer::from_settings(db) {
        match mailer.notify_payment_received(db, &passport) {
            Ok(()) => println!("   📧 Payment confirmation sent"),
            Err(e) => println!("   ⚠️  Payment confirmation failed: {}", e),
        }
    }
    Ok(())
}

pub fn cmd_passports_redeem(db: &Database, pass_code: &str) -> Result<()> {
    let passport = db.redeem_passport(pass_code, Some("cli"))?;
    println!(
        "✅ Pass {} redeemed; {} session(s) remaining",
        passport.pass_code, passport.uses_remaining
    );
    Ok(())
}

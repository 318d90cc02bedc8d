//! Admin account commands

use std::io::Write;

use anyhow::{bail, Result};

use minipass_core::Database;

pub fn cmd_admin_add(
    db: &Database,
    email: &str,
    name: Option<&str>,
    password: Option<&str>,
) -> Result<()> {
    let password = match password {
        Some(password) => password.to_string(),
        None => match std::env::var("MINIPASS_ADMIN_PASSWORD") {
            Ok(password) => password,
            Err(_) => prompt_password()?,
        },
    };

    if password.trim().is_empty() {
        bail!("Password cannot be empty");
    }

    let id = db.create_admin(email, password.trim(), name)?;
    db.log_audit(email, "Admin account created via CLI")?;

    println!("✅ Admin {} created (id {})", email, id);
    Ok(())
}

/// Read a password from stdin
///
/// Note: input is echoed. Use --password or MINIPASS_ADMIN_PASSWORD in
/// scripted contexts.
fn prompt_password() -> Result<String> {
    print!("Password (min 8 chars): ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

pub fn cmd_admin_list(db: &Database) -> Result<()> {
    let admins = db.list_admins()?;

    if admins.is_empty() {
        println!("No admin accounts. Create one with `minipass admin add you@example.com`");
        return Ok(());
    }

    println!();
    println!("  {:<5} {:<35} {:<20} CREATED", "ID", "EMAIL", "NAME");
    for admin in admins {
        println!(
            "  {:<5} {:<35} {:<20} {}",
            admin.id,
            admin.email,
            admin.name.as_deref().unwrap_or("-"),
            admin.created_at.format("%Y-%m-%d")
        );
    }
    println!();
    Ok(())
}

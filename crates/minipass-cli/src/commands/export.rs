//! Export, backup, and restore commands

use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};

use minipass_core::export::{
    export_passports_csv, export_signups_csv, restore_backup_gz, write_backup_gz,
};
use minipass_core::{Database, PassportFilter, SignupFilter};

use super::open_db;

fn write_or_print(content: &str, output: Option<&str>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write {}", path))?;
            println!("✅ Written to {}", path);
        }
        None => print!("{}", content),
    }
    Ok(())
}

pub fn cmd_export_passports(db: &Database, output: Option<&str>) -> Result<()> {
    let csv = export_passports_csv(
        db,
        &PassportFilter {
            limit: Some(i64::MAX),
            ..Default::default()
        },
    )?;
    write_or_print(&csv, output)
}

pub fn cmd_export_signups(db: &Database, output: Option<&str>) -> Result<()> {
    let csv = export_signups_csv(
        db,
        &SignupFilter {
            limit: Some(i64::MAX),
            ..Default::default()
        },
    )?;
    write_or_print(&csv, output)
}

pub fn cmd_export_full(db: &Database, output: &str) -> Result<()> {
    let info = write_backup_gz(db, Path::new(output))?;
    db.log_audit("cli", &format!("Backup written to {}", info.path))?;

    println!("✅ Backup written: {}", info.path);
    println!("   {} row(s), {} bytes", info.row_count, info.size_bytes);
    println!("   SHA-256: {}", info.checksum);
    Ok(())
}

pub fn cmd_restore(
    db_path: &str,
    file: &str,
    clear: bool,
    yes: bool,
    no_encrypt: bool,
) -> Result<()> {
    if !Path::new(file).exists() {
        bail!("Backup file not found: {}", file);
    }

    if clear && !yes {
        print!(
            "⚠️  This will ERASE all data in {} before restoring. Continue? [y/N] ",
            db_path
        );
        std::io::stdout().flush()?;
        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
        if !line.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    let db = open_db(db_path, no_encrypt)?;
    let stats = restore_backup_gz(&db, Path::new(file), clear)?;
    db.log_audit("cli", &format!("Backup restored from {}", file))?;

    println!(
        "✅ Restored {} row(s) across {} table(s)",
        stats.rows, stats.tables
    );
    Ok(())
}

//! Core commands (init, status, serve) and shared utilities

use anyhow::{Context, Result};

use minipass_core::db::{Database, DB_KEY_ENV};
use minipass_core::PassportFilter;

/// Open the database, honoring the encryption flag
pub fn open_db(db_path: &str, no_encrypt: bool) -> Result<Database> {
    let db = if no_encrypt {
        Database::new_unencrypted(db_path)
    } else {
        Database::new(db_path)
    };
    db.with_context(|| format!("Failed to open database at {}", db_path))
}

pub fn cmd_init(db_path: &str, no_encrypt: bool) -> Result<()> {
    let db = open_db(db_path, no_encrypt)?;

    println!();
    println!("✅ Database initialized at {}", db.path());
    if no_encrypt {
        println!("   ⚠️  Encryption disabled; use {} for production", DB_KEY_ENV);
    }
    if db.count_admins()? == 0 {
        println!("   Next: create an admin with `minipass admin add you@example.com`");
    }
    println!();
    Ok(())
}

pub fn cmd_status(db_path: &str, no_encrypt: bool) -> Result<()> {
    use std::fs;

    println!();
    println!("📊 Minipass Status");
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Database: {}", db_path);

    let path = std::path::Path::new(db_path);
    if path.exists() {
        if let Ok(metadata) = fs::metadata(path) {
            let size_kb = metadata.len() as f64 / 1024.0;
            if size_kb < 1024.0 {
                println!("   Size: {:.1} KB", size_kb);
            } else {
                println!("   Size: {:.1} MB", size_kb / 1024.0);
            }
        }
    } else {
        println!("   Size: (database not initialized)");
    }

    let has_key = std::env::var(DB_KEY_ENV).is_ok();
    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else if has_key {
        println!("   🔒 Encryption: ENABLED ({}=***)", DB_KEY_ENV);
    } else {
        println!("   ❌ Encryption: REQUIRED but {} not set", DB_KEY_ENV);
    }

    if path.exists() {
        match open_db(db_path, no_encrypt) {
            Ok(db) => {
                let kpis = db.global_kpis()?;
                let unpaid = db
                    .list_passports(&PassportFilter {
                        paid: Some(false),
                        ..Default::default()
                    })?
                    .len();
                println!();
                println!("   Activities: {}", kpis.activity_count);
                println!("   Members: {}", kpis.member_count);
                println!("   Active passes: {}", kpis.active_passport_count);
                println!("   Unpaid passes: {} (${:.2})", unpaid, kpis.unpaid_amount);
                println!("   Revenue to date: ${:.2}", kpis.total_revenue);
            }
            Err(e) => {
                println!();
                println!("   ❌ Error opening database: {}", e);
                if !no_encrypt && !has_key {
                    println!("      Set {} or use --no-encrypt", DB_KEY_ENV);
                }
            }
        }
    }

    println!();
    Ok(())
}

pub async fn cmd_serve(
    db_path: &str,
    host: &str,
    port: u16,
    no_auth: bool,
    no_encrypt: bool,
    static_dir: Option<&str>,
) -> Result<()> {
    let db = open_db(db_path, no_encrypt)?;

    let config = minipass_server::ServerConfig {
        require_auth: !no_auth,
        allowed_origins: std::env::var("MINIPASS_ALLOWED_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default(),
        api_keys: std::env::var("MINIPASS_API_KEYS")
            .map(|s| {
                s.split(',')
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty())
                    .collect()
            })
            .unwrap_or_default(),
    };

    minipass_server::serve_with_config(db, host, port, static_dir, config).await
}

//! Minipass CLI - activity pass manager
//!
//! Usage:
//!   minipass init                    Initialize database
//!   minipass admin add EMAIL         Create an admin account
//!   minipass serve --port 8080       Start web server
//!   minipass match-payments          Poll the inbox and match payments
//!   minipass report summary          Monthly financial summary

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Serve {
            port,
            host,
            no_auth,
            static_dir,
        } => {
            commands::cmd_serve(
                &cli.db,
                &host,
                port,
                no_auth,
                cli.no_encrypt,
                static_dir.as_deref(),
            )
            .await
        }
        Commands::Status => commands::cmd_status(&cli.db, cli.no_encrypt),
        Commands::Admin { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                AdminAction::Add {
                    email,
                    name,
                    password,
                } => commands::cmd_admin_add(&db, &email, name.as_deref(), password.as_deref()),
                AdminAction::List => commands::cmd_admin_list(&db),
            }
        }
        Commands::Activities => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_activities_list(&db)
        }
        Commands::Passports { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None => commands::cmd_passports_list(&db, false, None, 50),
                Some(PassportsAction::List {
                    unpaid,
                    activity,
                    limit,
                }) => commands::cmd_passports_list(&db, unpaid, activity, limit),
                Some(PassportsAction::Create {
                    name,
                    email,
                    activity,
                    amount,
                    sessions,
                    paid,
                }) => commands::cmd_passports_create(
                    &db, &name, &email, activity, amount, sessions, paid,
                ),
                Some(PassportsAction::Show { pass_code }) => {
                    commands::cmd_passports_show(&db, &pass_code)
                }
                Some(PassportsAction::MarkPaid { id }) => {
                    commands::cmd_passports_mark_paid(&db, id)
                }
                Some(PassportsAction::Redeem { pass_code }) => {
                    commands::cmd_passports_redeem(&db, &pass_code)
                }
            }
        }
        Commands::Signups { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None => commands::cmd_signups_list(&db, None, 50),
                Some(SignupsAction::List { status, limit }) => {
                    commands::cmd_signups_list(&db, status.as_deref(), limit)
                }
                Some(SignupsAction::Approve { id }) => commands::cmd_signups_approve(&db, id),
            }
        }
        Commands::MatchPayments => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_match_payments(&db)
        }
        Commands::Remind => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_remind(&db)
        }
        Commands::Report { report_type } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match report_type {
                ReportType::Summary { activity, year } => {
                    commands::cmd_report_summary(&db, activity, year)
                }
                ReportType::Kpis { activity, period } => {
                    commands::cmd_report_kpis(&db, activity, period)
                }
            }
        }
        Commands::Chat { question } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_chat(&db, &question).await
        }
        Commands::Export { export_type } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match export_type {
                ExportType::Passports { output } => {
                    commands::cmd_export_passports(&db, output.as_deref())
                }
                ExportType::Signups { output } => {
                    commands::cmd_export_signups(&db, output.as_deref())
                }
                ExportType::Full { output } => commands::cmd_export_full(&db, &output),
            }
        }
        Commands::Restore { file, clear, yes } => {
            commands::cmd_restore(&cli.db, &file, clear, yes, cli.no_encrypt)
        }
    }
}

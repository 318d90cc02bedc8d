//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - init, status, serve and the shared open_db helper
//! - `admin` - Admin account management
//! - `activities` - Activity listing
//! - `passports` - Passport commands (list, create, show, mark-paid, redeem)
//! - `signups` - Signup commands (list, approve)
//! - `bot` - Payment bot and reminder runs
//! - `reports` - Financial summary and KPI reports
//! - `chat` - Analytics chatbot
//! - `export` - CSV exports, full backup, restore

pub mod activities;
pub mod admin;
pub mod bot;
pub mod chat;
pub mod core;
pub mod export;
pub mod passports;
pub mod reports;
pub mod signups;

// Re-export command functions for main.rs
pub use activities::*;
pub use admin::*;
pub use bot::*;
pub use chat::*;
pub use core::*;
pub use export::*;
pub use passports::*;
pub use reports::*;
pub use signups::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}...", &s[..max.saturating_sub(3)])
    }
}

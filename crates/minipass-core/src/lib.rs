//! Minipass Core Library
//!
//! Shared functionality for the Minipass activity pass manager:
//! - Database access and migrations (including the monthly financial summary view)
//! - Interac e-transfer notification parsing and fuzzy payment matching
//! - IMAP inbox abstraction for the payment bot
//! - SMTP mailer with templated emails and inline QR codes
//! - Email template library with embedded defaults and per-install overrides
//! - Unpaid-pass payment reminders
//! - Activity dashboard KPI aggregation
//! - Pluggable local AI backend (Ollama) for the analytics chatbot
//! - Chat query engine with language detection, semantic glossary, and SQL guard
//! - CSV exports and gzipped full backups

pub mod ai;
pub mod chat;
pub mod db;
pub mod error;
pub mod etransfer;
pub mod export;
pub mod inbox;
pub mod mailer;
pub mod matching;
pub mod models;
pub mod qr;
pub mod reminders;
pub mod templates;

pub use ai::{AiBackend, AiClient, MockBackend, OllamaBackend};
pub use chat::{ChatAnswer, ChatEngine};
pub use db::{AuditEntry, Database, PassportFilter, SignupFilter};
pub use error::{Error, Result};
pub use etransfer::{parse_transfer, ParsedTransfer, TransferFilter};
pub use export::{BackupInfo, FullBackup, RestoreStats};
pub use inbox::{ImapConfig, ImapInbox, Inbox, InboxMessage};
pub use mailer::{Mailer, MailerConfig};
pub use matching::{run_payment_bot, BotConfig, MatchingReport};
pub use reminders::{send_unpaid_reminders, ReminderConfig, ReminderReport};
pub use templates::{EmailTemplate, TemplateId, TemplateLibrary};

//! Error types for Minipass

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Email error: {0}")]
    Email(String),

    #[error("Inbox error: {0}")]
    Inbox(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Chat error: {0}")]
    Chat(String),

    #[error("Blocked query: {0}")]
    BlockedQuery(String),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Backup error: {0}")]
    Backup(String),

    #[error("QR code error: {0}")]
    Qr(String),
}

pub type Result<T> = std::result::Result<T, Error>;

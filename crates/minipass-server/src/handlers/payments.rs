//! Payment bot, email, and reminder handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;

use minipass_core::inbox::{ImapConfig, ImapInbox};
use minipass_core::matching::{run_payment_bot as run_bot, BotConfig, MatchingReport};
use minipass_core::models::{EbankPayment, EmailLogEntry};
use minipass_core::reminders::{send_unpaid_reminders, ReminderConfig, ReminderReport};

use crate::{get_admin_email, AppError, AppState, SuccessResponse};

/// POST /api/payment-bot/run - Poll the inbox and match payments once
///
/// The IMAP session is blocking; the whole run happens on a blocking thread.
pub async fn run_payment_bot(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<MatchingReport>, AppError> {
    let admin_email = get_admin_email(&state, &headers);

    let imap_config = ImapConfig::from_settings(&state.db)?.ok_or_else(|| {
        AppError::service_unavailable(
            "Mail credentials not configured (MAIL_USERNAME / MAIL_PASSWORD)",
        )
    })?;
    let bot_config = BotConfig::from_settings(&state.db)?;

    let db = state.db.clone();
    let mailer = state.mailer();
    let report = tokio::task::spawn_blocking(move || {
        let mut inbox = ImapInbox::connect(&imap_config)?;
        run_bot(&db, &mut inbox, mailer.as_ref(), &bot_config)
    })
    .await
    .map_err(|e| AppError::internal(&format!("Bot task panicked: {}", e)))??;

    state.db.log_audit(
        &admin_email,
        &format!(
            "Payment bot run: {} fetched, {} matched, {} unmatched",
            report.fetched, report.matched, report.unmatched
        ),
    )?;

    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<i64>,
}

/// GET /api/payment-bot/logs - Recent payment log entries
pub async fn get_payment_bot_logs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LogsQuery>,
) -> Result<Json<Vec<EbankPayment>>, AppError> {
    let limit = params.limit.unwrap_or(50).clamp(1, crate::MAX_PAGE_LIMIT);
    Ok(Json(state.db.list_ebank_payments(limit)?))
}

/// Settings keys the payment bot page exposes
const BOT_SETTING_KEYS: &[(&str, &str)] = &[
    ("BANK_EMAIL_SUBJECT", "Virement Interac :"),
    ("BANK_EMAIL_FROM", "notify@payments.interac.ca"),
    ("BANK_EMAIL_NAME_CONFIDENCE", "85"),
    ("IMAP_SERVER", ""),
    ("PROCESSED_FOLDER", "PaymentProcessed"),
];

/// GET /api/payment-bot/settings - Bot configuration
pub async fn get_payment_bot_settings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut settings = serde_json::Map::new();
    for (key, default) in BOT_SETTING_KEYS {
        settings.insert(
            key.to_string(),
            serde_json::Value::from(state.db.get_setting(key, default)?),
        );
    }
    Ok(Json(serde_json::Value::Object(settings)))
}

/// PUT /api/payment-bot/settings - Update bot configuration
pub async fn update_payment_bot_settings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<serde_json::Map<String, serde_json::Value>>,
) -> Result<Json<SuccessResponse>, AppError> {
    for (key, _) in BOT_SETTING_KEYS {
        if let Some(value) = payload.get(*key).and_then(|v| v.as_str()) {
            state.db.save_setting(key, value)?;
        }
    }

    let admin_email = get_admin_email(&state, &headers);
    state
        .db
        .log_audit(&admin_email, "Payment bot settings updated")?;

    Ok(Json(SuccessResponse { success: true }))
}

#[derive(Debug, Deserialize)]
pub struct TestEmailRequest {
    pub to: String,
}

/// POST /api/email/test - Send a test message to verify SMTP settings
pub async fn send_test_email(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TestEmailRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    let mailer = state
        .mailer()
        .ok_or_else(|| AppError::service_unavailable("Mail is not configured"))?;

    let db = state.db.clone();
    tokio::task::spawn_blocking(move || mailer.send_test(&db, &payload.to))
        .await
        .map_err(|e| AppError::internal(&format!("Mail task panicked: {}", e)))??;

    Ok(Json(SuccessResponse { success: true }))
}

/// POST /api/email/retry-failed - Re-send recent FAILED emails
pub async fn retry_failed_emails(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    let mailer = state
        .mailer()
        .ok_or_else(|| AppError::service_unavailable("Mail is not configured"))?;

    let db = state.db.clone();
    let retried = tokio::task::spawn_blocking(move || mailer.retry_failed(&db, 50))
        .await
        .map_err(|e| AppError::internal(&format!("Mail task panicked: {}", e)))??;

    let admin_email = get_admin_email(&state, &headers);
    state.db.log_audit(
        &admin_email,
        &format!("Retried {} failed email(s)", retried),
    )?;

    Ok(Json(serde_json::json!({ "retried": retried })))
}

/// GET /api/email/log - Recent email log entries
pub async fn get_email_log(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LogsQuery>,
) -> Result<Json<Vec<EmailLogEntry>>, AppError> {
    let limit = params.limit.unwrap_or(50).clamp(1, crate::MAX_PAGE_LIMIT);
    Ok(Json(state.db.list_email_log(limit)?))
}

/// POST /api/reminders/run - Send unpaid-pass reminders now
pub async fn run_reminders(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ReminderReport>, AppError> {
    let mailer = state
        .mailer()
        .ok_or_else(|| AppError::service_unavailable("Mail is not configured"))?;
    let config = ReminderConfig::from_settings(&state.db)?;

    let db = state.db.clone();
    let report = tokio::task::spawn_blocking(move || send_unpaid_reminders(&db, &mailer, &config))
        .await
        .map_err(|e| AppError::internal(&format!("Reminder task panicked: {}", e)))??;

    let admin_email = get_admin_email(&state, &headers);
    state.db.log_audit(
        &admin_email,
        &format!("Reminder run: {} sent", report.sent),
    )?;

    Ok(Json(report))
}

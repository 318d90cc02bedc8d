//! Settings, audit log, backup, and data-erase handlers

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use minipass_core::export;
use minipass_core::AuditEntry;

use crate::{get_admin_email, AppError, AppState, SuccessResponse};

/// Setting keys whose values are never echoed back to the client
const SECRET_KEYS: &[&str] = &["MAIL_PASSWORD"];

/// GET /api/settings - All stored settings (secrets redacted)
pub async fn list_settings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BTreeMap<String, String>>, AppError> {
    let mut settings = state.db.list_settings()?;
    for key in SECRET_KEYS {
        if settings.contains_key(*key) {
            settings.insert(key.to_string(), "********".to_string());
        }
    }
    Ok(Json(settings))
}

/// PUT /api/settings - Save settings (string values only; empty deletes)
pub async fn save_settings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<BTreeMap<String, String>>,
) -> Result<Json<SuccessResponse>, AppError> {
    for (key, value) in &payload {
        // The redaction placeholder must never overwrite a stored secret
        if SECRET_KEYS.contains(&key.as_str()) && value == "********" {
            continue;
        }
        state.db.save_setting(key, value)?;
    }

    let admin_email = get_admin_email(&state, &headers);
    state.db.log_audit(
        &admin_email,
        &format!("Settings updated ({} key(s))", payload.len()),
    )?;

    Ok(Json(SuccessResponse { success: true }))
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<i64>,
}

/// GET /api/audit - Recent admin actions
pub async fn get_audit_log(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuditQuery>,
) -> Result<Json<Vec<AuditEntry>>, AppError> {
    let limit = params.limit.unwrap_or(100).clamp(1, crate::MAX_PAGE_LIMIT);
    Ok(Json(state.db.list_audit_log(limit)?))
}

/// GET /api/backup - Download a gzipped full backup
pub async fn download_backup(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let bytes = export::backup_to_gz_bytes(&state.db)?;

    let admin_email = get_admin_email(&state, &headers);
    state.db.log_audit(&admin_email, "Backup downloaded")?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/gzip"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"minipass-backup.json.gz\"",
            ),
        ],
        bytes,
    ))
}

#[derive(Debug, Deserialize)]
pub struct EraseRequest {
    /// Must be the literal string "ERASE" to proceed
    pub confirm: String,
}

/// POST /api/erase-app-data - Clear all operational data
///
/// Admin accounts and settings survive. Requires an explicit confirmation
/// token in the body.
pub async fn erase_app_data(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<EraseRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    if payload.confirm != "ERASE" {
        return Err(AppError::bad_request(
            "Confirmation required: send {\"confirm\": \"ERASE\"}",
        ));
    }

    let admin_email = get_admin_email(&state, &headers);
    state.db.erase_app_data()?;
    state.db.log_audit(&admin_email, "Application data erased")?;

    Ok(Json(SuccessResponse { success: true }))
}

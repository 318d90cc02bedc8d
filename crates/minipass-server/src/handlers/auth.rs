//! Login, logout, and identity handlers

use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use minipass_core::models::Admin;

use crate::{bearer_token, get_admin_email, AppError, AppState, SuccessResponse};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub admin: Admin,
}

/// POST /api/login - Authenticate and open a session
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let admin = state
        .db
        .verify_admin_login(&payload.email, &payload.password)?;

    let Some(admin) = admin else {
        warn!(email = %payload.email, "Failed login attempt");
        return Err(AppError::unauthorized("Invalid email or password"));
    };

    let token = state.db.create_session(admin.id)?;
    state
        .db
        .log_audit(&admin.email, "Logged in")?;
    info!(email = %admin.email, "Admin logged in");

    Ok(Json(LoginResponse { token, admin }))
}

/// POST /api/logout - Close the current session
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SuccessResponse>, AppError> {
    if let Some(token) = bearer_token(&headers) {
        let admin_email = get_admin_email(&state, &headers);
        state.db.delete_session(token)?;
        state.db.log_audit(&admin_email, "Logged out")?;
    }
    Ok(Json(SuccessResponse { success: true }))
}

/// GET /api/me - Current admin identity
pub async fn me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    let email = get_admin_email(&state, &headers);
    Ok(Json(serde_json::json!({ "email": email })))
}

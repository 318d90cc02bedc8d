//! Signup handlers: public form, listing, approval workflow

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use minipass_core::db::SignupFilter;
use minipass_core::export;
use minipass_core::models::{
    Activity, NewSignup, Passport, PassportType, Signup, SignupStatus, SignupWithMember,
};

use crate::{get_admin_email, AppError, AppState, SuccessResponse, MAX_PAGE_LIMIT};

/// Public info for rendering a signup form
#[derive(Debug, Serialize)]
pub struct SignupInfoResponse {
    pub activity: Activity,
    pub passport_types: Vec<PassportType>,
}

/// GET /api/activities/:id/signup-info - Public signup form data
pub async fn get_signup_info(
    State(state): State<Arc<AppState>>,
    Path(activity_id): Path<i64>,
) -> Result<Json<SignupInfoResponse>, AppError> {
    let activity = state.db.get_activity(activity_id)?;
    let passport_types = state.db.list_passport_types(activity_id, true)?;
    Ok(Json(SignupInfoResponse {
        activity,
        passport_types,
    }))
}

/// POST /api/activities/:id/signup - Public signup submission
///
/// Sends the acknowledgement email when mail is configured.
pub async fn create_signup(
    State(state): State<Arc<AppState>>,
    Path(activity_id): Path<i64>,
    Json(payload): Json<NewSignup>,
) -> Result<Json<Signup>, AppError> {
    let signup = state.db.create_signup(activity_id, &payload)?;

    if let Some(mailer) = state.mailer() {
        // Delivery happens off the request path; failures land in email_logs
        let db = state.db.clone();
        let signup_id = signup.id;
        tokio::task::spawn_blocking(move || {
            if let Err(e) = mailer.notify_signup_received(&db, signup_id) {
                warn!(signup_id, "Signup email failed: {}", e);
            }
        });
    }

    Ok(Json(signup))
}

#[derive(Debug, Deserialize)]
pub struct ListSignupsQuery {
    pub activity_id: Option<i64>,
    pub status: Option<String>,
    pub paid: Option<bool>,
    pub limit: Option<i64>,
}

impl ListSignupsQuery {
    fn into_filter(self) -> Result<SignupFilter, AppError> {
        let status = self
            .status
            .as_deref()
            .map(|s| s.parse::<SignupStatus>())
            .transpose()
            .map_err(|e| AppError::bad_request(&e))?;
        Ok(SignupFilter {
            activity_id: self.activity_id,
            status,
            paid: self.paid,
            limit: Some(self.limit.unwrap_or(200).clamp(1, MAX_PAGE_LIMIT)),
        })
    }
}

/// GET /api/signups - List signups
pub async fn list_signups(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListSignupsQuery>,
) -> Result<Json<Vec<SignupWithMember>>, AppError> {
    Ok(Json(state.db.list_signups(&params.into_filter()?)?))
}

/// GET /api/signups/:id - Get one signup
pub async fn get_signup(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Signup>, AppError> {
    Ok(Json(state.db.get_signup(id)?))
}

#[derive(Debug, Deserialize)]
pub struct UpdateSignupStatusRequest {
    pub status: String,
}

/// POST /api/signups/:id/status - Update a signup's status
pub async fn update_signup_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(payload): Json<UpdateSignupStatusRequest>,
) -> Result<Json<Signup>, AppError> {
    let status: SignupStatus = payload
        .status
        .parse()
        .map_err(|e: String| AppError::bad_request(&e))?;
    state.db.update_signup_status(id, status)?;

    let admin_email = get_admin_email(&state, &headers);
    state.db.log_audit(
        &admin_email,
        &format!("Signup {} status set to {}", id, status),
    )?;

    Ok(Json(state.db.get_signup(id)?))
}

/// POST /api/signups/:id/mark-paid - Mark a signup paid
pub async fn mark_signup_paid(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Signup>, AppError> {
    state.db.mark_signup_paid(id)?;
    let signup = state.db.get_signup(id)?;

    // When a pass was already issued from this signup, mark it too
    if let Some(passport_id) = signup.passport_id {
        let admin_email = get_admin_email(&state, &headers);
        match state.db.mark_passport_paid(passport_id, &admin_email) {
            Ok(passport) => {
                if let Some(mailer) = state.mailer() {
                    let db = state.db.clone();
                    tokio::task::spawn_blocking(move || {
                        if let Err(e) = mailer.notify_payment_received(&db, &passport) {
                            warn!(pass_code = %passport.pass_code, "Payment email failed: {}", e);
                        }
                    });
                }
            }
            Err(minipass_core::Error::Conflict(_)) => {} // already paid
            Err(e) => return Err(e.into()),
        }
    }

    let admin_email = get_admin_email(&state, &headers);
    state
        .db
        .log_audit(&admin_email, &format!("Signup {} marked paid", id))?;

    Ok(Json(state.db.get_signup(id)?))
}

/// POST /api/signups/:id/approve - Approve a signup and issue a passport
///
/// Sends the pass-created email when mail is configured.
pub async fn approve_signup(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Passport>, AppError> {
    let admin_email = get_admin_email(&state, &headers);
    let passport = state.db.approve_signup(id, Some(&admin_email))?;

    state.db.log_audit(
        &admin_email,
        &format!(
            "Signup {} approved; passport {} issued",
            id, passport.pass_code
        ),
    )?;

    if let Some(mailer) = state.mailer() {
        let db = state.db.clone();
        let passport = passport.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(e) = mailer.notify_pass_created(&db, &passport) {
                warn!(pass_code = %passport.pass_code, "Confirmation email failed: {}", e);
            }
        });
    }

    Ok(Json(passport))
}

/// GET /api/signups/export - Export signups as CSV
pub async fn export_signups(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListSignupsQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let mut filter = params.into_filter()?;
    filter.limit = Some(i64::MAX);
    let csv = export::export_signups_csv(&state.db, &filter)?;

    let admin_email = get_admin_email(&state, &headers);
    state.db.log_audit(&admin_email, "Signups exported")?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"signups.csv\"",
            ),
        ],
        csv,
    ))
}

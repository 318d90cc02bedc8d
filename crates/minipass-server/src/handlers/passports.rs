//! Passport handlers: CRUD, payment marking, redemption, public pass view

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use minipass_core::db::PassportFilter;
use minipass_core::models::{NewPassport, PassHistory, Passport, PassportWithMember};
use minipass_core::{export, qr};

use crate::{get_admin_email, AppError, AppState, MAX_PAGE_LIMIT};

#[derive(Debug, Deserialize)]
pub struct ListPassportsQuery {
    pub activity_id: Option<i64>,
    pub paid: Option<bool>,
    /// Holder name, email, or pass code substring
    pub search: Option<String>,
    pub limit: Option<i64>,
}

impl ListPassportsQuery {
    fn into_filter(self) -> PassportFilter {
        PassportFilter {
            activity_id: self.activity_id,
            paid: self.paid,
            search: self.search,
            limit: Some(self.limit.unwrap_or(200).clamp(1, MAX_PAGE_LIMIT)),
        }
    }
}

/// GET /api/passports - List passports
pub async fn list_passports(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListPassportsQuery>,
) -> Result<Json<Vec<PassportWithMember>>, AppError> {
    Ok(Json(state.db.list_passports(&params.into_filter())?))
}

/// POST /api/passports - Create a passport
///
/// Sends the pass-created email (with QR) when mail is configured; the
/// passport is created regardless of delivery outcome.
pub async fn create_passport(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<NewPassport>,
) -> Result<Json<Passport>, AppError> {
    let admin_email = get_admin_email(&state, &headers);
    let passport = state.db.create_passport(&payload, Some(&admin_email))?;

    let activity = state.db.get_activity(passport.activity_id)?;
    state.db.log_audit(
        &admin_email,
        &format!(
            "Passport created for {} for activity '{}'",
            payload.member_name, activity.name
        ),
    )?;

    if let Some(mailer) = state.mailer() {
        // Delivery happens off the request path; failures land in email_logs
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

/// GET /api/passports/:id - Get one passport
pub async fn get_passport(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Passport>, AppError> {
    Ok(Json(state.db.get_passport(id)?))
}

#[derive(Debug, Deserialize)]
pub struct UpdatePassportRequest {
    pub sold_amt: f64,
    pub uses_remaining: i64,
    pub notes: Option<String>,
}

/// PUT /api/passports/:id - Update a passport's editable fields
pub async fn update_passport(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(payload): Json<UpdatePassportRequest>,
) -> Result<Json<Passport>, AppError> {
    state.db.update_passport(
        id,
        payload.sold_amt,
        payload.uses_remaining,
        payload.notes.as_deref(),
    )?;
    let passport = state.db.get_passport(id)?;

    let admin_email = get_admin_email(&state, &headers);
    state.db.log_audit(
        &admin_email,
        &format!("Passport updated: {}", passport.pass_code),
    )?;

    Ok(Json(passport))
}

/// POST /api/passports/:id/mark-paid - Mark a passport paid
///
/// Sends the payment-received email when mail is configured.
pub async fn mark_passport_paid(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Passport>, AppError> {
    let admin_email = get_admin_email(&state, &headers);
    let passport = state.db.mark_passport_paid(id, &admin_email)?;

    state.db.log_audit(
        &admin_email,
        &format!("Passport marked paid: {}", passport.pass_code),
    )?;

    if let Some(mailer) = state.mailer() {
        let db = state.db.clone();
        let passport = passport.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(e) = mailer.notify_payment_received(&db, &passport) {
                warn!(pass_code = %passport.pass_code, "Payment email failed: {}", e);
            }
        });
    }

    Ok(Json(passport))
}

/// POST /api/pass/:code/redeem - Redeem one session of a pass
pub async fn redeem_pass(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Passport>, AppError> {
    let admin_email = get_admin_email(&state, &headers);
    let passport = state.db.redeem_passport(&code, Some(&admin_email))?;

    state.db.log_audit(
        &admin_email,
        &format!(
            "Pass redeemed: {} ({} sessions left)",
            passport.pass_code, passport.uses_remaining
        ),
    )?;

    Ok(Json(passport))
}

/// GET /api/pass/:code/history - Full history of a pass
pub async fn get_pass_history(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<PassHistory>, AppError> {
    Ok(Json(state.db.get_pass_history(&code)?))
}

/// Public pass payload: holder-visible fields plus the check-in QR
#[derive(Debug, Serialize)]
pub struct PublicPassResponse {
    pub pass_code: String,
    pub holder_name: String,
    pub activity_name: String,
    pub passport_type_name: Option<String>,
    pub uses_remaining: i64,
    pub paid: bool,
    pub qr_svg: String,
}

/// GET /api/pass/:code - Public pass view (what the QR link opens)
pub async fn get_pass_public(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<PublicPassResponse>, AppError> {
    let passport = state.db.get_passport_by_code(&code)?;
    let member = state.db.get_member(passport.member_id)?;
    let activity = state.db.get_activity(passport.activity_id)?;

    let base_url = state
        .db
        .get_setting("APP_BASE_URL", "http://localhost:8080")?;
    let qr_svg = qr::pass_qr_svg(&base_url, &passport.pass_code)?;

    Ok(Json(PublicPassResponse {
        pass_code: passport.pass_code,
        holder_name: member.name,
        activity_name: activity.name,
        passport_type_name: passport.passport_type_name,
        uses_remaining: passport.uses_remaining,
        paid: passport.paid,
        qr_svg,
    }))
}

/// GET /api/passports/export - Export passports as CSV
pub async fn export_passports(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListPassportsQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let mut filter = params.into_filter();
    filter.limit = Some(i64::MAX);
    let csv = export::export_passports_csv(&state.db, &filter)?;

    let admin_email = get_admin_email(&state, &headers);
    state.db.log_audit(&admin_email, "Passports exported")?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"passports.csv\"",
            ),
        ],
        csv,
    ))
}

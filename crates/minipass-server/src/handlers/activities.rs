//! Activity and passport type handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;

use minipass_core::models::{
    Activity, ActivityStatus, NewActivity, NewPassportType, PassportType,
    PassportTypeDependencies,
};

use crate::{get_admin_email, AppError, AppState, SuccessResponse};

#[derive(Debug, Deserialize)]
pub struct ListActivitiesQuery {
    /// Filter by status (active, archived)
    pub status: Option<String>,
}

/// GET /api/activities - List activities
pub async fn list_activities(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListActivitiesQuery>,
) -> Result<Json<Vec<Activity>>, AppError> {
    let status = params
        .status
        .as_deref()
        .map(|s| s.parse::<ActivityStatus>())
        .transpose()
        .map_err(|e| AppError::bad_request(&e))?;

    Ok(Json(state.db.list_activities(status)?))
}

/// POST /api/activities - Create an activity
pub async fn create_activity(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<NewActivity>,
) -> Result<Json<Activity>, AppError> {
    let admin_email = get_admin_email(&state, &headers);
    let id = state.db.create_activity(&payload, Some(&admin_email))?;
    let activity = state.db.get_activity(id)?;

    state.db.log_audit(
        &admin_email,
        &format!("Activity created: {}", activity.name),
    )?;

    Ok(Json(activity))
}

/// GET /api/activities/:id - Get one activity
pub async fn get_activity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Activity>, AppError> {
    Ok(Json(state.db.get_activity(id)?))
}

/// PUT /api/activities/:id - Update an activity
pub async fn update_activity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(payload): Json<NewActivity>,
) -> Result<Json<Activity>, AppError> {
    state.db.update_activity(id, &payload)?;
    let activity = state.db.get_activity(id)?;

    let admin_email = get_admin_email(&state, &headers);
    state.db.log_audit(
        &admin_email,
        &format!("Activity updated: {}", activity.name),
    )?;

    Ok(Json(activity))
}

/// DELETE /api/activities/:id - Delete an activity
///
/// Refused (409) while passports or signups reference it.
pub async fn delete_activity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<SuccessResponse>, AppError> {
    let activity = state.db.get_activity(id)?;
    state.db.delete_activity(id)?;

    let admin_email = get_admin_email(&state, &headers);
    state.db.log_audit(
        &admin_email,
        &format!("Activity deleted: {}", activity.name),
    )?;

    Ok(Json(SuccessResponse { success: true }))
}

#[derive(Debug, Deserialize)]
pub struct ListPassportTypesQuery {
    /// Hide archived offerings (used by signup forms)
    pub active_only: Option<bool>,
}

/// GET /api/activities/:id/passport-types - List an activity's passport types
pub async fn list_passport_types(
    State(state): State<Arc<AppState>>,
    Path(activity_id): Path<i64>,
    Query(params): Query<ListPassportTypesQuery>,
) -> Result<Json<Vec<PassportType>>, AppError> {
    let types = state
        .db
        .list_passport_types(activity_id, params.active_only.unwrap_or(false))?;
    Ok(Json(types))
}

/// POST /api/activities/:id/passport-types - Create a passport type
pub async fn create_passport_type(
    State(state): State<Arc<AppState>>,
    Path(activity_id): Path<i64>,
    headers: HeaderMap,
    Json(payload): Json<NewPassportType>,
) -> Result<Json<PassportType>, AppError> {
    let id = state.db.create_passport_type(activity_id, &payload)?;
    let passport_type = state.db.get_passport_type(id)?;

    let admin_email = get_admin_email(&state, &headers);
    state.db.log_audit(
        &admin_email,
        &format!("Passport type created: {}", passport_type.name),
    )?;

    Ok(Json(passport_type))
}

/// GET /api/passport-types/:id - Get one passport type
pub async fn get_passport_type(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<PassportType>, AppError> {
    Ok(Json(state.db.get_passport_type(id)?))
}

/// PUT /api/passport-types/:id - Update a passport type
pub async fn update_passport_type(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(payload): Json<NewPassportType>,
) -> Result<Json<PassportType>, AppError> {
    state.db.update_passport_type(id, &payload)?;
    Ok(Json(state.db.get_passport_type(id)?))
}

/// GET /api/passport-types/:id/dependencies - Records referencing this type
pub async fn get_passport_type_dependencies(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<PassportTypeDependencies>, AppError> {
    // 404 for unknown types, not an all-zero answer
    state.db.get_passport_type(id)?;
    Ok(Json(state.db.passport_type_dependencies(id)?))
}

/// POST /api/passport-types/:id/archive - Archive a passport type
pub async fn archive_passport_type(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<SuccessResponse>, AppError> {
    let passport_type = state.db.get_passport_type(id)?;
    state.db.archive_passport_type(id)?;

    let admin_email = get_admin_email(&state, &headers);
    state.db.log_audit(
        &admin_email,
        &format!("Passport type archived: {}", passport_type.name),
    )?;

    Ok(Json(SuccessResponse { success: true }))
}

/// DELETE /api/passport-types/:id - Delete a passport type
///
/// Existing passports keep their rows (passport_type_id becomes NULL).
pub async fn delete_passport_type(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<SuccessResponse>, AppError> {
    let passport_type = state.db.get_passport_type(id)?;
    state.db.delete_passport_type(id)?;

    let admin_email = get_admin_email(&state, &headers);
    state.db.log_audit(
        &admin_email,
        &format!("Passport type deleted: {}", passport_type.name),
    )?;

    Ok(Json(SuccessResponse { success: true }))
}

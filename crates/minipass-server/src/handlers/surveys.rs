//! Survey handlers: templates, surveys, public response flow

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};

use minipass_core::models::{
    Survey, SurveyQuestion, SurveyResponse, SurveyResults, SurveyTemplate,
};

use crate::{get_admin_email, AppError, AppState, SuccessResponse};

#[derive(Debug, Deserialize)]
pub struct TemplateRequest {
    pub name: String,
    pub description: Option<String>,
    pub questions: Vec<SurveyQuestion>,
}

/// GET /api/survey-templates - List survey templates
pub async fn list_survey_templates(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SurveyTemplate>>, AppError> {
    Ok(Json(state.db.list_survey_templates()?))
}

/// POST /api/survey-templates - Create a survey template
pub async fn create_survey_template(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<TemplateRequest>,
) -> Result<Json<SurveyTemplate>, AppError> {
    let id = state.db.create_survey_template(
        &payload.name,
        payload.description.as_deref(),
        &payload.questions,
    )?;

    let admin_email = get_admin_email(&state, &headers);
    state.db.log_audit(
        &admin_email,
        &format!("Survey template created: {}", payload.name),
    )?;

    Ok(Json(state.db.get_survey_template(id)?))
}

/// GET /api/survey-templates/:id - Get one template
pub async fn get_survey_template(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<SurveyTemplate>, AppError> {
    Ok(Json(state.db.get_survey_template(id)?))
}

/// PUT /api/survey-templates/:id - Update a template
pub async fn update_survey_template(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(payload): Json<TemplateRequest>,
) -> Result<Json<SurveyTemplate>, AppError> {
    state.db.update_survey_template(
        id,
        &payload.name,
        payload.description.as_deref(),
        &payload.questions,
    )?;
    Ok(Json(state.db.get_survey_template(id)?))
}

/// DELETE /api/survey-templates/:id - Delete a template (409 while in use)
pub async fn delete_survey_template(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.db.delete_survey_template(id)?;
    Ok(Json(SuccessResponse { success: true }))
}

#[derive(Debug, Deserialize)]
pub struct CreateSurveyRequest {
    pub activity_id: i64,
    pub template_id: i64,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ListSurveysQuery {
    pub activity_id: Option<i64>,
}

/// GET /api/surveys - List surveys
pub async fn list_surveys(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListSurveysQuery>,
) -> Result<Json<Vec<Survey>>, AppError> {
    Ok(Json(state.db.list_surveys(params.activity_id)?))
}

/// POST /api/surveys - Create a survey for an activity
pub async fn create_survey(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<CreateSurveyRequest>,
) -> Result<Json<Survey>, AppError> {
    let survey =
        state
            .db
            .create_survey(payload.activity_id, payload.template_id, &payload.name)?;

    let admin_email = get_admin_email(&state, &headers);
    state
        .db
        .log_audit(&admin_email, &format!("Survey created: {}", survey.name))?;

    Ok(Json(survey))
}

/// GET /api/surveys/:id/results - Aggregated results
pub async fn get_survey_results(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<SurveyResults>, AppError> {
    Ok(Json(state.db.get_survey_results(id)?))
}

/// POST /api/surveys/:id/close - Stop accepting responses
pub async fn close_survey(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Survey>, AppError> {
    state.db.close_survey(id)?;
    Ok(Json(state.db.get_survey(id)?))
}

/// POST /api/surveys/:id/reopen - Accept responses again
pub async fn reopen_survey(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Survey>, AppError> {
    state.db.reopen_survey(id)?;
    Ok(Json(state.db.get_survey(id)?))
}

/// DELETE /api/surveys/:id - Delete a survey and its responses
pub async fn delete_survey(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<SuccessResponse>, AppError> {
    let survey = state.db.get_survey(id)?;
    state.db.delete_survey(id)?;

    let admin_email = get_admin_email(&state, &headers);
    state
        .db
        .log_audit(&admin_email, &format!("Survey deleted: {}", survey.name))?;

    Ok(Json(SuccessResponse { success: true }))
}

/// POST /api/surveys/:id/invite - Email invitations to pass holders
pub async fn send_survey_invitations(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    let mailer = state
        .mailer()
        .ok_or_else(|| AppError::service_unavailable("Mail is not configured"))?;

    let db = state.db.clone();
    let sent = tokio::task::spawn_blocking(move || mailer.send_survey_invitations(&db, id))
        .await
        .map_err(|e| AppError::internal(&format!("Mail task panicked: {}", e)))??;

    let admin_email = get_admin_email(&state, &headers);
    state.db.log_audit(
        &admin_email,
        &format!("Survey {} invitations sent: {}", id, sent),
    )?;

    Ok(Json(serde_json::json!({ "sent": sent })))
}

/// Public survey payload: the questions, never other responses
#[derive(Debug, Serialize)]
pub struct PublicSurveyResponse {
    pub name: String,
    pub status: String,
    pub questions: Vec<SurveyQuestion>,
}

/// GET /api/survey/:token - Public survey view
pub async fn get_survey_public(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<PublicSurveyResponse>, AppError> {
    let survey = state.db.get_survey_by_token(&token)?;
    let template = state.db.get_survey_template(survey.template_id)?;
    Ok(Json(PublicSurveyResponse {
        name: survey.name,
        status: survey.status.as_str().to_string(),
        questions: template.questions,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SubmitSurveyRequest {
    pub answers: serde_json::Map<String, serde_json::Value>,
    /// Optional pass code linking the response to a pass holder
    pub pass_code: Option<String>,
}

/// POST /api/survey/:token/submit - Public response submission
pub async fn submit_survey_response(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Json(payload): Json<SubmitSurveyRequest>,
) -> Result<Json<SurveyResponse>, AppError> {
    let passport_id = match payload.pass_code.as_deref() {
        Some(code) => Some(state.db.get_passport_by_code(code)?.id),
        None => None,
    };

    let response = state
        .db
        .submit_survey_response(&token, passport_id, &payload.answers)?;
    Ok(Json(response))
}

//! Dashboard and KPI handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use minipass_core::models::{ActivityKpis, ActivitySummary, GlobalKpis};

use crate::{AppError, AppState};

/// Global dashboard payload
#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub totals: GlobalKpis,
    pub activities: Vec<ActivitySummary>,
}

/// GET /api/dashboard - Global totals plus per-activity lines
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DashboardResponse>, AppError> {
    Ok(Json(DashboardResponse {
        totals: state.db.global_kpis()?,
        activities: state.db.activity_summaries()?,
    }))
}

/// GET /api/kpis - Global KPI totals
pub async fn get_global_kpis(
    State(state): State<Arc<AppState>>,
) -> Result<Json<GlobalKpis>, AppError> {
    Ok(Json(state.db.global_kpis()?))
}

#[derive(Debug, Deserialize)]
pub struct KpiQuery {
    /// Time window in days: 7, 30, or 90 (unsupported values fall back to 7)
    pub period: Option<i64>,
}

/// GET /api/activities/:id/kpis - Activity dashboard KPIs
pub async fn get_activity_kpis(
    State(state): State<Arc<AppState>>,
    Path(activity_id): Path<i64>,
    Query(params): Query<KpiQuery>,
) -> Result<Json<ActivityKpis>, AppError> {
    let kpis = state
        .db
        .activity_kpis(activity_id, params.period.unwrap_or(7))?;
    Ok(Json(kpis))
}

//! Income/expense handlers and the financial summary report

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;

use minipass_core::models::{Expense, FinancialSummaryRow, Income, NewExpense, NewIncome};

use crate::{get_admin_email, AppError, AppState, SuccessResponse};

/// GET /api/activities/:id/incomes - List an activity's income records
pub async fn list_incomes(
    State(state): State<Arc<AppState>>,
    Path(activity_id): Path<i64>,
) -> Result<Json<Vec<Income>>, AppError> {
    state.db.get_activity(activity_id)?;
    Ok(Json(state.db.list_incomes(activity_id)?))
}

/// POST /api/activities/:id/incomes - Record income
pub async fn create_income(
    State(state): State<Arc<AppState>>,
    Path(activity_id): Path<i64>,
    headers: HeaderMap,
    Json(payload): Json<NewIncome>,
) -> Result<Json<Vec<Income>>, AppError> {
    state.db.create_income(activity_id, &payload)?;

    let admin_email = get_admin_email(&state, &headers);
    state.db.log_audit(
        &admin_email,
        &format!(
            "Income ${:.2} recorded for activity {}",
            payload.amount, activity_id
        ),
    )?;

    Ok(Json(state.db.list_incomes(activity_id)?))
}

/// PUT /api/incomes/:id - Update an income record
pub async fn update_income(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(payload): Json<NewIncome>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.db.update_income(id, &payload)?;
    Ok(Json(SuccessResponse { success: true }))
}

/// DELETE /api/incomes/:id - Delete an income record
pub async fn delete_income(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<SuccessResponse>, AppError> {
    state.db.delete_income(id)?;

    let admin_email = get_admin_email(&state, &headers);
    state
        .db
        .log_audit(&admin_email, &format!("Income {} deleted", id))?;

    Ok(Json(SuccessResponse { success: true }))
}

/// GET /api/activities/:id/expenses - List an activity's expenses
pub async fn list_expenses(
    State(state): State<Arc<AppState>>,
    Path(activity_id): Path<i64>,
) -> Result<Json<Vec<Expense>>, AppError> {
    state.db.get_activity(activity_id)?;
    Ok(Json(state.db.list_expenses(activity_id)?))
}

/// POST /api/activities/:id/expenses - Record an expense
pub async fn create_expense(
    State(state): State<Arc<AppState>>,
    Path(activity_id): Path<i64>,
    headers: HeaderMap,
    Json(payload): Json<NewExpense>,
) -> Result<Json<Vec<Expense>>, AppError> {
    state.db.create_expense(activity_id, &payload)?;

    let admin_email = get_admin_email(&state, &headers);
    state.db.log_audit(
        &admin_email,
        &format!(
            "Expense ${:.2} recorded for activity {}",
            payload.amount, activity_id
        ),
    )?;

    Ok(Json(state.db.list_expenses(activity_id)?))
}

/// PUT /api/expenses/:id - Update an expense record
pub async fn update_expense(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(payload): Json<NewExpense>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.db.update_expense(id, &payload)?;
    Ok(Json(SuccessResponse { success: true }))
}

/// DELETE /api/expenses/:id - Delete an expense record
pub async fn delete_expense(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<SuccessResponse>, AppError> {
    state.db.delete_expense(id)?;

    let admin_email = get_admin_email(&state, &headers);
    state
        .db
        .log_audit(&admin_email, &format!("Expense {} deleted", id))?;

    Ok(Json(SuccessResponse { success: true }))
}

#[derive(Debug, Deserialize)]
pub struct FinancialSummaryQuery {
    pub activity_id: Option<i64>,
    /// Narrow to one calendar year (e.g. 2026)
    pub fiscal_year: Option<i32>,
}

/// GET /api/reports/financial-summary - The monthly financial summary view
pub async fn get_financial_summary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FinancialSummaryQuery>,
) -> Result<Json<Vec<FinancialSummaryRow>>, AppError> {
    let rows = state
        .db
        .financial_summary(params.activity_id, params.fiscal_year)?;
    Ok(Json(rows))
}

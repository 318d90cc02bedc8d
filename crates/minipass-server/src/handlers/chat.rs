//! Analytics chatbot handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use minipass_core::chat::{ChatAnswer, ChatEngine};
use minipass_core::models::ChatQueryLogEntry;

use crate::{AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct ChatAskRequest {
    pub question: String,
}

/// POST /api/chat/ask - Ask a natural-language question about the data
pub async fn chat_ask(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatAskRequest>,
) -> Result<Json<ChatAnswer>, AppError> {
    let ai = state.ai.clone().ok_or_else(|| {
        AppError::service_unavailable("Chatbot not configured (set OLLAMA_HOST)")
    })?;

    let engine = ChatEngine::new(state.db.clone(), ai);
    let answer = engine.ask(&payload.question).await?;
    Ok(Json(answer))
}

#[derive(Debug, Deserialize)]
pub struct ChatHistoryQuery {
    pub limit: Option<i64>,
}

/// GET /api/chat/history - Recent chatbot queries
pub async fn get_chat_history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ChatHistoryQuery>,
) -> Result<Json<Vec<ChatQueryLogEntry>>, AppError> {
    let limit = params.limit.unwrap_or(50).clamp(1, crate::MAX_PAGE_LIMIT);
    Ok(Json(state.db.list_chat_queries(limit)?))
}

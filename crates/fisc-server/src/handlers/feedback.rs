//! Budget feedback handlers
//!
//! Feedback is readable and writable by any authenticated user, owner or
//! not; it is the public-comment surface of a budget and not part of the
//! ownership chain.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

use fisc_core::models::Feedback;

use crate::events::Event;
use crate::{AppError, AppState, AuthUser};

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub message: String,
    /// Post anonymously (the user id is omitted from the stored row).
    #[serde(default)]
    pub anonymous: bool,
}

/// GET /api/budgets/:id/feedback - Feedback for a budget, newest first
pub async fn list_feedback(
    State(state): State<Arc<AppState>>,
    Extension(_user): Extension<AuthUser>,
    Path(budget_id): Path<i64>,
) -> Result<Json<Vec<Feedback>>, AppError> {
    if state.db.get_budget(budget_id)?.is_none() {
        return Err(AppError::not_found("Budget not found"));
    }
    Ok(Json(state.db.list_feedback(budget_id)?))
}

/// POST /api/budgets/:id/feedback - Attach feedback to a budget
pub async fn create_feedback(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(budget_id): Path<i64>,
    Json(req): Json<FeedbackRequest>,
) -> Result<(StatusCode, Json<Feedback>), AppError> {
    let message = req.message.trim();
    if message.is_empty() {
        return Err(AppError::bad_request("Message must not be empty"));
    }
    if state.db.get_budget(budget_id)?.is_none() {
        return Err(AppError::not_found("Budget not found"));
    }

    let user_id = if req.anonymous { None } else { Some(user.0) };
    let feedback = state.db.create_feedback(budget_id, message, user_id)?;

    state.events.broadcast(&Event::new(
        "feedback_created",
        serde_json::to_value(&feedback).unwrap_or_default(),
    ));

    Ok((StatusCode::CREATED, Json(feedback)))
}

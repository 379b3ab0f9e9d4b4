//! Budget handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

use fisc_core::models::{Budget, BudgetTree, NodeKind};

use crate::events::{broadcast_dashboard_summary, Event};
use crate::{AppError, AppState, AuthUser};

#[derive(Debug, Deserialize)]
pub struct BudgetRequest {
    pub name: String,
}

fn validated_name(raw: &str) -> Result<&str, AppError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("Name must not be empty"));
    }
    Ok(name)
}

/// GET /api/budgets - List the caller's budgets
pub async fn list_budgets(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Budget>>, AppError> {
    Ok(Json(state.db.list_budgets(user.0)?))
}

/// POST /api/budgets - Create a budget owned by the caller
pub async fn create_budget(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<BudgetRequest>,
) -> Result<(StatusCode, Json<Budget>), AppError> {
    let name = validated_name(&req.name)?;
    let budget = state.db.create_budget(name, user.0)?;

    state.events.broadcast(&Event::entity(
        NodeKind::Budget,
        "created",
        serde_json::to_value(&budget).unwrap_or_default(),
    ));
    broadcast_dashboard_summary(&state.events, &state.db);

    Ok((StatusCode::CREATED, Json(budget)))
}

/// GET /api/budgets/:id - A budget with its full nested hierarchy
pub async fn get_budget(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<BudgetTree>, AppError> {
    state.db.authorize(user.0, NodeKind::Budget, id)?;
    let tree = state
        .db
        .get_budget_tree(id)?
        .ok_or_else(|| AppError::not_found("Budget not found"))?;
    Ok(Json(tree))
}

/// PUT /api/budgets/:id - Rename a budget
pub async fn update_budget(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(req): Json<BudgetRequest>,
) -> Result<Json<Budget>, AppError> {
    state.db.authorize(user.0, NodeKind::Budget, id)?;
    let name = validated_name(&req.name)?;
    let budget = state.db.update_budget(id, name)?;

    state.events.broadcast(&Event::entity(
        NodeKind::Budget,
        "updated",
        serde_json::to_value(&budget).unwrap_or_default(),
    ));
    broadcast_dashboard_summary(&state.events, &state.db);

    Ok(Json(budget))
}

/// DELETE /api/budgets/:id - Delete a budget and its whole subtree
pub async fn delete_budget(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.db.authorize(user.0, NodeKind::Budget, id)?;
    state.db.delete_budget(id)?;

    state.events.broadcast(&Event::entity(
        NodeKind::Budget,
        "deleted",
        serde_json::json!({ "id": id }),
    ));
    broadcast_dashboard_summary(&state.events, &state.db);

    Ok(Json(serde_json::json!({ "success": true })))
}

//! Dashboard aggregate handler

use std::sync::Arc;

use axum::{extract::State, Extension, Json};

use fisc_core::models::BudgetTotal;

use crate::{AppError, AppState, AuthUser};

/// GET /api/dashboard - Per-budget totals, the same aggregate the event
/// hub pushes as `dashboard_summary_updated`. Rows carry the owning
/// user id so clients can filter to their own budgets.
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(_user): Extension<AuthUser>,
) -> Result<Json<Vec<BudgetTotal>>, AppError> {
    Ok(Json(state.db.budget_totals()?))
}

//! Transaction handlers
//!
//! Creation annotates the response with an anomaly verdict from the AI
//! gateway. The gateway never fails (outages produce its documented
//! fallback), so a transaction create returns 201 even when the AI
//! service is down.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fisc_core::ai::{AnomalyResult, TransactionFeatures};
use fisc_core::db::NewTransaction;
use fisc_core::models::{NodeKind, Transaction};

use crate::events::{broadcast_dashboard_summary, Event};
use crate::{AppError, AppState, AuthUser};

#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    pub amount: f64,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub vendor_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTransactionRequest {
    pub amount: f64,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TransactionFilter {
    #[serde(default)]
    pub vendor_id: Option<i64>,
}

/// Response envelope for transaction creation. The anomaly verdict is
/// advisory and never persisted.
#[derive(Debug, Serialize)]
pub struct CreatedTransaction {
    #[serde(flatten)]
    pub transaction: Transaction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anomaly: Option<AnomalyResult>,
}

/// GET /api/transactions?vendor_id= - List the caller's transactions
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(filter): Query<TransactionFilter>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    Ok(Json(state.db.list_transactions(user.0, filter.vendor_id)?))
}

/// POST /api/transactions - Record a transaction under an owned vendor
pub async fn create_transaction(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<CreatedTransaction>), AppError> {
    state.db.authorize(user.0, NodeKind::Vendor, req.vendor_id)?;

    let transaction = state.db.create_transaction(&NewTransaction {
        amount: req.amount,
        description: req.description,
        date: req.date,
        vendor_id: req.vendor_id,
    })?;

    let anomaly = match &state.ai {
        Some(gateway) => Some(annotate(&state, gateway, &transaction).await?),
        None => None,
    };

    state.events.broadcast(&Event::entity(
        NodeKind::Transaction,
        "created",
        serde_json::to_value(&transaction).unwrap_or_default(),
    ));
    broadcast_dashboard_summary(&state.events, &state.db);

    Ok((
        StatusCode::CREATED,
        Json(CreatedTransaction {
            transaction,
            anomaly,
        }),
    ))
}

/// Build the feature vector for the anomaly detector from the stored
/// transaction and its vendor/department context.
async fn annotate(
    state: &AppState,
    gateway: &fisc_core::ai::AiGateway,
    transaction: &Transaction,
) -> Result<AnomalyResult, AppError> {
    let vendor = state
        .db
        .get_vendor(transaction.vendor_id)?
        .ok_or_else(|| AppError::not_found("Vendor not found"))?;
    let project = state
        .db
        .get_project(vendor.project_id)?
        .ok_or_else(|| AppError::not_found("Project not found"))?;

    let features = TransactionFeatures {
        amount: transaction.amount,
        department_id: project.department_id,
        vendor_name: vendor.name,
        transaction_date: transaction.date.format("%Y-%m-%d").to_string(),
        description: transaction.description.clone(),
    };
    Ok(gateway.detect_anomaly(&features).await)
}

/// GET /api/transactions/:id
pub async fn get_transaction(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<Transaction>, AppError> {
    state.db.authorize(user.0, NodeKind::Transaction, id)?;
    let transaction = state
        .db
        .get_transaction(id)?
        .ok_or_else(|| AppError::not_found("Transaction not found"))?;
    Ok(Json(transaction))
}

/// PUT /api/transactions/:id
pub async fn update_transaction(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateTransactionRequest>,
) -> Result<Json<Transaction>, AppError> {
    state.db.authorize(user.0, NodeKind::Transaction, id)?;
    let transaction = state
        .db
        .update_transaction(id, req.amount, req.description.as_deref())?;

    state.events.broadcast(&Event::entity(
        NodeKind::Transaction,
        "updated",
        serde_json::to_value(&transaction).unwrap_or_default(),
    ));
    broadcast_dashboard_summary(&state.events, &state.db);

    Ok(Json(transaction))
}

/// DELETE /api/transactions/:id
pub async fn delete_transaction(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.db.authorize(user.0, NodeKind::Transaction, id)?;
    state.db.delete_transaction(id)?;

    state.events.broadcast(&Event::entity(
        NodeKind::Transaction,
        "deleted",
        serde_json::json!({ "id": id }),
    ));
    broadcast_dashboard_summary(&state.events, &state.db);

    Ok(Json(serde_json::json!({ "success": true })))
}

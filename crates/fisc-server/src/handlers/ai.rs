//! AI gateway handlers
//!
//! Every endpoint here answers 200 regardless of the AI service's state:
//! an unconfigured or unreachable service produces the gateway's
//! documented fallback values instead of an error.

use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use serde::Deserialize;

use fisc_core::ai::{AnomalyResult, HealthStats, QueryAnswer, TransactionFeatures};

use crate::{AppError, AppState, AuthUser};

#[derive(Debug, Deserialize)]
pub struct BudgetQueryRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub transactions: Vec<TransactionFeatures>,
}

/// POST /api/ai/budget-query - Natural-language question about budgets
pub async fn ai_budget_query(
    State(state): State<Arc<AppState>>,
    Extension(_user): Extension<AuthUser>,
    Json(req): Json<BudgetQueryRequest>,
) -> Result<Json<QueryAnswer>, AppError> {
    let text = req.text.trim();
    if text.is_empty() {
        return Err(AppError::bad_request("Query text must not be empty"));
    }

    let answer = match &state.ai {
        Some(gateway) => gateway.answer_budget_query(text).await,
        None => QueryAnswer::fallback(),
    };
    Ok(Json(answer))
}

/// POST /api/ai/analyze-transaction - Batch anomaly scoring
pub async fn ai_analyze_transaction(
    State(state): State<Arc<AppState>>,
    Extension(_user): Extension<AuthUser>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<Vec<AnomalyResult>>, AppError> {
    if req.transactions.is_empty() {
        return Err(AppError::bad_request("No transactions to analyze"));
    }

    let results = match &state.ai {
        Some(gateway) => gateway.analyze_transactions(&req.transactions).await,
        None => req
            .transactions
            .iter()
            .enumerate()
            .map(|(i, _)| {
                let mut fallback = AnomalyResult::fallback();
                fallback.transaction_index = i;
                fallback
            })
            .collect(),
    };
    Ok(Json(results))
}

/// GET /api/ai/health - Operational stats of the AI service
pub async fn ai_health(
    State(state): State<Arc<AppState>>,
    Extension(_user): Extension<AuthUser>,
) -> Result<Json<HealthStats>, AppError> {
    let stats = match &state.ai {
        Some(gateway) => gateway.health_stats().await,
        None => HealthStats::offline(),
    };
    Ok(Json(stats))
}

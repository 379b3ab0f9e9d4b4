//! Outbound client for the anomaly/query AI microservice
//!
//! The gateway is the single place remote failure is contained: every
//! public capability returns its documented fallback value instead of an
//! error, so an AI outage can never abort transaction recording or a
//! budget query. The fallback is a designed contract, not error
//! suppression: the internal `try_*` methods surface the real failure,
//! and the public wrappers log it and synthesize the substitute.
//!
//! # Configuration
//!
//! - `FISC_AI_URL`: service base URL. Unset means `AiGateway::from_env()`
//!   returns `None` and callers use the fallbacks directly.
//! - Requests time out after [`DEFAULT_TIMEOUT`].

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};

/// Per-request timeout for AI service calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Environment variable holding the AI service base URL.
pub const AI_URL_ENV: &str = "FISC_AI_URL";

/// Transaction features sent to the anomaly detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionFeatures {
    pub amount: f64,
    pub department_id: i64,
    pub vendor_name: String,
    pub transaction_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Anomaly verdict for one transaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnomalyResult {
    #[serde(default)]
    pub transaction_index: usize,
    pub is_anomaly: bool,
    pub anomaly_score: f64,
    pub reasons: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_name: Option<String>,
}

impl AnomalyResult {
    /// The documented safe substitute when the service is unreachable.
    pub fn fallback() -> Self {
        Self {
            transaction_index: 0,
            is_anomaly: false,
            anomaly_score: 0.1,
            reasons: vec!["AI analysis temporarily unavailable".to_string()],
            transaction_amount: None,
            vendor_name: None,
        }
    }
}

/// Natural-language answer to a budget query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryAnswer {
    pub answer: String,
    pub confidence: f64,
    #[serde(default)]
    pub keywords_detected: Vec<String>,
    pub intent: String,
    #[serde(default)]
    pub processing_time: f64,
}

impl QueryAnswer {
    pub fn fallback() -> Self {
        Self {
            answer: "Sorry, the budget assistant is temporarily unavailable. \
                     Please try again in a few minutes."
                .to_string(),
            confidence: 0.0,
            keywords_detected: Vec::new(),
            intent: "fallback".to_string(),
            processing_time: 0.0,
        }
    }
}

/// Operational stats of the AI service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthStats {
    pub status: String,
    #[serde(default)]
    pub uptime_seconds: u64,
    #[serde(default)]
    pub models_loaded: Vec<String>,
}

impl HealthStats {
    pub fn offline() -> Self {
        Self {
            status: "offline".to_string(),
            uptime_seconds: 0,
            models_loaded: Vec::new(),
        }
    }
}

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
    transactions: &'a [TransactionFeatures],
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    text: &'a str,
}

/// HTTP client for the AI microservice.
#[derive(Clone)]
pub struct AiGateway {
    http_client: Client,
    base_url: String,
}

impl AiGateway {
    pub fn new(base_url: &str) -> Self {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Self {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create from `FISC_AI_URL`, or `None` if it is unset.
    pub fn from_env() -> Option<Self> {
        let url = std::env::var(AI_URL_ENV).ok()?;
        Some(Self::new(&url))
    }

    pub fn host(&self) -> &str {
        &self.base_url
    }

    /// Score a single transaction. Never fails: outages yield
    /// [`AnomalyResult::fallback`].
    pub async fn detect_anomaly(&self, tx: &TransactionFeatures) -> AnomalyResult {
        let batch = std::slice::from_ref(tx);
        match self.try_analyze(batch).await {
            Ok(mut results) if !results.is_empty() => results.remove(0),
            Ok(_) => {
                warn!("AI service returned no results for a single-transaction batch");
                AnomalyResult::fallback()
            }
            Err(e) => {
                warn!(error = %e, "Anomaly detection unavailable, using fallback");
                AnomalyResult::fallback()
            }
        }
    }

    /// Score a batch of transactions. On failure every entry gets the
    /// fallback verdict, index preserved.
    pub async fn analyze_transactions(&self, batch: &[TransactionFeatures]) -> Vec<AnomalyResult> {
        match self.try_analyze(batch).await {
            Ok(results) => results,
            Err(e) => {
                warn!(error = %e, "Batch anomaly analysis unavailable, using fallback");
                batch
                    .iter()
                    .enumerate()
                    .map(|(i, _)| AnomalyResult {
                        transaction_index: i,
                        ..AnomalyResult::fallback()
                    })
                    .collect()
            }
        }
    }

    /// Answer a natural-language budget question. Never fails.
    pub async fn answer_budget_query(&self, text: &str) -> QueryAnswer {
        match self.try_query(text).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, "Budget query unavailable, using fallback");
                QueryAnswer::fallback()
            }
        }
    }

    /// Fetch service health. An unreachable service reports `offline`
    /// rather than erroring; health is the one place the outage is shown.
    pub async fn health_stats(&self) -> HealthStats {
        match self.try_health().await {
            Ok(stats) => stats,
            Err(e) => {
                warn!(error = %e, "AI health check failed");
                HealthStats::offline()
            }
        }
    }

    async fn try_analyze(&self, batch: &[TransactionFeatures]) -> Result<Vec<AnomalyResult>> {
        let response = self
            .http_client
            .post(format!("{}/api/anomaly/detect", self.base_url))
            .json(&AnalyzeRequest { transactions: batch })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Validation(format!(
                "AI service error: {}",
                response.status()
            )));
        }

        Ok(response.json().await?)
    }

    async fn try_query(&self, text: &str) -> Result<QueryAnswer> {
        let response = self
            .http_client
            .post(format!("{}/api/voice/text-query", self.base_url))
            .json(&QueryRequest { text })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Validation(format!(
                "AI service error: {}",
                response.status()
            )));
        }

        Ok(response.json().await?)
    }

    async fn try_health(&self) -> Result<HealthStats> {
        let response = self
            .http_client
            .get(format!("{}/api/health/", self.base_url))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Validation(format!(
                "AI service error: {}",
                response.status()
            )));
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_values_match_contract() {
        let anomaly = AnomalyResult::fallback();
        assert!(!anomaly.is_anomaly);
        assert_eq!(anomaly.anomaly_score, 0.1);
        assert_eq!(
            anomaly.reasons,
            vec!["AI analysis temporarily unavailable".to_string()]
        );

        let query = QueryAnswer::fallback();
        assert_eq!(query.confidence, 0.0);
        assert_eq!(query.intent, "fallback");

        let health = HealthStats::offline();
        assert_eq!(health.status, "offline");
        assert_eq!(health.uptime_seconds, 0);
        assert!(health.models_loaded.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_service_yields_fallbacks() {
        // Nothing listens on this port; every call must degrade, not error.
        let gateway = AiGateway::with_timeout("http://127.0.0.1:1", Duration::from_millis(200));

        let tx = TransactionFeatures {
            amount: 150.0,
            department_id: 1,
            vendor_name: "Acme".to_string(),
            transaction_date: "2026-01-15".to_string(),
            description: None,
        };

        assert_eq!(gateway.detect_anomaly(&tx).await, AnomalyResult::fallback());

        let batch = gateway
            .analyze_transactions(std::slice::from_ref(&tx))
            .await;
        assert_eq!(batch.len(), 1);
        assert!(!batch[0].is_anomaly);
        assert_eq!(batch[0].transaction_index, 0);

        assert_eq!(
            gateway.answer_budget_query("how much did parks spend?").await,
            QueryAnswer::fallback()
        );
        assert_eq!(gateway.health_stats().await, HealthStats::offline());
    }
}

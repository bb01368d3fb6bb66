//! Insight providers
//!
//! Generation goes through a ranked chain: an optional primary provider (the
//! remote statistics service) tried under a timeout, then the local engine.
//! Any primary error or timeout falls through to the local engine.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};

use super::engine::{sort_insights, AnalysisContext, InsightEngine, Snapshot};
use super::types::{Impact, Insight, InsightType};

/// Everything a provider needs to generate insights for one user
#[derive(Debug, Clone, Serialize)]
pub struct InsightRequest {
    pub owner_id: i64,
    pub now: DateTime<Utc>,
    pub general_window_days: u32,
    pub snapshot: Snapshot,
}

#[async_trait]
pub trait InsightProvider: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    async fn generate(&self, request: &InsightRequest) -> Result<Vec<Insight>>;
}

/// Deterministic local computation
pub struct LocalInsightProvider {
    engine: Arc<InsightEngine>,
}

impl LocalInsightProvider {
    pub fn new(engine: Arc<InsightEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl InsightProvider for LocalInsightProvider {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn generate(&self, request: &InsightRequest) -> Result<Vec<Insight>> {
        let ctx = AnalysisContext::new(
            request.owner_id,
            request.now,
            &request.snapshot,
            self.engine.config(),
        )
        .with_general_window(request.general_window_days);
        self.engine.analyze(&ctx)
    }
}

// Remote service protocol

#[derive(Debug, Serialize)]
struct RemoteTransaction<'a> {
    id: i64,
    amount: f64,
    #[serde(rename = "type")]
    kind: &'a str,
    category: &'a str,
    date: String,
    description: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct RemoteRequest<'a> {
    transactions: Vec<RemoteTransaction<'a>>,
    user_id: i64,
    timeframe: String,
}

#[derive(Debug, Deserialize)]
struct RemoteInsight {
    #[serde(rename = "type")]
    insight_type: String,
    title: String,
    message: String,
    confidence: f64,
    #[serde(default)]
    impact: Option<String>,
    #[serde(default)]
    actionable: Option<bool>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RemoteResponse {
    insights: Vec<RemoteInsight>,
}

/// HTTP client for the remote insight service
pub struct RemoteInsightProvider {
    http_client: Client,
    base_url: String,
    expiry_days: u32,
}

impl RemoteInsightProvider {
    pub fn new(base_url: &str, expiry_days: u32) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            expiry_days,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_request<'a>(request: &'a InsightRequest) -> RemoteRequest<'a> {
        let transactions = request
            .snapshot
            .transactions
            .iter()
            .map(|tx| RemoteTransaction {
                id: tx.id,
                amount: tx.amount.to_f64().unwrap_or_default(),
                kind: tx.kind.as_str(),
                category: &tx.category,
                date: tx.occurred_at.to_rfc3339(),
                description: tx.description.as_deref(),
            })
            .collect();

        RemoteRequest {
            transactions,
            user_id: request.owner_id,
            timeframe: format!("{}d", request.general_window_days),
        }
    }

    /// Convert one service insight, rejecting anything out of range
    fn convert(&self, request: &InsightRequest, remote: RemoteInsight) -> Result<Insight> {
        let insight_type: InsightType = remote.insight_type.parse()?;
        if !(0.0..=1.0).contains(&remote.confidence) {
            return Err(Error::InvalidData(format!(
                "confidence {} out of range for {} insight",
                remote.confidence, insight_type
            )));
        }
        let impact = match remote.impact.as_deref() {
            Some(impact) => impact.parse()?,
            None => Impact::Medium,
        };

        let insight = Insight {
            owner_id: request.owner_id,
            insight_type,
            title: remote.title,
            message: remote.message,
            confidence: remote.confidence,
            impact,
            actionable: remote.actionable.unwrap_or(true),
            category: remote.category,
            data: remote.data,
            generated_at: request.now,
            expires_at: None,
        };
        Ok(insight.expiring_after(self.expiry_days))
    }
}

#[async_trait]
impl InsightProvider for RemoteInsightProvider {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn generate(&self, request: &InsightRequest) -> Result<Vec<Insight>> {
        let body = Self::build_request(request);

        let response = self
            .http_client
            .post(format!("{}/api/insights/generate", self.base_url))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::InvalidData(format!(
                "Insight service error {}: {}",
                status, text
            )));
        }

        let parsed: RemoteResponse = response.json().await?;
        let insights = parsed
            .insights
            .into_iter()
            .map(|remote| self.convert(request, remote))
            .collect::<Result<Vec<_>>>()?;

        Ok(sort_insights(insights))
    }
}

/// Which branch of the chain produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderSource {
    Primary,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct ChainOutcome {
    pub insights: Vec<Insight>,
    pub source: ProviderSource,
}

/// Primary provider under a timeout, falling through to the local provider
pub struct InsightProviderChain {
    primary: Option<Arc<dyn InsightProvider>>,
    fallback: Arc<dyn InsightProvider>,
    timeout: Duration,
}

impl InsightProviderChain {
    pub fn new(
        primary: Option<Arc<dyn InsightProvider>>,
        fallback: Arc<dyn InsightProvider>,
        timeout: Duration,
    ) -> Self {
        Self {
            primary,
            fallback,
            timeout,
        }
    }

    /// Chain with only the local provider
    pub fn local_only(fallback: Arc<dyn InsightProvider>) -> Self {
        Self::new(None, fallback, Duration::ZERO)
    }

    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    pub async fn generate(&self, request: &InsightRequest) -> Result<ChainOutcome> {
        if let Some(primary) = &self.primary {
            match tokio::time::timeout(self.timeout, primary.generate(request)).await {
                Ok(Ok(insights)) => {
                    debug!(
                        owner_id = request.owner_id,
                        provider = primary.name(),
                        count = insights.len(),
                        "Primary insight provider succeeded"
                    );
                    return Ok(ChainOutcome {
                        insights,
                        source: ProviderSource::Primary,
                    });
                }
                Ok(Err(e)) => {
                    warn!(
                        owner_id = request.owner_id,
                        provider = primary.name(),
                        error = %e,
                        "Primary insight provider failed, falling back"
                    );
                }
                Err(_) => {
                    warn!(
                        owner_id = request.owner_id,
                        provider = primary.name(),
                        timeout_ms = self.timeout.as_millis() as u64,
                        "Primary insight provider timed out, falling back"
                    );
                }
            }
        }

        let insights = self.fallback.generate(request).await?;
        Ok(ChainOutcome {
            insights,
            source: ProviderSource::Fallback,
        })
    }
}

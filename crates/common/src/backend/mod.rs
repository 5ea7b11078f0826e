//! Search service abstraction
//!
//! The full-text index lives in an external service. Everything that talks to
//! it goes through [`SearchBackend`], constructed once and injected:
//! - [`ElasticsearchClient`] speaks the Elasticsearch REST API
//! - [`MockBackend`] returns canned hits for tests

mod elasticsearch;
mod mock;

pub use elasticsearch::{ElasticsearchClient, SUGGEST_FIELD, TEXT_FIELD};
pub use mock::MockBackend;

use crate::errors::{AppError, Result};
use crate::models::IndexedPage;
use async_trait::async_trait;
use backoff::ExponentialBackoff;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Text relevance clause of a composite query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelevanceClause {
    /// Exact phrase match on the page text
    Phrase(String),
    /// Case-insensitive wildcard pattern on the page text
    Wildcard(String),
}

/// Modifier applied to a numeric field before it scales relevance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoostModifier {
    None,
    Sqrt,
    Log1p,
}

impl BoostModifier {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoostModifier::None => "none",
            BoostModifier::Sqrt => "sqrt",
            BoostModifier::Log1p => "log1p",
        }
    }
}

impl fmt::Display for BoostModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BoostModifier {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(BoostModifier::None),
            "sqrt" => Ok(BoostModifier::Sqrt),
            "log1p" => Ok(BoostModifier::Log1p),
            other => Err(AppError::InvalidFormat {
                message: format!("unknown boost modifier '{}'", other),
            }),
        }
    }
}

/// Scale relevance by a stored numeric field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValueBoost {
    pub field: String,
    pub factor: f64,
    pub modifier: BoostModifier,
    /// Value used when a document lacks the field
    pub missing: f64,
}

/// Extra weight for documents containing any of `terms`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermsBoost {
    pub field: String,
    pub terms: Vec<String>,
    pub weight: f64,
}

/// Structured query sent to the search service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeQuery {
    pub relevance: RelevanceClause,
    pub authority: FieldValueBoost,
    pub history: Option<TermsBoost>,
    /// Maximum hits to return
    pub size: usize,
}

/// One hit with the service's composite score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub score: f64,
    pub page: IndexedPage,
}

/// Document the service refused during bulk indexing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkFailure {
    pub url: String,
    pub reason: String,
}

/// Outcome of one bulk request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkReport {
    pub indexed: usize,
    pub failures: Vec<BulkFailure>,
}

impl BulkReport {
    /// Fold another batch's outcome into this one
    pub fn merge(&mut self, other: BulkReport) {
        self.indexed += other.indexed;
        self.failures.extend(other.failures);
    }
}

/// Trait for the external full-text search service
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Check connectivity
    async fn ping(&self) -> Result<()>;

    /// Run a composite ranked query
    async fn search(&self, query: &CompositeQuery) -> Result<Vec<SearchHit>>;

    /// Prefix completion over the suggestion field, best match first
    async fn suggest(&self, prefix: &str, size: usize) -> Result<Vec<String>>;

    /// Create the page index if missing; true when it was created
    async fn ensure_index(&self) -> Result<bool>;

    /// Index a batch of pages, reporting per-document failures
    async fn bulk_index(&self, pages: &[IndexedPage]) -> Result<BulkReport>;

    /// Backend name for logs
    fn name(&self) -> &str;
}

/// Ping the backend with exponential backoff until it answers or `max_elapsed` passes
pub async fn wait_until_ready(backend: &dyn SearchBackend, max_elapsed: Duration) -> Result<()> {
    let policy = ExponentialBackoff {
        max_elapsed_time: Some(max_elapsed),
        ..ExponentialBackoff::default()
    };

    backoff::future::retry(policy, || async move {
        backend.ping().await.map_err(|e| {
            tracing::warn!(backend = backend.name(), error = %e, "Search service not ready, retrying");
            backoff::Error::transient(e)
        })
    })
    .await?;

    tracing::info!(backend = backend.name(), "Connected to search service");
    Ok(())
}

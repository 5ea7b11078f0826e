//! Query-time ranking
//!
//! Provides:
//! - Composite query construction (relevance, authority boost, history boost)
//! - Min-max normalization of candidate scores
//! - Weighted fusion of relevance and authority into the final order
//! - The [`Ranker`] tying these to a search backend and the query log

mod fusion;
mod normalize;
mod query;
mod ranker;

pub use fusion::{log_snippet, snippet, ScoreFusion};
pub use normalize::{normalize, NORMALIZED_FLOOR};
pub use query::QueryBuilder;
pub use ranker::Ranker;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;
use webrank_common::errors::{AppError, Result};
use webrank_common::models::IndexedPage;

/// How the query text is matched against page text
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    /// Exact phrase match
    Phrase,
    /// Case-insensitive wildcard pattern (`*` and `?`)
    Wildcard,
}

impl QueryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryMode::Phrase => "phrase",
            QueryMode::Wildcard => "wildcard",
        }
    }
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "phrase" => Ok(QueryMode::Phrase),
            "wildcard" => Ok(QueryMode::Wildcard),
            other => Err(AppError::InvalidFormat {
                message: format!("unknown query mode '{}'", other),
            }),
        }
    }
}

/// Search request parameters
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SearchRequest {
    /// Query text
    #[validate(length(min = 1, max = 1000))]
    pub query: String,

    /// Match mode
    pub mode: QueryMode,

    /// Logged-in user; enables personalization and history logging
    pub user: Option<String>,

    /// Maximum results to return
    #[validate(range(min = 1, max = 100))]
    pub limit: usize,
}

impl SearchRequest {
    pub fn phrase(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            mode: QueryMode::Phrase,
            user: None,
            limit: 4,
        }
    }

    pub fn wildcard(query: impl Into<String>) -> Self {
        Self {
            mode: QueryMode::Wildcard,
            ..Self::phrase(query)
        }
    }

    pub fn for_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Check field constraints, including a non-blank query
    pub fn check(&self) -> Result<()> {
        self.validate().map_err(|e| AppError::Validation {
            message: e.to_string(),
            field: e.field_errors().keys().next().map(|field| field.to_string()),
        })?;

        if self.query.trim().is_empty() {
            return Err(AppError::Validation {
                message: "query must not be blank".to_string(),
                field: Some("query".to_string()),
            });
        }
        Ok(())
    }
}

/// Page returned by the search service with its raw scores
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub page: IndexedPage,

    /// Service relevance score for this query
    pub relevance: f64,

    /// Stored authority of the page
    pub authority: f64,
}

/// Ranked result shown to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub title: String,
    pub url: String,
    pub snippet: String,

    /// Raw authority score of the page
    pub authority: f64,

    /// Weighted sum of normalized relevance and authority
    pub final_score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("Phrase".parse::<QueryMode>().unwrap(), QueryMode::Phrase);
        assert_eq!("wildcard".parse::<QueryMode>().unwrap(), QueryMode::Wildcard);
        assert!("fuzzy".parse::<QueryMode>().is_err());
    }

    #[test]
    fn test_request_validation() {
        assert!(SearchRequest::phrase("library hours").check().is_ok());
        assert!(SearchRequest::phrase("").check().is_err());
        assert!(SearchRequest::phrase("   ").check().is_err());
        assert!(SearchRequest::phrase("x".repeat(1001)).check().is_err());
        assert!(SearchRequest::phrase("q").with_limit(0).check().is_err());
        assert!(SearchRequest::phrase("q").with_limit(101).check().is_err());
    }

    #[test]
    fn test_validation_names_field() {
        let err = SearchRequest::phrase("q").with_limit(0).check().unwrap_err();
        match err {
            AppError::Validation { field, .. } => assert_eq!(field.as_deref(), Some("limit")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

//! In-process search backend for tests

use super::{BulkFailure, BulkReport, CompositeQuery, SearchBackend, SearchHit};
use crate::errors::{AppError, Result};
use crate::models::IndexedPage;
use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::Mutex;

/// Mock search backend returning canned hits in the order given
#[derive(Default)]
pub struct MockBackend {
    hits: Vec<SearchHit>,
    suggestions: Vec<String>,
    rejected: HashSet<String>,
    unavailable: bool,
    queries: Mutex<Vec<CompositeQuery>>,
    indexed: Mutex<Vec<IndexedPage>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hits returned by every search, truncated to the query size
    pub fn with_hits(mut self, hits: Vec<SearchHit>) -> Self {
        self.hits = hits;
        self
    }

    /// Completion candidates matched by case-insensitive prefix
    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }

    /// Refuse this URL during bulk indexing
    pub fn rejecting(mut self, url: &str) -> Self {
        self.rejected.insert(url.to_string());
        self
    }

    /// Fail every call as if the service were down
    pub fn failing(mut self) -> Self {
        self.unavailable = true;
        self
    }

    /// Queries received so far
    pub async fn recorded_queries(&self) -> Vec<CompositeQuery> {
        self.queries.lock().await.clone()
    }

    /// Pages accepted so far
    pub async fn indexed_pages(&self) -> Vec<IndexedPage> {
        self.indexed.lock().await.clone()
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable {
            return Err(AppError::ServiceUnavailable {
                message: "mock backend is down".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SearchBackend for MockBackend {
    async fn ping(&self) -> Result<()> {
        self.check_available()
    }

    async fn search(&self, query: &CompositeQuery) -> Result<Vec<SearchHit>> {
        self.check_available()?;
        self.queries.lock().await.push(query.clone());
        Ok(self.hits.iter().take(query.size).cloned().collect())
    }

    async fn suggest(&self, prefix: &str, size: usize) -> Result<Vec<String>> {
        self.check_available()?;
        let prefix = prefix.to_lowercase();
        Ok(self
            .suggestions
            .iter()
            .filter(|s| s.to_lowercase().starts_with(&prefix))
            .take(size)
            .cloned()
            .collect())
    }

    async fn ensure_index(&self) -> Result<bool> {
        self.check_available()?;
        Ok(false)
    }

    async fn bulk_index(&self, pages: &[IndexedPage]) -> Result<BulkReport> {
        self.check_available()?;

        let mut report = BulkReport::default();
        let mut indexed = self.indexed.lock().await;
        for page in pages {
            if self.rejected.contains(&page.url) {
                report.failures.push(BulkFailure {
                    url: page.url.clone(),
                    reason: "rejected by mock".to_string(),
                });
            } else {
                indexed.push(page.clone());
                report.indexed += 1;
            }
        }
        Ok(report)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

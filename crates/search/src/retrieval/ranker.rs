//! Ranked search over the external search service
//!
//! One request flows through:
//! 1. history terms for the requesting user
//! 2. composite query (relevance + authority boost + history boost)
//! 3. candidate retrieval from the backend
//! 4. normalization and weighted fusion
//! 5. query log append

use super::{log_snippet, Candidate, QueryBuilder, RankedResult, ScoreFusion, SearchRequest};
use crate::personalization::{HistoryEntry, PersonalizationStore, ResultSummary};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use webrank_common::backend::SearchBackend;
use webrank_common::config::RankingConfig;
use webrank_common::errors::{AppError, Result};
use webrank_common::metrics;

/// Query-time ranking engine
///
/// Holds no per-request state; share it behind an `Arc`.
pub struct Ranker {
    backend: Arc<dyn SearchBackend>,
    personalization: PersonalizationStore,
    builder: QueryBuilder,
    fusion: ScoreFusion,
    snippet_chars: usize,
    log_snippet_chars: usize,
    suggest_size: usize,
}

impl Ranker {
    /// Create a ranker over an injected backend and query log
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        personalization: PersonalizationStore,
        config: &RankingConfig,
    ) -> Result<Self> {
        Ok(Self {
            backend,
            personalization,
            builder: QueryBuilder::from_config(config)?,
            fusion: ScoreFusion::from_config(config),
            snippet_chars: config.snippet_chars,
            log_snippet_chars: config.log_snippet_chars,
            suggest_size: config.suggest_size,
        })
    }

    /// Rank pages for a query
    ///
    /// A backend failure fails the whole request; a failed history append
    /// is only logged.
    #[instrument(skip(self, request), fields(mode = %request.mode, user = ?request.user))]
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<RankedResult>> {
        request.check()?;
        let start = Instant::now();
        let mode = request.mode.as_str();

        let history_terms = match &request.user {
            Some(user) => self.personalization.history_terms(user).await,
            None => HashSet::new(),
        };

        let query = self.builder.build(request, &history_terms, request.limit);
        let hits = self.backend.search(&query).await.map_err(|e| {
            metrics::record_search_failure(mode);
            warn!(backend = self.backend.name(), error = %e, "Search service query failed");
            match e {
                AppError::ServiceUnavailable { .. } => e,
                other => AppError::unavailable(other),
            }
        })?;

        debug!(
            hits = hits.len(),
            history_terms = history_terms.len(),
            "Candidates retrieved"
        );

        let candidates = hits
            .into_iter()
            .map(|hit| Candidate {
                relevance: hit.score,
                authority: hit.page.pagerank,
                page: hit.page,
            })
            .collect();
        let results = self.fusion.fuse(candidates, self.snippet_chars)?;

        if let Some(user) = &request.user {
            let summaries = results
                .iter()
                .map(|result| ResultSummary {
                    title: result.title.clone(),
                    url: result.url.clone(),
                    snippet: log_snippet(&result.snippet, self.log_snippet_chars),
                })
                .collect();

            if let Err(e) = self.personalization.record_query(user, &request.query, summaries).await {
                warn!(user = %user, error = %e, "Failed to record query history");
            }
        }

        let elapsed = start.elapsed();
        metrics::record_search(elapsed.as_secs_f64(), mode, results.len());
        info!(
            results = results.len(),
            latency_ms = elapsed.as_millis() as u64,
            "Search completed"
        );

        Ok(results)
    }

    /// Completion suggestions for a prefix, in service order
    #[instrument(skip(self))]
    pub async fn suggest(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return Err(AppError::Validation {
                message: "prefix must not be blank".to_string(),
                field: Some("prefix".to_string()),
            });
        }

        let suggestions = self
            .backend
            .suggest(prefix, self.suggest_size)
            .await
            .map_err(|e| match e {
                AppError::ServiceUnavailable { .. } => e,
                other => AppError::unavailable(other),
            })?;

        metrics::record_suggest(suggestions.len());
        Ok(suggestions)
    }

    /// The user's past queries, oldest first
    pub async fn history(&self, user: &str) -> Result<Vec<HistoryEntry>> {
        self.personalization.queries(user).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authority::{LinkGraph, PageRankConfig, PageRankScorer};
    use crate::personalization::{InMemoryQueryLog, QueryLog};
    use crate::retrieval::QueryMode;
    use async_trait::async_trait;
    use webrank_common::backend::{MockBackend, RelevanceClause, SearchHit};
    use webrank_common::models::IndexedPage;

    fn hit(url: &str, score: f64, pagerank: f64) -> SearchHit {
        SearchHit {
            score,
            page: IndexedPage {
                url: url.to_string(),
                title: format!("Page {}", url),
                text: format!("Body of {}\nsecond line", url),
                pagerank,
                ..Default::default()
            },
        }
    }

    fn ranker(backend: Arc<MockBackend>, log: Arc<dyn QueryLog>) -> Ranker {
        Ranker::new(backend, PersonalizationStore::new(log), &RankingConfig::default()).unwrap()
    }

    struct BrokenLog;

    #[async_trait]
    impl QueryLog for BrokenLog {
        async fn append(&self, _entry: &HistoryEntry) -> Result<()> {
            Err(AppError::Storage {
                path: "history.txt".into(),
                message: "disk full".into(),
            })
        }

        async fn read_all(&self, _username: Option<&str>) -> Result<Vec<HistoryEntry>> {
            Err(AppError::Storage {
                path: "history.txt".into(),
                message: "permission denied".into(),
            })
        }
    }

    #[tokio::test]
    async fn test_search_fuses_and_logs() {
        let backend = Arc::new(MockBackend::new().with_hits(vec![
            hit("a", 8.0, 0.05),
            hit("b", 4.0, 0.50),
        ]));
        let log = Arc::new(InMemoryQueryLog::new());
        let ranker = ranker(backend.clone(), log.clone());

        let results = ranker
            .search(&SearchRequest::phrase("library hours").for_user("alice"))
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results[0].final_score >= results[1].final_score);

        let history = log.read_all(Some("alice")).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].query, "library hours");
        assert_eq!(history[0].results.len(), 2);
        assert!(!history[0].results[0].snippet.contains('\n'));
    }

    #[tokio::test]
    async fn test_history_terms_reach_the_query() {
        let backend = Arc::new(MockBackend::new().with_hits(vec![hit("a", 1.0, 0.1)]));
        let ranker = ranker(backend.clone(), Arc::new(InMemoryQueryLog::new()));

        let first = SearchRequest::phrase("library hours").for_user("alice");
        ranker.search(&first).await.unwrap();
        ranker.search(&SearchRequest::wildcard("Exam*").for_user("alice")).await.unwrap();

        let queries = backend.recorded_queries().await;
        assert!(queries[0].history.is_none());

        let second = &queries[1];
        assert_eq!(second.relevance, RelevanceClause::Wildcard("exam*".into()));
        let boost = second.history.as_ref().unwrap();
        assert_eq!(boost.terms, vec!["hours".to_string(), "library".to_string()]);
        assert_eq!(boost.weight, 1.5);
    }

    #[tokio::test]
    async fn test_anonymous_search_is_not_logged() {
        let backend = Arc::new(MockBackend::new().with_hits(vec![hit("a", 1.0, 0.1)]));
        let log = Arc::new(InMemoryQueryLog::new());
        let ranker = ranker(backend, log.clone());

        ranker.search(&SearchRequest::phrase("library")).await.unwrap();
        assert_eq!(log.len().await, 0);
    }

    #[tokio::test]
    async fn test_no_hits_is_empty_and_still_logged() {
        let log = Arc::new(InMemoryQueryLog::new());
        let ranker = ranker(Arc::new(MockBackend::new()), log.clone());

        let results = ranker
            .search(&SearchRequest::phrase("nothing matches").for_user("alice"))
            .await
            .unwrap();

        assert!(results.is_empty());
        assert_eq!(log.len().await, 1);
    }

    #[tokio::test]
    async fn test_backend_failure_is_unavailable() {
        let log = Arc::new(InMemoryQueryLog::new());
        let ranker = ranker(Arc::new(MockBackend::new().failing()), log.clone());

        let err = ranker
            .search(&SearchRequest::phrase("library").for_user("alice"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ServiceUnavailable { .. }));
        assert_eq!(log.len().await, 0);
    }

    #[tokio::test]
    async fn test_broken_history_does_not_fail_search() {
        let backend = Arc::new(MockBackend::new().with_hits(vec![hit("a", 1.0, 0.1)]));
        let ranker = ranker(backend.clone(), Arc::new(BrokenLog));

        let results = ranker
            .search(&SearchRequest::phrase("library").for_user("alice"))
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert!(backend.recorded_queries().await[0].history.is_none());
    }

    #[tokio::test]
    async fn test_invalid_request_never_reaches_backend() {
        let backend = Arc::new(MockBackend::new());
        let ranker = ranker(backend.clone(), Arc::new(InMemoryQueryLog::new()));

        let err = ranker.search(&SearchRequest::phrase("  ")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
        assert!(backend.recorded_queries().await.is_empty());
    }

    #[tokio::test]
    async fn test_suggest() {
        let backend = Arc::new(MockBackend::new().with_suggestions(vec![
            "Library Hours...".into(),
            "Library Map...".into(),
            "Lab Safety...".into(),
        ]));
        let ranker = ranker(backend, Arc::new(InMemoryQueryLog::new()));

        let suggestions = ranker.suggest("lib").await.unwrap();
        assert_eq!(suggestions, vec!["Library Hours...".to_string(), "Library Map...".to_string()]);
        assert!(ranker.suggest(" ").await.is_err());
    }

    #[tokio::test]
    async fn test_history_lists_queries() {
        let ranker = ranker(Arc::new(MockBackend::new()), Arc::new(InMemoryQueryLog::new()));
        ranker.search(&SearchRequest::phrase("first").for_user("alice")).await.unwrap();
        ranker.search(&SearchRequest::phrase("second").for_user("alice")).await.unwrap();

        let history = ranker.history("alice").await.unwrap();
        let queries: Vec<&str> = history.iter().map(|e| e.query.as_str()).collect();
        assert_eq!(queries, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_authority_decides_equal_relevance() {
        // A -> B, A -> C, B -> C, C -> A
        let mut graph = LinkGraph::new();
        graph.add_edge("A", "B");
        graph.add_edge("A", "C");
        graph.add_edge("B", "C");
        graph.add_edge("C", "A");

        let authority = PageRankScorer::new(PageRankConfig::default()).compute(&graph).scores;
        assert!(authority.score("C") > authority.score("B"));

        let backend = Arc::new(MockBackend::new().with_hits(vec![
            hit("A", 2.0, authority.score("A")),
            hit("B", 2.0, authority.score("B")),
            hit("C", 2.0, authority.score("C")),
        ]));
        let ranker = ranker(backend, Arc::new(InMemoryQueryLog::new()));

        let request = SearchRequest {
            query: "campus".into(),
            mode: QueryMode::Phrase,
            user: None,
            limit: 4,
        };
        let results = ranker.search(&request).await.unwrap();

        let position = |url: &str| results.iter().position(|r| r.url == url).unwrap();
        assert!(position("C") < position("B"));
        assert_eq!(results[0].url, "C");
    }
}

//! Elasticsearch REST client
//!
//! Builds `function_score` queries, completion suggestions, and `_bulk`
//! NDJSON bodies over plain `reqwest`.

use super::{
    BulkFailure, BulkReport, CompositeQuery, RelevanceClause, SearchBackend, SearchHit,
};
use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use crate::models::IndexedPage;
use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

/// Field queried by the relevance clause and the history boost
pub const TEXT_FIELD: &str = "text";

/// Field holding completion inputs
pub const SUGGEST_FIELD: &str = "suggest";

const SUGGESTION_NAME: &str = "page_suggest";

/// Elasticsearch-backed search service client
pub struct ElasticsearchClient {
    client: reqwest::Client,
    base_url: String,
    index: String,
    bulk_timeout: Duration,
    fuzziness: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Deserialize)]
struct HitsEnvelope {
    hits: Vec<RawHit>,
}

#[derive(Deserialize)]
struct RawHit {
    #[serde(rename = "_score")]
    score: Option<f64>,
    #[serde(rename = "_source")]
    source: IndexedPage,
}

#[derive(Deserialize)]
struct SuggestResponse {
    #[serde(default)]
    suggest: HashMap<String, Vec<SuggestEntry>>,
}

#[derive(Deserialize)]
struct SuggestEntry {
    #[serde(default)]
    options: Vec<SuggestOption>,
}

#[derive(Deserialize)]
struct SuggestOption {
    text: String,
}

#[derive(Deserialize)]
struct BulkResponse {
    #[serde(default)]
    errors: bool,
    #[serde(default)]
    items: Vec<HashMap<String, BulkItem>>,
}

#[derive(Deserialize)]
struct BulkItem {
    #[serde(rename = "_id", default)]
    id: Option<String>,
    #[serde(default)]
    error: Option<BulkItemError>,
}

#[derive(Deserialize)]
struct BulkItemError {
    #[serde(default)]
    reason: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

impl ElasticsearchClient {
    /// Create a new client from configuration
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.search_service.url.trim_end_matches('/').to_string(),
            index: config.search_service.index.clone(),
            bulk_timeout: config.bulk_timeout(),
            fuzziness: config.ranking.suggest_fuzziness.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Request body for a composite ranked query
    pub fn search_body(query: &CompositeQuery) -> Value {
        let relevance = match &query.relevance {
            RelevanceClause::Phrase(phrase) => json!({
                "match_phrase": { TEXT_FIELD: { "query": phrase } }
            }),
            RelevanceClause::Wildcard(pattern) => json!({
                "wildcard": { TEXT_FIELD: { "value": pattern, "case_insensitive": true } }
            }),
        };

        let mut functions = vec![json!({
            "field_value_factor": {
                "field": query.authority.field,
                "factor": query.authority.factor,
                "modifier": query.authority.modifier.as_str(),
                "missing": query.authority.missing,
            }
        })];

        if let Some(history) = &query.history {
            functions.push(json!({
                "filter": { "terms": { history.field.as_str(): history.terms } },
                "weight": history.weight,
            }));
        }

        json!({
            "size": query.size,
            "query": {
                "function_score": {
                    "query": relevance,
                    "functions": functions,
                    "boost_mode": "multiply",
                }
            }
        })
    }

    /// Request body for prefix completion
    pub fn suggest_body(prefix: &str, size: usize, fuzziness: &str) -> Value {
        json!({
            "_source": false,
            "suggest": {
                SUGGESTION_NAME: {
                    "prefix": prefix,
                    "completion": {
                        "field": SUGGEST_FIELD,
                        "fuzzy": { "fuzziness": fuzziness },
                        "size": size,
                    }
                }
            }
        })
    }

    /// Index mapping for ranked pages
    pub fn index_mapping() -> Value {
        json!({
            "mappings": {
                "properties": {
                    "title": { "type": "text" },
                    "url": { "type": "keyword" },
                    "text": { "type": "text" },
                    "linksurl": { "type": "keyword" },
                    "pagerank": { "type": "float" },
                    "suggest": { "type": "completion" },
                }
            }
        })
    }

    /// NDJSON body for `_bulk`; the URL doubles as document id so re-uploads overwrite
    pub fn bulk_body(index: &str, pages: &[IndexedPage]) -> Result<String> {
        let mut body = String::new();
        for page in pages {
            let action = json!({ "index": { "_index": index, "_id": page.url } });
            body.push_str(&serde_json::to_string(&action)?);
            body.push('\n');
            body.push_str(&serde_json::to_string(page)?);
            body.push('\n');
        }
        Ok(body)
    }

    /// Map transport failures and non-success statuses into `AppError`
    async fn check(&self, result: reqwest::Result<Response>, what: &str) -> Result<Response> {
        let response = result?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream {
                status: status.as_u16(),
                message: format!("{}: {}", what, body),
            });
        }

        Ok(response)
    }

    fn collect_bulk_failures(pages: &[IndexedPage], response: BulkResponse) -> BulkReport {
        if !response.errors {
            return BulkReport { indexed: response.items.len(), failures: Vec::new() };
        }

        let mut report = BulkReport::default();
        for (position, item) in response.items.into_iter().enumerate() {
            let Some(result) = item.into_values().next() else { continue };

            match result.error {
                Some(error) => {
                    let url = result
                        .id
                        .or_else(|| pages.get(position).map(|p| p.url.clone()))
                        .unwrap_or_default();
                    let reason = error
                        .reason
                        .or(error.kind)
                        .unwrap_or_else(|| "Unknown error".to_string());
                    report.failures.push(BulkFailure { url, reason });
                }
                _ => report.indexed += 1,
            }
        }
        report
    }
}

#[async_trait]
impl SearchBackend for ElasticsearchClient {
    async fn ping(&self) -> Result<()> {
        let result = self.client.head(self.url("/")).send().await;
        self.check(result, "ping").await?;
        Ok(())
    }

    async fn search(&self, query: &CompositeQuery) -> Result<Vec<SearchHit>> {
        let result = self
            .client
            .post(self.url(&format!("{}/_search", self.index)))
            .json(&Self::search_body(query))
            .send()
            .await;
        let response = self.check(result, "search").await?;

        let parsed: SearchResponse = response.json().await?;

        Ok(parsed
            .hits
            .hits
            .into_iter()
            .map(|hit| SearchHit {
                score: hit.score.unwrap_or(0.0),
                page: hit.source,
            })
            .collect())
    }

    async fn suggest(&self, prefix: &str, size: usize) -> Result<Vec<String>> {
        let result = self
            .client
            .post(self.url(&format!("{}/_search", self.index)))
            .json(&Self::suggest_body(prefix, size, &self.fuzziness))
            .send()
            .await;
        let response = self.check(result, "suggest").await?;

        let mut parsed: SuggestResponse = response.json().await?;

        Ok(parsed
            .suggest
            .remove(SUGGESTION_NAME)
            .and_then(|entries| entries.into_iter().next())
            .map(|entry| entry.options.into_iter().map(|o| o.text).collect())
            .unwrap_or_default())
    }

    async fn ensure_index(&self) -> Result<bool> {
        let exists = self.client.head(self.url(&self.index)).send().await?;

        match exists.status() {
            status if status.is_success() => {
                tracing::info!(index = %self.index, "Index already exists");
                Ok(false)
            }
            StatusCode::NOT_FOUND => {
                let result = self
                    .client
                    .put(self.url(&self.index))
                    .json(&Self::index_mapping())
                    .send()
                    .await;
                self.check(result, "create index").await?;
                tracing::info!(index = %self.index, "Index created");
                Ok(true)
            }
            status => Err(AppError::Upstream {
                status: status.as_u16(),
                message: format!("index lookup for '{}'", self.index),
            }),
        }
    }

    async fn bulk_index(&self, pages: &[IndexedPage]) -> Result<BulkReport> {
        if pages.is_empty() {
            return Ok(BulkReport::default());
        }

        let body = Self::bulk_body(&self.index, pages)?;
        let result = self
            .client
            .post(self.url("_bulk"))
            .timeout(self.bulk_timeout)
            .header("Content-Type", "application/x-ndjson")
            .body(body)
            .send()
            .await;
        let response = self.check(result, "bulk").await?;

        let parsed: BulkResponse = response.json().await.map_err(|e| AppError::BulkIndex {
            message: format!("malformed bulk response: {}", e),
        })?;

        Ok(Self::collect_bulk_failures(pages, parsed))
    }

    fn name(&self) -> &str {
        "elasticsearch"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BoostModifier, FieldValueBoost, TermsBoost};

    fn query(history: Option<TermsBoost>) -> CompositeQuery {
        CompositeQuery {
            relevance: RelevanceClause::Phrase("library hours".into()),
            authority: FieldValueBoost {
                field: "pagerank".into(),
                factor: 1.0,
                modifier: BoostModifier::Sqrt,
                missing: 1.0,
            },
            history,
            size: 4,
        }
    }

    #[test]
    fn test_search_body_without_history() {
        let body = ElasticsearchClient::search_body(&query(None));
        let fs = &body["query"]["function_score"];

        assert_eq!(body["size"], 4);
        assert_eq!(fs["query"]["match_phrase"]["text"]["query"], "library hours");
        assert_eq!(fs["functions"].as_array().unwrap().len(), 1);
        assert_eq!(fs["functions"][0]["field_value_factor"]["modifier"], "sqrt");
        assert_eq!(fs["functions"][0]["field_value_factor"]["field"], "pagerank");
        assert_eq!(fs["boost_mode"], "multiply");
    }

    #[test]
    fn test_search_body_with_history_and_wildcard() {
        let mut q = query(Some(TermsBoost {
            field: TEXT_FIELD.into(),
            terms: vec!["library".into()],
            weight: 1.5,
        }));
        q.relevance = RelevanceClause::Wildcard("lib*".into());

        let body = ElasticsearchClient::search_body(&q);
        let fs = &body["query"]["function_score"];

        assert_eq!(fs["query"]["wildcard"]["text"]["value"], "lib*");
        assert_eq!(fs["query"]["wildcard"]["text"]["case_insensitive"], true);
        assert_eq!(fs["functions"][1]["filter"]["terms"]["text"][0], "library");
        assert_eq!(fs["functions"][1]["weight"], 1.5);
    }

    #[test]
    fn test_suggest_body() {
        let body = ElasticsearchClient::suggest_body("nank", 5, "AUTO");
        let completion = &body["suggest"]["page_suggest"]["completion"];
        assert_eq!(body["suggest"]["page_suggest"]["prefix"], "nank");
        assert_eq!(completion["size"], 5);
        assert_eq!(completion["fuzzy"]["fuzziness"], "AUTO");
    }

    #[test]
    fn test_bulk_body_is_ndjson() {
        let pages = vec![
            IndexedPage { url: "https://a.example/".into(), pagerank: 0.4, ..Default::default() },
            IndexedPage { url: "https://b.example/".into(), pagerank: 0.6, ..Default::default() },
        ];
        let body = ElasticsearchClient::bulk_body("webrank", &pages).unwrap();
        let lines: Vec<&str> = body.lines().collect();

        assert_eq!(lines.len(), 4);
        let action: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(action["index"]["_id"], "https://a.example/");
        let source: IndexedPage = serde_json::from_str(lines[3]).unwrap();
        assert_eq!(source.pagerank, 0.6);
    }

    #[test]
    fn test_bulk_failures_are_collected() {
        let pages = vec![
            IndexedPage { url: "https://a.example/".into(), ..Default::default() },
            IndexedPage { url: "https://b.example/".into(), ..Default::default() },
        ];
        let response: BulkResponse = serde_json::from_value(json!({
            "errors": true,
            "items": [
                { "index": { "_id": "https://a.example/", "status": 201 } },
                { "index": { "_id": "https://b.example/", "status": 400,
                             "error": { "type": "mapper_parsing_exception", "reason": "bad pagerank" } } }
            ]
        }))
        .unwrap();

        let report = ElasticsearchClient::collect_bulk_failures(&pages, response);
        assert_eq!(report.indexed, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].url, "https://b.example/");
        assert_eq!(report.failures[0].reason, "bad pagerank");
    }

    #[test]
    fn test_parse_search_response() {
        let parsed: SearchResponse = serde_json::from_value(json!({
            "hits": { "hits": [
                { "_score": 2.5, "_source": { "url": "https://a.example/", "title": "A", "pagerank": 0.3 } }
            ] }
        }))
        .unwrap();
        assert_eq!(parsed.hits.hits[0].score, Some(2.5));
        assert_eq!(parsed.hits.hits[0].source.pagerank, 0.3);
    }

    #[tokio::test]
    async fn test_transport_failure_is_service_error() {
        let mut config = AppConfig::default();
        config.search_service.url = "http://127.0.0.1:1".into();
        config.search_service.request_timeout_secs = 2;
        let client = ElasticsearchClient::new(&config).unwrap();

        let err = client.ping().await.unwrap_err();
        assert!(matches!(err, AppError::HttpClient(_)));
        assert!(err.is_service_error());

        let err = client.ensure_index().await.unwrap_err();
        assert!(err.is_service_error());
    }
}

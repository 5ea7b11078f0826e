//! Per-user query history
//!
//! Provides:
//! - [`QueryLog`], the append-only log abstraction
//! - [`FileQueryLog`], the pipe-delimited text file used in production
//! - [`InMemoryQueryLog`] for tests and embedding
//! - [`PersonalizationStore`], which derives history terms from a log

mod file;
mod memory;

pub use file::FileQueryLog;
pub use memory::InMemoryQueryLog;

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};
use webrank_common::errors::{AppError, Result};
use webrank_common::metrics;

/// Timestamp layout used in the log
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Summary of one returned result, as logged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// One logged query with the results it returned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: NaiveDateTime,
    pub username: String,
    pub query: String,
    pub results: Vec<ResultSummary>,
}

impl HistoryEntry {
    /// New entry stamped with the current local time (second precision)
    pub fn new(username: &str, query: &str, results: Vec<ResultSummary>) -> Self {
        let now = Local::now().naive_local();
        let timestamp = now.with_nanosecond(0).unwrap_or(now);

        Self {
            timestamp,
            username: username.to_string(),
            query: query.to_string(),
            results,
        }
    }

    /// Whitespace tokens of the query
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.query.split_whitespace()
    }
}

/// Username as it is keyed in the log
///
/// Field separators and line breaks become spaces and surrounding whitespace
/// is dropped, so every log stores and looks up the same key.
pub fn normalize_username(username: &str) -> String {
    username.replace(['|', '\n', '\r'], " ").trim().to_string()
}

/// Append-only store of history entries
#[async_trait]
pub trait QueryLog: Send + Sync {
    /// Append one entry; the entry lands whole or not at all
    async fn append(&self, entry: &HistoryEntry) -> Result<()>;

    /// Read entries in append order, optionally only one user's
    async fn read_all(&self, username: Option<&str>) -> Result<Vec<HistoryEntry>>;
}

/// Personalization signals derived from the query log
pub struct PersonalizationStore {
    log: Arc<dyn QueryLog>,
}

impl PersonalizationStore {
    pub fn new(log: Arc<dyn QueryLog>) -> Self {
        Self { log }
    }

    /// Log a query and the results it returned
    pub async fn record_query(&self, username: &str, query: &str, results: Vec<ResultSummary>) -> Result<()> {
        let username = normalize_username(username);
        if username.is_empty() {
            return Err(AppError::Validation {
                message: "username must not be blank".to_string(),
                field: Some("username".to_string()),
            });
        }

        let entry = HistoryEntry::new(&username, query, results);
        let outcome = self.log.append(&entry).await;
        metrics::record_history_append(outcome.is_ok());

        if outcome.is_ok() {
            debug!(username = %entry.username, results = entry.results.len(), "Query recorded");
        }
        outcome
    }

    /// Distinct terms of the user's past queries
    ///
    /// A log that cannot be read yields no terms.
    pub async fn history_terms(&self, username: &str) -> HashSet<String> {
        let username = normalize_username(username);
        match self.log.read_all(Some(&username)).await {
            Ok(entries) => entries
                .iter()
                .flat_map(|entry| entry.terms())
                .map(str::to_string)
                .collect(),
            Err(e) => {
                warn!(username = %username, error = %e, "Query history unreadable, skipping personalization");
                HashSet::new()
            }
        }
    }

    /// The user's past queries in the order they were made
    pub async fn queries(&self, username: &str) -> Result<Vec<HistoryEntry>> {
        self.log.read_all(Some(&normalize_username(username))).await
    }
}

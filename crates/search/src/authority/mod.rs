//! Link authority
//!
//! Provides:
//! - Link graph construction from crawl records
//! - PageRank authority scores over that graph
//! - Top-page listings with link counts

mod graph;
mod pagerank;

pub use graph::LinkGraph;
pub use pagerank::{PageRankConfig, PageRankOutcome, PageRankScorer};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Authority score per page URL
///
/// Scores are non-negative and sum to 1 across all graph nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthorityVector {
    scores: HashMap<String, f64>,
}

impl AuthorityVector {
    pub fn new(scores: HashMap<String, f64>) -> Self {
        Self { scores }
    }

    /// Score of a URL, if it is a graph node
    pub fn get(&self, url: &str) -> Option<f64> {
        self.scores.get(url).copied()
    }

    /// Score of a URL; pages outside the graph have no authority
    pub fn score(&self, url: &str) -> f64 {
        self.get(url).unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Sum of all scores
    pub fn total(&self) -> f64 {
        self.scores.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.scores.iter().map(|(url, score)| (url.as_str(), *score))
    }
}

/// Page with its authority score and link counts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPage {
    pub url: String,
    pub authority: f64,
    pub inbound_links: usize,
    pub outbound_links: usize,
}

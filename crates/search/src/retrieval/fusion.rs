//! Weighted score fusion for ranking candidates
//!
//! Relevance and authority live on unrelated scales, so each is min-max
//! normalized across the candidate set before the weighted sum.

use super::normalize::normalize;
use super::{Candidate, RankedResult};
use regex_lite::Regex;
use std::sync::OnceLock;
use webrank_common::config::RankingConfig;
use webrank_common::errors::Result;

/// Fusion weights
#[derive(Debug, Clone)]
pub struct ScoreFusion {
    /// Weight for normalized relevance
    pub relevance_weight: f64,

    /// Weight for normalized authority
    pub authority_weight: f64,
}

impl Default for ScoreFusion {
    fn default() -> Self {
        Self {
            relevance_weight: 0.7,
            authority_weight: 0.3,
        }
    }
}

impl ScoreFusion {
    /// Create with custom weights
    pub fn with_weights(relevance_weight: f64, authority_weight: f64) -> Self {
        Self {
            relevance_weight,
            authority_weight,
        }
    }

    pub fn from_config(config: &RankingConfig) -> Self {
        Self::with_weights(config.relevance_weight, config.authority_weight)
    }

    /// Final score from already-normalized components
    pub fn score(&self, relevance: f64, authority: f64) -> f64 {
        self.relevance_weight * relevance + self.authority_weight * authority
    }

    /// Order candidates by fused score
    ///
    /// Ties keep the order the candidates arrived in.
    pub fn fuse(&self, candidates: Vec<Candidate>, snippet_chars: usize) -> Result<Vec<RankedResult>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let relevance: Vec<f64> = candidates.iter().map(|c| c.relevance).collect();
        let authority: Vec<f64> = candidates.iter().map(|c| c.authority).collect();
        let relevance = normalize(&relevance)?;
        let authority = normalize(&authority)?;

        let mut results: Vec<RankedResult> = candidates
            .into_iter()
            .zip(relevance.iter().zip(&authority))
            .map(|(candidate, (&rel, &auth))| RankedResult {
                snippet: snippet(&candidate.page.text, snippet_chars),
                title: candidate.page.title,
                url: candidate.page.url,
                authority: candidate.authority,
                final_score: self.score(rel, auth),
            })
            .collect();

        // Sort by final score descending; sort_by is stable
        results.sort_by(|a, b| {
            b.final_score
                .partial_cmp(&a.final_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(results)
    }
}

/// First `max_chars` characters of `text`
pub fn snippet(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

/// Single-line snippet for the history log
pub fn log_snippet(text: &str, max_chars: usize) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    let whitespace = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("static pattern"));

    let flattened = whitespace.replace_all(text, " ");
    snippet(flattened.trim(), max_chars)
}

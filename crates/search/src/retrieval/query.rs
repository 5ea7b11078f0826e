//! Composite query construction

use super::{QueryMode, SearchRequest};
use std::collections::HashSet;
use webrank_common::backend::{
    BoostModifier, CompositeQuery, FieldValueBoost, RelevanceClause, TermsBoost, TEXT_FIELD,
};
use webrank_common::config::RankingConfig;
use webrank_common::errors::Result;

/// Builds service queries from requests and history terms
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    authority: FieldValueBoost,
    history_weight: f64,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self {
            authority: FieldValueBoost {
                field: "pagerank".to_string(),
                factor: 1.0,
                modifier: BoostModifier::Sqrt,
                missing: 1.0,
            },
            history_weight: 1.5,
        }
    }
}

impl QueryBuilder {
    /// Builder using the configured authority field, modifier, and history weight
    pub fn from_config(config: &RankingConfig) -> Result<Self> {
        Ok(Self {
            authority: FieldValueBoost {
                field: config.authority_field.clone(),
                factor: 1.0,
                modifier: config.authority_modifier.parse()?,
                missing: 1.0,
            },
            history_weight: config.history_boost,
        })
    }

    /// Composite query for a request; `size` caps the candidates fetched
    pub fn build(&self, request: &SearchRequest, history_terms: &HashSet<String>, size: usize) -> CompositeQuery {
        let relevance = match request.mode {
            QueryMode::Phrase => RelevanceClause::Phrase(request.query.clone()),
            QueryMode::Wildcard => RelevanceClause::Wildcard(request.query.to_lowercase()),
        };

        let history = if history_terms.is_empty() {
            None
        } else {
            let mut terms: Vec<String> = history_terms.iter().cloned().collect();
            terms.sort();
            Some(TermsBoost {
                field: TEXT_FIELD.to_string(),
                terms,
                weight: self.history_weight,
            })
        };

        CompositeQuery {
            relevance,
            authority: self.authority.clone(),
            history,
            size,
        }
    }
}

//! WebRank ranking engine
//!
//! Provides:
//! - Link graph construction and PageRank authority scoring
//! - Min-max normalization and weighted fusion of relevance and authority
//! - Per-user query history feeding a personalization boost
//! - Ranked search and prefix completion over an injected search backend

pub mod authority;
pub mod personalization;
pub mod retrieval;

pub use authority::{AuthorityVector, LinkGraph, PageRankConfig, PageRankOutcome, PageRankScorer, ScoredPage};
pub use personalization::{FileQueryLog, HistoryEntry, InMemoryQueryLog, PersonalizationStore, QueryLog};
pub use retrieval::{QueryMode, RankedResult, Ranker, SearchRequest};

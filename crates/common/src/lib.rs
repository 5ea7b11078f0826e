//! WebRank Common Library
//!
//! Shared code for the WebRank binaries including:
//! - Configuration management
//! - Error types and handling
//! - Page models for crawl snapshots and the search index
//! - Search service client abstraction
//! - Registered users
//! - Metrics and tracing setup

pub mod auth;
pub mod backend;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod models;
pub mod telemetry;

// Re-export commonly used types
pub use backend::{SearchBackend, SearchHit};
pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use models::{CrawlRecord, IndexedPage};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

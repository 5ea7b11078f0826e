//! In-memory query log

use super::{HistoryEntry, QueryLog};
use async_trait::async_trait;
use tokio::sync::RwLock;
use webrank_common::errors::Result;

/// Query log held in process memory
#[derive(Default)]
pub struct InMemoryQueryLog {
    entries: RwLock<Vec<HistoryEntry>>,
}

impl InMemoryQueryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl QueryLog for InMemoryQueryLog {
    async fn append(&self, entry: &HistoryEntry) -> Result<()> {
        self.entries.write().await.push(entry.clone());
        Ok(())
    }

    async fn read_all(&self, username: Option<&str>) -> Result<Vec<HistoryEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|entry| username.map_or(true, |u| entry.username == u))
            .cloned()
            .collect())
    }
}

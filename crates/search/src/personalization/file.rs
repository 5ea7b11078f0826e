//! Pipe-delimited history file
//!
//! Each entry is one query line followed by one line per returned result:
//!
//! ```text
//! 2024-05-01 10:00:00 | alice | library hours
//! 2024-05-01 10:00:00 | alice | Library | https://lib.example/ | Opening hours for...
//! ```

use super::{HistoryEntry, QueryLog, ResultSummary, TIMESTAMP_FORMAT};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::warn;
use webrank_common::errors::{AppError, Result};

const FIELD_SEPARATOR: char = '|';

/// Append-only query log in a text file
pub struct FileQueryLog {
    path: PathBuf,

    /// Serializes appends from this process
    write_lock: Mutex<()>,
}

impl FileQueryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn storage_error(&self, e: impl std::fmt::Display) -> AppError {
        AppError::Storage {
            path: self.path.display().to_string(),
            message: e.to_string(),
        }
    }
}

#[async_trait]
impl QueryLog for FileQueryLog {
    async fn append(&self, entry: &HistoryEntry) -> Result<()> {
        let payload = render(entry);
        let path = self.path.clone();

        let _guard = self.write_lock.lock().await;

        // One write of the whole entry on an O_APPEND handle
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)?;
            file.write_all(payload.as_bytes())
        })
        .await
        .map_err(|e| AppError::Internal {
            message: format!("history writer task failed: {}", e),
        })?
        .map_err(|e| self.storage_error(e))
    }

    async fn read_all(&self, username: Option<&str>) -> Result<Vec<HistoryEntry>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.storage_error(e)),
        };

        let mut entries = parse(&contents);
        if let Some(username) = username {
            // Same key the writer produced
            let key = sanitize(username);
            let key = key.trim();
            entries.retain(|entry| entry.username == key);
        }
        Ok(entries)
    }
}

/// Replace characters that would break the line format
fn sanitize(field: &str) -> String {
    field
        .chars()
        .map(|c| match c {
            FIELD_SEPARATOR | '\n' | '\r' => ' ',
            other => other,
        })
        .collect()
}

fn render(entry: &HistoryEntry) -> String {
    let timestamp = entry.timestamp.format(TIMESTAMP_FORMAT).to_string();
    let username = sanitize(&entry.username);

    let mut out = format!("{} | {} | {}\n", timestamp, username, sanitize(&entry.query));
    for result in &entry.results {
        out.push_str(&format!(
            "{} | {} | {} | {} | {}\n",
            timestamp,
            username,
            sanitize(&result.title),
            sanitize(&result.url),
            sanitize(&result.snippet),
        ));
    }
    out
}

fn parse(contents: &str) -> Vec<HistoryEntry> {
    let mut entries: Vec<HistoryEntry> = Vec::new();
    let mut skipped = 0usize;

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(FIELD_SEPARATOR).map(str::trim).collect();
        let Ok(timestamp) = NaiveDateTime::parse_from_str(fields[0], TIMESTAMP_FORMAT) else {
            skipped += 1;
            continue;
        };

        match fields.as_slice() {
            [_, username, query] => entries.push(HistoryEntry {
                timestamp,
                username: username.to_string(),
                query: query.to_string(),
                results: Vec::new(),
            }),
            [_, username, title, url, snippet] => match entries.last_mut() {
                Some(last) if last.timestamp == timestamp && last.username == *username => {
                    last.results.push(ResultSummary {
                        title: title.to_string(),
                        url: url.to_string(),
                        snippet: snippet.to_string(),
                    });
                }
                // Result line without its query line
                _ => skipped += 1,
            },
            _ => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!(skipped, "Skipped malformed history lines");
    }
    entries
}

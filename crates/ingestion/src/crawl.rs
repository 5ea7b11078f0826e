//! Snapshot file I/O
//!
//! Crawl snapshots and ranked page files are either JSON Lines (one object
//! per line) or CSV with a header row, chosen by the `.csv` extension.
//! Malformed lines and rows are skipped and counted rather than failing the run.

use crate::errors::IngestionError;
use serde::de::DeserializeOwned;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use webrank_common::models::IndexedPage;

/// Column order of ranked page CSV files
const PAGE_COLUMNS: [&str; 6] = ["title", "url", "text", "linksurl", "pagerank", "suggest"];

/// On-disk layout of a snapshot file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    JsonLines,
    Csv,
}

impl SnapshotFormat {
    /// `.csv` files are CSV, anything else is JSON Lines
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => SnapshotFormat::Csv,
            _ => SnapshotFormat::JsonLines,
        }
    }
}

/// Records parsed from a snapshot file
#[derive(Debug)]
pub struct Parsed<T> {
    pub items: Vec<T>,

    /// Non-blank lines or rows that did not decode
    pub malformed: usize,
}

/// Read and decode every record of a snapshot file
pub async fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Parsed<T>, IngestionError> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| IngestionError::SnapshotRead {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

    let format = SnapshotFormat::from_path(path);
    let parsed = match format {
        SnapshotFormat::JsonLines => parse_lines(&contents),
        SnapshotFormat::Csv => parse_csv(&contents),
    };
    if parsed.malformed > 0 {
        warn!(
            path = %path.display(),
            ?format,
            malformed = parsed.malformed,
            "Skipped malformed records"
        );
    }
    Ok(parsed)
}

pub fn parse_lines<T: DeserializeOwned>(contents: &str) -> Parsed<T> {
    let mut items = Vec::new();
    let mut malformed = 0usize;

    for (index, line) in contents.lines().enumerate() {
        // Tolerate a byte-order mark on the first line
        let line = line.trim_start_matches('\u{feff}').trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str(line) {
            Ok(item) => items.push(item),
            Err(e) => {
                debug!(line = index + 1, error = %e, "Malformed line");
                malformed += 1;
            }
        }
    }

    Parsed { items, malformed }
}

/// Decode CSV rows by header name; unknown columns are ignored
pub fn parse_csv<T: DeserializeOwned>(contents: &str) -> Parsed<T> {
    let contents = contents.trim_start_matches('\u{feff}');
    let mut reader = csv::ReaderBuilder::new().from_reader(contents.as_bytes());

    let mut items = Vec::new();
    let mut malformed = 0usize;

    for (index, row) in reader.deserialize::<T>().enumerate() {
        match row {
            Ok(item) => items.push(item),
            Err(e) => {
                // Row numbers count the header as row 1
                debug!(row = index + 2, error = %e, "Malformed row");
                malformed += 1;
            }
        }
    }

    Parsed { items, malformed }
}

/// Write pages in the format implied by `path`, replacing any existing file
pub async fn write_pages(path: &Path, pages: &[IndexedPage]) -> Result<(), IngestionError> {
    let write_error = |e: &dyn std::fmt::Display| IngestionError::OutputWrite {
        path: path.display().to_string(),
        message: e.to_string(),
    };

    let buffer = match SnapshotFormat::from_path(path) {
        SnapshotFormat::JsonLines => render_lines(pages).map_err(|e| write_error(&e))?,
        SnapshotFormat::Csv => render_csv(pages).map_err(|e| write_error(&e))?,
    };

    let mut file = tokio::fs::File::create(path).await.map_err(|e| write_error(&e))?;
    file.write_all(&buffer).await.map_err(|e| write_error(&e))?;
    file.flush().await.map_err(|e| write_error(&e))?;
    Ok(())
}

fn render_lines(pages: &[IndexedPage]) -> Result<Vec<u8>, serde_json::Error> {
    let mut buffer = Vec::new();
    for page in pages {
        serde_json::to_writer(&mut buffer, page)?;
        buffer.push(b'\n');
    }
    Ok(buffer)
}

fn render_csv(pages: &[IndexedPage]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(PAGE_COLUMNS)?;

    for page in pages {
        let pagerank = page.pagerank.to_string();
        writer.write_record([
            page.title.as_str(),
            page.url.as_str(),
            page.text.as_str(),
            page.linksurl.as_str(),
            pagerank.as_str(),
            page.suggest.as_deref().unwrap_or(""),
        ])?;
    }

    writer.into_inner().map_err(|e| e.into_error().into())
}

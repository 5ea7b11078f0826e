//! Ingestion jobs
//!
//! - [`RankingJob`]: crawl snapshot -> link graph -> authority -> ranked pages
//! - [`UploadJob`]: ranked pages -> search service, in concurrent bulk batches

use crate::crawl::{read_records, write_pages, Parsed};
use crate::errors::IngestionError;
use crate::suggest::generate_suggestion;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use webrank_common::backend::{BulkFailure, BulkReport, SearchBackend};
use webrank_common::metrics;
use webrank_common::models::{CrawlRecord, IndexedPage};
use webrank_search::{LinkGraph, PageRankConfig, PageRankScorer};

/// Pages listed in the ranking summary log
const SUMMARY_TOP_PAGES: usize = 10;

/// Outcome of a ranking run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RankingSummary {
    /// Records decoded from the snapshot
    pub records: usize,

    /// Snapshot lines that were not valid records
    pub malformed: usize,

    /// Records dropped for lacking a URL
    pub without_url: usize,

    pub nodes: usize,
    pub edges: usize,
    pub iterations: usize,
    pub converged: bool,

    /// Pages written to the output
    pub written: usize,
}

/// Computes authority for a crawl snapshot
pub struct RankingJob {
    scorer: PageRankScorer,
    with_suggest: bool,
}

impl RankingJob {
    pub fn new(config: PageRankConfig, with_suggest: bool) -> Self {
        Self {
            scorer: PageRankScorer::new(config),
            with_suggest,
        }
    }

    /// Attach authority (and optionally a suggestion) to every record with a URL
    pub fn rank_records(&self, records: Vec<CrawlRecord>) -> (Vec<IndexedPage>, RankingSummary) {
        let graph = LinkGraph::from_records(&records);
        let outcome = self.scorer.compute(&graph);

        for page in PageRankScorer::top_pages(&graph, &outcome.scores, SUMMARY_TOP_PAGES) {
            info!(
                url = %page.url,
                authority = page.authority,
                inbound = page.inbound_links,
                outbound = page.outbound_links,
                "Top page"
            );
        }

        let mut summary = RankingSummary {
            records: records.len(),
            nodes: graph.node_count(),
            edges: graph.edge_count(),
            iterations: outcome.iterations,
            converged: outcome.converged,
            ..RankingSummary::default()
        };

        let mut pages = Vec::with_capacity(records.len());
        for record in records {
            let pagerank = record
                .canonical_url()
                .map(|url| outcome.scores.score(url))
                .unwrap_or(0.0);

            match IndexedPage::from_record(record, pagerank) {
                Some(mut page) => {
                    if self.with_suggest {
                        page.suggest = generate_suggestion(&page.title);
                    }
                    pages.push(page);
                }
                None => summary.without_url += 1,
            }
        }

        summary.written = pages.len();
        (pages, summary)
    }

    /// Read a snapshot, rank it, and write the ranked pages
    #[instrument(skip(self), fields(input = %input.display(), output = %output.display()))]
    pub async fn run(&self, input: &Path, output: &Path) -> Result<RankingSummary, IngestionError> {
        info!("Reading crawl snapshot");
        let Parsed { items, malformed } = read_records::<CrawlRecord>(input).await?;

        let (pages, mut summary) = self.rank_records(items);
        summary.malformed = malformed;

        write_pages(output, &pages).await?;

        info!(
            records = summary.records,
            malformed = summary.malformed,
            without_url = summary.without_url,
            nodes = summary.nodes,
            edges = summary.edges,
            written = summary.written,
            "Ranking complete"
        );
        Ok(summary)
    }
}

/// Outcome of an upload run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UploadSummary {
    /// Pages read from the input
    pub pages: usize,

    /// Input lines that were not valid pages
    pub malformed: usize,

    /// True when the index had to be created
    pub index_created: bool,

    pub report: BulkReport,
}

/// Bulk indexes ranked pages
pub struct UploadJob {
    backend: Arc<dyn SearchBackend>,
    batch_size: usize,
    concurrency: usize,
}

impl UploadJob {
    pub fn new(backend: Arc<dyn SearchBackend>, batch_size: usize, concurrency: usize) -> Self {
        Self {
            backend,
            batch_size: batch_size.max(1),
            concurrency: concurrency.max(1),
        }
    }

    /// Index pages in batches
    ///
    /// A batch whose request fails counts all of its pages as failed; the
    /// remaining batches still run.
    pub async fn upload(&self, pages: &[IndexedPage]) -> BulkReport {
        let reports: Vec<BulkReport> = stream::iter(pages.chunks(self.batch_size))
            .map(|batch| async move {
                match self.backend.bulk_index(batch).await {
                    Ok(report) => report,
                    Err(e) => {
                        error!(batch_size = batch.len(), error = %e, "Bulk request failed");
                        BulkReport {
                            indexed: 0,
                            failures: batch
                                .iter()
                                .map(|page| BulkFailure {
                                    url: page.url.clone(),
                                    reason: e.to_string(),
                                })
                                .collect(),
                        }
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut total = BulkReport::default();
        for report in reports {
            total.merge(report);
        }

        metrics::record_bulk_index(total.indexed, total.failures.len());
        total
    }

    /// Read ranked pages, make sure the index exists, and upload
    #[instrument(skip(self), fields(input = %input.display(), backend = self.backend.name()))]
    pub async fn run(&self, input: &Path) -> Result<UploadSummary, IngestionError> {
        let Parsed { items, malformed } = read_records::<IndexedPage>(input).await?;

        let index_created = self.backend.ensure_index().await?;
        if index_created {
            info!("Created page index");
        }

        info!(pages = items.len(), batch_size = self.batch_size, "Uploading pages");
        let report = self.upload(&items).await;

        for failure in &report.failures {
            warn!(url = %failure.url, reason = %failure.reason, "Page not indexed");
        }
        info!(
            indexed = report.indexed,
            failed = report.failures.len(),
            "Upload complete"
        );

        Ok(UploadSummary {
            pages: items.len(),
            malformed,
            index_created,
            report,
        })
    }
}

/// Write pages the service rejected, with reasons, as a JSON array
pub async fn write_failures(path: &Path, failures: &[BulkFailure]) -> Result<(), IngestionError> {
    let json = serde_json::to_string_pretty(failures).map_err(|e| IngestionError::OutputWrite {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    tokio::fs::write(path, json).await?;
    info!(path = %path.display(), failed = failures.len(), "Failed pages written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use webrank_common::backend::MockBackend;

    fn record(url: Option<&str>, title: &str, links: &str) -> CrawlRecord {
        CrawlRecord {
            url: url.map(str::to_string),
            title: title.to_string(),
            text: format!("{} body", title),
            linksurl: links.to_string(),
        }
    }

    fn page(url: &str) -> IndexedPage {
        IndexedPage {
            url: url.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_rank_records() {
        let job = RankingJob::new(PageRankConfig::default(), true);
        let (pages, summary) = job.rank_records(vec![
            record(Some("A"), "Alpha Home Page", "B;C"),
            record(Some("B"), "Beta", "C"),
            record(Some("C"), "", "A"),
            record(None, "Orphan", "A"),
        ]);

        assert_eq!(summary.records, 4);
        assert_eq!(summary.without_url, 1);
        assert_eq!(summary.written, 3);
        assert_eq!(summary.nodes, 3);
        assert_eq!(summary.edges, 4);

        let total: f64 = pages.iter().map(|p| p.pagerank).sum();
        assert!((total - 1.0).abs() < 1e-4);

        let c = pages.iter().find(|p| p.url == "C").unwrap();
        let b = pages.iter().find(|p| p.url == "B").unwrap();
        assert!(c.pagerank > b.pagerank);

        assert_eq!(pages[0].suggest.as_deref(), Some("Alpha Home..."));
        assert_eq!(pages[1].suggest.as_deref(), Some("Beta..."));
        assert_eq!(pages[2].suggest, None);
    }

    #[test]
    fn test_rank_without_suggest() {
        let job = RankingJob::new(PageRankConfig::default(), false);
        let (pages, _) = job.rank_records(vec![record(Some("A"), "Alpha Home", "")]);
        assert_eq!(pages[0].suggest, None);
        assert!((pages[0].pagerank - 1.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_ranking_run_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("crawl.jsonl");
        let output = dir.path().join("ranked.jsonl");
        std::fs::write(
            &input,
            "{\"url\":\"A\",\"title\":\"Alpha\",\"linksurl\":\"B\"}\n\
             {broken\n\
             {\"url\":\"B\",\"title\":\"Beta\",\"linksurl\":\"A\"}\n",
        )
        .unwrap();

        let summary = RankingJob::new(PageRankConfig::default(), false)
            .run(&input, &output)
            .await
            .unwrap();

        assert_eq!(summary.malformed, 1);
        assert_eq!(summary.written, 2);

        let written = std::fs::read_to_string(&output).unwrap();
        let pages: Vec<IndexedPage> = written
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert!((pages[0].pagerank - 0.5).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_ranking_run_over_crawler_csv() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("crawl.csv");
        let output = dir.path().join("ranked.csv");
        std::fs::write(
            &input,
            "\u{feff}title,url,text,linksurl\n\
             Alpha Home Page,A,alpha body,B\n\
             Beta,B,beta body,A\n",
        )
        .unwrap();

        let summary = RankingJob::new(PageRankConfig::default(), true)
            .run(&input, &output)
            .await
            .unwrap();
        assert_eq!(summary.written, 2);

        let ranked: Parsed<IndexedPage> = read_records(&output).await.unwrap();
        assert_eq!(ranked.items.len(), 2);
        assert!((ranked.items[0].pagerank - 0.5).abs() < 1e-6);
        assert_eq!(ranked.items[0].suggest.as_deref(), Some("Alpha Home..."));
    }

    #[tokio::test]
    async fn test_upload_collects_partial_failures() {
        let backend = Arc::new(MockBackend::new().rejecting("b"));
        let job = UploadJob::new(backend.clone(), 2, 2);

        let report = job.upload(&[page("a"), page("b"), page("c"), page("d"), page("e")]).await;

        assert_eq!(report.indexed, 4);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].url, "b");
        assert_eq!(backend.indexed_pages().await.len(), 4);
    }

    #[tokio::test]
    async fn test_failed_batches_count_every_page() {
        let job = UploadJob::new(Arc::new(MockBackend::new().failing()), 2, 1);
        let report = job.upload(&[page("a"), page("b"), page("c")]).await;

        assert_eq!(report.indexed, 0);
        assert_eq!(report.failures.len(), 3);
    }

    #[tokio::test]
    async fn test_upload_run_requires_service() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("ranked.jsonl");
        std::fs::write(&input, "{\"url\":\"a\",\"pagerank\":0.5}\n").unwrap();

        let down = UploadJob::new(Arc::new(MockBackend::new().failing()), 10, 1);
        assert!(matches!(down.run(&input).await, Err(IngestionError::Service(_))));

        let up = UploadJob::new(Arc::new(MockBackend::new()), 10, 1);
        let summary = up.run(&input).await.unwrap();
        assert_eq!(summary.pages, 1);
        assert_eq!(summary.report.indexed, 1);
    }

    #[tokio::test]
    async fn test_write_failures() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("failed.json");
        let failures = vec![BulkFailure {
            url: "b".into(),
            reason: "bad pagerank".into(),
        }];

        write_failures(&path, &failures).await.unwrap();
        let written: Vec<BulkFailure> = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, failures);

        let missing_dir = dir.path().join("absent").join("failed.json");
        assert!(matches!(
            write_failures(&missing_dir, &failures).await,
            Err(IngestionError::IoError(_))
        ));
    }
}

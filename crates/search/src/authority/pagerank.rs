//! PageRank authority scoring
//!
//! Power iteration on the random-surfer model. Dangling pages spread their
//! mass uniformly so every iterate stays a probability distribution.

use super::{AuthorityVector, LinkGraph, ScoredPage};
use rayon::prelude::*;
use tracing::{debug, info, warn};
use webrank_common::config::AuthorityConfig;
use webrank_common::metrics;

/// Graphs smaller than this are updated on the calling thread
const PARALLEL_THRESHOLD: usize = 1024;

/// PageRank configuration
#[derive(Debug, Clone)]
pub struct PageRankConfig {
    /// Damping factor (typically 0.85)
    pub damping: f64,

    /// Maximum iterations
    pub max_iterations: usize,

    /// Convergence threshold on the L1 change between iterates
    pub tolerance: f64,

    /// Spread the per-node update over the rayon pool
    pub parallel: bool,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            damping: 0.85,
            max_iterations: 100,
            tolerance: 1e-6,
            parallel: true,
        }
    }
}

impl From<&AuthorityConfig> for PageRankConfig {
    fn from(config: &AuthorityConfig) -> Self {
        Self {
            damping: config.damping,
            max_iterations: config.max_iterations,
            tolerance: config.tolerance,
            parallel: config.parallel,
        }
    }
}

/// Result of one authority computation
#[derive(Debug, Clone)]
pub struct PageRankOutcome {
    pub scores: AuthorityVector,

    /// Update steps performed
    pub iterations: usize,

    /// False when the iteration cap was hit first
    pub converged: bool,

    /// L1 change of the final step
    pub residual: f64,
}

/// PageRank scorer for pages
pub struct PageRankScorer {
    config: PageRankConfig,
}

impl PageRankScorer {
    /// Create a new scorer
    pub fn new(config: PageRankConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PageRankConfig {
        &self.config
    }

    /// Compute authority for every node of the graph
    pub fn compute(&self, graph: &LinkGraph) -> PageRankOutcome {
        let n = graph.node_count();
        if n == 0 {
            return PageRankOutcome {
                scores: AuthorityVector::default(),
                iterations: 0,
                converged: true,
                residual: 0.0,
            };
        }

        let mut rank = vec![1.0 / n as f64; n];
        let mut iterations = 0;
        let mut residual = f64::INFINITY;

        while iterations < self.config.max_iterations {
            let next = self.step(graph, &rank);
            residual = l1_distance(&next, &rank);
            rank = next;
            iterations += 1;

            if residual < self.config.tolerance {
                break;
            }
        }

        let converged = residual < self.config.tolerance;
        if converged {
            debug!(iterations, residual, "PageRank converged");
        } else {
            warn!(
                iterations,
                residual,
                tolerance = self.config.tolerance,
                "PageRank hit the iteration cap, returning last iterate"
            );
        }

        metrics::record_authority_run(n, iterations, converged);
        info!(nodes = n, edges = graph.edge_count(), iterations, converged, "Authority computed");

        let scores = graph
            .urls()
            .iter()
            .cloned()
            .zip(rank)
            .collect();

        PageRankOutcome {
            scores: AuthorityVector::new(scores),
            iterations,
            converged,
            residual,
        }
    }

    /// One synchronous update; reads only `rank`, the previous iterate
    pub fn step(&self, graph: &LinkGraph, rank: &[f64]) -> Vec<f64> {
        let n = rank.len();
        let n_f64 = n as f64;
        let damping = self.config.damping;

        let dangling_mass: f64 = (0..n)
            .filter(|&id| graph.is_dangling(id))
            .map(|id| rank[id])
            .sum();
        let base = (1.0 - damping) / n_f64 + damping * dangling_mass / n_f64;

        let update = |node: usize| -> f64 {
            let inbound: f64 = graph
                .incoming(node)
                .iter()
                .map(|&source| rank[source] / graph.out_degree(source) as f64)
                .sum();
            base + damping * inbound
        };

        if self.config.parallel && n >= PARALLEL_THRESHOLD {
            (0..n).into_par_iter().map(update).collect()
        } else {
            (0..n).map(update).collect()
        }
    }

    /// Score and list the highest-authority pages
    pub fn rank(&self, graph: &LinkGraph, limit: usize) -> Vec<ScoredPage> {
        let outcome = self.compute(graph);
        Self::top_pages(graph, &outcome.scores, limit)
    }

    /// List the highest-authority pages of an already scored graph
    pub fn top_pages(graph: &LinkGraph, scores: &AuthorityVector, limit: usize) -> Vec<ScoredPage> {
        let mut pages: Vec<ScoredPage> = graph
            .urls()
            .iter()
            .enumerate()
            .map(|(id, url)| ScoredPage {
                url: url.clone(),
                authority: scores.score(url),
                inbound_links: graph.in_degree(id),
                outbound_links: graph.out_degree(id),
            })
            .collect();

        // Sort by authority descending, URL for a stable listing
        pages.sort_by(|a, b| {
            b.authority
                .partial_cmp(&a.authority)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.url.cmp(&b.url))
        });

        pages.truncate(limit);
        pages
    }
}

fn l1_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
}

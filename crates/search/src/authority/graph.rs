//! Link graph representation
//!
//! Provides the in-memory directed graph built from a crawl snapshot

use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};
use webrank_common::models::CrawlRecord;

/// Directed graph of pages and their distinct outbound links
///
/// URLs are interned to dense indices so the power iteration can work on
/// plain vectors.
#[derive(Debug, Clone, Default)]
pub struct LinkGraph {
    /// URL -> node index
    index: HashMap<String, usize>,

    /// Node index -> URL
    urls: Vec<String>,

    /// Adjacency list: node -> distinct link targets
    outgoing: Vec<Vec<usize>>,

    /// Reverse adjacency: node -> distinct pages linking to it
    incoming: Vec<Vec<usize>>,

    /// Edge set for duplicate suppression
    edges: HashSet<(usize, usize)>,
}

impl LinkGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph from crawl records
    ///
    /// Records without a URL are skipped. Link targets that were never
    /// crawled still become nodes.
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a CrawlRecord>,
    {
        let mut graph = Self::new();
        let mut skipped = 0usize;

        for record in records {
            let Some(url) = record.canonical_url() else {
                skipped += 1;
                continue;
            };

            let source = graph.add_node(url);
            for link in record.links() {
                let target = graph.add_node(link);
                graph.insert_edge(source, target);
            }
        }

        if skipped > 0 {
            warn!(skipped, "Skipped crawl records without a URL");
        }
        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Link graph built"
        );

        graph
    }

    /// Add a node if absent and return its index
    pub fn add_node(&mut self, url: &str) -> usize {
        if let Some(&id) = self.index.get(url) {
            return id;
        }

        let id = self.urls.len();
        self.index.insert(url.to_string(), id);
        self.urls.push(url.to_string());
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        id
    }

    /// Add an edge between two URLs, creating nodes as needed
    ///
    /// Returns false if the edge already existed.
    pub fn add_edge(&mut self, from: &str, to: &str) -> bool {
        let source = self.add_node(from);
        let target = self.add_node(to);
        self.insert_edge(source, target)
    }

    fn insert_edge(&mut self, source: usize, target: usize) -> bool {
        if !self.edges.insert((source, target)) {
            return false;
        }
        self.outgoing[source].push(target);
        self.incoming[target].push(source);
        true
    }

    /// Get node count
    pub fn node_count(&self) -> usize {
        self.urls.len()
    }

    /// Get distinct edge count
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.index.contains_key(url)
    }

    /// Index of a URL, if it is a node
    pub fn node_id(&self, url: &str) -> Option<usize> {
        self.index.get(url).copied()
    }

    /// All node URLs in index order
    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    /// Distinct link targets of a node
    pub fn outgoing(&self, id: usize) -> &[usize] {
        &self.outgoing[id]
    }

    /// Distinct pages linking to a node
    pub fn incoming(&self, id: usize) -> &[usize] {
        &self.incoming[id]
    }

    /// Get out-degree (distinct outbound links)
    pub fn out_degree(&self, id: usize) -> usize {
        self.outgoing[id].len()
    }

    /// Get in-degree (distinct inbound links)
    pub fn in_degree(&self, id: usize) -> usize {
        self.incoming[id].len()
    }

    /// A node with no outbound edges
    pub fn is_dangling(&self, id: usize) -> bool {
        self.outgoing[id].is_empty()
    }

    /// Edges as URL pairs, independent of node numbering
    pub fn edge_urls(&self) -> HashSet<(&str, &str)> {
        self.edges
            .iter()
            .map(|&(s, t)| (self.urls[s].as_str(), self.urls[t].as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(url: Option<&str>, links: &str) -> CrawlRecord {
        CrawlRecord {
            url: url.map(str::to_string),
            linksurl: links.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_graph_construction() {
        let mut graph = LinkGraph::new();

        // A links B, B links C
        graph.add_edge("A", "B");
        graph.add_edge("B", "C");

        let a = graph.node_id("A").unwrap();
        let b = graph.node_id("B").unwrap();
        let c = graph.node_id("C").unwrap();

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.outgoing(a), &[b]);
        assert_eq!(graph.incoming(b), &[a]);
        assert_eq!(graph.outgoing(b), &[c]);
        assert!(graph.is_dangling(c));
    }

    #[test]
    fn test_duplicate_links_collapse() {
        let graph = LinkGraph::from_records(&[record(Some("A"), "B;B; B ;C")]);
        let a = graph.node_id("A").unwrap();

        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.out_degree(a), 2);
    }

    #[test]
    fn test_uncrawled_targets_become_nodes() {
        let graph = LinkGraph::from_records(&[record(Some("A"), "https://elsewhere/")]);
        assert!(graph.contains("https://elsewhere/"));
        assert!(graph.is_dangling(graph.node_id("https://elsewhere/").unwrap()));
    }

    #[test]
    fn test_missing_url_skipped() {
        let records = vec![
            record(None, "B"),
            record(Some("  "), "C"),
            record(Some("A"), ""),
        ];
        let graph = LinkGraph::from_records(&records);

        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);
        assert!(!graph.contains("B"));
    }

    #[test]
    fn test_self_loop_kept() {
        let graph = LinkGraph::from_records(&[record(Some("A"), "A")]);
        let a = graph.node_id("A").unwrap();
        assert_eq!(graph.out_degree(a), 1);
        assert!(!graph.is_dangling(a));
    }

    #[test]
    fn test_record_order_does_not_change_edges() {
        let records = vec![
            record(Some("A"), "B;C"),
            record(Some("B"), "C"),
            record(Some("C"), "A"),
        ];
        let reversed: Vec<CrawlRecord> = records.iter().rev().cloned().collect();

        let forward = LinkGraph::from_records(&records);
        let backward = LinkGraph::from_records(&reversed);

        assert_eq!(forward.edge_urls(), backward.edge_urls());
        assert_eq!(forward.node_count(), backward.node_count());
    }

    #[test]
    fn test_degree_counts() {
        let mut graph = LinkGraph::new();

        // Both A and C link B
        graph.add_edge("A", "B");
        graph.add_edge("C", "B");

        assert_eq!(graph.in_degree(graph.node_id("B").unwrap()), 2);
        assert_eq!(graph.out_degree(graph.node_id("A").unwrap()), 1);
    }
}

//! Crawl record and indexed page shapes

use serde::{Deserialize, Serialize};

/// Separator between outbound links in `linksurl`
pub const LINK_SEPARATOR: char = ';';

/// One page as emitted by the crawler
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrawlRecord {
    /// Canonical URL; records without one are skipped
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub text: String,

    /// Outbound links, `;`-separated, may be empty
    #[serde(default)]
    pub linksurl: String,
}

impl CrawlRecord {
    /// The record's URL if it is present and not blank
    pub fn canonical_url(&self) -> Option<&str> {
        self.url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Non-empty, trimmed outbound links in document order
    pub fn links(&self) -> impl Iterator<Item = &str> {
        self.linksurl
            .split(LINK_SEPARATOR)
            .map(str::trim)
            .filter(|link| !link.is_empty())
    }
}

/// Page stored in the search index, carrying its authority score
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexedPage {
    pub url: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub linksurl: String,

    /// Authority score; 0.0 when the URL never became a graph node
    #[serde(default)]
    pub pagerank: f64,

    /// Completion input for prefix suggestions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggest: Option<String>,
}

impl IndexedPage {
    /// Build the persisted form of a crawl record; `None` when it has no URL
    pub fn from_record(record: CrawlRecord, pagerank: f64) -> Option<Self> {
        let url = record.canonical_url()?.to_string();
        Some(Self {
            url,
            title: record.title,
            text: record.text,
            linksurl: record.linksurl,
            pagerank,
            suggest: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_links_are_trimmed_and_filtered() {
        let record = CrawlRecord {
            url: Some("https://a.example/".into()),
            linksurl: " https://b.example/ ;;https://c.example/; ".into(),
            ..Default::default()
        };

        let links: Vec<&str> = record.links().collect();
        assert_eq!(links, vec!["https://b.example/", "https://c.example/"]);
    }

    #[test]
    fn test_blank_url_is_missing() {
        let record = CrawlRecord {
            url: Some("   ".into()),
            ..Default::default()
        };
        assert!(record.canonical_url().is_none());
        assert!(IndexedPage::from_record(record, 0.5).is_none());
    }

    #[test]
    fn test_deserialize_crawl_line() {
        let line = r#"{"url":"https://a.example/","title":"A","text":"body","linksurl":"https://b.example/"}"#;
        let record: CrawlRecord = serde_json::from_str(line).unwrap();
        let page = IndexedPage::from_record(record, 0.25).unwrap();

        assert_eq!(page.url, "https://a.example/");
        assert_eq!(page.pagerank, 0.25);
        assert!(page.suggest.is_none());
    }

    #[test]
    fn test_missing_fields_default() {
        let page: IndexedPage = serde_json::from_str(r#"{"url":"https://x.example/"}"#).unwrap();
        assert_eq!(page.pagerank, 0.0);
        assert!(page.title.is_empty());
    }
}

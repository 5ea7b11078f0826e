//! Page records flowing from the crawl snapshot to the search index

mod page;

pub use page::{CrawlRecord, IndexedPage, LINK_SEPARATOR};

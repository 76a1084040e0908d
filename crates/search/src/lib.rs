//! Web search and concurrent page scraping for inlet.

pub mod backend;
pub mod extract;
pub mod filter;
pub mod pipeline;
pub mod websearch;

pub use backend::SearchBackend;
pub use filter::DomainFilter;
pub use pipeline::{FetchOrigin, FetchPipeline, FetchResult, HttpFetcher, PageCandidate, PageFetcher};
pub use websearch::WebSearch;

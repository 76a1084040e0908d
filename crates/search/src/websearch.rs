//! The search facade: query the backend, scrape concurrently, cite, and
//! hand back context-ready result documents.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use url::Url;

use inlet_config::SearchConfig;
use inlet_core::{Notification, NotificationSink, SearchError};

use crate::backend::SearchBackend;
use crate::filter::DomainFilter;
use crate::pipeline::{emit_citations, FetchPipeline, HttpFetcher, PageCandidate};

/// One result document as injected into the exchange context.
///
/// Failure documents carry no title or snippet, only an explanatory
/// `content`, so the model sees why a page is missing.
#[derive(Debug, Serialize)]
struct ResultDocument<'a> {
    title: Option<&'a str>,
    url: &'a str,
    content: &'a str,
    snippet: Option<&'a str>,
}

fn render_document(doc: &ResultDocument<'_>) -> String {
    serde_json::to_string(doc).unwrap_or_default()
}

fn failure_document(url: &str, message: &str) -> String {
    render_document(&ResultDocument {
        title: None,
        url,
        content: message,
        snippet: None,
    })
}

/// Web search over a ranked-results backend plus the concurrent scraper.
pub struct WebSearch {
    backend: SearchBackend,
    pipeline: FetchPipeline,
    returned_pages: usize,
    scraped_pages: usize,
    citation_links: bool,
}

impl WebSearch {
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        let fetcher = HttpFetcher::new(Duration::from_secs(config.fetch_timeout_secs))?;
        let filter = DomainFilter::new(
            config.ignored_websites.clone(),
            config.included_domains.clone(),
        );
        Ok(Self {
            backend: SearchBackend::new(config)?,
            pipeline: FetchPipeline::new(
                Arc::new(fetcher),
                filter,
                config.concurrency,
                config.page_words_limit,
            ),
            returned_pages: config.returned_pages,
            scraped_pages: config.scraped_pages,
            citation_links: config.citation_links,
        })
    }

    /// Search the web and return up to `returned_pages` scraped result
    /// documents as JSON strings, fastest valid pages first.
    pub async fn search_web(
        &self,
        query: &str,
        sink: &dyn NotificationSink,
    ) -> Result<Vec<String>, SearchError> {
        tracing::info!(%query, "Starting web search");
        sink.emit(Notification::status(format!("Searching the web for: {query}")))
            .await;

        let candidates = self.backend.search(query, self.scraped_pages).await?;
        sink.emit(Notification::status(format!(
            "Reading {} pages",
            candidates.len().min(self.scraped_pages)
        )))
        .await;

        let results = self
            .pipeline
            .fetch(candidates, self.returned_pages)
            .await;

        if self.citation_links {
            emit_citations(&results, sink).await;
        }
        sink.emit(Notification::status(format!(
            "Retrieved {} pages",
            results.len()
        )))
        .await;

        Ok(results
            .iter()
            .map(|r| {
                render_document(&ResultDocument {
                    title: Some(&r.title),
                    url: &r.url,
                    content: &r.body,
                    snippet: Some(&r.snippet),
                })
            })
            .collect())
    }

    /// Fetch a single page the user pointed at directly.
    ///
    /// A bad or unfetchable URL yields an explicit failure document rather
    /// than an empty result.
    pub async fn get_website(
        &self,
        url: &str,
        sink: &dyn NotificationSink,
    ) -> Result<Vec<String>, SearchError> {
        if Url::parse(url).is_err() {
            return Ok(vec![failure_document(url, "Invalid URL provided")]);
        }

        sink.emit(Notification::status(format!("Reading {url}"))).await;

        let candidate = PageCandidate {
            url: url.to_owned(),
            title: url.to_owned(),
            snippet: String::new(),
            engine_rank: 0,
        };
        let results = self.pipeline.fetch(vec![candidate], 1).await;

        if results.is_empty() {
            sink.emit(Notification::status(format!("Failed to retrieve {url}")))
                .await;
            return Ok(vec![failure_document(url, "Failed to retrieve the page.")]);
        }

        if self.citation_links {
            emit_citations(&results, sink).await;
        }

        Ok(results
            .iter()
            .map(|r| {
                render_document(&ResultDocument {
                    title: Some(&r.title),
                    url: &r.url,
                    content: &r.body,
                    snippet: Some(&r.snippet),
                })
            })
            .collect())
    }
}

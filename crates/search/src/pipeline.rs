//! Bounded concurrent page fetching with early stop.
//!
//! Given N candidate pages, fetches them concurrently under a semaphore,
//! filters denied hosts before any network call, and collects up to K
//! valid results in completion order. Once K results are in, remaining
//! in-flight fetches are abandoned; a late result is discarded. A failing
//! page is dropped and never aborts its siblings.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use inlet_core::{
    CitationData, CitationMeta, CitationSource, Notification, NotificationSink, SearchError,
};

use crate::extract::{excerpt, extract_text, format_text, strip_emojis};
use crate::filter::DomainFilter;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Excerpt length used for citation documents.
const CITATION_EXCERPT_CHARS: usize = 200;

/// One page the pipeline may fetch.
#[derive(Debug, Clone)]
pub struct PageCandidate {
    pub url: String,
    pub title: String,
    pub snippet: String,
    /// Position in the search engine's ranking, 0-based.
    pub engine_rank: usize,
}

/// Where a retained result came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOrigin {
    pub engine_rank: usize,
    /// Whether a positive allow-list entry matched this URL.
    pub filter_matched: bool,
}

/// One fetched and normalized page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    pub url: String,
    pub title: String,
    pub snippet: String,
    pub body: String,
    pub origin: FetchOrigin,
}

/// Fetches one page's raw HTML. The seam exists so the pipeline can be
/// exercised without a network.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Returns the page body, or `None` on any failure.
    async fn fetch_page(&self, url: &str) -> Option<String>;
}

/// The production fetcher: plain GET with a browser user agent and a short
/// per-page timeout so one slow page cannot stall the batch.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SearchError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_page(&self, url: &str) -> Option<String> {
        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(%url, error = %e, "Page fetch failed");
                return None;
            }
        };
        if !response.status().is_success() {
            tracing::debug!(%url, status = %response.status(), "Page fetch rejected");
            return None;
        }
        match response.text().await {
            Ok(body) => Some(body),
            Err(e) => {
                tracing::debug!(%url, error = %e, "Page body read failed");
                None
            }
        }
    }
}

/// The concurrent fetch pipeline.
pub struct FetchPipeline {
    fetcher: Arc<dyn PageFetcher>,
    filter: DomainFilter,
    concurrency: usize,
    word_limit: usize,
}

impl FetchPipeline {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        filter: DomainFilter,
        concurrency: usize,
        word_limit: usize,
    ) -> Self {
        Self {
            fetcher,
            filter,
            concurrency,
            word_limit,
        }
    }

    /// Fetch candidates concurrently, returning up to `early_stop` valid
    /// results in completion order. Zero survivors yields an empty vec,
    /// never an error.
    pub async fn fetch(
        &self,
        candidates: Vec<PageCandidate>,
        early_stop: usize,
    ) -> Vec<FetchResult> {
        if early_stop == 0 || candidates.is_empty() {
            return Vec::new();
        }

        let semaphore = Arc::new(Semaphore::new(self.concurrency.max(1)));
        let mut tasks: JoinSet<Option<FetchResult>> = JoinSet::new();

        for candidate in candidates {
            if !self.filter.allows(&candidate.url) {
                continue;
            }
            let fetcher = Arc::clone(&self.fetcher);
            let semaphore = Arc::clone(&semaphore);
            let filter_matched = self.filter.include_match(&candidate.url);
            let word_limit = self.word_limit;
            tasks.spawn(async move {
                // Closed semaphore only happens at shutdown.
                let _permit = semaphore.acquire().await.ok()?;
                let html = fetcher.fetch_page(&candidate.url).await?;
                let body = format_text(&extract_text(&html), word_limit);
                if body.is_empty() {
                    return None;
                }
                // Engine titles and snippets arrive raw; normalize them the
                // same way as page text.
                let snippet: String = candidate.snippet.chars().take(200).collect();
                Some(FetchResult {
                    url: candidate.url,
                    title: strip_emojis(&candidate.title),
                    snippet: strip_emojis(&snippet),
                    body,
                    origin: FetchOrigin {
                        engine_rank: candidate.engine_rank,
                        filter_matched,
                    },
                })
            });
        }

        let mut results = Vec::with_capacity(early_stop);
        while let Some(joined) = tasks.join_next().await {
            // Panicked or aborted workers are dropped like failed pages.
            if let Ok(Some(result)) = joined {
                results.push(result);
                if results.len() >= early_stop {
                    tasks.abort_all();
                    break;
                }
            }
        }
        results
    }
}

/// Publish one citation per retained result, numbered by position.
pub async fn emit_citations(results: &[FetchResult], sink: &dyn NotificationSink) {
    for (idx, result) in results.iter().enumerate() {
        sink.emit(Notification::Citation(CitationData {
            document: vec![excerpt(&result.body, CITATION_EXCERPT_CHARS)],
            metadata: vec![CitationMeta {
                source: result.url.clone(),
            }],
            source: Some(CitationSource {
                name: result.title.clone(),
                id: Some(idx.to_string()),
            }),
        }))
        .await;
    }
}

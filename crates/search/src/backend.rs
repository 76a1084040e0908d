//! Client for the ranked-results search backend.

use std::time::Duration;

use inlet_config::SearchConfig;
use inlet_core::SearchError;
use serde::Deserialize;

use crate::pipeline::PageCandidate;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "webPages", default)]
    web_pages: Option<WebPages>,
}

#[derive(Debug, Deserialize)]
struct WebPages {
    #[serde(default)]
    value: Vec<RankedPage>,
}

#[derive(Debug, Deserialize)]
struct RankedPage {
    #[serde(default)]
    name: String,
    url: String,
    #[serde(default)]
    snippet: String,
}

/// Issues ranked-results queries against the configured endpoint.
pub struct SearchBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl SearchBackend {
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .build()
            .map_err(|e| SearchError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Query the backend for up to `count` ranked results.
    pub async fn search(&self, query: &str, count: usize) -> Result<Vec<PageCandidate>, SearchError> {
        let mut request = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query), ("count", &count.to_string())]);
        if let Some(key) = &self.api_key {
            request = request.header("Ocp-Apim-Subscription-Key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::ApiError {
                status_code: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Network(format!("failed to decode search response: {e}")))?;

        let candidates = parsed
            .web_pages
            .map(|p| p.value)
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(rank, page)| PageCandidate {
                url: page.url,
                title: page.name,
                snippet: page.snippet,
                engine_rank: rank,
            })
            .collect();
        Ok(candidates)
    }
}

//! Search client — posts the modal's query to the backend endpoint.

use deck_proto::protocol::{SearchRequest, SearchResponse};
use thiserror::Error;

/// Transport-level search failure.  Backend-reported failures travel in-band
/// as `SearchResponse { success: false, .. }` — only the displayed message
/// text distinguishes the two.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error("{0}")]
    Transport(String),
}

#[derive(Clone)]
pub struct SearchClient {
    client: reqwest::Client,
    endpoint: String,
}

impl SearchClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// One request per call — duplicate submissions are intentionally not
    /// deduplicated, and there is no cancellation or timeout here.
    pub async fn search(&self, query: &str) -> Result<SearchResponse, SearchError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&SearchRequest {
                query: query.to_string(),
            })
            .send()
            .await
            .map_err(|e| SearchError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SearchError::Transport(format!(
                "search endpoint returned status {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| SearchError::Transport(e.to_string()))
    }
}

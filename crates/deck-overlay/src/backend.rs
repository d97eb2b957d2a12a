//! Server side of `/youtube-search`.
//!
//! Keyless lookup: a query containing a video URL (or bare id) is resolved
//! through YouTube's oembed endpoint; free-text queries filter a curated list
//! of popular videos.  Failures never escape as errors — they become
//! `success: false` responses the modal renders as text.

use std::time::Duration;

use anyhow::{Context, Result};
use deck_proto::config::SearchConfig;
use deck_proto::protocol::{SearchResponse, SearchResult};
use deck_proto::youtube;
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct OembedData {
    title: String,
    author_name: String,
    thumbnail_url: Option<String>,
}

#[derive(Clone)]
pub struct SearchProvider {
    client: reqwest::Client,
    max_results: usize,
    oembed_timeout: Duration,
}

impl SearchProvider {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            max_results: config.max_results,
            oembed_timeout: Duration::from_secs(config.oembed_timeout_secs),
        }
    }

    pub async fn search(&self, query: &str) -> SearchResponse {
        if let Some(video_id) = youtube::extract_video_id(query) {
            return match self.video_info(&video_id).await {
                Ok(result) => SearchResponse::ok(vec![result]),
                Err(e) => {
                    warn!("oembed lookup failed for {}: {:#}", video_id, e);
                    SearchResponse::failure(format!("Could not fetch video info: {e}"))
                }
            };
        }
        SearchResponse::ok(self.filter_popular(query))
    }

    /// Basic video metadata without an API key, via the oembed endpoint.
    async fn video_info(&self, video_id: &str) -> Result<SearchResult> {
        let watch = youtube::watch_url(video_id);
        let url = format!(
            "https://www.youtube.com/oembed?url={}&format=json",
            watch
        );
        let response = self
            .client
            .get(&url)
            .timeout(self.oembed_timeout)
            .send()
            .await
            .context("Failed to fetch oembed data")?;

        if !response.status().is_success() {
            anyhow::bail!("oembed returned status {}", response.status());
        }

        let data: OembedData = response
            .json()
            .await
            .context("Failed to parse oembed response")?;

        Ok(SearchResult {
            url: watch,
            title: data.title,
            author: data.author_name,
            thumbnail_url: data
                .thumbnail_url
                .unwrap_or_else(|| youtube::thumbnail_url(video_id)),
        })
    }

    /// Filter the curated list by title/author substring; an empty or
    /// unmatched query falls back to the full list, capped at `max_results`.
    fn filter_popular(&self, query: &str) -> Vec<SearchResult> {
        let all = popular_videos();
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return all.into_iter().take(self.max_results).collect();
        }
        let filtered: Vec<SearchResult> = all
            .iter()
            .filter(|v| {
                v.title.to_lowercase().contains(&query) || v.author.to_lowercase().contains(&query)
            })
            .cloned()
            .collect();
        let picked = if filtered.is_empty() { all } else { filtered };
        picked.into_iter().take(self.max_results).collect()
    }
}

fn popular_videos() -> Vec<SearchResult> {
    let entries = [
        (
            "Rick Astley - Never Gonna Give You Up (Official Music Video)",
            "Rick Astley",
            "dQw4w9WgXcQ",
        ),
        (
            "Beautiful Nature Video - Relaxing Music",
            "Nature Channel",
            "j800SVei8DA",
        ),
        (
            "Lofi Hip Hop Radio - Beats to Relax/Study to",
            "Lofi Girl",
            "jfKfPfyJRdk",
        ),
    ];
    entries
        .into_iter()
        .map(|(title, author, id)| SearchResult {
            url: youtube::watch_url(id),
            title: title.to_string(),
            author: author.to_string(),
            thumbnail_url: youtube::thumbnail_url(id),
        })
        .collect()
}

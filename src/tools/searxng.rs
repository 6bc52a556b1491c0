use super::{clean_hits, SearchService, USER_AGENT};
use crate::error::ServiceError;
use crate::models::{SearchHit, SearxngResponse};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use std::time::Duration;
use tracing::{debug, warn};

const CATEGORIES: &str = "general,science,it";
const LANGUAGE: &str = "en-US";

/// Self-hosted SearXNG metasearch instance, queried through its JSON API.
#[derive(Debug, Clone)]
pub struct SearxngSearch {
    base_url: String,
    timeout: Duration,
}

impl SearxngSearch {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl SearchService for SearxngSearch {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, ServiceError> {
        // One client per call; nothing outlives the request.
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        debug!("Searching SearXNG for {:?}", query);
        let response = client
            .get(format!("{}/search", self.base_url))
            .header(ACCEPT, "application/json")
            .query(&[
                ("q", query),
                ("format", "json"),
                ("categories", CATEGORIES),
                ("language", LANGUAGE),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("SearXNG returned HTTP {} for {:?}", status.as_u16(), query);
            return Ok(Vec::new());
        }

        let body = response.text().await?;
        let parsed: SearxngResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Malformed SearXNG response for {:?}: {}", query, e);
                return Ok(Vec::new());
            }
        };

        let hits = parsed.results.into_iter().map(|r| SearchHit {
            url: r.url,
            title: r.title,
            snippet: r.content,
            score: r.score,
        });
        let hits = clean_hits(hits, limit);
        debug!("SearXNG returned {} result(s) for {:?}", hits.len(), query);
        Ok(hits)
    }
}

pub mod llm;
pub mod page;
pub mod searxng;
pub mod tavily;
pub mod url_guard;

use crate::error::ServiceError;
use crate::models::SearchHit;
use async_trait::async_trait;
use std::collections::HashSet;

pub use llm::{get_llm, LlmAgent, TextCompletion};
pub use page::{HttpPageFetcher, PageFetcher};
pub use searxng::SearxngSearch;
pub use tavily::TavilySearch;

pub(crate) const USER_AGENT: &str = "ResearchFlow/1.0";

/// Keyword search backend. Returns hits in the backend's own ranking order.
#[async_trait]
pub trait SearchService: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, ServiceError>;
}

/// Backend-side cleanup shared by the search adapters: drops hits without a
/// URL and repeated URLs within one response, then caps at `limit`.
pub(crate) fn clean_hits(hits: impl IntoIterator<Item = SearchHit>, limit: usize) -> Vec<SearchHit> {
    let mut seen = HashSet::new();
    hits.into_iter()
        .filter(|hit| !hit.url.trim().is_empty())
        .filter(|hit| seen.insert(hit.url.clone()))
        .take(limit)
        .collect()
}

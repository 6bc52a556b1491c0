use crate::error::FetchErrorKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One entry of the aggregated, deduplicated search result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub url: String,
    pub title: String,
    pub snippet: String,
    pub relevance_score: f64,
    pub origin_sub_query: String,
}

/// A raw hit as returned by a search backend, before attribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub url: String,
    pub title: String,
    pub snippet: String,
    pub score: Option<f64>,
}

/// What a page fetcher reports for a single URL.
///
/// `success == false` always carries an `error_message`; `error_kind` is
/// set by adapters that can classify the failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageContent {
    pub success: bool,
    pub title: Option<String>,
    pub markdown_text: Option<String>,
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<FetchErrorKind>,
}

impl PageContent {
    pub fn extracted(title: Option<String>, text: String) -> Self {
        Self {
            success: true,
            title,
            markdown_text: Some(text),
            error_message: None,
            error_kind: None,
        }
    }

    pub fn failed(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            title: None,
            markdown_text: None,
            error_message: Some(message.into()),
            error_kind: Some(kind),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FetchResult {
    Success {
        url: String,
        title: String,
        content: String,
    },
    Failure {
        url: String,
        error_kind: FetchErrorKind,
        message: String,
    },
}

impl FetchResult {
    pub fn url(&self) -> &str {
        match self {
            FetchResult::Success { url, .. } | FetchResult::Failure { url, .. } => url,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FetchResult::Success { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSegment {
    pub source_title: String,
    pub source_url: String,
    pub text: String,
}

impl ContextSegment {
    /// Citation header placed in front of the segment text.
    pub fn header(&self) -> String {
        format!("\n--- Source: {} ({}) ---\n", self.source_title, self.source_url)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssembledContext {
    pub query: String,
    pub segments: Vec<ContextSegment>,
    /// Characters of segment text admitted under the budgets.
    pub total_chars: usize,
}

impl AssembledContext {
    pub fn empty(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            segments: Vec::new(),
            total_chars: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The single text buffer handed to answer synthesis.
    pub fn render(&self) -> String {
        self.segments
            .iter()
            .map(|s| format!("{}{}", s.header(), s.text))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchOutcome {
    pub original_query: String,
    pub sub_queries: Vec<String>,
    pub result_count: usize,
    pub fetch_results: Vec<FetchResult>,
    pub context: AssembledContext,
    pub stage_times_ms: HashMap<String, u64>,
}

impl ResearchOutcome {
    pub fn failed_urls(&self) -> Vec<&str> {
        self.fetch_results
            .iter()
            .filter(|r| !r.is_success())
            .map(FetchResult::url)
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchRequest {
    pub query: String,
    #[serde(default)]
    pub max_urls: Option<usize>,
    #[serde(default)]
    pub synthesize: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchResponse {
    pub request_id: String,
    pub completed_at: chrono::DateTime<chrono::Utc>,
    pub elapsed_ms: u64,
    pub outcome: ResearchOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TavilySearchRequest {
    pub query: String,
    pub max_results: usize,
    pub search_depth: String,
    pub include_raw_content: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TavilySearchResponse {
    #[serde(default)]
    pub results: Vec<TavilyResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TavilyResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearxngResponse {
    #[serde(default)]
    pub results: Vec<SearxngResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearxngResult {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub score: Option<f64>,
}

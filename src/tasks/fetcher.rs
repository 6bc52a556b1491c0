use crate::error::{FetchErrorKind, ResearchError};
use crate::fanout::gather_until;
use crate::models::{FetchResult, PageContent};
use crate::tools::PageFetcher;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, instrument, warn};

pub const NO_TITLE: &str = "No Title";

/// Fetches the selected URLs concurrently, one result per URL in input order.
pub struct ContentFetcher {
    pages: Arc<dyn PageFetcher>,
    timeout: Duration,
    batch_deadline: Option<Duration>,
}

impl ContentFetcher {
    pub fn new(pages: Arc<dyn PageFetcher>, timeout: Duration) -> Self {
        Self {
            pages,
            timeout,
            batch_deadline: None,
        }
    }

    pub fn with_batch_deadline(mut self, batch_deadline: Option<Duration>) -> Self {
        self.batch_deadline = batch_deadline;
        self
    }

    pub async fn fetch(&self, urls: &[String]) -> Vec<FetchResult> {
        self.fetch_until(urls, None).await
    }

    /// Fetch with an external deadline. The earlier of `deadline` and the
    /// configured batch deadline wins; URLs unfinished by then are reported
    /// as `Cancelled` failures.
    #[instrument(skip(self, urls), fields(urls = urls.len()))]
    pub async fn fetch_until(&self, urls: &[String], deadline: Option<Instant>) -> Vec<FetchResult> {
        let batch_deadline = self.batch_deadline.map(|d| Instant::now() + d);
        let deadline = match (deadline, batch_deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };

        let fetches = urls.iter().map(|url| self.fetch_one(url)).collect();
        let completed = gather_until(fetches, deadline).await;

        let results: Vec<FetchResult> = urls
            .iter()
            .zip(completed)
            .map(|(url, result)| {
                result.unwrap_or_else(|| FetchResult::Failure {
                    url: url.clone(),
                    error_kind: FetchErrorKind::Cancelled,
                    message: "abandoned at batch deadline".to_string(),
                })
            })
            .collect();

        for failure in results.iter().filter_map(as_fetch_error) {
            warn!("{}", failure);
        }
        let ok = results.iter().filter(|r| r.is_success()).count();
        info!("Fetched {}/{} sources", ok, results.len());
        results
    }

    async fn fetch_one(&self, url: &str) -> FetchResult {
        match tokio::time::timeout(self.timeout, self.pages.fetch(url)).await {
            Ok(page) => to_fetch_result(url, page),
            Err(_) => FetchResult::Failure {
                url: url.to_string(),
                error_kind: FetchErrorKind::Timeout,
                message: format!("no response within {:?}", self.timeout),
            },
        }
    }
}

fn to_fetch_result(url: &str, page: PageContent) -> FetchResult {
    if page.success {
        let title = page
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| NO_TITLE.to_string());
        FetchResult::Success {
            url: url.to_string(),
            title,
            content: page.markdown_text.unwrap_or_default(),
        }
    } else {
        FetchResult::Failure {
            url: url.to_string(),
            error_kind: page.error_kind.unwrap_or(FetchErrorKind::Extraction),
            message: page
                .error_message
                .unwrap_or_else(|| "fetch service reported failure".to_string()),
        }
    }
}

fn as_fetch_error(result: &FetchResult) -> Option<ResearchError> {
    match result {
        FetchResult::Failure {
            url,
            error_kind,
            message,
        } => Some(ResearchError::FetchFailed {
            url: url.clone(),
            kind: *error_kind,
            message: message.clone(),
        }),
        FetchResult::Success { .. } => None,
    }
}

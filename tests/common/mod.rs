//! Fake collaborators shared by the pipeline tests.

#![allow(dead_code)]

use async_trait::async_trait;
use research_flow::models::{PageContent, SearchHit};
use research_flow::tools::{PageFetcher, SearchService, TextCompletion};
use research_flow::{FetchErrorKind, ServiceError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Completion service returning a fixed reply, or failing.
pub struct MockLlm {
    reply: Option<String>,
    pub calls: AtomicUsize,
}

impl MockLlm {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TextCompletion for MockLlm {
    async fn complete(&self, _prompt: &str) -> Result<String, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply
            .clone()
            .ok_or_else(|| ServiceError::Completion("mock LLM failure".to_string()))
    }
}

pub fn hit(url: &str, title: &str) -> SearchHit {
    SearchHit {
        url: url.to_string(),
        title: title.to_string(),
        snippet: format!("{} snippet", title),
        score: Some(0.5),
    }
}

/// Search service answering from a table, recording every query it sees.
#[derive(Default)]
pub struct MockSearch {
    answers: HashMap<String, Vec<SearchHit>>,
    failing: Vec<String>,
    pub seen: Mutex<Vec<String>>,
}

impl MockSearch {
    pub fn answer(mut self, query: &str, hits: Vec<SearchHit>) -> Self {
        self.answers.insert(query.to_string(), hits);
        self
    }

    pub fn fail(mut self, query: &str) -> Self {
        self.failing.push(query.to_string());
        self
    }
}

#[async_trait]
impl SearchService for MockSearch {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, ServiceError> {
        self.seen.lock().unwrap().push(query.to_string());
        if self.failing.iter().any(|q| q == query) {
            return Err(ServiceError::Status(500));
        }
        Ok(self
            .answers
            .get(query)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .take(limit)
            .collect())
    }
}

/// Page fetcher with per-URL pages and delays. Unknown URLs fail.
#[derive(Default)]
pub struct MockPages {
    pages: HashMap<String, PageContent>,
    delays: HashMap<String, Duration>,
    pub requested: Mutex<Vec<String>>,
}

impl MockPages {
    pub fn page(mut self, url: &str, title: &str, text: &str) -> Self {
        self.pages.insert(
            url.to_string(),
            PageContent::extracted(Some(title.to_string()), text.to_string()),
        );
        self
    }

    pub fn delay(mut self, url: &str, delay: Duration) -> Self {
        self.delays.insert(url.to_string(), delay);
        self
    }
}

#[async_trait]
impl PageFetcher for MockPages {
    async fn fetch(&self, url: &str) -> PageContent {
        self.requested.lock().unwrap().push(url.to_string());
        if let Some(delay) = self.delays.get(url) {
            tokio::time::sleep(*delay).await;
        }
        self.pages
            .get(url)
            .cloned()
            .unwrap_or_else(|| PageContent::failed(FetchErrorKind::Network, "connection reset"))
    }
}

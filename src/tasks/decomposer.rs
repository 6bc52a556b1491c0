use crate::error::ResearchError;
use crate::tools::TextCompletion;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, instrument, warn};

/// Hard cap on returned sub-queries, whatever the model produced.
pub const MAX_SUB_QUERIES: usize = 5;

/// Turns one user query into a small ordered set of search queries.
pub struct QueryDecomposer {
    llm: Arc<dyn TextCompletion>,
    timeout: Duration,
    max_queries: usize,
}

impl QueryDecomposer {
    pub fn new(llm: Arc<dyn TextCompletion>, timeout: Duration) -> Self {
        Self {
            llm,
            timeout,
            max_queries: MAX_SUB_QUERIES,
        }
    }

    /// Lower the cap below the default of 5. Values above 5 are ignored.
    pub fn with_max_queries(mut self, max_queries: usize) -> Self {
        self.max_queries = max_queries.clamp(1, MAX_SUB_QUERIES);
        self
    }

    pub async fn decompose(&self, query: &str) -> Vec<String> {
        self.decompose_until(query, None).await
    }

    /// Like [`decompose`](Self::decompose), but gives up on the completion
    /// service at `deadline` and degrades to the original query.
    #[instrument(skip(self))]
    pub async fn decompose_until(&self, query: &str, deadline: Option<Instant>) -> Vec<String> {
        let query = query.trim();
        let prompt = decomposition_prompt(query);

        let mut wait = self.timeout;
        if let Some(deadline) = deadline {
            wait = wait.min(deadline.saturating_duration_since(Instant::now()));
        }

        let response = match tokio::time::timeout(wait, self.llm.complete(&prompt)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return degraded(query, e.to_string()),
            Err(_) => return degraded(query, format!("no completion within {:?}", wait)),
        };

        let sub_queries = parse_sub_queries(query, &response, self.max_queries);
        if sub_queries.len() == 1 {
            warn!(
                "{}",
                ResearchError::DecompositionDegraded {
                    reason: "completion contained no usable sub-queries".to_string()
                }
            );
        }
        info!("Decomposed query into {} sub-queries", sub_queries.len());
        sub_queries
    }
}

fn degraded(query: &str, reason: String) -> Vec<String> {
    warn!("{}", ResearchError::DecompositionDegraded { reason });
    vec![query.to_string()]
}

fn decomposition_prompt(query: &str) -> String {
    format!(
        r#"You are an expert research assistant. Break the user's query down into 2-4 distinct, specific search queries that together gather comprehensive information.

User Query: {}

Return ONLY the queries, one per line. Do not number them."#,
        query
    )
}

/// Parse untrusted completion text into sub-queries.
///
/// Each line is trimmed and stripped of leading list markers; blank results
/// and repeats are dropped. The original query always comes first and the
/// output never exceeds `max` entries (minimum one: the original).
pub fn parse_sub_queries(original: &str, response: &str, max: usize) -> Vec<String> {
    let original = original.trim();
    let mut queries = vec![original.to_string()];

    for line in response.lines() {
        if queries.len() >= max.max(1) {
            break;
        }
        let cleaned = strip_list_marker(line);
        if cleaned.is_empty() || queries.iter().any(|q| q == cleaned) {
            continue;
        }
        queries.push(cleaned.to_string());
    }

    queries
}

fn strip_list_marker(line: &str) -> &str {
    line.trim()
        .trim_start_matches(|c: char| {
            c.is_whitespace() || c.is_ascii_digit() || c.is_ascii_punctuation() || matches!(c, '•' | '◦' | '–' | '—')
        })
        .trim()
}

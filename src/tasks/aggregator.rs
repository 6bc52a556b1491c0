use crate::error::ResearchError;
use crate::fanout::gather_until;
use crate::models::{SearchHit, SearchResult};
use crate::tools::SearchService;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_PER_QUERY_LIMIT: usize = 5;

/// Runs one search per sub-query and merges the hits into a single
/// URL-unique list in discovery order.
pub struct SearchAggregator {
    search: Arc<dyn SearchService>,
    timeout: Duration,
}

impl SearchAggregator {
    pub fn new(search: Arc<dyn SearchService>, timeout: Duration) -> Self {
        Self { search, timeout }
    }

    pub async fn aggregate(&self, sub_queries: &[String], per_query_limit: usize) -> Vec<SearchResult> {
        self.aggregate_until(sub_queries, per_query_limit, None).await
    }

    /// Sub-queries still in flight at `deadline` contribute nothing.
    #[instrument(skip(self, sub_queries), fields(sub_queries = sub_queries.len()))]
    pub async fn aggregate_until(
        &self,
        sub_queries: &[String],
        per_query_limit: usize,
        deadline: Option<Instant>,
    ) -> Vec<SearchResult> {
        let searches = sub_queries
            .iter()
            .map(|sub_query| self.search_one(sub_query, per_query_limit))
            .collect();

        let per_query = gather_until(searches, deadline).await;

        let lists = sub_queries.iter().zip(per_query).map(|(sub_query, hits)| {
            let hits = hits.unwrap_or_else(|| {
                warn!(
                    "{}",
                    ResearchError::SearchSubQueryFailed {
                        sub_query: sub_query.clone(),
                        reason: "deadline reached before the search completed".to_string(),
                    }
                );
                Vec::new()
            });
            (sub_query.as_str(), hits)
        });

        let merged = merge_results(lists);
        info!("Aggregated {} unique results", merged.len());
        merged
    }

    async fn search_one(&self, sub_query: &str, limit: usize) -> Vec<SearchHit> {
        let outcome = tokio::time::timeout(self.timeout, self.search.search(sub_query, limit)).await;
        let reason = match outcome {
            Ok(Ok(hits)) => {
                debug!("{} hit(s) for {:?}", hits.len(), sub_query);
                return hits;
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("no response within {:?}", self.timeout),
        };
        warn!(
            "{}",
            ResearchError::SearchSubQueryFailed {
                sub_query: sub_query.to_string(),
                reason,
            }
        );
        Vec::new()
    }
}

/// Merge per-sub-query hit lists, in sub-query order and then backend
/// order, keeping the first occurrence of each URL.
pub fn merge_results<'a>(lists: impl IntoIterator<Item = (&'a str, Vec<SearchHit>)>) -> Vec<SearchResult> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();

    for (sub_query, hits) in lists {
        for hit in hits {
            let url = hit.url.trim();
            if url.is_empty() || !seen.insert(url.to_string()) {
                continue;
            }
            merged.push(SearchResult {
                url: url.to_string(),
                title: hit.title,
                snippet: hit.snippet,
                relevance_score: hit.score.unwrap_or(0.0),
                origin_sub_query: sub_query.to_string(),
            });
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use async_trait::async_trait;
    use std::collections::HashMap;

    fn hit(url: &str, title: &str) -> SearchHit {
        SearchHit {
            url: url.to_string(),
            title: title.to_string(),
            snippet: format!("snippet for {}", title),
            score: Some(1.0),
        }
    }

    /// Answers from a table; listed queries fail, delayed ones sleep first.
    #[derive(Default)]
    struct TableSearch {
        answers: HashMap<String, Vec<SearchHit>>,
        failing: Vec<String>,
        delays_ms: HashMap<String, u64>,
    }

    #[async_trait]
    impl SearchService for TableSearch {
        async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, ServiceError> {
            if let Some(ms) = self.delays_ms.get(query) {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }
            if self.failing.iter().any(|q| q == query) {
                return Err(ServiceError::Status(502));
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

    fn queries(qs: &[&str]) -> Vec<String> {
        qs.iter().map(|q| q.to_string()).collect()
    }

    #[tokio::test]
    async fn overlapping_url_keeps_first_sub_query_version() {
        let mut search = TableSearch::default();
        search.answers.insert(
            "solid state batteries 2025".to_string(),
            vec![hit("https://a.com", "A1"), hit("https://b.com", "B1"), hit("https://c.com", "C1")],
        );
        search.answers.insert(
            "SSB commercialization".to_string(),
            vec![hit("https://d.com", "D2"), hit("https://b.com", "B2"), hit("https://e.com", "E2")],
        );

        let aggregator = SearchAggregator::new(Arc::new(search), Duration::from_secs(5));
        let results = aggregator
            .aggregate(&queries(&["solid state batteries 2025", "SSB commercialization"]), 5)
            .await;

        let urls: Vec<_> = results.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://a.com", "https://b.com", "https://c.com", "https://d.com", "https://e.com"]
        );
        let b = &results[1];
        assert_eq!(b.title, "B1");
        assert_eq!(b.snippet, "snippet for B1");
        assert_eq!(b.origin_sub_query, "solid state batteries 2025");
    }

    #[tokio::test]
    async fn failed_sub_query_contributes_nothing() {
        let mut search = TableSearch::default();
        search.answers.insert("good".to_string(), vec![hit("https://a.com", "A")]);
        search.failing.push("bad".to_string());

        let aggregator = SearchAggregator::new(Arc::new(search), Duration::from_secs(5));
        let results = aggregator.aggregate(&queries(&["bad", "good"]), 5).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].origin_sub_query, "good");
    }

    #[tokio::test(start_paused = true)]
    async fn completion_order_does_not_change_merge_order() {
        let mut search = TableSearch::default();
        search.answers.insert("slow".to_string(), vec![hit("https://x.com", "slow")]);
        search.answers.insert("fast".to_string(), vec![hit("https://x.com", "fast")]);
        search.delays_ms.insert("slow".to_string(), 500);

        let aggregator = SearchAggregator::new(Arc::new(search), Duration::from_secs(5));
        let results = aggregator.aggregate(&queries(&["slow", "fast"]), 5).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "slow");
    }

    #[tokio::test(start_paused = true)]
    async fn per_call_timeout_yields_zero_results_for_that_query() {
        let mut search = TableSearch::default();
        search.answers.insert("stuck".to_string(), vec![hit("https://s.com", "S")]);
        search.answers.insert("ok".to_string(), vec![hit("https://o.com", "O")]);
        search.delays_ms.insert("stuck".to_string(), 60_000);

        let aggregator = SearchAggregator::new(Arc::new(search), Duration::from_secs(1));
        let results = aggregator.aggregate(&queries(&["stuck", "ok"]), 5).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].url, "https://o.com");
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_drops_sub_queries_still_in_flight() {
        let mut search = TableSearch::default();
        search.answers.insert("stalled".to_string(), vec![hit("https://s.com", "S")]);
        search.answers.insert("quick".to_string(), vec![hit("https://q.com", "Q")]);
        search.delays_ms.insert("stalled".to_string(), 60_000);

        let aggregator = SearchAggregator::new(Arc::new(search), Duration::from_secs(120));
        let started = Instant::now();
        let results = aggregator
            .aggregate_until(
                &queries(&["stalled", "quick"]),
                5,
                Some(started + Duration::from_secs(1)),
            )
            .await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].url, "https://q.com");
        assert_eq!(results[0].origin_sub_query, "quick");
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn merge_never_emits_duplicate_urls() {
        let lists = vec![
            ("q1", vec![hit("https://a.com", "1"), hit("https://a.com", "2")]),
            ("q2", vec![hit(" https://a.com ", "3"), hit("", "blank"), hit("https://b.com", "4")]),
        ];
        let merged = merge_results(lists);
        let mut urls: Vec<_> = merged.iter().map(|r| r.url.clone()).collect();
        let total = urls.len();
        urls.sort();
        urls.dedup();
        assert_eq!(urls.len(), total);
        assert_eq!(merged[0].title, "1");
        assert_eq!(total, 2);
    }
}

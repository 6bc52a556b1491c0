//! End-to-end research run: decompose → search → select → fetch → assemble.

use crate::config::{ResearchConfig, SearchBackend, ServiceSettings};
use crate::error::{ResearchError, Result, ServiceError};
use crate::models::ResearchOutcome;
use crate::tasks::{ContentFetcher, ContextAssembler, QueryDecomposer, SearchAggregator, SourceSelector};
use crate::tools::{get_llm, HttpPageFetcher, PageFetcher, SearchService, SearxngSearch, TavilySearch, TextCompletion};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{info, instrument};

/// Longest accepted user query, in characters.
pub const MAX_QUERY_CHARS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Decomposing,
    Searching,
    Selecting,
    Fetching,
    Assembling,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Decomposing => "decomposing",
            Stage::Searching => "searching",
            Stage::Selecting => "selecting",
            Stage::Fetching => "fetching",
            Stage::Assembling => "assembling",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Tracks the current stage and how long each one took.
struct StageClock {
    stage: Stage,
    entered: std::time::Instant,
    times_ms: HashMap<String, u64>,
}

impl StageClock {
    fn start() -> Self {
        info!("Entering stage {}", Stage::Decomposing);
        Self {
            stage: Stage::Decomposing,
            entered: std::time::Instant::now(),
            times_ms: HashMap::new(),
        }
    }

    fn advance(&mut self, next: Stage) {
        let elapsed = self.entered.elapsed().as_millis() as u64;
        self.times_ms.insert(self.stage.to_string(), elapsed);
        info!("Stage {} finished in {}ms, entering {}", self.stage, elapsed, next);
        self.stage = next;
        self.entered = std::time::Instant::now();
    }

    fn finish(mut self) -> HashMap<String, u64> {
        self.advance(Stage::Done);
        self.times_ms
    }
}

pub struct ResearchPipeline {
    config: ResearchConfig,
    decomposer: QueryDecomposer,
    aggregator: SearchAggregator,
    fetcher: ContentFetcher,
}

impl ResearchPipeline {
    pub fn new(
        config: ResearchConfig,
        llm: Arc<dyn TextCompletion>,
        search: Arc<dyn SearchService>,
        pages: Arc<dyn PageFetcher>,
    ) -> Self {
        let decomposer =
            QueryDecomposer::new(llm, config.completion_timeout).with_max_queries(config.max_sub_queries);
        let aggregator = SearchAggregator::new(search, config.search_timeout);
        let fetcher =
            ContentFetcher::new(pages, config.fetch_timeout).with_batch_deadline(config.fetch_batch_deadline);
        Self {
            config,
            decomposer,
            aggregator,
            fetcher,
        }
    }

    /// Wire the pipeline to the real backends described by `settings`.
    pub fn from_settings(config: ResearchConfig, settings: &ServiceSettings) -> Result<Self, ServiceError> {
        let llm: Arc<dyn TextCompletion> = Arc::new(get_llm(settings)?);
        let search: Arc<dyn SearchService> = match settings.search_backend {
            SearchBackend::Searxng => Arc::new(SearxngSearch::new(&settings.searxng_url, config.search_timeout)),
            SearchBackend::Tavily => {
                let key = settings
                    .tavily_api_key
                    .as_deref()
                    .ok_or_else(|| ServiceError::Config("TAVILY_API_KEY not set".to_string()))?;
                Arc::new(TavilySearch::new(key, config.search_timeout))
            }
        };
        let pages: Arc<dyn PageFetcher> =
            Arc::new(HttpPageFetcher::new(config.fetch_timeout, settings.allow_private_hosts));
        Ok(Self::new(config, llm, search, pages))
    }

    pub async fn run(&self, user_query: &str, max_urls: usize) -> Result<ResearchOutcome> {
        self.execute(user_query, max_urls, None).await
    }

    /// Run with a caller deadline. Work still outstanding when it passes is
    /// abandoned; the outcome holds whatever completed.
    pub async fn run_until(&self, user_query: &str, max_urls: usize, deadline: Instant) -> Result<ResearchOutcome> {
        self.execute(user_query, max_urls, Some(deadline)).await
    }

    #[instrument(skip(self, user_query))]
    async fn execute(&self, user_query: &str, max_urls: usize, deadline: Option<Instant>) -> Result<ResearchOutcome> {
        let query = sanitize_query(user_query)?;
        let max_urls = self.config.effective_max_urls(max_urls);
        info!("Starting research for {:?}", query);

        let mut clock = StageClock::start();
        let sub_queries = self.decomposer.decompose_until(&query, deadline).await;

        clock.advance(Stage::Searching);
        let results = self
            .aggregator
            .aggregate_until(&sub_queries, self.config.per_query_limit, deadline)
            .await;

        clock.advance(Stage::Selecting);
        let urls = SourceSelector::select(&results, max_urls);

        clock.advance(Stage::Fetching);
        let fetch_results = self.fetcher.fetch_until(&urls, deadline).await;

        clock.advance(Stage::Assembling);
        let context = ContextAssembler::assemble(
            &query,
            &fetch_results,
            self.config.global_budget,
            self.config.per_source_budget,
        );

        let stage_times_ms = clock.finish();
        Ok(ResearchOutcome {
            original_query: query,
            sub_queries,
            result_count: results.len(),
            fetch_results,
            context,
            stage_times_ms,
        })
    }
}

/// Strip control characters and collapse whitespace. Blank or overlong
/// queries are rejected before any network call.
pub fn sanitize_query(raw: &str) -> Result<String> {
    let cleaned = raw
        .chars()
        .filter(|c| !c.is_control() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    if cleaned.is_empty() {
        return Err(ResearchError::InvalidInput("query is empty".to_string()));
    }
    let len = cleaned.chars().count();
    if len > MAX_QUERY_CHARS {
        return Err(ResearchError::InvalidInput(format!(
            "query is {} characters, limit is {}",
            len, MAX_QUERY_CHARS
        )));
    }
    Ok(cleaned)
}

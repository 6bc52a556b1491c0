//! Runtime configuration.
//!
//! Both structs read `RESEARCH_*` variables (after loading a `.env` file if
//! present). Provider credentials keep their conventional names.

use crate::tasks::aggregator::DEFAULT_PER_QUERY_LIMIT;
use crate::tasks::assembler::{DEFAULT_GLOBAL_BUDGET, DEFAULT_PER_SOURCE_BUDGET};
use crate::tasks::decomposer::MAX_SUB_QUERIES;
use crate::tasks::selector::DEFAULT_MAX_SOURCES;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Budgets, limits and timeouts of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    pub per_query_limit: usize,
    pub max_urls: usize,
    pub max_urls_cap: usize,
    pub max_sub_queries: usize,
    pub global_budget: usize,
    pub per_source_budget: usize,
    pub completion_timeout: Duration,
    pub search_timeout: Duration,
    pub fetch_timeout: Duration,
    /// Upper bound for a whole fetch batch, on top of the per-fetch timeout.
    pub fetch_batch_deadline: Option<Duration>,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            per_query_limit: DEFAULT_PER_QUERY_LIMIT,
            max_urls: DEFAULT_MAX_SOURCES,
            max_urls_cap: 50,
            max_sub_queries: MAX_SUB_QUERIES,
            global_budget: DEFAULT_GLOBAL_BUDGET,
            per_source_budget: DEFAULT_PER_SOURCE_BUDGET,
            completion_timeout: Duration::from_secs(120),
            search_timeout: Duration::from_secs(20),
            fetch_timeout: Duration::from_secs(30),
            fetch_batch_deadline: None,
        }
    }
}

impl ResearchConfig {
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let d = Self::default();
        Self {
            per_query_limit: env_or("RESEARCH_PER_QUERY_LIMIT", d.per_query_limit),
            max_urls: env_or("RESEARCH_MAX_URLS", d.max_urls),
            max_urls_cap: env_or("RESEARCH_MAX_URLS_CAP", d.max_urls_cap),
            max_sub_queries: env_or("RESEARCH_MAX_SUB_QUERIES", d.max_sub_queries),
            global_budget: env_or("RESEARCH_GLOBAL_BUDGET", d.global_budget),
            per_source_budget: env_or("RESEARCH_PER_SOURCE_BUDGET", d.per_source_budget),
            completion_timeout: env_secs("RESEARCH_COMPLETION_TIMEOUT_SECS", d.completion_timeout),
            search_timeout: env_secs("RESEARCH_SEARCH_TIMEOUT_SECS", d.search_timeout),
            fetch_timeout: env_secs("RESEARCH_FETCH_TIMEOUT_SECS", d.fetch_timeout),
            fetch_batch_deadline: std::env::var("RESEARCH_FETCH_BATCH_DEADLINE_SECS")
                .ok()
                .and_then(|v| parse_logged::<u64>("RESEARCH_FETCH_BATCH_DEADLINE_SECS", &v))
                .map(Duration::from_secs),
        }
    }

    /// Resolve a caller-supplied URL count: 0 means the default, anything
    /// else is clamped to `1..=max_urls_cap`.
    pub fn effective_max_urls(&self, requested: usize) -> usize {
        let n = if requested == 0 { self.max_urls } else { requested };
        n.clamp(1, self.max_urls_cap.max(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    OpenAi,
    Ollama,
}

impl FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(LlmProvider::OpenAi),
            "ollama" => Ok(LlmProvider::Ollama),
            other => Err(format!("unknown LLM provider '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchBackend {
    Searxng,
    Tavily,
}

impl FromStr for SearchBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "searxng" => Ok(SearchBackend::Searxng),
            "tavily" => Ok(SearchBackend::Tavily),
            other => Err(format!("unknown search backend '{}'", other)),
        }
    }
}

/// Where the external collaborators live and how to reach them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    pub llm_provider: LlmProvider,
    pub llm_model: Option<String>,
    pub ollama_url: String,
    #[serde(skip_serializing)]
    pub openai_api_key: Option<String>,
    pub search_backend: SearchBackend,
    pub searxng_url: String,
    #[serde(skip_serializing)]
    pub tavily_api_key: Option<String>,
    pub allow_private_hosts: bool,
    pub bind_addr: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            llm_provider: LlmProvider::Ollama,
            llm_model: None,
            ollama_url: "http://localhost:11434".to_string(),
            openai_api_key: None,
            search_backend: SearchBackend::Searxng,
            searxng_url: "http://localhost:8080".to_string(),
            tavily_api_key: None,
            allow_private_hosts: false,
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

impl ServiceSettings {
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let d = Self::default();
        Self {
            llm_provider: env_or("RESEARCH_LLM_PROVIDER", d.llm_provider),
            llm_model: std::env::var("RESEARCH_LLM_MODEL").ok().filter(|m| !m.trim().is_empty()),
            ollama_url: std::env::var("RESEARCH_OLLAMA_URL").unwrap_or(d.ollama_url),
            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
            search_backend: env_or("RESEARCH_SEARCH_BACKEND", d.search_backend),
            searxng_url: std::env::var("RESEARCH_SEARXNG_URL").unwrap_or(d.searxng_url),
            tavily_api_key: std::env::var("TAVILY_API_KEY").ok(),
            allow_private_hosts: env_or("RESEARCH_ALLOW_PRIVATE_HOSTS", d.allow_private_hosts),
            bind_addr: std::env::var("RESEARCH_BIND_ADDR").unwrap_or(d.bind_addr),
        }
    }
}

fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => parse_logged(key, &raw).unwrap_or(default),
        Err(_) => default,
    }
}

fn env_secs(key: &str, default: Duration) -> Duration {
    match std::env::var(key) {
        Ok(raw) => parse_logged::<u64>(key, &raw)
            .map(Duration::from_secs)
            .unwrap_or(default),
        Err(_) => default,
    }
}

fn parse_logged<T>(key: &str, raw: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("Ignoring {}={:?}: {}", key, raw, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_max_urls_clamps_to_cap() {
        let config = ResearchConfig::default();
        assert_eq!(config.effective_max_urls(0), 5);
        assert_eq!(config.effective_max_urls(3), 3);
        assert_eq!(config.effective_max_urls(500), 50);
    }

    #[test]
    fn defaults_follow_stage_constants() {
        let config = ResearchConfig::default();
        assert_eq!(config.per_query_limit, DEFAULT_PER_QUERY_LIMIT);
        assert_eq!(config.max_urls, DEFAULT_MAX_SOURCES);
        assert_eq!(config.max_sub_queries, MAX_SUB_QUERIES);
        assert_eq!(config.global_budget, DEFAULT_GLOBAL_BUDGET);
        assert_eq!(config.per_source_budget, DEFAULT_PER_SOURCE_BUDGET);
        assert_eq!(config.fetch_batch_deadline, None);
    }

    #[test]
    fn parses_backend_names_case_insensitively() {
        assert_eq!("SearXNG".parse::<SearchBackend>(), Ok(SearchBackend::Searxng));
        assert_eq!(" tavily ".parse::<SearchBackend>(), Ok(SearchBackend::Tavily));
        assert!("bing".parse::<SearchBackend>().is_err());
        assert_eq!("OpenAI".parse::<LlmProvider>(), Ok(LlmProvider::OpenAi));
    }
}

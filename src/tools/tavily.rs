use super::{clean_hits, SearchService, USER_AGENT};
use crate::error::ServiceError;
use crate::models::{SearchHit, TavilySearchRequest, TavilySearchResponse};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

const TAVILY_ENDPOINT: &str = "https://api.tavily.com";

/// Hosted Tavily search API.
#[derive(Debug, Clone)]
pub struct TavilySearch {
    api_key: String,
    endpoint: String,
    timeout: Duration,
}

impl TavilySearch {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: TAVILY_ENDPOINT.to_string(),
            timeout,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl SearchService for TavilySearch {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        let request = TavilySearchRequest {
            query: query.to_string(),
            max_results: limit,
            search_depth: "basic".to_string(),
            include_raw_content: false,
        };

        let response = client
            .post(format!("{}/search", self.endpoint))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Tavily returned HTTP {} for {:?}", status.as_u16(), query);
            return Ok(Vec::new());
        }

        let search_response: TavilySearchResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Failed to parse Tavily response for {:?}: {}", query, e);
                return Ok(Vec::new());
            }
        };

        let hits = search_response.results.into_iter().map(|r| SearchHit {
            url: r.url,
            title: r.title,
            snippet: r.content,
            score: r.score,
        });
        let hits = clean_hits(hits, limit);
        debug!("Tavily returned {} result(s) for {:?}", hits.len(), query);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn posts_query_and_maps_results() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({"query": "SSB commercialization", "max_results": 3})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    {"title": "Toyota plans", "url": "https://t.com", "content": "2027 launch", "score": 0.91},
                    {"title": "QuantumScape", "url": "https://q.com", "content": "samples", "score": 0.80}
                ]
            })))
            .mount(&server)
            .await;

        let tavily = TavilySearch::new("test-key", Duration::from_secs(5)).with_endpoint(server.uri());
        let hits = tavily.search("SSB commercialization", 3).await.unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "Toyota plans");
        assert_eq!(hits[0].snippet, "2027 launch");
        assert_eq!(hits[1].url, "https://q.com");
    }

    #[tokio::test]
    async fn unauthorized_is_zero_results() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let tavily = TavilySearch::new("bad", Duration::from_secs(5)).with_endpoint(server.uri());
        assert!(tavily.search("q", 5).await.unwrap().is_empty());
    }
}

use crate::error::ServiceError;
use crate::models::ResearchOutcome;
use crate::tools::TextCompletion;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// Writes the final answer from an assembled context.
pub struct Synthesizer {
    llm: Arc<dyn TextCompletion>,
    timeout: Duration,
}

impl Synthesizer {
    pub fn new(llm: Arc<dyn TextCompletion>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    #[instrument(skip(self, outcome), fields(query = %outcome.original_query))]
    pub async fn synthesize(&self, outcome: &ResearchOutcome) -> Result<String, ServiceError> {
        let prompt = synthesis_prompt(outcome);
        let answer = tokio::time::timeout(self.timeout, self.llm.complete(&prompt))
            .await
            .map_err(|_| ServiceError::Timeout(self.timeout))??;

        info!("Generated answer with {} characters", answer.len());
        Ok(answer)
    }
}

fn synthesis_prompt(outcome: &ResearchOutcome) -> String {
    let context = if outcome.context.is_empty() {
        "(no sources could be retrieved)".to_string()
    } else {
        outcome.context.render()
    };

    let unavailable = outcome.failed_urls();
    let unavailable = if unavailable.is_empty() {
        String::new()
    } else {
        format!("\nUnavailable sources: {}\n", unavailable.join(", "))
    };

    format!(
        r#"You are a private research assistant. Based ONLY on the provided context, answer the user's research query.

User Query: {}

Context:
{}
{}
Instructions:
1. Synthesize a comprehensive answer.
2. Cite your sources using [Source Name] or [URL] format when possible.
3. If the context doesn't contain the answer, state that clearly.
4. Be professional, detailed, and objective."#,
        outcome.original_query, context, unavailable
    )
}

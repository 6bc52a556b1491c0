use crate::config::{LlmProvider, ServiceSettings};
use crate::error::ServiceError;
use async_trait::async_trait;
use rig::completion::Prompt;
use rig::prelude::*;
use rig::providers::{ollama, openai};

const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";
const OLLAMA_DEFAULT_MODEL: &str = "qwen2.5:3b";

/// Opaque text-completion service. Output is best-effort natural language
/// and must be parsed defensively by callers.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ServiceError>;
}

type OpenAiAgent = rig::agent::Agent<openai::CompletionModel>;
type OllamaAgent = rig::agent::Agent<ollama::CompletionModel>;

/// rig-backed completion agent for the configured provider.
pub enum LlmAgent {
    OpenAi(OpenAiAgent),
    Ollama(OllamaAgent),
}

impl LlmAgent {
    pub fn model_label(settings: &ServiceSettings) -> String {
        settings.llm_model.clone().unwrap_or_else(|| {
            match settings.llm_provider {
                LlmProvider::OpenAi => OPENAI_DEFAULT_MODEL,
                LlmProvider::Ollama => OLLAMA_DEFAULT_MODEL,
            }
            .to_string()
        })
    }
}

pub fn get_llm(settings: &ServiceSettings) -> Result<LlmAgent, ServiceError> {
    let model = LlmAgent::model_label(settings);
    match settings.llm_provider {
        LlmProvider::OpenAi => {
            let api_key = settings
                .openai_api_key
                .as_deref()
                .ok_or_else(|| ServiceError::Config("OpenAI API key not configured".to_string()))?;
            let client = openai::Client::new(api_key);
            Ok(LlmAgent::OpenAi(client.agent(&model).temperature(0.0).build()))
        }
        LlmProvider::Ollama => {
            let client = ollama::Client::from_url(&settings.ollama_url);
            Ok(LlmAgent::Ollama(client.agent(&model).temperature(0.0).build()))
        }
    }
}

#[async_trait]
impl TextCompletion for LlmAgent {
    async fn complete(&self, prompt: &str) -> Result<String, ServiceError> {
        let response = match self {
            LlmAgent::OpenAi(agent) => agent.prompt(prompt.to_string()).await,
            LlmAgent::Ollama(agent) => agent.prompt(prompt.to_string()).await,
        };
        response.map_err(|e| ServiceError::Completion(format!("Prompt error: {}", e)))
    }
}

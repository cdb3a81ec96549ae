//! OpenRouter provider (OpenAI-compatible chat completions)

use crate::bridge::{AbortSignal, ClassificationProvider, ClassificationRequest};
use crate::prompt::CLASSIFICATION_SYSTEM_PROMPT;
use anyhow::{Context, Result};
use graph_ide_core::ProviderConfig;
use serde::{Deserialize, Serialize};

const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";

pub struct OpenRouterProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenRouterProvider {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    /// Read the key from the configured environment variable (`.env` included).
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let _ = dotenvy::dotenv();
        let api_key = std::env::var(&config.api_key_env)
            .with_context(|| format!("{} is not set", config.api_key_env))?;
        Ok(Self::new(api_key, config.model.clone()))
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn complete(&self, request: &ClassificationRequest) -> Result<String> {
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: CLASSIFICATION_SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.prompt.clone(),
                },
            ],
            temperature: 0.1,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .context("Failed to send request to OpenRouter")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenRouter API error ({}): {}", status, error_text);
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .context("Failed to parse OpenRouter response")?;
        if let Some(usage) = parsed.usage {
            tracing::debug!("{} used {} tokens", request.task, usage.total_tokens);
        }
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .context("OpenRouter response contained no choices")
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    total_tokens: u32,
}

#[async_trait::async_trait]
impl ClassificationProvider for OpenRouterProvider {
    async fn classify(&self, request: ClassificationRequest, signal: AbortSignal) -> Result<String> {
        if signal.is_aborted() {
            return Ok(String::new());
        }
        tracing::debug!("Requesting {} classification from {}", request.task, self.model);
        tokio::select! {
            _ = signal.aborted() => {
                tracing::info!("{} classification aborted", request.task);
                Ok(String::new())
            }
            result = self.complete(&request) => result,
        }
    }

    fn name(&self) -> &str {
        "openrouter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::ClassificationTask;

    #[tokio::test]
    async fn aborted_signal_returns_empty_without_network() {
        let provider = OpenRouterProvider::new("test-key".into(), "test/model".into())
            .with_endpoint("http://127.0.0.1:9/unreachable");
        let signal = AbortSignal::new();
        signal.abort();

        let request = ClassificationRequest {
            task: ClassificationTask::Systems,
            prompt: "{}".into(),
            project_path: ".".into(),
        };
        assert_eq!(provider.classify(request, signal).await.unwrap(), "");
    }

    #[test]
    fn missing_key_is_an_error() {
        let config = ProviderConfig {
            name: "openrouter".into(),
            model: "m".into(),
            api_key_env: "GRAPH_IDE_TEST_KEY_THAT_IS_NEVER_SET".into(),
        };
        assert!(OpenRouterProvider::from_config(&config).is_err());
    }
}

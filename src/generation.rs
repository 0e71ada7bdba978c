//! Remote text generation
//!
//! Commands the local table cannot answer are sent to an OpenAI-compatible
//! chat-completions endpoint together with the persona instruction.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::config::GenerationConfig;
use crate::{Error, Result};

/// Reply used when the model returns no text
pub const EMPTY_COMPLETION_REPLY: &str = "Sorry Sir, kuch gadbad ho gayi.";

/// Turns a prompt into a reply
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a reply for `prompt`
    ///
    /// # Errors
    ///
    /// Returns error if the remote call fails
    async fn generate(&self, prompt: &str) -> Result<String>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Chat-completions client
pub struct ChatClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<SecretString>,
    model: String,
    temperature: f32,
    system_prompt: String,
}

impl ChatClient {
    /// Create a client from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: &GenerationConfig, system_prompt: String) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(ms) = config.timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }

        let endpoint = format!("{}/chat/completions", config.api_url.trim_end_matches('/'));
        tracing::debug!(endpoint = %endpoint, model = %config.model, "chat client initialized");

        Ok(Self {
            client: builder.build()?,
            endpoint,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            system_prompt,
        })
    }
}

#[async_trait]
impl TextGenerator for ChatClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        tracing::debug!(prompt, model = %self.model, "requesting completion");

        let request = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let mut http = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            http = http.bearer_auth(key.expose_secret());
        }

        let response = http.send().await.map_err(|e| {
            tracing::error!(error = %e, "completion request failed");
            Error::Generation(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "completion API error");
            return Err(Error::Generation(format!("API error {status}: {body}")));
        }

        let result: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Generation(format!("invalid completion response: {e}")))?;

        let text = result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| EMPTY_COMPLETION_REPLY.to_string());

        tracing::debug!(response_len = text.len(), "completion received");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = ChatRequest {
            model: "gpt-4o-mini",
            temperature: 0.8,
            messages: [
                ChatMessage {
                    role: "system",
                    content: "be cute",
                },
                ChatMessage {
                    role: "user",
                    content: "hello",
                },
            ],
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hello");
    }

    #[test]
    fn test_response_without_choices() {
        let parsed: ChatResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.choices.is_empty());
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let config = GenerationConfig {
            api_url: "http://localhost:8080/v1/".to_string(),
            ..GenerationConfig::default()
        };
        let client = ChatClient::new(&config, String::new()).unwrap();
        assert_eq!(client.endpoint, "http://localhost:8080/v1/chat/completions");
    }
}

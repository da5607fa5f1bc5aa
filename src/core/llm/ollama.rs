//! Mistral via a local Ollama server.
//!
//! - Endpoint: `POST {base_url}/api/chat` with `stream: true`
//! - Body: newline-delimited JSON, one object per token
//! - Token: `message.content`, end marker: `done: true`

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::base::{BaseLLM, LLMBackend, LLMConfig, LLMError, LLMResult, TokenStream};
use super::lines::{LineEvent, line_token_stream};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_MISTRAL_MODEL: &str = "mistral";

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    message: Option<ChunkMessage>,
    #[serde(default)]
    done: bool,
}

#[derive(Debug, Deserialize)]
struct ChunkMessage {
    #[serde(default)]
    content: String,
}

pub struct OllamaLLM {
    client: reqwest::Client,
    config: LLMConfig,
}

impl OllamaLLM {
    pub fn new(client: reqwest::Client, config: LLMConfig) -> LLMResult<Self> {
        if config.base_url.is_empty() {
            return Err(LLMError::ConfigurationError(
                "Ollama base URL is required".to_string(),
            ));
        }
        Ok(Self { client, config })
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.config.base_url.trim_end_matches('/'))
    }

    pub(crate) fn parse_line(line: &str) -> LineEvent {
        match serde_json::from_str::<ChatChunk>(line) {
            Ok(chunk) => match chunk.message {
                Some(message) if !message.content.is_empty() => LineEvent::Token(message.content),
                _ if chunk.done => LineEvent::Done,
                _ => LineEvent::Skip,
            },
            Err(e) => {
                warn!("Failed to parse Ollama chunk: {} - {}", e, line);
                LineEvent::Skip
            }
        }
    }
}

#[async_trait]
impl BaseLLM for OllamaLLM {
    async fn stream_reply(&self, utterance: &str) -> LLMResult<TokenStream> {
        let body = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": self.config.system_prompt },
                { "role": "user", "content": utterance },
            ],
            "stream": true,
        });

        debug!(model = %self.config.model, "Requesting Ollama chat completion");
        let response = self
            .client
            .post(self.chat_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| LLMError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LLMError::ProviderError {
                status: status.as_u16(),
                body,
            });
        }

        Ok(line_token_stream(response, Self::parse_line))
    }

    fn backend(&self) -> LLMBackend {
        LLMBackend::Mistral
    }
}

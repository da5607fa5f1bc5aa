//! OpenAI Chat Completions streaming.
//!
//! - Endpoint: `POST {base_url}/v1/chat/completions` with `stream: true`
//! - Body: server-sent events, `data: {json}` per chunk
//! - Token: `choices[0].delta.content`, end marker: `data: [DONE]`

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::base::{BaseLLM, LLMBackend, LLMConfig, LLMError, LLMResult, TokenStream};
use super::lines::{LineEvent, line_token_stream};

pub const OPENAI_API_URL: &str = "https://api.openai.com";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAILLM {
    client: reqwest::Client,
    config: LLMConfig,
    api_key: String,
}

impl OpenAILLM {
    pub fn new(client: reqwest::Client, config: LLMConfig) -> LLMResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                LLMError::ConfigurationError("OpenAI API key is required".to_string())
            })?;
        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    pub(crate) fn parse_line(line: &str) -> LineEvent {
        let Some(data) = line.strip_prefix("data:") else {
            return LineEvent::Skip;
        };
        let data = data.trim();
        if data == "[DONE]" {
            return LineEvent::Done;
        }

        match serde_json::from_str::<CompletionChunk>(data) {
            Ok(chunk) => chunk
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.delta.content)
                .filter(|content| !content.is_empty())
                .map(LineEvent::Token)
                .unwrap_or(LineEvent::Skip),
            Err(e) => {
                warn!("Failed to parse OpenAI chunk: {} - {}", e, data);
                LineEvent::Skip
            }
        }
    }
}

#[async_trait]
impl BaseLLM for OpenAILLM {
    async fn stream_reply(&self, utterance: &str) -> LLMResult<TokenStream> {
        let body = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": self.config.system_prompt },
                { "role": "user", "content": utterance },
            ],
            "stream": true,
        });

        debug!(model = %self.config.model, "Requesting OpenAI chat completion");
        let response = self
            .client
            .post(self.completions_url())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
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
        LLMBackend::OpenAI
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        assert_eq!(
            OpenAILLM::parse_line(r#"data: {"choices":[{"delta":{"content":"Hi"}}]}"#),
            LineEvent::Token("Hi".to_string())
        );
        assert_eq!(
            OpenAILLM::parse_line(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#),
            LineEvent::Skip
        );
        assert_eq!(OpenAILLM::parse_line("data: [DONE]"), LineEvent::Done);
        assert_eq!(OpenAILLM::parse_line(": keep-alive"), LineEvent::Skip);
        assert_eq!(OpenAILLM::parse_line("data: {oops"), LineEvent::Skip);
    }

    #[test]
    fn test_api_key_required() {
        let result = OpenAILLM::new(
            reqwest::Client::new(),
            LLMConfig {
                base_url: OPENAI_API_URL.to_string(),
                model: DEFAULT_OPENAI_MODEL.to_string(),
                api_key: Some(String::new()),
                system_prompt: String::new(),
            },
        );
        assert!(matches!(result, Err(LLMError::ConfigurationError(_))));
    }
}

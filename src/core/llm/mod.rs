//! Streaming text generation and reply segmentation.

mod base;
pub mod lines;
pub mod ollama;
pub mod openai;
pub mod segmenter;

pub use base::{BaseLLM, LLMBackend, LLMConfig, LLMError, LLMResult, TokenStream};
pub use ollama::{DEFAULT_MISTRAL_MODEL, DEFAULT_OLLAMA_URL, OllamaLLM};
pub use openai::{DEFAULT_OPENAI_MODEL, OPENAI_API_URL, OpenAILLM};
pub use segmenter::{ReplySegmenter, SentenceUnit, sentences};

/// Create the client for `backend`.
pub fn create_llm(
    backend: LLMBackend,
    client: reqwest::Client,
    config: LLMConfig,
) -> LLMResult<Box<dyn BaseLLM>> {
    match backend {
        LLMBackend::Mistral => Ok(Box::new(OllamaLLM::new(client, config)?)),
        LLMBackend::OpenAI => Ok(Box::new(OpenAILLM::new(client, config)?)),
    }
}

pub fn get_supported_llm_backends() -> Vec<&'static str> {
    vec!["mistral", "openai"]
}

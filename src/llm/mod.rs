//! Language-model and image-model providers.
//!
//! Handlers only see the [`LanguageModel`] and [`ImageGenerator`] traits so the
//! acquisition adapters can run against in-memory fakes in tests.

mod client;
mod endpoints;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub use client::ChatClient;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model API key is not configured")]
    MissingApiKey,
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("model API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("model returned no content")]
    EmptyResponse,
    #[error("{message}")]
    Formatting { message: String, raw: String },
}

/// Image attached to a vision request, already base64-encoded.
#[derive(Debug, Clone)]
pub struct InlineImage {
    pub media_type: String,
    pub base64: String,
}

#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub model: String,
    pub system: String,
    pub user: String,
    pub image: Option<InlineImage>,
    pub max_tokens: u32,
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Returns the text of the first completion choice.
    async fn complete(&self, request: ModelRequest) -> Result<String, ModelError>;
}

#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub body: Bytes,
    pub content_type: String,
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage, ModelError>;
}

/// Strips a surrounding markdown code fence, with or without a language tag.
pub fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    if !(trimmed.starts_with("```") && trimmed.ends_with("```") && trimmed.len() >= 6) {
        return trimmed;
    }
    let inner = &trimmed[3..trimmed.len() - 3];
    // drop an optional language tag on the opening line
    match inner.find('\n') {
        Some(nl) if !inner[..nl].trim().contains(char::is_whitespace) => inner[nl + 1..].trim(),
        _ => inner.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fence() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn strips_bare_fence() {
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
    }

    #[test]
    fn leaves_plain_json_alone() {
        assert_eq!(strip_code_fences("  {\"a\": 1} \n"), "{\"a\": 1}");
    }
}

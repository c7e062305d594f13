use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use reqwest::Client;
use tracing::{debug, instrument};

use super::endpoints::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ContentPart,
    ImageGenerationRequest, ImageGenerationResponse, ImageUrl, MessageContent,
};
use super::{GeneratedImage, ImageGenerator, LanguageModel, ModelError, ModelRequest};
use crate::config::ModelConfig;

/// OpenAI-compatible chat-completions and image-generation client.
#[derive(Clone)]
pub struct ChatClient {
    http: Client,
    base_url: String,
    api_key: String,
    image_model: String,
}

impl ChatClient {
    pub fn new(cfg: &ModelConfig) -> Self {
        Self {
            http: Client::new(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
            image_model: cfg.image_model.clone(),
        }
    }

    async fn post<T: serde::Serialize, R: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<R, ModelError> {
        if self.api_key.is_empty() {
            return Err(ModelError::MissingApiKey);
        }
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json::<R>().await?)
        } else {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            Err(ModelError::Api { status, body })
        }
    }
}

#[async_trait]
impl LanguageModel for ChatClient {
    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn complete(&self, request: ModelRequest) -> Result<String, ModelError> {
        let user = match request.image {
            None => MessageContent::Text(request.user),
            Some(image) => MessageContent::Parts(vec![
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: format!("data:{};base64,{}", image.media_type, image.base64),
                    },
                },
                ContentPart::Text { text: request.user },
            ]),
        };
        let body = ChatCompletionRequest {
            model: request.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: MessageContent::Text(request.system),
                },
                ChatMessage { role: "user", content: user },
            ],
            temperature: Some(0.2),
            max_tokens: Some(request.max_tokens),
        };

        let response: ChatCompletionResponse = self.post("/chat/completions", &body).await?;
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(ModelError::EmptyResponse)?;
        debug!(chars = content.len(), "model completion received");
        Ok(content)
    }
}

#[async_trait]
impl ImageGenerator for ChatClient {
    #[instrument(skip(self, prompt))]
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage, ModelError> {
        let body = ImageGenerationRequest {
            model: self.image_model.clone(),
            prompt: prompt.to_string(),
            n: 1,
            size: "1024x1024",
            response_format: "b64_json",
        };
        let response: ImageGenerationResponse = self.post("/images/generations", &body).await?;
        let encoded = response
            .data
            .into_iter()
            .find_map(|d| d.b64_json)
            .ok_or(ModelError::EmptyResponse)?;
        let decoded = STANDARD.decode(encoded).map_err(|e| ModelError::Formatting {
            message: format!("image payload is not base64: {e}"),
            raw: String::new(),
        })?;
        Ok(GeneratedImage {
            body: Bytes::from(decoded),
            content_type: "image/png".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_key: &str) -> ModelConfig {
        ModelConfig {
            api_key: api_key.into(),
            base_url: "http://127.0.0.1:9/v1/".into(),
            generation_model: "g".into(),
            formatting_model: "f".into(),
            vision_model: "v".into(),
            image_model: "i".into(),
        }
    }

    #[test]
    fn base_url_loses_trailing_slash() {
        let client = ChatClient::new(&config("k"));
        assert_eq!(client.base_url, "http://127.0.0.1:9/v1");
    }

    #[tokio::test]
    async fn missing_api_key_fails_before_network() {
        let client = ChatClient::new(&config(""));
        let err = client
            .complete(ModelRequest {
                model: "g".into(),
                system: "s".into(),
                user: "u".into(),
                image: None,
                max_tokens: 10,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::MissingApiKey));
    }

    #[test]
    fn vision_message_serializes_as_parts() {
        let msg = ChatMessage {
            role: "user",
            content: MessageContent::Parts(vec![ContentPart::ImageUrl {
                image_url: ImageUrl { url: "data:image/png;base64,AAAA".into() },
            }]),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["content"][0]["type"], "image_url");
        assert_eq!(json["content"][0]["image_url"]["url"], "data:image/png;base64,AAAA");
    }
}

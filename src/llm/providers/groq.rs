

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::base::{LlmMetadata, LlmProvider, LlmProviderError};

pub const GROQ_API_URL: &str = "https://api.groq.com/openai/v1";

const MAX_COMPLETION_TOKENS: u32 = 500;

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    r#type: String,
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
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

/// OpenAI-compatible chat completions (Groq by default).
pub struct GroqProvider {
    api_key: String,
    model: String,
    base_url: String,
    temperature: f64,
    client: Client,
}

impl GroqProvider {

    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: Option<String>,
        temperature: f64,
        timeout: Duration,
    ) -> Result<Self, LlmProviderError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmProviderError::Config(
                "Groq provider requires an API key (GROQ_API_KEY or MAHALLE_LLM_API_KEY)".to_string(),
            ));
        }

        let model = model.into();
        let base_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| GROQ_API_URL.to_string());
        info!("Groq provider initialized (model={}, url={})", model, base_url);

        Ok(Self {
            api_key,
            model,
            base_url,
            temperature,
            client: Client::builder().timeout(timeout).build()?,
        })
    }
}

#[async_trait]
impl LlmProvider for GroqProvider {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        response_format: Option<&str>,
    ) -> Result<(String, LlmMetadata), LlmProviderError> {
        let messages = vec![
            ChatMessage {
                role: "system".to_string(),
                content: system_prompt.to_string(),
            },
            ChatMessage {
                role: "user".to_string(),
                content: user_prompt.to_string(),
            },
        ];

        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: MAX_COMPLETION_TOKENS,
            response_format: response_format.map(|f| ResponseFormat {
                r#type: f.to_string(),
            }),
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()
            .map_err(LlmProviderError::Http)?
            .json::<ChatResponse>()
            .await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmProviderError::provider("groq", "no choices in response"))?
            .message
            .content;

        let mut metadata = LlmMetadata::new("groq", &self.model).with_base_url(&self.base_url);
        if let Some(usage) = response.usage {
            metadata = metadata.with_usage(usage.prompt_tokens, usage.completion_tokens);
        }

        Ok((content, metadata))
    }

    fn provider_name(&self) -> &str {
        "groq"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_api_key() {
        let result = GroqProvider::new("  ", "llama-3.1-8b-instant", None, 0.1, Duration::from_secs(5));
        assert!(matches!(result, Err(LlmProviderError::Config(_))));
    }

    #[test]
    fn test_response_deserialization() {
        let raw = r#"{
            "choices": [{"message": {"role": "assistant", "content": "{\"reasoning\": \"ok\"}"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }"#;
        let response: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.choices[0].message.content, "{\"reasoning\": \"ok\"}");
        assert_eq!(response.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn test_custom_base_url() {
        let provider = GroqProvider::new(
            "key",
            "model",
            Some("https://example.test/v1/".to_string()),
            0.1,
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(provider.base_url, "https://example.test/v1");
        assert_eq!(provider.provider_name(), "groq");
    }
}

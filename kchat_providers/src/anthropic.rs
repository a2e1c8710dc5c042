use async_trait::async_trait;
use kchat_core::{ChatMessage, LLMProvider, LLMResponse, Role, Usage};
use reqwest::Client;
use serde_json::json;
use tracing::{debug, info};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Client for the Anthropic Messages API.
///
/// The client has no request timeout, so a stalled backend blocks the caller.
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    base_url: String,
    max_tokens: u32,
    temperature: f32,
}

impl AnthropicProvider {
    pub fn new(api_key: String) -> Self {
        info!("Creating AnthropicProvider");
        Self {
            client: Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            max_tokens: 512,
            temperature: 0.0,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Build the request body. System messages move to the top-level field.
    fn build_request(&self, messages: &[ChatMessage], model: &str) -> serde_json::Value {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();
        let turns: Vec<&ChatMessage> = messages.iter().filter(|m| m.role != Role::System).collect();

        let mut request = json!({
            "model": model,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "messages": turns,
        });

        if !system.is_empty() {
            request["system"] = json!(system.join("\n\n"));
        }

        request
    }

    async fn send(&self, request: &serde_json::Value) -> anyhow::Result<LLMResponse> {
        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let body: serde_json::Value = serde_json::from_str(&text).unwrap_or_default();
            let message = body["error"]["message"].as_str().unwrap_or(&text);
            anyhow::bail!("Anthropic API error ({status}): {message}");
        }

        let body: serde_json::Value = serde_json::from_str(&text)?;

        let content = body["content"]
            .as_array()
            .map(|blocks| {
                blocks
                    .iter()
                    .filter(|b| b["type"] == "text")
                    .filter_map(|b| b["text"].as_str())
                    .collect::<String>()
            })
            .filter(|text| !text.is_empty())
            .ok_or_else(|| anyhow::anyhow!("Invalid response format: missing text content"))?;

        let usage = body["usage"].as_object().map(|u| {
            let prompt_tokens = u32::try_from(u["input_tokens"].as_u64().unwrap_or(0)).unwrap_or(0);
            let completion_tokens =
                u32::try_from(u["output_tokens"].as_u64().unwrap_or(0)).unwrap_or(0);
            Usage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens.saturating_add(completion_tokens),
            }
        });

        Ok(LLMResponse { content, usage })
    }
}

#[async_trait]
impl LLMProvider for AnthropicProvider {
    async fn chat(&self, messages: &[ChatMessage], model: &str) -> anyhow::Result<LLMResponse> {
        let request = self.build_request(messages, model);

        info!("Sending request to Anthropic API: model={}", model);
        let response = self.send(&request).await?;

        if let Some(usage) = response.usage {
            debug!(
                "Tokens: {} prompt + {} completion = {} total",
                usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
            );
        }
        info!("Received response from Anthropic API");
        Ok(response)
    }
}

use super::{ChatRequest, LlmClient, LlmResponse};
use crate::config::Credential;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

/// Client for OpenAI-compatible `/chat/completions` endpoints (OpenAI, Poe, vLLM, ...).
pub struct OpenAIClient {
    pub model: String,
    base_url: String,
    api_key: Credential,
    client: reqwest::Client,
}

impl OpenAIClient {
    pub fn new(
        model: String,
        base_url: String,
        api_key: Credential,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            model,
            base_url,
            api_key,
            client,
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn request_body(&self, request: &ChatRequest) -> serde_json::Value {
        json!({
            "model": self.model,
            "temperature": request.temperature,
            "messages": request.messages,
        })
    }
}

/// Pull `choices[0].message.content` out of a chat-completion response.
fn extract_content(body: &serde_json::Value) -> anyhow::Result<String> {
    body.pointer("/choices/0/message/content")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("chat completion response missing choices[0].message.content"))
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn complete(&self, request: &ChatRequest) -> anyhow::Result<LlmResponse> {
        let url = self.endpoint();
        let resp = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose())
            .json(&self.request_body(request))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            anyhow::bail!(
                "chat API error (status {}): {}",
                status.as_u16(),
                error_text.chars().take(500).collect::<String>()
            );
        }

        let body: serde_json::Value = resp.json().await?;
        Ok(LlmResponse {
            text: extract_content(&body)?,
            provider: "openai".to_string(),
            model: self.model.clone(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

use super::{ChatRequest, LlmClient, LlmResponse};
use async_trait::async_trait;

/// Deterministic offline judge: answers every request with the same reply.
pub struct FakeLlmClient {
    reply: String,
}

impl FakeLlmClient {
    pub const DEFAULT_REPLY: &'static str = r#"{"score": 1, "explanation": "fake judge"}"#;

    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

impl Default for FakeLlmClient {
    fn default() -> Self {
        Self::new(Self::DEFAULT_REPLY)
    }
}

#[async_trait]
impl LlmClient for FakeLlmClient {
    async fn complete(&self, _request: &ChatRequest) -> anyhow::Result<LlmResponse> {
        Ok(LlmResponse {
            text: self.reply.clone(),
            provider: "fake".to_string(),
            model: "fake".to_string(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}

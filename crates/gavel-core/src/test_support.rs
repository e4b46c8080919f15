use crate::providers::llm::{ChatRequest, LlmClient, LlmResponse};
use async_trait::async_trait;
use std::sync::Mutex;

/// Replays a fixed script of replies; `Err` entries simulate transport
/// failures. Once the script runs out, every call fails.
pub(crate) struct ScriptedLlmClient {
    script: Mutex<Vec<Result<String, String>>>,
    pub(crate) requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedLlmClient {
    pub(crate) fn new(script: Vec<Result<&str, &str>>) -> Self {
        Self {
            script: Mutex::new(
                script
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn replies(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|r| Ok(*r)).collect())
    }

    pub(crate) fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, request: &ChatRequest) -> anyhow::Result<LlmResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let next = {
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                None
            } else {
                Some(script.remove(0))
            }
        };
        match next {
            Some(Ok(text)) => Ok(LlmResponse {
                text,
                provider: "mock".to_string(),
                model: "mock".to_string(),
            }),
            Some(Err(e)) => anyhow::bail!("{e}"),
            None => anyhow::bail!("connection refused"),
        }
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

//! Judgement Oracle Client: one binary verdict per (example, response).

pub mod parse;
pub mod prompt;
pub mod retry;


use std::sync::Arc;

use crate::config::JudgeSettings;
use crate::model::Example;
use crate::providers::llm::{ChatRequest, LlmClient};
use parse::Verdict;
use retry::{run_with_retry, RetryOutcome, RetryPolicy};

#[derive(Clone, Debug, PartialEq)]
pub struct JudgeConfig {
    pub temperature: f32,
    pub retry: RetryPolicy,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            retry: RetryPolicy::default(),
        }
    }
}

impl From<&JudgeSettings> for JudgeConfig {
    fn from(s: &JudgeSettings) -> Self {
        Self {
            temperature: s.temperature,
            retry: RetryPolicy::new(s.max_attempts, s.retry_delay()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JudgeStatus {
    /// The oracle produced a parseable verdict.
    Judged,
    /// Every attempt failed; the record carries score 0 and the last error.
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Judgement {
    pub score: f64,
    pub explanation: String,
    pub attempts: u32,
    pub status: JudgeStatus,
}

#[derive(Clone)]
pub struct JudgeService {
    config: JudgeConfig,
    client: Arc<dyn LlmClient>,
}

impl JudgeService {
    pub fn new(config: JudgeConfig, client: Arc<dyn LlmClient>) -> Self {
        Self { config, client }
    }

    pub fn provider_name(&self) -> &'static str {
        self.client.provider_name()
    }

    /// Judge one response. Never fails: exhausted retries become a zero score
    /// whose explanation names the last error.
    pub async fn judge(&self, example: &Example, response_text: &str) -> Judgement {
        let request = prompt::build_request(example, response_text, self.config.temperature);
        let outcome = run_with_retry(self.config.retry, |_| self.call_once(&request)).await;
        match outcome {
            RetryOutcome::Success { value, attempts } => Judgement {
                score: value.score,
                explanation: value.explanation,
                attempts,
                status: JudgeStatus::Judged,
            },
            RetryOutcome::Exhausted { attempts, error } => {
                tracing::warn!(
                    "judging example '{}' failed after {} attempts: {:#}",
                    example.id,
                    attempts,
                    error
                );
                Judgement {
                    score: 0.0,
                    explanation: format!("Judging failed: {error:#}"),
                    attempts,
                    status: JudgeStatus::Failed,
                }
            }
        }
    }

    async fn call_once(&self, request: &ChatRequest) -> anyhow::Result<Verdict> {
        let resp = self.client.complete(request).await?;
        Ok(parse::verdict_from_reply(resp.text.trim())?)
    }
}

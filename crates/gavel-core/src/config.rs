//! Optional `gavel.yaml` configuration. Every field has a default, so the
//! file only needs the values that differ; CLI flags override it.
//!
//! ```yaml
//! judge:
//!   provider: openai
//!   model: GPT-5
//!   base_url: https://api.poe.com/v1
//!   max_attempts: 3
//!   retry_delay_ms: 1500
//! run:
//!   concurrency: 1
//!   progress_every: 10
//! ```

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

pub const DEFAULT_JUDGE_MODEL: &str = "GPT-5";
pub const DEFAULT_BASE_URL: &str = "https://api.poe.com/v1";
/// Environment variable holding the judge API key.
pub const API_KEY_ENV: &str = "POE_API_KEY";

/// API credential. Never printed in full.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Blank values count as absent.
    pub fn from_option(secret: Option<String>) -> Result<Self, ConfigError> {
        match secret {
            Some(s) if !s.trim().is_empty() => Ok(Self(s.trim().to_string())),
            _ => Err(ConfigError::MissingCredential { env: API_KEY_ENV }),
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JudgeProvider {
    #[default]
    Openai,
    Fake,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JudgeSettings {
    pub provider: JudgeProvider,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for JudgeSettings {
    fn default() -> Self {
        Self {
            provider: JudgeProvider::Openai,
            model: DEFAULT_JUDGE_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: 0.0,
            max_attempts: 3,
            retry_delay_ms: 1500,
            request_timeout_secs: 120,
        }
    }
}

impl JudgeSettings {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunSettings {
    pub concurrency: usize,
    pub progress_every: usize,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            concurrency: 1,
            progress_every: 10,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GavelConfig {
    pub judge: JudgeSettings,
    pub run: RunSettings,
}

impl GavelConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: Self = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.judge.max_attempts == 0 {
            return Err(ConfigError::Invalid("judge.max_attempts must be at least 1".into()));
        }
        if self.run.concurrency == 0 {
            return Err(ConfigError::Invalid("run.concurrency must be at least 1".into()));
        }
        if self.judge.model.trim().is_empty() {
            return Err(ConfigError::Invalid("judge.model must not be empty".into()));
        }
        Ok(())
    }
}

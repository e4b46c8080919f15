use std::sync::Arc;

use crate::cli::args::JudgeArgs;
use crate::exit_codes::{CONFIG_ERROR, INPUT_ERROR, SUCCESS};
use gavel_core::config::{Credential, GavelConfig, JudgeProvider};
use gavel_core::errors::ConfigError;
use gavel_core::judge::{JudgeConfig, JudgeService};
use gavel_core::pipeline::{run_judging, JudgeRunOptions, PersistMode};
use gavel_core::providers::llm::fake::FakeLlmClient;
use gavel_core::providers::llm::openai::OpenAIClient;
use gavel_core::providers::llm::LlmClient;
use gavel_core::report::console::{format_done_line, progress_sink};

pub async fn run(args: JudgeArgs) -> anyhow::Result<i32> {
    let cfg = match resolve_config(&args) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("error: {e}");
            return Ok(CONFIG_ERROR);
        }
    };
    let client = match build_client(&cfg, args.api_key.clone()) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("error: {e:#}");
            return Ok(CONFIG_ERROR);
        }
    };
    let judge = JudgeService::new(JudgeConfig::from(&cfg.judge), client);

    let opts = JudgeRunOptions {
        dataset: args.dataset.clone(),
        generations_in: args.generations_in.clone(),
        generations_out: args.generations_out.clone(),
        mode: PersistMode::from_flags(args.append, args.stream_write),
        concurrency: cfg.run.concurrency,
    };
    let progress = args
        .progress
        .then(|| progress_sink(cfg.run.progress_every));

    match run_judging(&opts, &judge, progress).await {
        Ok(stats) => {
            tracing::info!(
                "judged {} (skipped {}, failed {}) -> {}",
                stats.judged,
                stats.skipped,
                stats.failed,
                opts.generations_out.display()
            );
            if args.progress {
                eprintln!("{}", format_done_line(&stats));
            }
            Ok(SUCCESS)
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            Ok(INPUT_ERROR)
        }
    }
}

/// Config file (if any) with CLI overrides applied on top, validated.
fn resolve_config(args: &JudgeArgs) -> Result<GavelConfig, ConfigError> {
    let mut cfg = match &args.config {
        Some(path) => GavelConfig::load(path)?,
        None => GavelConfig::default(),
    };

    if let Some(provider) = args.judge_provider.as_deref() {
        cfg.judge.provider = match provider {
            "fake" => JudgeProvider::Fake,
            "openai" => JudgeProvider::Openai,
            other => {
                return Err(ConfigError::Invalid(format!(
                    "unknown judge provider: {other}"
                )))
            }
        };
    }
    if let Some(model) = &args.judge_model {
        cfg.judge.model = model.clone();
    }
    if let Some(base_url) = &args.base_url {
        cfg.judge.base_url = base_url.clone();
    }
    if let Some(n) = args.max_attempts {
        cfg.judge.max_attempts = n;
    }
    if let Some(ms) = args.retry_delay_ms {
        cfg.judge.retry_delay_ms = ms;
    }
    if let Some(secs) = args.request_timeout_secs {
        cfg.judge.request_timeout_secs = secs;
    }
    if let Some(n) = args.concurrency {
        cfg.run.concurrency = n;
    }
    if let Some(n) = args.progress_every {
        cfg.run.progress_every = n;
    }

    cfg.validate()?;
    Ok(cfg)
}

/// The credential is only required for the live provider.
fn build_client(cfg: &GavelConfig, api_key: Option<String>) -> anyhow::Result<Arc<dyn LlmClient>> {
    match cfg.judge.provider {
        JudgeProvider::Fake => Ok(Arc::new(FakeLlmClient::default())),
        JudgeProvider::Openai => {
            let credential = Credential::from_option(api_key)?;
            let client = OpenAIClient::new(
                cfg.judge.model.clone(),
                cfg.judge.base_url.clone(),
                credential,
                cfg.judge.request_timeout(),
            )?;
            Ok(Arc::new(client))
        }
    }
}

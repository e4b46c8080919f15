use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "gavel",
    version,
    about = "Resumable LLM-as-judge scoring for JSONL generations"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Score generations against a dataset with an LLM judge
    Judge(JudgeArgs),
    /// Join judged generations with the dataset and compute accuracy
    Aggregate(AggregateArgs),
    Version,
}

#[derive(Parser, Debug, Clone)]
pub struct JudgeArgs {
    /// Dataset JSONL (id, prompt, rubric/reference, category, media_url/image)
    #[arg(long)]
    pub dataset: PathBuf,

    /// Generations JSONL to judge
    #[arg(long)]
    pub generations_in: PathBuf,

    /// Judged output JSONL
    #[arg(long)]
    pub generations_out: PathBuf,

    /// Optional gavel.yaml; flags below override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Judge provider
    /// - openai: OpenAI-compatible chat completions endpoint
    /// - fake: deterministic offline judge (tests/dry runs)
    #[arg(long, value_parser = ["openai", "fake"])]
    pub judge_provider: Option<String>,

    /// Judge model identifier (default: GPT-5)
    #[arg(long)]
    pub judge_model: Option<String>,

    /// API key for the judge endpoint
    #[arg(long, env = "POE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of the chat completions API
    #[arg(long)]
    pub base_url: Option<String>,

    /// Append to the output and skip ids already judged there (resumable)
    #[arg(long)]
    pub append: bool,

    /// Truncate the output, then write each judged row as it completes.
    /// Ignored when --append is set.
    #[arg(long)]
    pub stream_write: bool,

    /// Print progress lines to stderr
    #[arg(long)]
    pub progress: bool,

    /// Emit a progress line every N records
    #[arg(long)]
    pub progress_every: Option<usize>,

    /// Judge attempts per record before scoring it 0
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Base backoff; attempt n waits n × this before retrying
    #[arg(long)]
    pub retry_delay_ms: Option<u64>,

    /// Per-request timeout for judge calls
    #[arg(long)]
    pub request_timeout_secs: Option<u64>,

    /// Judge calls in flight at once (output order is unaffected)
    #[arg(long)]
    pub concurrency: Option<usize>,
}

#[derive(Parser, Debug, Clone)]
pub struct AggregateArgs {
    /// Judged generations JSONL
    pub generations: PathBuf,

    /// Dataset JSONL
    #[arg(long)]
    pub data: PathBuf,

    /// Detailed per-example results JSONL
    #[arg(long)]
    pub output: PathBuf,

    /// Summary JSON (default: <output stem>_summary.<ext>)
    #[arg(long)]
    pub output_summary: Option<PathBuf>,
}

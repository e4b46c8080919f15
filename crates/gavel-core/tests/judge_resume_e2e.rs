use async_trait::async_trait;
use gavel_core::aggregate::aggregate_files;
use gavel_core::judge::retry::RetryPolicy;
use gavel_core::judge::{JudgeConfig, JudgeService};
use gavel_core::pipeline::{run_judging, JudgeRunOptions, PersistMode};
use gavel_core::providers::llm::{ChatRequest, LlmClient, LlmResponse};
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

/// Answers with a fixed reply and counts calls.
struct CountingJudge {
    reply: &'static str,
    calls: AtomicUsize,
}

impl CountingJudge {
    fn new(reply: &'static str) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl LlmClient for CountingJudge {
    async fn complete(&self, _request: &ChatRequest) -> anyhow::Result<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(LlmResponse {
            text: self.reply.to_string(),
            provider: "counting".into(),
            model: "counting".into(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "counting"
    }
}

fn service(client: Arc<CountingJudge>) -> JudgeService {
    JudgeService::new(
        JudgeConfig {
            temperature: 0.0,
            retry: RetryPolicy::new(3, Duration::ZERO),
        },
        client,
    )
}

fn options(dir: &Path, mode: PersistMode) -> JudgeRunOptions {
    JudgeRunOptions {
        dataset: dir.join("data.jsonl"),
        generations_in: dir.join("gens.jsonl"),
        generations_out: dir.join("judged.jsonl"),
        mode,
        concurrency: 1,
    }
}

#[tokio::test]
async fn end_to_end_judge_then_aggregate() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("data.jsonl"),
        "{\"id\":\"a\",\"prompt\":\"P\",\"rubric\":\"R\",\"category\":\"C\"}\n",
    )
    .unwrap();
    fs::write(dir.path().join("gens.jsonl"), "{\"id\":\"a\",\"response\":\"ok\"}\n").unwrap();

    let client = CountingJudge::new(r#"{"score":1,"explanation":"good"}"#);
    let stats = run_judging(
        &options(dir.path(), PersistMode::Batch),
        &service(client.clone()),
        None,
    )
    .await
    .unwrap();
    assert_eq!(stats.judged, 1);
    assert_eq!(
        fs::read_to_string(dir.path().join("judged.jsonl")).unwrap(),
        "{\"id\":\"a\",\"response\":\"ok\",\"score\":1.0,\"explanation\":\"good\"}\n"
    );

    let (report, summary_path) = aggregate_files(
        &dir.path().join("judged.jsonl"),
        &dir.path().join("data.jsonl"),
        &dir.path().join("detailed.jsonl"),
        None,
    )
    .unwrap();
    assert_eq!(report.rows.len(), 1);
    assert_eq!(summary_path, dir.path().join("detailed_summary.jsonl"));
    let summary: Value =
        serde_json::from_str(&fs::read_to_string(summary_path).unwrap()).unwrap();
    assert_eq!(summary, serde_json::json!({"C": 100.0, "overall": 100.0}));
}

#[tokio::test]
async fn interrupted_append_run_resumes_without_duplicates() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("data.jsonl"),
        "{\"id\":\"a\",\"category\":\"reasoning\"}\n\
         {\"id\":\"b\",\"category\":\"reasoning\"}\n\
         {\"id\":\"c\",\"category\":\"math\"}\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("gens.jsonl"),
        "{\"id\":\"a\",\"response\":\"1\"}\n\
         {\"example_id\":\"b\",\"response\":\"2\"}\n\
         {\"id\":\"c\",\"response\":\"3\"}\n",
    )
    .unwrap();
    // A previous run died while writing the second row.
    fs::write(
        dir.path().join("judged.jsonl"),
        "{\"id\":\"a\",\"response\":\"1\",\"score\":1.0,\"explanation\":\"\"}\n{\"example_id\":\"b\",\"resp",
    )
    .unwrap();

    let client = CountingJudge::new(r#"Sure: {"score": "0", "explanation": "nope"}"#);
    let stats = run_judging(
        &options(dir.path(), PersistMode::Append),
        &service(client.clone()),
        None,
    )
    .await
    .unwrap();
    assert_eq!(client.calls.load(Ordering::SeqCst), 2);
    assert_eq!((stats.skipped, stats.judged, stats.failed), (1, 2, 0));

    let body = fs::read_to_string(dir.path().join("judged.jsonl")).unwrap();
    let ids: Vec<String> = body
        .lines()
        .map(|l| serde_json::from_str::<Value>(l).unwrap())
        .map(|v| gavel_core::resolve_id(v.as_object().unwrap()).unwrap())
        .collect();
    assert_eq!(ids, vec!["a", "b", "c"]);

    let again = CountingJudge::new(r#"{"score":1}"#);
    run_judging(
        &options(dir.path(), PersistMode::Append),
        &service(again.clone()),
        None,
    )
    .await
    .unwrap();
    assert_eq!(again.calls.load(Ordering::SeqCst), 0);
    assert_eq!(fs::read_to_string(dir.path().join("judged.jsonl")).unwrap(), body);
}

#[tokio::test]
async fn missing_generations_file_leaves_output_untouched() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("data.jsonl"), "{\"id\":\"a\"}\n").unwrap();
    fs::write(dir.path().join("judged.jsonl"), "{\"id\":\"a\"}\n").unwrap();

    let err = run_judging(
        &options(dir.path(), PersistMode::Stream),
        &service(CountingJudge::new("{}")),
        None,
    )
    .await
    .unwrap_err();
    assert!(format!("{err:#}").contains("gens.jsonl"));
    assert_eq!(
        fs::read_to_string(dir.path().join("judged.jsonl")).unwrap(),
        "{\"id\":\"a\"}\n"
    );
}

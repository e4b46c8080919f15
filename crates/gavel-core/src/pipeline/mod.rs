//! Judging Orchestrator.
//!
//! Per generation, in input order: resolve the identifier, skip it if the
//! resume index already has it, otherwise judge it against its dataset
//! example, annotate the record and hand it to the sink. Oracle calls may
//! overlap (bounded by `concurrency`); persistence never does, and output
//! order always equals input order.

pub mod sink;


use std::collections::HashSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use futures::stream::{self, StreamExt};
use serde_json::Value;

use crate::dataset::DatasetIndex;
use crate::identity::resolve_id;
use crate::judge::{JudgeService, JudgeStatus, Judgement};
use crate::model::{response_text, Example, Record, EXPLANATION_FIELD, IMAGE_FIELD, SCORE_FIELD};
use crate::report::progress::{ProgressEvent, ProgressSink};
use crate::resume::ResumeIndex;
use crate::store::{self, StoreError};
pub use sink::{open_sink, PersistMode, RecordSink};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    /// Input records handled, skipped ones included.
    pub processed: usize,
    /// Records sent to the oracle and persisted this run.
    pub judged: usize,
    pub skipped: usize,
    /// Judged records whose every oracle attempt failed (persisted with score 0).
    pub failed: usize,
    pub elapsed: Duration,
}

impl RunStats {
    /// Newly judged records per second, the same in every persistence mode.
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.judged as f64 / secs
        } else {
            0.0
        }
    }
}

enum Step {
    Skip,
    Judge {
        record: Record,
        example: Example,
        response: String,
    },
}

pub struct JudgePipeline<'a> {
    dataset: &'a DatasetIndex,
    judge: &'a JudgeService,
    concurrency: usize,
    progress: Option<ProgressSink>,
}

impl<'a> JudgePipeline<'a> {
    pub fn new(dataset: &'a DatasetIndex, judge: &'a JudgeService) -> Self {
        Self {
            dataset,
            judge,
            concurrency: 1,
            progress: None,
        }
    }

    /// Maximum oracle calls in flight. 1 means strictly sequential.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_progress(mut self, progress: Option<ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Drive every generation through the judge into `sink`, then finish the
    /// sink. A read error in `generations` aborts the run; records persisted
    /// before it stay persisted.
    pub async fn run<I>(
        &self,
        generations: I,
        resume: &ResumeIndex,
        mut sink: Box<dyn RecordSink>,
        total: usize,
    ) -> anyhow::Result<RunStats>
    where
        I: IntoIterator<Item = Result<Record, StoreError>>,
    {
        let start = Instant::now();
        let mut stats = RunStats::default();

        let mut seen = HashSet::new();
        let steps = generations
            .into_iter()
            .map(|row| row.map(|record| self.plan(record, resume, &mut seen)));
        let mut outcomes = std::pin::pin!(stream::iter(steps)
            .map(|step| self.execute(step))
            .buffered(self.concurrency));

        while let Some(outcome) = outcomes.next().await {
            match outcome.context("reading generations")? {
                None => stats.skipped += 1,
                Some((record, status)) => {
                    sink.write(record).context("persisting judged record")?;
                    stats.judged += 1;
                    if status == JudgeStatus::Failed {
                        stats.failed += 1;
                    }
                }
            }
            stats.processed += 1;
            if let Some(progress) = &self.progress {
                progress(ProgressEvent {
                    done: stats.processed,
                    total,
                    skipped: stats.skipped,
                    judged: stats.judged,
                    elapsed: start.elapsed(),
                });
            }
        }

        let written = sink.finish().context("finishing judged output")?;
        stats.elapsed = start.elapsed();
        tracing::debug!("sink wrote {} records", written);
        Ok(stats)
    }

    /// Ids already in the output, or seen earlier in this input, are skipped
    /// so every identifier lands in the output at most once.
    fn plan(&self, record: Record, resume: &ResumeIndex, seen: &mut HashSet<String>) -> Step {
        let id = resolve_id(&record);
        if let Some(id) = id.as_deref() {
            if resume.contains(id) {
                return Step::Skip;
            }
            if !seen.insert(id.to_string()) {
                tracing::warn!("generation '{}' repeats an earlier input row; skipping it", id);
                return Step::Skip;
            }
        }
        let example = match id.as_deref().and_then(|id| self.dataset.get(id)) {
            Some(example) => example.clone(),
            None => {
                tracing::debug!(
                    "no dataset example for generation {:?}; judging without context",
                    id
                );
                Example {
                    id: id.unwrap_or_default(),
                    ..Example::default()
                }
            }
        };
        let response = response_text(&record);
        Step::Judge {
            record,
            example,
            response,
        }
    }

    async fn execute(
        &self,
        step: Result<Step, StoreError>,
    ) -> Result<Option<(Record, JudgeStatus)>, StoreError> {
        match step? {
            Step::Skip => Ok(None),
            Step::Judge {
                mut record,
                example,
                response,
            } => {
                let judgement = self.judge.judge(&example, &response).await;
                annotate(&mut record, &example, &judgement);
                Ok(Some((record, judgement.status)))
            }
        }
    }
}

/// Attach the verdict and, when the record has no `image`, the example's media.
fn annotate(record: &mut Record, example: &Example, judgement: &Judgement) {
    record.insert(SCORE_FIELD.to_string(), Value::from(judgement.score));
    record.insert(
        EXPLANATION_FIELD.to_string(),
        Value::String(judgement.explanation.clone()),
    );
    if !record.contains_key(IMAGE_FIELD) {
        if let Some(media) = &example.media {
            record.insert(IMAGE_FIELD.to_string(), media.clone());
        }
    }
}

/// Paths and knobs for one judging run over files.
#[derive(Debug, Clone)]
pub struct JudgeRunOptions {
    pub dataset: PathBuf,
    pub generations_in: PathBuf,
    pub generations_out: PathBuf,
    pub mode: PersistMode,
    pub concurrency: usize,
}

/// File-level entry point: load the dataset and (in append mode) the resume
/// index, open the sink, judge every generation.
pub async fn run_judging(
    opts: &JudgeRunOptions,
    judge: &JudgeService,
    progress: Option<ProgressSink>,
) -> anyhow::Result<RunStats> {
    let dataset = DatasetIndex::load(&opts.dataset).context("loading dataset")?;
    let total = store::count_lines(&opts.generations_in).context("sizing generations input")?;
    let generations = store::read(&opts.generations_in).context("opening generations input")?;

    let resume = if opts.mode.resumes() {
        ResumeIndex::load(&opts.generations_out)
    } else {
        ResumeIndex::empty()
    };
    if !resume.is_empty() {
        tracing::info!(
            "Resuming: found {} existing judged rows in {}",
            resume.len(),
            opts.generations_out.display()
        );
    }

    let sink = open_sink(opts.mode, &opts.generations_out, &resume)
        .context("opening judged output")?;
    tracing::info!(
        "judging {} generations against {} examples ({:?} mode, judge: {})",
        total,
        dataset.len(),
        opts.mode,
        judge.provider_name()
    );

    JudgePipeline::new(&dataset, judge)
        .with_concurrency(opts.concurrency)
        .with_progress(progress)
        .run(generations, &resume, sink, total)
        .await
}

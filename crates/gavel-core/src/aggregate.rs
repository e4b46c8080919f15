//! Aggregator: joins judged records with dataset examples and turns scores
//! into per-category and overall accuracy percentages.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{json, Value};

use crate::dataset::DatasetIndex;
use crate::identity::resolve_id;
use crate::model::{first_present, first_text, Example, Record, SCORE_FIELD};
use crate::store;

/// Category used when an example carries none.
pub const UNKNOWN_CATEGORY: &str = "unknown";
/// Summary key for the count-weighted figure across all categories.
pub const OVERALL_KEY: &str = "overall";

/// Percentages keyed by category, plus the overall figure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    pub categories: BTreeMap<String, f64>,
    pub overall: f64,
}

/// Flat `{"<category>": pct, ..., "overall": pct}`. A category literally
/// named `overall` is shadowed by the overall figure.
impl Serialize for Summary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (category, pct) in &self.categories {
            if category.as_str() != OVERALL_KEY {
                map.serialize_entry(category, pct)?;
            }
        }
        map.serialize_entry(OVERALL_KEY, &self.overall)?;
        map.end()
    }
}

#[derive(Debug, Clone, Default)]
pub struct AggregateReport {
    /// Detailed rows, one per judged record that joined an example.
    pub rows: Vec<Record>,
    /// Identified records with no dataset example.
    pub missing: usize,
    pub summary: Summary,
}

/// Read a score the way judged files carry it: numbers, booleans and
/// numeric strings. Anything else is not a score.
pub fn score_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Mean × 100 per category and, weighted by count, overall. Empty input
/// gives an overall of 0.0.
pub fn compute_percentages<'a, I>(scores: I) -> Summary
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let mut buckets: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for (category, score) in scores {
        let bucket = buckets.entry(category.to_string()).or_default();
        bucket.0 += score;
        bucket.1 += 1;
    }

    let (sum, count) = buckets
        .values()
        .fold((0.0, 0usize), |(s, c), (bs, bc)| (s + bs, c + bc));
    let overall = if count > 0 {
        sum / count as f64 * 100.0
    } else {
        0.0
    };
    if buckets.contains_key(OVERALL_KEY) {
        tracing::warn!(
            "category '{}' collides with the overall summary key; the overall figure wins",
            OVERALL_KEY
        );
    }
    let categories = buckets
        .into_iter()
        .map(|(category, (s, c))| (category, s / c as f64 * 100.0))
        .collect();
    Summary {
        categories,
        overall,
    }
}

fn category_of(example: &Example) -> &str {
    if example.category.is_empty() {
        UNKNOWN_CATEGORY
    } else {
        &example.category
    }
}

fn detailed_row(id: String, example: &Example, record: &Record) -> Record {
    let image = first_present(record, &["image"])
        .cloned()
        .or_else(|| example.media.clone())
        .unwrap_or(Value::Null);
    let row = json!({
        "example_id": id,
        "category": category_of(example),
        "prompt": example.prompt,
        "reference": example.rubric,
        "image": image,
        "generation": first_text(record, &["generation", "response"]).unwrap_or_default(),
        "score": record.get(SCORE_FIELD).cloned().unwrap_or(Value::Null),
        "explanation": first_text(record, &["explanation", "evaluator_explanation"])
            .unwrap_or_default(),
    });
    match row {
        Value::Object(map) => map,
        _ => Record::new(),
    }
}

/// Join judged records against the dataset.
pub fn aggregate<I>(judged: I, dataset: &DatasetIndex) -> AggregateReport
where
    I: IntoIterator<Item = Record>,
{
    let mut rows = Vec::new();
    let mut missing = 0usize;
    for record in judged {
        let Some(id) = resolve_id(&record) else {
            continue;
        };
        let Some(example) = dataset.get(&id) else {
            missing += 1;
            continue;
        };
        rows.push(detailed_row(id, example, &record));
    }
    if missing > 0 {
        tracing::warn!(
            "{} judged records have no matching dataset example and were dropped",
            missing
        );
    }

    let summary = compute_percentages(rows.iter().filter_map(|row| {
        let score = row.get(SCORE_FIELD).and_then(score_value)?;
        let category = row.get("category").and_then(Value::as_str)?;
        Some((category, score))
    }));
    AggregateReport {
        rows,
        missing,
        summary,
    }
}

/// `results/run.jsonl` → `results/run_summary.jsonl`.
pub fn default_summary_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match output.extension() {
        Some(ext) => format!("{stem}_summary.{}", ext.to_string_lossy()),
        None => format!("{stem}_summary"),
    };
    output.with_file_name(name)
}

/// Aggregate a judged JSONL file against a dataset file, writing the detailed
/// rows to `output` and the summary JSON to `output_summary` (or the default
/// summary path). Returns the report and the summary path used.
pub fn aggregate_files(
    generations: &Path,
    data: &Path,
    output: &Path,
    output_summary: Option<&Path>,
) -> anyhow::Result<(AggregateReport, PathBuf)> {
    let dataset = DatasetIndex::load(data).context("loading dataset")?;
    let judged = store::read(generations)
        .context("opening judged generations")?
        .collect::<Result<Vec<_>, _>>()
        .context("reading judged generations")?;

    let report = aggregate(judged, &dataset);
    store::write_all(output, &report.rows).context("writing detailed results")?;

    let summary_path = output_summary
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_summary_path(output));
    if let Some(parent) = summary_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let body = serde_json::to_string_pretty(&report.summary)?;
    fs::write(&summary_path, body + "\n")
        .with_context(|| format!("writing summary {}", summary_path.display()))?;

    tracing::info!(
        "aggregated {} rows ({} unmatched), overall {:.1}",
        report.rows.len(),
        report.missing,
        report.summary.overall
    );
    Ok((report, summary_path))
}

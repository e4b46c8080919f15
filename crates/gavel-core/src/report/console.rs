use crate::pipeline::RunStats;
use crate::report::progress::{ProgressEvent, ProgressSink};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Format a single progress line. Deterministic, unit-testable.
#[must_use]
pub fn format_progress_line(ev: &ProgressEvent) -> String {
    let pct = ev.done * 100 / ev.total.max(1);
    format!(
        "Judging progress: {}/{} ({}%), ~{:.2} ex/s (skipped {})",
        ev.done,
        ev.total,
        pct,
        ev.rate(),
        ev.skipped
    )
}

#[must_use]
pub fn format_done_line(stats: &RunStats) -> String {
    format!(
        "Done. Processed {} (judged {}, skipped {}, failed {}) in {:.1}s (~{:.2} ex/s)",
        stats.processed,
        stats.judged,
        stats.skipped,
        stats.failed,
        stats.elapsed.as_secs_f64(),
        stats.rate()
    )
}

/// Minimum interval between intermediate updates to avoid log spam.
const PROGRESS_MIN_INTERVAL_MS: u64 = 200;

fn should_emit_step(ev: &ProgressEvent, every: usize) -> bool {
    ev.done == 1 || ev.done % every.max(1) == 0
}

/// Sink printing to stderr on the first record, every `every` records, and
/// on the last one. Intermediate lines are throttled; the final line never is.
pub fn progress_sink(every: usize) -> ProgressSink {
    let last_emit: Mutex<Option<Instant>> = Mutex::new(None);
    Arc::new(move |ev: ProgressEvent| {
        let is_final = ev.total > 0 && ev.done >= ev.total;
        if !is_final && !should_emit_step(&ev, every) {
            return;
        }
        let now = Instant::now();
        let Ok(mut last) = last_emit.lock() else {
            return;
        };
        let interval_ok = last
            .map(|t| {
                now.saturating_duration_since(t) >= Duration::from_millis(PROGRESS_MIN_INTERVAL_MS)
            })
            .unwrap_or(true);
        if is_final || interval_ok {
            *last = Some(now);
            eprintln!("{}", format_progress_line(&ev));
        }
    })
}

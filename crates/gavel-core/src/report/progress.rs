//! Progress reporting for judging runs. The orchestrator emits one event per
//! input record (judged or skipped); the console layer consumes via a sink.

use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressEvent {
    /// Records handled so far, skipped ones included.
    pub done: usize,
    /// Input line count (an upper bound; blank lines are counted too).
    pub total: usize,
    pub skipped: usize,
    pub judged: usize,
    pub elapsed: Duration,
}

impl ProgressEvent {
    /// Newly judged records per second; skipped records are not work done.
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.judged as f64 / secs
        } else {
            0.0
        }
    }
}

pub type ProgressSink = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

//! Gavel core: a resumable, idempotent LLM-as-judge pipeline over JSONL files.
//!
//! The judging flow is `dataset` + generations -> [`pipeline`] -> judged JSONL,
//! with [`resume`] guarding against duplicate rows across restarts and
//! [`judge`] absorbing oracle failures into zero-score records.

pub mod aggregate;
pub mod config;
pub mod dataset;
pub mod errors;
pub mod identity;
pub mod judge;
pub mod model;
pub mod pipeline;
pub mod providers;
pub mod report;
pub mod resume;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use identity::resolve_id;
pub use model::{Example, Record};

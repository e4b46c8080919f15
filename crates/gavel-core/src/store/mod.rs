//! Record Store: newline-delimited JSON on local disk.
//!
//! Reads are lazy and strict (a malformed line fails the read). Writes are
//! line-atomic from the caller's point of view: every record is serialized
//! before any byte of it reaches the file.

mod errors;
mod jsonl;

pub use errors::StoreError;
pub use jsonl::{append_one, count_lines, read, write_all, JsonlAppender, JsonlReader};

//! Resume Index: identifiers already present in a previous run's output.
//!
//! Loading is best-effort. The first line that cannot be parsed ends the scan
//! and everything before it counts as judged; a half-written tail from an
//! aborted run therefore never stops a new run from starting.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::identity::resolve_id;
use crate::store::StoreError;

/// Where and why a scan stopped early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorruptTail {
    /// 1-based line number of the first unreadable line.
    pub line: usize,
    /// Byte offset at which that line starts.
    pub offset: u64,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct ResumeIndex {
    ids: HashSet<String>,
    valid_len: u64,
    file_len: u64,
    corrupt: Option<CorruptTail>,
}

impl ResumeIndex {
    /// An index that skips nothing (batch and stream modes).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Scan `path`. Never fails: a missing file gives an empty index and any
    /// read or parse failure truncates the scan with a warning.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::empty(),
            Err(e) => {
                tracing::warn!(
                    "resume index: cannot open {}: {}; resuming with no judged rows",
                    path.display(),
                    e
                );
                return Self::empty();
            }
        };
        let file_len = file.metadata().map(|m| m.len()).unwrap_or(0);
        let index = Self::scan(path, BufReader::new(file), file_len);
        if let Some(tail) = &index.corrupt {
            tracing::warn!(
                "resume index: stopped at {}:{} (byte offset {}): {}; {} judged rows before it are kept",
                path.display(),
                tail.line,
                tail.offset,
                tail.reason,
                index.ids.len()
            );
        }
        index
    }

    fn scan<R: BufRead>(path: &Path, mut reader: R, file_len: u64) -> Self {
        let mut index = Self {
            file_len,
            ..Self::default()
        };
        let mut buf = Vec::new();
        let mut offset = 0u64;
        let mut line_no = 0usize;
        loop {
            buf.clear();
            let n = match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    index.corrupt = Some(CorruptTail {
                        line: line_no + 1,
                        offset,
                        reason: StoreError::io(path, e).to_string(),
                    });
                    break;
                }
            };
            line_no += 1;
            match parse_line(&buf) {
                Ok(Some(record)) => {
                    if let Some(id) = resolve_id(&record) {
                        index.ids.insert(id);
                    }
                }
                Ok(None) => {}
                Err(reason) => {
                    index.corrupt = Some(CorruptTail {
                        line: line_no,
                        offset,
                        reason,
                    });
                    break;
                }
            }
            offset += n as u64;
            index.valid_len = offset;
        }
        index
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Length in bytes of the readable prefix of the scanned file.
    pub fn valid_len(&self) -> u64 {
        self.valid_len
    }

    /// Bytes after the readable prefix (a corrupt line and whatever follows it).
    pub fn discarded_len(&self) -> u64 {
        self.file_len.saturating_sub(self.valid_len)
    }

    pub fn corrupt_tail(&self) -> Option<&CorruptTail> {
        self.corrupt.as_ref()
    }
}

/// `Ok(None)` for blank lines.
fn parse_line(raw: &[u8]) -> Result<Option<crate::model::Record>, String> {
    let text = std::str::from_utf8(raw).map_err(|e| format!("invalid UTF-8: {e}"))?;
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(serde_json::Value::Object(map)) => Ok(Some(map)),
        Ok(_) => Err("line is not a JSON object".to_string()),
        Err(e) => Err(format!("invalid JSON: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let idx = ResumeIndex::load(dir.path().join("absent.jsonl"));
        assert!(idx.is_empty());
        assert_eq!(idx.valid_len(), 0);
        assert!(idx.corrupt_tail().is_none());
    }

    #[test]
    fn collects_ids_across_spellings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        fs::write(
            &path,
            "{\"id\":\"a\"}\n\n{\"example_id\":\"b\"}\n{\"exampleId\":\"c\"}\n{\"note\":\"no id\"}\n",
        )
        .unwrap();
        let idx = ResumeIndex::load(&path);
        assert_eq!(idx.len(), 3);
        assert!(idx.contains("a") && idx.contains("b") && idx.contains("c"));
        assert_eq!(idx.discarded_len(), 0);
    }

    #[test]
    fn truncated_tail_keeps_prefix() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        let good = "{\"id\":\"a\",\"score\":1.0}\n{\"id\":\"b\",\"score\":0.0}\n";
        fs::write(&path, format!("{good}{{\"id\":\"c\",\"sco")).unwrap();

        let idx = ResumeIndex::load(&path);
        assert_eq!(idx.len(), 2);
        assert!(!idx.contains("c"));
        assert_eq!(idx.valid_len(), good.len() as u64);
        let tail = idx.corrupt_tail().unwrap();
        assert_eq!(tail.line, 3);
        assert_eq!(tail.offset, good.len() as u64);
        assert_eq!(idx.discarded_len(), "{\"id\":\"c\",\"sco".len() as u64);
    }

    #[test]
    fn stops_at_first_bad_line_even_mid_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        fs::write(&path, "{\"id\":\"a\"}\ngarbage\n{\"id\":\"b\"}\n").unwrap();
        let idx = ResumeIndex::load(&path);
        assert!(idx.contains("a"));
        assert!(!idx.contains("b"));
        assert_eq!(idx.corrupt_tail().unwrap().line, 2);
    }

    #[test]
    fn invalid_utf8_line_ends_the_prefix() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        fs::write(&path, b"{\"id\":\"a\"}\n{\"id\":\"\xff\xfe\"}\n{\"id\":\"b\"}\n").unwrap();
        let idx = ResumeIndex::load(&path);
        assert_eq!(idx.len(), 1);
        assert!(!idx.contains("b"));
        assert_eq!(idx.valid_len(), 11);
        let tail = idx.corrupt_tail().unwrap();
        assert_eq!(tail.line, 2);
        assert_eq!(tail.offset, 11);
    }

    #[test]
    fn non_object_line_ends_the_prefix() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        fs::write(&path, "{\"id\":\"a\"}\n[1]\n{\"id\":\"b\"}\n").unwrap();
        let idx = ResumeIndex::load(&path);
        assert_eq!(idx.len(), 1);
        assert!(!idx.contains("b"));
        assert_eq!(idx.valid_len(), 11);
        let tail = idx.corrupt_tail().unwrap();
        assert_eq!(tail.line, 2);
        assert_eq!(tail.reason, "line is not a JSON object");
    }

    #[test]
    fn unterminated_but_valid_last_line_counts() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        fs::write(&path, "{\"id\":\"a\"}\n{\"id\":\"b\"}").unwrap();
        let idx = ResumeIndex::load(&path);
        assert_eq!(idx.len(), 2);
        assert_eq!(idx.discarded_len(), 0);
    }
}

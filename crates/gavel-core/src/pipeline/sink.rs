//! Persistence strategies for judged records.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::model::Record;
use crate::resume::ResumeIndex;
use crate::store::{self, JsonlAppender, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PersistMode {
    /// Append each record and flush it before the next is judged; resumable.
    Append,
    /// Truncate first, then write each record as it is produced.
    Stream,
    /// Buffer in memory and rewrite the file once at the end.
    #[default]
    Batch,
}

impl PersistMode {
    /// `--append` wins over `--stream-write`.
    pub fn from_flags(append: bool, stream_write: bool) -> Self {
        match (append, stream_write) {
            (true, _) => Self::Append,
            (false, true) => Self::Stream,
            (false, false) => Self::Batch,
        }
    }

    /// Only append mode reads back the previous output.
    pub fn resumes(self) -> bool {
        matches!(self, Self::Append)
    }
}

/// Single owner of the output file. The orchestrator hands records over in
/// input order; nothing else writes to the destination during a run.
pub trait RecordSink: Send {
    fn write(&mut self, record: Record) -> Result<(), StoreError>;

    /// Flush and close. Returns how many records this sink wrote.
    fn finish(self: Box<Self>) -> Result<usize, StoreError>;
}

pub fn open_sink(
    mode: PersistMode,
    path: &Path,
    resume: &ResumeIndex,
) -> Result<Box<dyn RecordSink>, StoreError> {
    Ok(match mode {
        PersistMode::Append => Box::new(WriteThroughSink::append(path, resume)?),
        PersistMode::Stream => Box::new(WriteThroughSink::truncate(path)?),
        PersistMode::Batch => Box::new(BatchSink::new(path)),
    })
}

/// Writes and flushes each record as it arrives. Backs both append and
/// stream modes; they differ only in how the file is opened.
pub struct WriteThroughSink {
    out: JsonlAppender,
    written: usize,
}

impl WriteThroughSink {
    /// Open `path` for appending after cutting it back to the prefix the
    /// resume index could read, so rows after a corrupt line cannot survive
    /// next to their re-judged copies.
    pub fn append(path: &Path, resume: &ResumeIndex) -> Result<Self, StoreError> {
        let valid_len = resume.valid_len();
        if resume.discarded_len() > 0 {
            tracing::warn!(
                "{}: discarding {} unreadable bytes after offset {} before appending",
                path.display(),
                resume.discarded_len(),
                valid_len
            );
            OpenOptions::new()
                .write(true)
                .open(path)
                .and_then(|f| f.set_len(valid_len))
                .map_err(|e| StoreError::io(path, e))?;
        }
        let needs_newline = valid_len > 0 && !ends_with_newline(path, valid_len)?;
        let mut out = JsonlAppender::open(path)?;
        if needs_newline {
            out.terminate_line()?;
        }
        Ok(Self { out, written: 0 })
    }

    /// Truncate `path`, then write through.
    pub fn truncate(path: &Path) -> Result<Self, StoreError> {
        Ok(Self {
            out: JsonlAppender::create(path)?,
            written: 0,
        })
    }
}

fn ends_with_newline(path: &Path, len: u64) -> Result<bool, StoreError> {
    let io_err = |e| StoreError::io(path, e);
    let mut file = File::open(path).map_err(io_err)?;
    file.seek(SeekFrom::Start(len - 1)).map_err(io_err)?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last).map_err(io_err)?;
    Ok(last[0] == b'\n')
}

impl RecordSink for WriteThroughSink {
    fn write(&mut self, record: Record) -> Result<(), StoreError> {
        self.out.append(&record)?;
        self.written += 1;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<usize, StoreError> {
        let written = self.written;
        self.out.close()?;
        Ok(written)
    }
}

/// Leaves the destination untouched until [`RecordSink::finish`].
pub struct BatchSink {
    path: PathBuf,
    rows: Vec<Record>,
}

impl BatchSink {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            rows: Vec::new(),
        }
    }
}

impl RecordSink for BatchSink {
    fn write(&mut self, record: Record) -> Result<(), StoreError> {
        self.rows.push(record);
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<usize, StoreError> {
        store::write_all(&self.path, &self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    fn rec(id: &str) -> Record {
        json!({ "id": id }).as_object().cloned().unwrap()
    }

    #[test]
    fn mode_flags() {
        assert_eq!(PersistMode::from_flags(true, true), PersistMode::Append);
        assert_eq!(PersistMode::from_flags(false, true), PersistMode::Stream);
        assert_eq!(PersistMode::from_flags(false, false), PersistMode::Batch);
        assert!(PersistMode::Append.resumes());
        assert!(!PersistMode::Stream.resumes());
    }

    #[test]
    fn append_sink_cuts_corrupt_tail_before_appending() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        fs::write(&path, "{\"id\":\"a\"}\n{\"id\":\"b\",\"sc").unwrap();
        let resume = ResumeIndex::load(&path);

        let mut sink: Box<dyn RecordSink> =
            Box::new(WriteThroughSink::append(&path, &resume).unwrap());
        sink.write(rec("b")).unwrap();
        assert_eq!(sink.finish().unwrap(), 1);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "{\"id\":\"a\"}\n{\"id\":\"b\"}\n"
        );
    }

    #[test]
    fn append_sink_cuts_back_to_line_before_non_object_row() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        fs::write(&path, "{\"id\":\"a\"}\n[1]\n{\"id\":\"b\"}\n").unwrap();
        let resume = ResumeIndex::load(&path);

        let mut sink = WriteThroughSink::append(&path, &resume).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"id\":\"a\"}\n");
        sink.write(rec("b")).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "{\"id\":\"a\"}\n{\"id\":\"b\"}\n"
        );
    }

    #[test]
    fn append_sink_cuts_back_to_line_before_invalid_utf8() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        fs::write(&path, b"{\"id\":\"a\"}\n{\"id\":\"\xff\"}\n{\"id\":\"b\"}\n").unwrap();
        let resume = ResumeIndex::load(&path);

        let sink = WriteThroughSink::append(&path, &resume).unwrap();
        assert_eq!(Box::new(sink).finish().unwrap(), 0);
        assert_eq!(fs::read(&path).unwrap(), b"{\"id\":\"a\"}\n");
    }

    #[test]
    fn append_sink_terminates_unterminated_valid_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        fs::write(&path, "{\"id\":\"a\"}").unwrap();
        let resume = ResumeIndex::load(&path);

        let mut sink = WriteThroughSink::append(&path, &resume).unwrap();
        sink.write(rec("b")).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "{\"id\":\"a\"}\n{\"id\":\"b\"}\n"
        );
    }

    #[test]
    fn batch_sink_writes_only_on_finish() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        fs::write(&path, "{\"id\":\"previous\"}\n").unwrap();

        let mut sink: Box<dyn RecordSink> = Box::new(BatchSink::new(&path));
        sink.write(rec("x")).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"id\":\"previous\"}\n");
        assert_eq!(sink.finish().unwrap(), 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"id\":\"x\"}\n");
    }

    #[test]
    fn stream_sink_truncates_then_writes_through() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        fs::write(&path, "{\"id\":\"previous\"}\n").unwrap();

        let mut sink = WriteThroughSink::truncate(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
        sink.write(rec("x")).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"id\":\"x\"}\n");
    }
}

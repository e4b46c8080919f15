use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::StoreError;
use crate::model::Record;

/// Lazy reader yielding one JSON object per non-empty line.
pub struct JsonlReader {
    path: PathBuf,
    lines: std::io::Lines<BufReader<File>>,
    line_no: usize,
    failed: bool,
}

impl JsonlReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| StoreError::io(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            lines: BufReader::new(file).lines(),
            line_no: 0,
            failed: false,
        })
    }
}

impl Iterator for JsonlReader {
    type Item = Result<Record, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(StoreError::io(&self.path, e)));
                }
            };
            self.line_no += 1;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let parsed = parse_record(&self.path, self.line_no, trimmed);
            self.failed = parsed.is_err();
            return Some(parsed);
        }
    }
}

/// Open `path` for lazy record iteration.
pub fn read(path: impl AsRef<Path>) -> Result<JsonlReader, StoreError> {
    JsonlReader::open(path)
}

pub(crate) fn parse_record(path: &Path, line_no: usize, content: &str) -> Result<Record, StoreError> {
    match serde_json::from_str::<Value>(content) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(StoreError::NotAnObject {
            path: path.to_path_buf(),
            line: line_no,
            found: json_kind(&other),
        }),
        Err(e) => Err(StoreError::parse(path, line_no, content, e)),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn encode_line(path: &Path, record: &Record) -> Result<Vec<u8>, StoreError> {
    let mut line = serde_json::to_vec(record).map_err(|source| StoreError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    line.push(b'\n');
    Ok(line)
}

fn ensure_parent_dir(path: &Path) -> Result<(), StoreError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))
        }
        _ => Ok(()),
    }
}

/// Truncate `path` and write every record, one per line. Returns the number
/// of records written.
pub fn write_all<'a, I>(path: impl AsRef<Path>, records: I) -> Result<usize, StoreError>
where
    I: IntoIterator<Item = &'a Record>,
{
    let path = path.as_ref();
    ensure_parent_dir(path)?;
    let file = File::create(path).map_err(|e| StoreError::io(path, e))?;
    let mut out = std::io::BufWriter::new(file);
    let mut written = 0;
    for record in records {
        let line = encode_line(path, record)?;
        out.write_all(&line).map_err(|e| StoreError::io(path, e))?;
        written += 1;
    }
    out.flush().map_err(|e| StoreError::io(path, e))?;
    Ok(written)
}

/// Append exactly one record to `path` and flush it.
pub fn append_one(path: impl AsRef<Path>, record: &Record) -> Result<(), StoreError> {
    let mut appender = JsonlAppender::open(path)?;
    appender.append(record)
}

/// Count newline-terminated lines, regardless of content. A missing file
/// counts as zero.
pub fn count_lines(path: impl AsRef<Path>) -> Result<usize, StoreError> {
    let path = path.as_ref();
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(StoreError::io(path, e)),
    };
    let mut buf = [0u8; 64 * 1024];
    let mut count = 0;
    loop {
        let n = file.read(&mut buf).map_err(|e| StoreError::io(path, e))?;
        if n == 0 {
            break;
        }
        count += buf[..n].iter().filter(|&&b| b == b'\n').count();
    }
    Ok(count)
}

/// Long-lived append handle. Each [`JsonlAppender::append`] lands as one
/// complete line and is flushed before returning, so a killed process leaves
/// a valid prefix behind.
pub struct JsonlAppender {
    path: PathBuf,
    file: File,
}

impl JsonlAppender {
    /// Open `path` for appending, creating it (and its parent directory) if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        ensure_parent_dir(path)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| StoreError::io(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Truncate `path` and open it for incremental writes.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        ensure_parent_dir(path)?;
        File::create(path).map_err(|e| StoreError::io(path, e))?;
        Self::open(path)
    }

    pub fn append(&mut self, record: &Record) -> Result<(), StoreError> {
        let line = encode_line(&self.path, record)?;
        self.file
            .write_all(&line)
            .and_then(|_| self.file.flush())
            .map_err(|e| StoreError::io(&self.path, e))
    }

    /// Write a bare newline, terminating a final line left without one.
    pub(crate) fn terminate_line(&mut self) -> Result<(), StoreError> {
        self.file
            .write_all(b"\n")
            .and_then(|_| self.file.flush())
            .map_err(|e| StoreError::io(&self.path, e))
    }

    pub fn close(mut self) -> Result<(), StoreError> {
        self.file
            .flush()
            .and_then(|_| self.file.sync_data())
            .map_err(|e| StoreError::io(&self.path, e))
    }
}

//! Event-log boundary: entry format, scalar record decoding, and the
//! `LogSource` seam that opens one run's log as a stream.
//!
//! A log is JSON lines. Each line is one entry:
//!
//! ```text
//! {"wall_time": 1700000000.25, "step": 3, "summary": {"value": [{"tag": "train/loss", "simple_value": 0.5}]}}
//! ```
//!
//! Only entries with exactly one scalar summary value become [`Record`]s.
//! Everything else (headers, multi-value entries, unparseable lines) is
//! dropped without error and counted in [`DecodeStats`].

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Cursor, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::MalformedLogError;
use crate::logging::{log, obj, v_str, Domain, Level};

pub const FILE_VERSION: &str = "brain.Event:2";

// =============================================================================
// Entry format
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub wall_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    #[serde(default)]
    pub value: Vec<SummaryValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryValue {
    pub tag: String,
    /// Absent for non-scalar summaries (images, histograms).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simple_value: Option<f64>,
}

/// One scalar observation.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub step: u64,
    pub wall_time: f64,
    pub tag: String,
    pub value: f64,
}

impl LogEntry {
    /// Single-scalar entries only; anything else is `None`.
    pub fn into_record(self) -> Option<Record> {
        let mut summary = self.summary?;
        if summary.value.len() != 1 {
            return None;
        }
        let sv = summary.value.pop()?;
        Some(Record {
            step: self.step.unwrap_or(0),
            wall_time: self.wall_time,
            tag: sv.tag,
            value: sv.simple_value?,
        })
    }
}

// =============================================================================
// Decoder
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    pub lines: u64,
    pub records: u64,
    pub skipped: u64,
}

/// Lazy, single-pass decoder over one log stream.
pub struct RecordDecoder<R> {
    reader: R,
    buf: Vec<u8>,
    stats: DecodeStats,
    done: bool,
}

pub fn decode<R: BufRead>(reader: R) -> RecordDecoder<R> {
    RecordDecoder {
        reader,
        buf: Vec::new(),
        stats: DecodeStats::default(),
        done: false,
    }
}

impl<R> RecordDecoder<R> {
    pub fn stats(&self) -> DecodeStats {
        self.stats
    }
}

impl<R: BufRead> Iterator for RecordDecoder<R> {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        while !self.done {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    self.done = true;
                    break;
                }
                Ok(_) => {}
                Err(err) => {
                    // A read failure mid-stream ends the run's data; what was
                    // decoded so far is kept.
                    log(
                        Level::Warn,
                        Domain::Ingest,
                        "read_interrupted",
                        obj(&[("error", v_str(&err.to_string()))]),
                    );
                    self.done = true;
                    break;
                }
            }
            let trimmed = trim_line(&self.buf);
            if trimmed.is_empty() {
                continue;
            }
            self.stats.lines += 1;
            // Bytes are parsed as-is: invalid UTF-8 fails here and is skipped
            // like any other unparseable line.
            let record = serde_json::from_slice::<LogEntry>(trimmed)
                .ok()
                .and_then(LogEntry::into_record);
            match record {
                Some(r) => {
                    self.stats.records += 1;
                    return Some(r);
                }
                None => self.stats.skipped += 1,
            }
        }
        None
    }
}

fn trim_line(line: &[u8]) -> &[u8] {
    let start = line.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(line.len());
    let end = line.iter().rposition(|b| !b.is_ascii_whitespace()).map_or(start, |i| i + 1);
    &line[start..end]
}

// =============================================================================
// Log sources
// =============================================================================

/// Opens one run's log as a buffered stream.
pub trait LogSource {
    fn open(&self, path: &Path) -> Result<Box<dyn BufRead>, MalformedLogError>;
}

/// Filesystem source. A file path is the log itself; a directory's log is
/// the concatenation of its files named `<prefix>*`, in file-name order.
#[derive(Debug, Clone)]
pub struct FsLogSource {
    pub event_file_prefix: String,
}

impl FsLogSource {
    pub fn new(event_file_prefix: impl Into<String>) -> Self {
        Self { event_file_prefix: event_file_prefix.into() }
    }

    pub fn event_files(&self, dir: &Path) -> Result<Vec<PathBuf>, MalformedLogError> {
        let open_err = |source| MalformedLogError::Open { path: dir.to_path_buf(), source };
        let mut files = Vec::new();
        for entry in fs::read_dir(dir).map_err(open_err)? {
            let entry = entry.map_err(open_err)?;
            let path = entry.path();
            let matches = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(&self.event_file_prefix))
                .unwrap_or(false);
            if matches && path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        if files.is_empty() {
            return Err(MalformedLogError::NoEventFiles {
                path: dir.to_path_buf(),
                prefix: self.event_file_prefix.clone(),
            });
        }
        Ok(files)
    }

    /// Files backing a run path, whether it names a file or a directory.
    pub fn log_files(&self, path: &Path) -> Result<Vec<PathBuf>, MalformedLogError> {
        if path.is_dir() {
            self.event_files(path)
        } else {
            Ok(vec![path.to_path_buf()])
        }
    }
}

impl LogSource for FsLogSource {
    fn open(&self, path: &Path) -> Result<Box<dyn BufRead>, MalformedLogError> {
        let mut reader: Box<dyn Read> = Box::new(io::empty());
        for file_path in self.log_files(path)? {
            let file = File::open(&file_path).map_err(|source| MalformedLogError::Open {
                path: file_path.clone(),
                source,
            })?;
            // Newline between files so a missing trailing newline cannot
            // splice two entries together.
            reader = Box::new(reader.chain(file).chain(Cursor::new(b"\n".to_vec())));
        }
        Ok(Box::new(BufReader::new(reader)))
    }
}

// =============================================================================
// Writer
// =============================================================================

/// Append-only writer producing logs in the format the decoder reads.
pub struct EventLogWriter {
    writer: BufWriter<File>,
}

impl EventLogWriter {
    /// Creates the file and writes the version header entry.
    pub fn create(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut w = Self { writer: BufWriter::new(File::create(path)?) };
        w.write_entry(&LogEntry {
            wall_time: wall_time_now(),
            step: None,
            summary: None,
            file_version: Some(FILE_VERSION.to_string()),
        })?;
        Ok(w)
    }

    pub fn add_scalar(&mut self, tag: &str, value: f64, step: u64) -> io::Result<()> {
        self.write_entry(&LogEntry {
            wall_time: wall_time_now(),
            step: Some(step),
            summary: Some(Summary {
                value: vec![SummaryValue { tag: tag.to_string(), simple_value: Some(value) }],
            }),
            file_version: None,
        })
    }

    pub fn write_entry(&mut self, entry: &LogEntry) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, entry)?;
        self.writer.write_all(b"\n")
    }

    pub fn close(mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

fn wall_time_now() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

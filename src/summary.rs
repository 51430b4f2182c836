//! Per-run summaries for inspection tooling.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::event_log::FsLogSource;
use crate::registry::RunRegistry;
use crate::run_index::RunIndex;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagSummary {
    pub tag: String,
    pub records: usize,
    pub step_min: Option<u64>,
    pub step_max: Option<u64>,
    pub last_value: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogFileSummary {
    pub path: String,
    pub sha256: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub records: usize,
    pub skipped_entries: u64,
    /// RFC3339 bounds of the run's wall times.
    pub first_wall_time: Option<String>,
    pub last_wall_time: Option<String>,
    pub tags: Vec<TagSummary>,
    pub files: Vec<LogFileSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnreadableSummary {
    pub run_id: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySummary {
    pub runs: Vec<RunSummary>,
    pub unreadable: Vec<UnreadableSummary>,
}

pub fn file_sha256(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

fn rfc3339(wall_time: f64) -> Option<String> {
    let secs = wall_time.floor();
    let nanos = ((wall_time - secs) * 1e9) as u32;
    chrono::DateTime::from_timestamp(secs as i64, nanos)
        .map(|t| t.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
}

pub fn summarize_run(run: &RunIndex, skipped_entries: u64) -> RunSummary {
    let mut first: Option<f64> = None;
    let mut last: Option<f64> = None;
    let mut tags = Vec::with_capacity(run.tags().len());
    for (tag, series) in run.tags() {
        for r in series.records() {
            first = Some(first.map_or(r.wall_time, |f| f.min(r.wall_time)));
            last = Some(last.map_or(r.wall_time, |l| l.max(r.wall_time)));
        }
        tags.push(TagSummary {
            tag: tag.clone(),
            records: series.len(),
            step_min: series.records().iter().map(|r| r.step).min(),
            step_max: series.records().iter().map(|r| r.step).max(),
            last_value: series.records().last().map(|r| r.value),
        });
    }
    RunSummary {
        run_id: run.run_id().to_string(),
        records: run.record_count(),
        skipped_entries,
        first_wall_time: first.and_then(rfc3339),
        last_wall_time: last.and_then(rfc3339),
        tags,
        files: Vec::new(),
    }
}

/// Summaries for every run; `source` resolves each run's backing files for
/// hashing.
pub fn summarize(registry: &RunRegistry, source: &FsLogSource) -> RegistrySummary {
    let runs = registry
        .runs()
        .map(|run| {
            let skipped = registry
                .decode_stats(run.run_id())
                .map(|s| s.skipped)
                .unwrap_or(0);
            let mut summary = summarize_run(run, skipped);
            summary.files = source
                .log_files(Path::new(run.run_id()))
                .unwrap_or_default()
                .into_iter()
                .map(|p| LogFileSummary {
                    sha256: file_sha256(&p).ok(),
                    path: p.to_string_lossy().into_owned(),
                })
                .collect();
            summary
        })
        .collect();
    let unreadable = registry
        .unreadable()
        .iter()
        .map(|u| UnreadableSummary { run_id: u.run_id.clone(), error: u.error.to_string() })
        .collect();
    RegistrySummary { runs, unreadable }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_log::Record;

    #[test]
    fn test_summarize_run_ranges() {
        let run = RunIndex::build(
            "r",
            vec![
                Record { step: 3, wall_time: 100.5, tag: "loss".into(), value: 1.0 },
                Record { step: 1, wall_time: 99.0, tag: "loss".into(), value: 0.7 },
                Record { step: 2, wall_time: 101.0, tag: "acc".into(), value: 0.4 },
            ],
        );
        let s = summarize_run(&run, 2);
        assert_eq!(s.records, 3);
        assert_eq!(s.skipped_entries, 2);
        assert_eq!(s.tags[0].tag, "loss");
        assert_eq!(s.tags[0].step_min, Some(1));
        assert_eq!(s.tags[0].step_max, Some(3));
        assert_eq!(s.tags[0].last_value, Some(0.7));
        assert_eq!(s.first_wall_time.as_deref(), Some("1970-01-01T00:01:39.000Z"));
        assert_eq!(s.last_wall_time.as_deref(), Some("1970-01-01T00:01:41.000Z"));
    }

    #[test]
    fn test_file_sha256_known_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        std::fs::write(&path, b"abc").unwrap();
        assert_eq!(
            file_sha256(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}

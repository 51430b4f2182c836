//! End-to-end checks of the dashboard core: logs on disk → registry →
//! session events → canvas visibility.

use std::cell::Cell;
use std::collections::BTreeSet;
use std::fs;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use runboard::canvas::{Canvas, MemoryCanvas};
use runboard::config::{Config, UnreadablePolicy};
use runboard::controller::selection_diff;
use runboard::error::MalformedLogError;
use runboard::event_log::{decode, FsLogSource, LogSource};
use runboard::registry::RunRegistry;
use runboard::render::render;
use runboard::run_index::RunIndex;
use runboard::session::DashboardSession;

/// Filesystem source that counts how many times a log was opened.
struct CountingSource {
    inner: FsLogSource,
    opens: Cell<usize>,
}

impl CountingSource {
    fn new() -> Self {
        Self { inner: FsLogSource::new("events"), opens: Cell::new(0) }
    }
}

impl LogSource for CountingSource {
    fn open(&self, path: &Path) -> Result<Box<dyn BufRead>, MalformedLogError> {
        self.opens.set(self.opens.get() + 1);
        self.inner.open(path)
    }
}

fn scalar(step: u64, tag: &str, value: f64) -> String {
    format!(
        r#"{{"wall_time": 1700000000.5, "step": {step}, "summary": {{"value": [{{"tag": "{tag}", "simple_value": {value}}}]}}}}"#
    )
}

fn write_run(root: &Path, name: &str, lines: &[String]) -> PathBuf {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("events.jsonl"), lines.join("\n") + "\n").unwrap();
    dir
}

fn set(ix: &[usize]) -> BTreeSet<usize> {
    ix.iter().copied().collect()
}

// ---------------------------------------------------------------------------
// Decoding: malformed entry is dropped, one tag survives
// ---------------------------------------------------------------------------
#[test]
fn malformed_entry_dropped_end_to_end() {
    let root = tempfile::tempdir().unwrap();
    let acc_two_values = r#"{"wall_time": 1700000001.0, "step": 0, "summary": {"value": [{"tag": "acc", "simple_value": 0.2}, {"tag": "acc", "simple_value": 0.3}]}}"#;
    let run = write_run(
        root.path(),
        "run-a",
        &[scalar(0, "loss", 1.0), scalar(1, "loss", 0.5), acc_two_values.to_string()],
    );

    let reader = FsLogSource::new("events").open(&run).unwrap();
    let index = RunIndex::build("run-a", decode(reader));
    assert_eq!(index.tag_names(), vec!["loss"]);
    assert_eq!(index.tags()["loss"].points(), vec![(0, 1.0), (1, 0.5)]);
}

// ---------------------------------------------------------------------------
// Decoding: N entries across T tags → N records in T series
// ---------------------------------------------------------------------------
#[test]
fn record_and_tag_counts_preserved() {
    let tags = ["a", "b", "c"];
    let lines: Vec<String> = (0..30u64)
        .map(|i| scalar(i / 3, tags[(i % 3) as usize], i as f64))
        .collect();
    let root = tempfile::tempdir().unwrap();
    let run = write_run(root.path(), "run", &lines);

    let reader = FsLogSource::new("events").open(&run).unwrap();
    let index = RunIndex::build("run", decode(reader));
    assert_eq!(index.tags().len(), 3);
    assert_eq!(index.record_count(), 30);
    for (t, series) in index.tags() {
        let offset = tags.iter().position(|x| x == t).unwrap() as f64;
        let values = series.values();
        let expected: Vec<f64> = (0..10).map(|k| (k * 3) as f64 + offset).collect();
        assert_eq!(values, expected);
    }
}

// ---------------------------------------------------------------------------
// Discovery: empty pattern → empty dashboard
// ---------------------------------------------------------------------------
#[test]
fn empty_pattern_renders_no_controls() {
    let root = tempfile::tempdir().unwrap();
    let pattern = format!("{}/runs/*", root.path().display());
    let registry = RunRegistry::discover(&pattern, &Config::default()).unwrap();
    assert_eq!(registry.len(), 0);

    let session = DashboardSession::new(registry, MemoryCanvas::new());
    assert_eq!(session.controls().count(), 0);
    assert!(render(&session, 40).contains("(no runs)"));
}

// ---------------------------------------------------------------------------
// Collapse preserves data: re-expand without re-reading the log
// ---------------------------------------------------------------------------
#[test]
fn collapse_and_reexpand_reads_log_once() {
    let root = tempfile::tempdir().unwrap();
    let run = write_run(
        root.path(),
        "run-a",
        &[scalar(0, "loss", 1.0), scalar(0, "acc", 0.1), scalar(1, "loss", 0.4)],
    );
    let source = CountingSource::new();
    let registry = RunRegistry::from_paths(&[run.clone()], &source, UnreadablePolicy::Skip).unwrap();
    let run_id = registry.run_ids().next().unwrap().to_string();
    let mut session = DashboardSession::new(registry, MemoryCanvas::new());

    session.click_run(&run_id).unwrap();
    session.select_tags(&run_id, set(&[0, 1])).unwrap();
    let tags_before = session.registry().get(&run_id).unwrap().lines().unwrap().clone();

    session.click_run(&run_id).unwrap();
    assert!(session.canvas().visible_names().is_empty());

    session.click_run(&run_id).unwrap();
    let tags_after = session.registry().get(&run_id).unwrap().lines().unwrap().clone();
    assert_eq!(tags_before, tags_after);
    assert_eq!(source.opens.get(), 1);
    assert_eq!(session.canvas().line_count(), 2);
}

// ---------------------------------------------------------------------------
// Key uniqueness across runs sharing a tag
// ---------------------------------------------------------------------------
#[test]
fn shared_tag_names_get_distinct_keys() {
    let root = tempfile::tempdir().unwrap();
    write_run(root.path(), "r1", &[scalar(0, "t", 1.0)]);
    write_run(root.path(), "r2", &[scalar(0, "t", 2.0)]);
    let pattern = format!("{}/*", root.path().display());
    let registry = RunRegistry::discover(&pattern, &Config::default()).unwrap();
    assert_eq!(registry.len(), 2);
    let ids: Vec<String> = registry.run_ids().map(String::from).collect();
    let mut session = DashboardSession::new(registry, MemoryCanvas::new());

    for id in &ids {
        session.click_run(id).unwrap();
    }
    let k1 = format!("{}:t", ids[0]);
    let k2 = format!("{}:t", ids[1]);
    assert_ne!(k1, k2);
    assert!(session.canvas().has_series(&k1));
    assert!(session.canvas().has_series(&k2));

    session.select_tags(&ids[1], set(&[0])).unwrap();
    assert_eq!(session.canvas().visible_names(), vec![k2.as_str()]);
    let h1 = session.registry().get(&ids[0]).unwrap().line("t").unwrap();
    assert_eq!(session.canvas().is_visible(h1), Some(false));
}

// ---------------------------------------------------------------------------
// Diff minimality through the session
// ---------------------------------------------------------------------------
#[test]
fn selection_change_touches_only_delta() {
    let tags: Vec<String> = ["A", "B", "C"].iter().map(|s| s.to_string()).collect();
    let diff = selection_diff(&set(&[0, 1]), &set(&[1, 2]), &tags);
    assert_eq!(diff.hide, vec!["A"]);
    assert_eq!(diff.show, vec!["C"]);

    let root = tempfile::tempdir().unwrap();
    let run = write_run(
        root.path(),
        "run",
        &[scalar(0, "A", 1.0), scalar(0, "B", 2.0), scalar(0, "C", 3.0)],
    );
    let registry = RunRegistry::from_paths(&[run], &FsLogSource::new("events"), UnreadablePolicy::Skip).unwrap();
    let run_id = registry.run_ids().next().unwrap().to_string();
    let mut session = DashboardSession::new(registry, MemoryCanvas::new());
    session.click_run(&run_id).unwrap();
    session.select_tags(&run_id, set(&[0, 1])).unwrap();

    let out = session.select_tags(&run_id, set(&[1, 2])).unwrap();
    assert_eq!(out.hidden, vec!["A"]);
    assert_eq!(out.shown, vec!["C"]);
    assert_eq!(out.materialized, 0);
    let b = session.registry().get(&run_id).unwrap().line("B").unwrap();
    assert_eq!(session.canvas().is_visible(b), Some(true));
}

// ---------------------------------------------------------------------------
// Unreadable run: placeholder under skip, startup failure under abort
// ---------------------------------------------------------------------------
#[test]
fn unreadable_run_policy() {
    let root = tempfile::tempdir().unwrap();
    write_run(root.path(), "good", &[scalar(0, "loss", 1.0)]);
    fs::create_dir_all(root.path().join("broken")).unwrap();
    let pattern = format!("{}/*", root.path().display());

    let registry = RunRegistry::discover(&pattern, &Config::default()).unwrap();
    let session = DashboardSession::new(registry, MemoryCanvas::new());
    assert_eq!(session.controls().count(), 1);
    assert!(render(&session, 40).contains("unreadable"));

    let abort = Config { unreadable_policy: UnreadablePolicy::Abort, ..Config::default() };
    assert!(RunRegistry::discover(&pattern, &abort).is_err());
}

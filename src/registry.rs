//! Run discovery and the registry of per-run indexes.

use indexmap::IndexMap;
use std::path::{Path, PathBuf};

use crate::config::{Config, UnreadablePolicy};
use crate::error::{DiscoveryError, MalformedLogError};
use crate::event_log::{decode, DecodeStats, FsLogSource, LogSource};
use crate::logging::{log, log_run_discovered, log_run_unreadable, obj, v_str, Domain, Level, ProfileScope};
use crate::run_index::RunIndex;

/// A matched run whose log could not be opened. Kept so the dashboard can
/// show a disabled placeholder.
#[derive(Debug)]
pub struct UnreadableRun {
    pub run_id: String,
    pub error: MalformedLogError,
}

#[derive(Debug, Default)]
pub struct RunRegistry {
    runs: IndexMap<String, RunIndex>,
    stats: IndexMap<String, DecodeStats>,
    unreadable: Vec<UnreadableRun>,
}

impl RunRegistry {
    /// Expands `pattern` and builds one index per matched path using the
    /// filesystem log source.
    pub fn discover(pattern: &str, cfg: &Config) -> Result<Self, DiscoveryError> {
        let source = FsLogSource::new(cfg.event_file_prefix.clone());
        Self::discover_with(pattern, &source, cfg.unreadable_policy)
    }

    pub fn discover_with<S: LogSource + ?Sized>(
        pattern: &str,
        source: &S,
        policy: UnreadablePolicy,
    ) -> Result<Self, DiscoveryError> {
        let paths = expand_pattern(pattern)?;
        if paths.is_empty() {
            log(
                Level::Info,
                Domain::Discovery,
                "discovery_empty",
                obj(&[("pattern", v_str(pattern))]),
            );
        }
        Self::from_paths(&paths, source, policy)
    }

    /// Builds the registry from already-resolved run paths, in the given order.
    pub fn from_paths<S: LogSource + ?Sized>(
        paths: &[PathBuf],
        source: &S,
        policy: UnreadablePolicy,
    ) -> Result<Self, DiscoveryError> {
        let mut registry = Self::default();
        for path in paths {
            let run_id = run_id_for(path);
            if registry.runs.contains_key(&run_id) {
                continue;
            }
            match load_run(&run_id, path, source) {
                Ok((index, stats)) => {
                    log_run_discovered(&run_id, index.tags().len(), stats.records, stats.skipped);
                    registry.stats.insert(run_id.clone(), stats);
                    registry.runs.insert(run_id, index);
                }
                Err(error) => {
                    log_run_unreadable(&run_id, &error.to_string());
                    if policy == UnreadablePolicy::Abort {
                        return Err(DiscoveryError::Unreadable(error));
                    }
                    registry.unreadable.push(UnreadableRun { run_id, error });
                }
            }
        }
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn run_ids(&self) -> impl Iterator<Item = &str> {
        self.runs.keys().map(|k| k.as_str())
    }

    pub fn runs(&self) -> impl Iterator<Item = &RunIndex> {
        self.runs.values()
    }

    pub fn get(&self, run_id: &str) -> Option<&RunIndex> {
        self.runs.get(run_id)
    }

    pub(crate) fn get_mut(&mut self, run_id: &str) -> Option<&mut RunIndex> {
        self.runs.get_mut(run_id)
    }

    pub fn decode_stats(&self, run_id: &str) -> Option<DecodeStats> {
        self.stats.get(run_id).copied()
    }

    pub fn unreadable(&self) -> &[UnreadableRun] {
        &self.unreadable
    }
}

/// Glob expansion. Entries the walk cannot read are logged and dropped.
pub fn expand_pattern(pattern: &str) -> Result<Vec<PathBuf>, DiscoveryError> {
    let paths = glob::glob(pattern).map_err(|source| DiscoveryError::Pattern {
        pattern: pattern.to_string(),
        source,
    })?;
    let mut matched = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) => matched.push(path),
            Err(err) => log(
                Level::Warn,
                Domain::Discovery,
                "glob_entry_unreadable",
                obj(&[
                    ("path", v_str(&err.path().to_string_lossy())),
                    ("error", v_str(&err.error().to_string())),
                ]),
            ),
        }
    }
    Ok(matched)
}

pub fn run_id_for(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn load_run<S: LogSource + ?Sized>(
    run_id: &str,
    path: &Path,
    source: &S,
) -> Result<(RunIndex, DecodeStats), MalformedLogError> {
    let _scope = ProfileScope::with_context("decode_run", &[("run_id", v_str(run_id))]);
    let reader = source.open(path)?;
    let mut decoder = decode(reader);
    let index = RunIndex::build(run_id, decoder.by_ref());
    Ok((index, decoder.stats()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_log(path: &Path, lines: &[(u64, &str, f64)]) {
        let body: Vec<String> = lines
            .iter()
            .map(|(step, tag, value)| {
                format!(
                    r#"{{"wall_time": 1.0, "step": {step}, "summary": {{"value": [{{"tag": "{tag}", "simple_value": {value}}}]}}}}"#
                )
            })
            .collect();
        fs::write(path, body.join("\n")).unwrap();
    }

    #[test]
    fn test_empty_pattern_yields_empty_registry() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = format!("{}/*", dir.path().display());
        let registry = RunRegistry::discover(&pattern, &Config::default()).unwrap();
        assert!(registry.is_empty());
        assert!(registry.unreadable().is_empty());
    }

    #[test]
    fn test_invalid_pattern_is_error() {
        let err = RunRegistry::discover("runs/[", &Config::default()).unwrap_err();
        assert!(matches!(err, DiscoveryError::Pattern { .. }));
    }

    #[test]
    fn test_discover_files_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        write_log(&dir.path().join("a.jsonl"), &[(0, "loss", 1.0), (1, "loss", 0.5)]);
        let run_b = dir.path().join("b");
        fs::create_dir(&run_b).unwrap();
        write_log(&run_b.join("events.jsonl"), &[(0, "acc", 0.1), (0, "loss", 2.0)]);

        let pattern = format!("{}/*", dir.path().display());
        let registry = RunRegistry::discover(&pattern, &Config::default()).unwrap();
        assert_eq!(registry.len(), 2);

        let a = registry.get(&run_id_for(&dir.path().join("a.jsonl"))).unwrap();
        assert_eq!(a.tag_names(), vec!["loss"]);
        let b = registry.get(&run_id_for(&run_b)).unwrap();
        assert_eq!(b.tag_names(), vec!["acc", "loss"]);
        assert_eq!(registry.decode_stats(b.run_id()).unwrap().records, 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_unlistable_directory_does_not_hide_other_runs() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let open = dir.path().join("open");
        let locked = dir.path().join("locked");
        fs::create_dir(&open).unwrap();
        fs::create_dir(&locked).unwrap();
        write_log(&open.join("run.jsonl"), &[(0, "loss", 1.0)]);
        write_log(&locked.join("run.jsonl"), &[(0, "loss", 2.0)]);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let pattern = format!("{}/*/*.jsonl", dir.path().display());
        let matched = expand_pattern(&pattern);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let matched = matched.unwrap();
        assert!(matched.contains(&open.join("run.jsonl")));
        // root can still list the locked directory
        assert!(matched.len() == 1 || matched.contains(&locked.join("run.jsonl")));
    }

    #[test]
    fn test_unreadable_run_skipped_with_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        write_log(&dir.path().join("good.jsonl"), &[(0, "loss", 1.0)]);
        fs::create_dir(dir.path().join("empty_run")).unwrap();

        let pattern = format!("{}/*", dir.path().display());
        let registry = RunRegistry::discover(&pattern, &Config::default()).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.unreadable().len(), 1);
        assert!(registry.unreadable()[0].run_id.ends_with("empty_run"));
    }

    #[test]
    fn test_unreadable_run_aborts_under_abort_policy() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("empty_run")).unwrap();
        let cfg = Config {
            unreadable_policy: UnreadablePolicy::Abort,
            ..Config::default()
        };
        let pattern = format!("{}/*", dir.path().display());
        let err = RunRegistry::discover(&pattern, &cfg).unwrap_err();
        assert!(matches!(err, DiscoveryError::Unreadable(_)));
    }
}

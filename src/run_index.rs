//! Per-run tag index and visibility state.
//!
//! State machine per run:
//!
//! ```text
//!             click                    materialize
//! Collapsed ─────────► ExpandedEmpty ─────────────► ExpandedLoaded { boxes: shown }
//!     ▲                     │ click                      │ click ▲
//!     └─────────────────────┘                            ▼       │ click
//!                                              ExpandedLoaded { boxes: hidden }
//! ```
//!
//! `ExpandedLoaded` is terminal with respect to loading: its lines are never
//! rebuilt, only shown or hidden.

use indexmap::IndexMap;

use crate::canvas::{series_key, Canvas, LineHandle};
use crate::error::CanvasError;
use crate::event_log::Record;
use crate::logging::{log_materialized, ProfileScope, v_str};

/// Records of one tag, in log arrival order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagSeries {
    records: Vec<Record>,
}

impl TagSeries {
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn steps(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.step as f64).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.value).collect()
    }

    /// (step, value) pairs in arrival order.
    pub fn points(&self) -> Vec<(u64, f64)> {
        self.records.iter().map(|r| (r.step, r.value)).collect()
    }
}

/// Lines materialized for a run. Keys match the run's tags exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedLines {
    pub lines: IndexMap<String, LineHandle>,
    pub tag_boxes_visible: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunState {
    Collapsed,
    ExpandedEmpty,
    ExpandedLoaded(LoadedLines),
}

#[derive(Debug, Clone)]
pub struct RunIndex {
    run_id: String,
    tags: IndexMap<String, TagSeries>,
    state: RunState,
}

impl RunIndex {
    /// Groups records by tag, keeping first-seen tag order and arrival order
    /// within each tag.
    pub fn build(run_id: impl Into<String>, records: impl IntoIterator<Item = Record>) -> Self {
        let mut tags: IndexMap<String, TagSeries> = IndexMap::new();
        for record in records {
            if let Some(series) = tags.get_mut(&record.tag) {
                series.records.push(record);
            } else {
                tags.insert(record.tag.clone(), TagSeries { records: vec![record] });
            }
        }
        Self {
            run_id: run_id.into(),
            tags,
            state: RunState::Collapsed,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn tags(&self) -> &IndexMap<String, TagSeries> {
        &self.tags
    }

    pub fn tag_names(&self) -> Vec<String> {
        self.tags.keys().cloned().collect()
    }

    pub fn record_count(&self) -> usize {
        self.tags.values().map(TagSeries::len).sum()
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn loaded(&self) -> bool {
        matches!(self.state, RunState::ExpandedLoaded(_))
    }

    pub fn tag_boxes_visible(&self) -> bool {
        match &self.state {
            RunState::Collapsed => false,
            RunState::ExpandedEmpty => true,
            RunState::ExpandedLoaded(loaded) => loaded.tag_boxes_visible,
        }
    }

    pub fn lines(&self) -> Option<&IndexMap<String, LineHandle>> {
        match &self.state {
            RunState::ExpandedLoaded(loaded) => Some(&loaded.lines),
            _ => None,
        }
    }

    pub fn line(&self, tag: &str) -> Option<LineHandle> {
        self.lines().and_then(|lines| lines.get(tag).copied())
    }

    pub(crate) fn show_tag_boxes(&mut self) {
        match self.state {
            RunState::Collapsed => self.state = RunState::ExpandedEmpty,
            RunState::ExpandedEmpty => {}
            RunState::ExpandedLoaded(ref mut loaded) => loaded.tag_boxes_visible = true,
        }
    }

    pub(crate) fn hide_tag_boxes(&mut self) {
        match self.state {
            RunState::Collapsed => {}
            RunState::ExpandedEmpty => self.state = RunState::Collapsed,
            RunState::ExpandedLoaded(ref mut loaded) => loaded.tag_boxes_visible = false,
        }
    }

    /// Writes every tag's series into the canvas as hidden lines. Runs at most
    /// once: a loaded run returns `Ok(0)` without touching the canvas.
    ///
    /// All keys are checked before anything is written, so a collision leaves
    /// the canvas and this run unchanged.
    pub(crate) fn materialize<C: Canvas + ?Sized>(
        &mut self,
        canvas: &mut C,
    ) -> Result<usize, CanvasError> {
        if self.loaded() {
            return Ok(0);
        }
        let _scope = ProfileScope::with_context("materialize", &[("run_id", v_str(&self.run_id))]);

        let keys: Vec<String> = self.tags.keys().map(|t| series_key(&self.run_id, t)).collect();
        if let Some(taken) = keys.iter().find(|k| canvas.has_series(k)) {
            return Err(CanvasError::DuplicateKey(taken.clone()));
        }

        let mut lines = IndexMap::with_capacity(self.tags.len());
        for ((tag, series), key) in self.tags.iter().zip(keys) {
            let handle = canvas.add_series(&key, tag, series.steps(), series.values())?;
            lines.insert(tag.clone(), handle);
        }
        let count = lines.len();
        let tag_boxes_visible = self.tag_boxes_visible();
        self.state = RunState::ExpandedLoaded(LoadedLines { lines, tag_boxes_visible });
        log_materialized(&self.run_id, count);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::MemoryCanvas;

    fn rec(step: u64, tag: &str, value: f64) -> Record {
        Record { step, wall_time: step as f64, tag: tag.to_string(), value }
    }

    #[test]
    fn test_build_groups_by_first_seen_tag() {
        let run = RunIndex::build(
            "r1",
            vec![
                rec(0, "loss", 1.0),
                rec(0, "acc", 0.1),
                rec(1, "loss", 0.8),
                rec(1, "acc", 0.2),
                rec(2, "lr", 0.01),
            ],
        );
        assert_eq!(run.tag_names(), vec!["loss", "acc", "lr"]);
        assert_eq!(run.record_count(), 5);
        assert_eq!(run.tags()["loss"].points(), vec![(0, 1.0), (1, 0.8)]);
        assert_eq!(*run.state(), RunState::Collapsed);
        assert!(!run.loaded());
        assert!(!run.tag_boxes_visible());
        assert!(run.lines().is_none());
    }

    #[test]
    fn test_arrival_order_is_not_resorted() {
        let run = RunIndex::build(
            "r1",
            vec![rec(5, "loss", 0.5), rec(2, "loss", 0.2), rec(9, "loss", 0.9)],
        );
        let steps: Vec<u64> = run.tags()["loss"].records().iter().map(|r| r.step).collect();
        assert_eq!(steps, vec![5, 2, 9]);
    }

    #[test]
    fn test_materialize_once_and_hidden() {
        let mut canvas = MemoryCanvas::new();
        let mut run = RunIndex::build("r1", vec![rec(0, "loss", 1.0), rec(0, "acc", 0.5)]);
        run.show_tag_boxes();
        assert_eq!(*run.state(), RunState::ExpandedEmpty);

        assert_eq!(run.materialize(&mut canvas).unwrap(), 2);
        assert!(run.loaded());
        assert!(run.tag_boxes_visible());
        let lines = run.lines().unwrap();
        assert_eq!(lines.keys().cloned().collect::<Vec<_>>(), run.tag_names());
        for handle in lines.values() {
            assert_eq!(canvas.is_visible(*handle), Some(false));
        }

        assert_eq!(run.materialize(&mut canvas).unwrap(), 0);
        assert_eq!(canvas.line_count(), 2);
    }

    #[test]
    fn test_hide_tag_boxes_keeps_loaded_lines() {
        let mut canvas = MemoryCanvas::new();
        let mut run = RunIndex::build("r1", vec![rec(0, "loss", 1.0)]);
        run.show_tag_boxes();
        run.materialize(&mut canvas).unwrap();
        let before = run.lines().cloned();

        run.hide_tag_boxes();
        assert!(run.loaded());
        assert!(!run.tag_boxes_visible());
        assert_eq!(run.lines().cloned(), before);
    }

    #[test]
    fn test_expanded_empty_collapses_back() {
        let mut run = RunIndex::build("r1", vec![rec(0, "loss", 1.0)]);
        run.show_tag_boxes();
        run.hide_tag_boxes();
        assert_eq!(*run.state(), RunState::Collapsed);
    }

    #[test]
    fn test_collision_leaves_run_unloaded() {
        let mut canvas = MemoryCanvas::new();
        canvas.add_series("r1:acc", "acc", vec![0.0], vec![0.0]).unwrap();
        let mut run = RunIndex::build("r1", vec![rec(0, "loss", 1.0), rec(0, "acc", 0.5)]);
        run.show_tag_boxes();

        let err = run.materialize(&mut canvas).unwrap_err();
        assert_eq!(err, CanvasError::DuplicateKey("r1:acc".to_string()));
        assert_eq!(*run.state(), RunState::ExpandedEmpty);
        assert!(!canvas.has_series("r1:loss"));
    }

    #[test]
    fn test_empty_run_loads_with_no_lines() {
        let mut canvas = MemoryCanvas::new();
        let mut run = RunIndex::build("empty", Vec::new());
        run.show_tag_boxes();
        assert_eq!(run.materialize(&mut canvas).unwrap(), 0);
        assert!(run.loaded());
        assert!(run.lines().unwrap().is_empty());
    }
}

//! Toggle controller: UI event → commands.
//!
//! Planning is pure: a handler reads the run's state (and, for collapse, the
//! canvas' current visibility) and returns the commands to apply. The
//! session applies them. This mirrors a reducer:
//!
//! ```text
//! UiEvent ──► handler.plan(state) ──► Vec<Command> ──► session.execute()
//! ```

use std::collections::BTreeSet;

use crate::canvas::Canvas;
use crate::logging::{log, obj, v_str, Domain, Level};
use crate::run_index::{RunIndex, RunState};
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    RunClicked {
        run_id: String,
    },
    TagSelectionChanged {
        run_id: String,
        old: BTreeSet<usize>,
        new: BTreeSet<usize>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ShowTagControl,
    HideTagControl,
    /// Write the run's series into the canvas (no-op once loaded).
    Materialize,
    SetLineVisible { tag: String, visible: bool },
    /// Reset the run's multi-select to nothing selected.
    ClearSelection,
}

/// Delta between two selections, as tag names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionDiff {
    pub hide: Vec<String>,
    pub show: Vec<String>,
    /// Indices with no tag behind them.
    pub unknown: Vec<usize>,
}

impl SelectionDiff {
    pub fn is_empty(&self) -> bool {
        self.hide.is_empty() && self.show.is_empty()
    }
}

/// `hide = old − new`, `show = new − old`, mapped through `tag_names`.
/// Indices present in both or neither set produce nothing.
pub fn selection_diff(
    old: &BTreeSet<usize>,
    new: &BTreeSet<usize>,
    tag_names: &[String],
) -> SelectionDiff {
    let mut diff = SelectionDiff::default();
    for &ix in old.difference(new) {
        match tag_names.get(ix) {
            Some(tag) => diff.hide.push(tag.clone()),
            None => diff.unknown.push(ix),
        }
    }
    for &ix in new.difference(old) {
        match tag_names.get(ix) {
            Some(tag) => diff.show.push(tag.clone()),
            None => diff.unknown.push(ix),
        }
    }
    diff
}

/// Click on a run's control.
pub fn plan_run_toggle<C: Canvas + ?Sized>(run: &RunIndex, canvas: &C) -> Vec<Command> {
    match run.state() {
        RunState::Collapsed => vec![Command::ShowTagControl, Command::Materialize],
        RunState::ExpandedEmpty => vec![Command::HideTagControl],
        RunState::ExpandedLoaded(loaded) if loaded.tag_boxes_visible => {
            let mut cmds = vec![Command::HideTagControl];
            for (tag, handle) in &loaded.lines {
                if canvas.is_visible(*handle) == Some(true) {
                    cmds.push(Command::SetLineVisible { tag: tag.clone(), visible: false });
                }
            }
            cmds.push(Command::ClearSelection);
            cmds
        }
        RunState::ExpandedLoaded(_) => vec![Command::ShowTagControl],
    }
}

/// Selection change on a run's multi-select. A run that is not expanded and
/// loaded cannot emit this; if it does anyway, it is expanded and loaded
/// first so the request still lands.
pub fn plan_tag_selection(
    run: &RunIndex,
    old: &BTreeSet<usize>,
    new: &BTreeSet<usize>,
    tag_names: &[String],
) -> Vec<Command> {
    let mut cmds = Vec::new();
    if !run.tag_boxes_visible() || !run.loaded() {
        log(
            Level::Warn,
            Domain::Ui,
            "selection_on_unloaded_run",
            obj(&[("run_id", v_str(run.run_id())), ("loaded", json!(run.loaded()))]),
        );
        if !run.tag_boxes_visible() {
            cmds.push(Command::ShowTagControl);
        }
        if !run.loaded() {
            cmds.push(Command::Materialize);
        }
    }

    let diff = selection_diff(old, new, tag_names);
    if !diff.unknown.is_empty() {
        log(
            Level::Warn,
            Domain::Ui,
            "selection_index_out_of_range",
            obj(&[("run_id", v_str(run.run_id())), ("indices", json!(diff.unknown))]),
        );
    }
    for tag in diff.hide {
        cmds.push(Command::SetLineVisible { tag, visible: false });
    }
    for tag in diff.show {
        cmds.push(Command::SetLineVisible { tag, visible: true });
    }
    cmds
}

/// Bound to one run's expand/collapse control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunToggleHandler {
    pub run_id: String,
}

impl RunToggleHandler {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self { run_id: run_id.into() }
    }

    pub fn plan<C: Canvas + ?Sized>(&self, run: &RunIndex, canvas: &C) -> Vec<Command> {
        plan_run_toggle(run, canvas)
    }
}

/// Bound to one run's tag multi-select; `tag_names` are the control's labels
/// in index order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSelectHandler {
    pub run_id: String,
    pub tag_names: Vec<String>,
}

impl TagSelectHandler {
    pub fn new(run_id: impl Into<String>, tag_names: Vec<String>) -> Self {
        Self { run_id: run_id.into(), tag_names }
    }

    pub fn plan(&self, run: &RunIndex, old: &BTreeSet<usize>, new: &BTreeSet<usize>) -> Vec<Command> {
        plan_tag_selection(run, old, new, &self.tag_names)
    }
}

//! Process-scoped dashboard state.
//!
//! `DashboardSession` owns the registry, the shared canvas, and the widget
//! state of every run control. It is built once at startup and every UI
//! event goes through [`DashboardSession::dispatch`].

use indexmap::IndexMap;
use std::collections::BTreeSet;

use crate::canvas::Canvas;
use crate::controller::{Command, RunToggleHandler, TagSelectHandler, UiEvent};
use crate::error::CanvasError;
use crate::logging::{log, log_visibility, obj, v_str, Domain, Level};
use crate::registry::RunRegistry;
use serde_json::json;

/// Widgets for one run: the expand button and its tag multi-select.
#[derive(Debug, Clone)]
pub struct RunControls {
    pub label: String,
    pub toggle: RunToggleHandler,
    pub select: TagSelectHandler,
    /// Indices currently checked in the multi-select.
    pub active: BTreeSet<usize>,
}

impl RunControls {
    pub fn tag_labels(&self) -> &[String] {
        &self.select.tag_names
    }
}

/// What a dispatched event did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    pub materialized: usize,
    pub shown: Vec<String>,
    pub hidden: Vec<String>,
}

pub struct DashboardSession<C: Canvas> {
    registry: RunRegistry,
    canvas: C,
    controls: IndexMap<String, RunControls>,
}

impl<C: Canvas> DashboardSession<C> {
    /// Builds one set of controls per run: all runs collapsed, every tag
    /// control hidden and empty.
    pub fn new(registry: RunRegistry, canvas: C) -> Self {
        let controls = registry
            .runs()
            .map(|run| {
                let run_id = run.run_id().to_string();
                let controls = RunControls {
                    label: run_id.clone(),
                    toggle: RunToggleHandler::new(run_id.clone()),
                    select: TagSelectHandler::new(run_id.clone(), run.tag_names()),
                    active: BTreeSet::new(),
                };
                (run_id, controls)
            })
            .collect();
        Self { registry, canvas, controls }
    }

    pub fn registry(&self) -> &RunRegistry {
        &self.registry
    }

    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    pub fn controls(&self) -> impl Iterator<Item = &RunControls> {
        self.controls.values()
    }

    pub fn control(&self, run_id: &str) -> Option<&RunControls> {
        self.controls.get(run_id)
    }

    /// Run id behind the n-th control (display order).
    pub fn run_id_at(&self, n: usize) -> Option<&str> {
        self.controls.get_index(n).map(|(id, _)| id.as_str())
    }

    /// Click on a run control. Equivalent to dispatching `RunClicked`.
    pub fn click_run(&mut self, run_id: &str) -> Result<Outcome, CanvasError> {
        self.dispatch(UiEvent::RunClicked { run_id: run_id.to_string() })
    }

    /// Replaces a run's checked set, emitting the change event with the
    /// control's current set as `old`.
    pub fn select_tags(&mut self, run_id: &str, new: BTreeSet<usize>) -> Result<Outcome, CanvasError> {
        let old = match self.controls.get(run_id) {
            Some(c) => c.active.clone(),
            None => return Ok(Outcome::default()),
        };
        self.dispatch(UiEvent::TagSelectionChanged { run_id: run_id.to_string(), old, new })
    }

    pub fn dispatch(&mut self, event: UiEvent) -> Result<Outcome, CanvasError> {
        let run_id = match &event {
            UiEvent::RunClicked { run_id } | UiEvent::TagSelectionChanged { run_id, .. } => run_id.clone(),
        };
        let (Some(run), Some(controls)) = (self.registry.get(&run_id), self.controls.get(&run_id)) else {
            log(
                Level::Warn,
                Domain::Ui,
                "unknown_run",
                obj(&[("run_id", v_str(&run_id))]),
            );
            return Ok(Outcome::default());
        };

        let (commands, new_active) = match &event {
            UiEvent::RunClicked { .. } => (controls.toggle.plan(run, &self.canvas), None),
            UiEvent::TagSelectionChanged { old, new, .. } => {
                (controls.select.plan(run, old, new), Some(new.clone()))
            }
        };
        log(
            Level::Debug,
            Domain::Ui,
            match &event {
                UiEvent::RunClicked { .. } => "run_clicked",
                UiEvent::TagSelectionChanged { .. } => "tag_selection_changed",
            },
            obj(&[("run_id", v_str(&run_id)), ("commands", json!(commands.len()))]),
        );

        let outcome = self.execute(&run_id, commands)?;
        if let (Some(active), Some(controls)) = (new_active, self.controls.get_mut(&run_id)) {
            controls.active = active;
        }
        Ok(outcome)
    }

    fn execute(&mut self, run_id: &str, commands: Vec<Command>) -> Result<Outcome, CanvasError> {
        let mut outcome = Outcome::default();
        let Some(run) = self.registry.get_mut(run_id) else {
            return Ok(outcome);
        };
        for command in commands {
            match command {
                Command::ShowTagControl => run.show_tag_boxes(),
                Command::HideTagControl => run.hide_tag_boxes(),
                Command::Materialize => outcome.materialized += run.materialize(&mut self.canvas)?,
                Command::SetLineVisible { tag, visible } => {
                    let Some(handle) = run.line(&tag) else {
                        log(
                            Level::Warn,
                            Domain::Canvas,
                            "line_missing",
                            obj(&[("run_id", v_str(run_id)), ("tag", v_str(&tag))]),
                        );
                        continue;
                    };
                    self.canvas.set_visible(handle, visible)?;
                    log_visibility(run_id, &tag, visible);
                    if visible {
                        outcome.shown.push(tag);
                    } else {
                        outcome.hidden.push(tag);
                    }
                }
                Command::ClearSelection => {
                    if let Some(controls) = self.controls.get_mut(run_id) {
                        controls.active.clear();
                    }
                }
            }
        }
        Ok(outcome)
    }
}

//! Shared plotting surface.
//!
//! One tabular data source (named `f64` columns) shared by every run, plus
//! line glyphs that reference a step column and a value column. Series are
//! keyed `run_id:tag`; the step column of a series is `step_run_id:tag`.

use indexmap::IndexMap;

use crate::error::CanvasError;

/// Opaque reference to a line glyph owned by a canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineHandle(usize);

pub fn series_key(run_id: &str, tag: &str) -> String {
    format!("{run_id}:{tag}")
}

pub fn step_key(series_key: &str) -> String {
    format!("step_{series_key}")
}

/// Read-only view of one line for the rendering layer.
#[derive(Debug, Clone, Copy)]
pub struct LineView<'a> {
    pub name: &'a str,
    pub legend: &'a str,
    pub visible: bool,
    pub steps: &'a [f64],
    pub values: &'a [f64],
}

pub trait Canvas {
    fn has_series(&self, key: &str) -> bool;

    /// Writes the step and value columns for `key` and creates a hidden
    /// line over them.
    fn add_series(
        &mut self,
        key: &str,
        legend: &str,
        steps: Vec<f64>,
        values: Vec<f64>,
    ) -> Result<LineHandle, CanvasError>;

    fn set_visible(&mut self, line: LineHandle, visible: bool) -> Result<(), CanvasError>;

    fn is_visible(&self, line: LineHandle) -> Option<bool>;

    fn lines(&self) -> Vec<LineView<'_>>;
}

#[derive(Debug, Clone)]
struct LineGlyph {
    name: String,
    legend: String,
    x: String,
    y: String,
    visible: bool,
}

/// Column data source + glyph list, held in memory.
#[derive(Debug, Default)]
pub struct MemoryCanvas {
    columns: IndexMap<String, Vec<f64>>,
    glyphs: Vec<LineGlyph>,
}

impl MemoryCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column(&self, key: &str) -> Option<&[f64]> {
        self.columns.get(key).map(|c| c.as_slice())
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn line_count(&self) -> usize {
        self.glyphs.len()
    }

    pub fn visible_names(&self) -> Vec<&str> {
        self.glyphs
            .iter()
            .filter(|g| g.visible)
            .map(|g| g.name.as_str())
            .collect()
    }
}

impl Canvas for MemoryCanvas {
    fn has_series(&self, key: &str) -> bool {
        self.columns.contains_key(key) || self.columns.contains_key(&step_key(key))
    }

    fn add_series(
        &mut self,
        key: &str,
        legend: &str,
        steps: Vec<f64>,
        values: Vec<f64>,
    ) -> Result<LineHandle, CanvasError> {
        if self.has_series(key) {
            return Err(CanvasError::DuplicateKey(key.to_string()));
        }
        if steps.len() != values.len() {
            return Err(CanvasError::LengthMismatch {
                key: key.to_string(),
                xs: steps.len(),
                ys: values.len(),
            });
        }
        let x = step_key(key);
        self.columns.insert(key.to_string(), values);
        self.columns.insert(x.clone(), steps);
        self.glyphs.push(LineGlyph {
            name: key.to_string(),
            legend: legend.to_string(),
            x,
            y: key.to_string(),
            visible: false,
        });
        Ok(LineHandle(self.glyphs.len() - 1))
    }

    fn set_visible(&mut self, line: LineHandle, visible: bool) -> Result<(), CanvasError> {
        let glyph = self
            .glyphs
            .get_mut(line.0)
            .ok_or(CanvasError::UnknownLine(line.0))?;
        glyph.visible = visible;
        Ok(())
    }

    fn is_visible(&self, line: LineHandle) -> Option<bool> {
        self.glyphs.get(line.0).map(|g| g.visible)
    }

    fn lines(&self) -> Vec<LineView<'_>> {
        self.glyphs
            .iter()
            .map(|g| LineView {
                name: &g.name,
                legend: &g.legend,
                visible: g.visible,
                steps: self.columns.get(&g.x).map(|c| c.as_slice()).unwrap_or(&[]),
                values: self.columns.get(&g.y).map(|c| c.as_slice()).unwrap_or(&[]),
            })
            .collect()
    }
}

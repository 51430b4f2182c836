//! Plain-text rendering of a dashboard session.

use std::fmt::Write;

use crate::canvas::Canvas;
use crate::run_index::RunState;
use crate::session::DashboardSession;

const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Bucket-averages `values` down to at most `width` cells.
pub fn sparkline(values: &[f64], width: usize) -> String {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() || width == 0 {
        return String::new();
    }
    let cells = finite.len().min(width);
    let buckets: Vec<f64> = (0..cells)
        .map(|i| {
            let start = i * finite.len() / cells;
            let end = ((i + 1) * finite.len() / cells).max(start + 1);
            let chunk = &finite[start..end];
            chunk.iter().sum::<f64>() / chunk.len() as f64
        })
        .collect();
    let lo = buckets.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = buckets.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = hi - lo;
    buckets
        .iter()
        .map(|v| {
            if span <= 0.0 {
                BARS[BARS.len() / 2]
            } else {
                let ix = ((v - lo) / span * (BARS.len() - 1) as f64).round() as usize;
                BARS[ix.min(BARS.len() - 1)]
            }
        })
        .collect()
}

fn state_label(state: &RunState) -> &'static str {
    match state {
        RunState::Collapsed => "collapsed",
        RunState::ExpandedEmpty => "expanded, not loaded",
        RunState::ExpandedLoaded(l) if l.tag_boxes_visible => "expanded",
        RunState::ExpandedLoaded(_) => "collapsed, loaded",
    }
}

/// Run rows, tag checkboxes, unreadable placeholders, then one sparkline per
/// visible line. Sparklines plot values in arrival order; the step column is
/// not used as the x-axis, so out-of-order steps are drawn as logged.
pub fn render<C: Canvas>(session: &DashboardSession<C>, width: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== Run comparison ==");
    if session.controls().next().is_none() && session.registry().unreadable().is_empty() {
        let _ = writeln!(out, "(no runs)");
    }

    for (n, controls) in session.controls().enumerate() {
        let Some(run) = session.registry().get(&controls.toggle.run_id) else {
            continue;
        };
        let _ = writeln!(out, "[{}] {}  ({})", n, controls.label, state_label(run.state()));
        if run.tag_boxes_visible() {
            let boxes: Vec<String> = controls
                .tag_labels()
                .iter()
                .enumerate()
                .map(|(i, tag)| {
                    let mark = if controls.active.contains(&i) { 'x' } else { ' ' };
                    format!("{i}:[{mark}] {tag}")
                })
                .collect();
            if boxes.is_empty() {
                let _ = writeln!(out, "      (no scalar tags)");
            } else {
                let _ = writeln!(out, "      {}", boxes.join("  "));
            }
        }
    }
    for placeholder in session.registry().unreadable() {
        let _ = writeln!(out, "[-] {}  (unreadable: {})", placeholder.run_id, placeholder.error);
    }

    let visible: Vec<_> = session
        .canvas()
        .lines()
        .into_iter()
        .filter(|l| l.visible)
        .collect();
    let _ = writeln!(out, "-- plot: {} line(s) --", visible.len());
    for line in visible {
        let last = line.values.last().copied().unwrap_or(f64::NAN);
        let min = line.values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = line.values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let _ = writeln!(
            out,
            "{}  {}  n={} min={:.4} max={:.4} last={:.4}",
            line.name,
            sparkline(line.values, width),
            line.values.len(),
            min,
            max,
            last
        );
    }
    out
}

//! Interactive run comparison dashboard.
//!
//! Usage:
//!   runboard [pattern]
//!
//! Reads UI events from stdin, one per line:
//!   click <run#>            - expand/collapse a run
//!   select <run#> [i,j,..]  - set the checked tags of a run (empty = none)
//!   show                    - redraw
//!   help | quit

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::io::{self, BufRead, Write};

use runboard::canvas::MemoryCanvas;
use runboard::config::Config;
use runboard::logging::{log, obj, v_str, Domain, Level};
use runboard::registry::RunRegistry;
use runboard::render::render;
use runboard::session::DashboardSession;
use serde_json::json;

const HELP: &str = "commands: click <run#> | select <run#> [i,j,...] | show | help | quit";

enum Input {
    Click(usize),
    Select(usize, BTreeSet<usize>),
    Show,
    Help,
    Quit,
}

fn parse_input(line: &str) -> Result<Input, String> {
    let mut parts = line.split_whitespace();
    let cmd = parts.next().unwrap_or_default();
    let run_no = |s: Option<&str>| -> Result<usize, String> {
        s.ok_or_else(|| "missing run number".to_string())?
            .parse::<usize>()
            .map_err(|e| format!("bad run number: {e}"))
    };
    match cmd {
        "click" | "c" => Ok(Input::Click(run_no(parts.next())?)),
        "select" | "s" => {
            let n = run_no(parts.next())?;
            let rest: String = parts.collect::<Vec<_>>().join("");
            let mut set = BTreeSet::new();
            for ix in rest.split(',').filter(|s| !s.is_empty()) {
                set.insert(ix.parse::<usize>().map_err(|e| format!("bad tag index '{ix}': {e}"))?);
            }
            Ok(Input::Select(n, set))
        }
        "show" | "" => Ok(Input::Show),
        "help" | "?" => Ok(Input::Help),
        "quit" | "q" | "exit" => Ok(Input::Quit),
        other => Err(format!("unknown command '{other}'")),
    }
}

fn main() -> Result<()> {
    let mut cfg = Config::from_env();
    if let Some(pattern) = std::env::args().nth(1) {
        cfg.runs_pattern = pattern;
    }

    let registry = RunRegistry::discover(&cfg.runs_pattern, &cfg)
        .with_context(|| format!("discovering runs from '{}'", cfg.runs_pattern))?;
    log(
        Level::Info,
        Domain::System,
        "startup",
        obj(&[
            ("pattern", v_str(&cfg.runs_pattern)),
            ("runs", json!(registry.len())),
            ("unreadable", json!(registry.unreadable().len())),
        ]),
    );
    let mut session = DashboardSession::new(registry, MemoryCanvas::new());

    let stdout = io::stdout();
    let mut out = stdout.lock();
    write!(out, "{}", render(&session, cfg.render_width))?;
    writeln!(out, "{HELP}")?;
    out.flush()?;

    for line in io::stdin().lock().lines() {
        let line = line.context("reading stdin")?;
        let input = match parse_input(line.trim()) {
            Ok(input) => input,
            Err(msg) => {
                writeln!(out, "{msg}")?;
                continue;
            }
        };
        let result = match input {
            Input::Quit => break,
            Input::Help => {
                writeln!(out, "{HELP}")?;
                continue;
            }
            Input::Show => Ok(Default::default()),
            Input::Click(n) | Input::Select(n, _) if session.run_id_at(n).is_none() => {
                writeln!(out, "no run #{n}")?;
                continue;
            }
            Input::Click(n) => {
                let run_id = session.run_id_at(n).unwrap_or_default().to_string();
                session.click_run(&run_id)
            }
            Input::Select(n, set) => {
                let run_id = session.run_id_at(n).unwrap_or_default().to_string();
                session.select_tags(&run_id, set)
            }
        };
        if let Err(err) = result {
            log(
                Level::Error,
                Domain::Canvas,
                "event_failed",
                obj(&[("error", v_str(&err.to_string()))]),
            );
            writeln!(out, "error: {err}")?;
        }
        write!(out, "{}", render(&session, cfg.render_width))?;
        out.flush()?;
    }

    log(Level::Info, Domain::System, "shutdown", obj(&[]));
    Ok(())
}

//! Inspect discovered runs without starting the dashboard.
//!
//! Usage:
//!   runs_inspect [pattern] [--json]
//!
//! Prints, per run: tags with record counts and step ranges, skipped
//! entries, wall-time range, and the sha256 of each backing log file.

use anyhow::{Context, Result};

use runboard::config::Config;
use runboard::event_log::FsLogSource;
use runboard::registry::RunRegistry;
use runboard::summary::{summarize, RegistrySummary};

fn print_text(summary: &RegistrySummary) {
    println!("=== Runs ===\n");
    if summary.runs.is_empty() && summary.unreadable.is_empty() {
        println!("(no runs matched)");
    }
    for run in &summary.runs {
        println!("{}", run.run_id);
        println!(
            "  records: {}  skipped: {}  wall: {} → {}",
            run.records,
            run.skipped_entries,
            run.first_wall_time.as_deref().unwrap_or("?"),
            run.last_wall_time.as_deref().unwrap_or("?")
        );
        for tag in &run.tags {
            println!(
                "  {:<24} {:>6}  steps {}..{}  last {}",
                tag.tag,
                tag.records,
                tag.step_min.map(|s| s.to_string()).unwrap_or_else(|| "?".into()),
                tag.step_max.map(|s| s.to_string()).unwrap_or_else(|| "?".into()),
                tag.last_value.map(|v| format!("{v:.4}")).unwrap_or_else(|| "?".into()),
            );
        }
        for file in &run.files {
            let hash = file.sha256.as_deref().unwrap_or("?");
            println!("  file {}  sha256={}", file.path, &hash[..16.min(hash.len())]);
        }
        println!();
    }
    for bad in &summary.unreadable {
        println!("{}  UNREADABLE: {}", bad.run_id, bad.error);
    }
}

fn main() -> Result<()> {
    let mut cfg = Config::from_env();
    let mut as_json = false;
    for arg in std::env::args().skip(1) {
        if arg == "--json" {
            as_json = true;
        } else {
            cfg.runs_pattern = arg;
        }
    }

    let registry = RunRegistry::discover(&cfg.runs_pattern, &cfg)
        .with_context(|| format!("discovering runs from '{}'", cfg.runs_pattern))?;
    let summary = summarize(&registry, &FsLogSource::new(cfg.event_file_prefix.clone()));

    if as_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_text(&summary);
    }
    Ok(())
}

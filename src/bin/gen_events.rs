//! Writes synthetic run logs for trying the dashboard.
//!
//! Usage:
//!   gen_events [out_dir]
//!
//! Settings come from GEN_RUNS_DIR, GEN_RUNS, GEN_STEPS, GEN_TAGS,
//! GEN_MAX_VALUE and GEN_SEED; `out_dir` overrides GEN_RUNS_DIR.

use anyhow::{Context, Result};
use std::path::PathBuf;

use runboard::config::GeneratorConfig;
use runboard::synth::generate;

fn main() -> Result<()> {
    let mut cfg = GeneratorConfig::from_env();
    if let Some(dir) = std::env::args().nth(1) {
        cfg.out_dir = PathBuf::from(dir);
    }
    let runs = generate(&cfg).with_context(|| format!("writing runs under {}", cfg.out_dir.display()))?;
    for run in &runs {
        println!("{}", run.display());
    }
    Ok(())
}

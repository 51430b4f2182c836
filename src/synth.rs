//! Synthetic run logs for demos.

use rand::{rngs::StdRng, Rng, SeedableRng};
use std::io;
use std::path::PathBuf;

use crate::config::GeneratorConfig;
use crate::event_log::EventLogWriter;
use crate::logging::{log, obj, v_str, Domain, Level};
use serde_json::json;

pub const RUN_LOG_NAME: &str = "events.jsonl";

/// Writes one run: header, then `steps` steps × every tag, each a random
/// integer in `[0, max_value)`. A `max_value` of 0 writes only zeros.
pub fn write_run<R: Rng>(path: &std::path::Path, cfg: &GeneratorConfig, rng: &mut R) -> io::Result<u64> {
    let mut writer = EventLogWriter::create(path)?;
    let upper = cfg.max_value.max(1);
    let mut written = 0;
    for step in 0..cfg.steps {
        for tag in &cfg.tags {
            let value = rng.gen_range(0..upper) as f64;
            writer.add_scalar(tag, value, step)?;
            written += 1;
        }
    }
    writer.close()?;
    Ok(written)
}

/// Generates `cfg.runs` runs as `<out_dir>/run-<n>/events.jsonl`.
pub fn generate(cfg: &GeneratorConfig) -> io::Result<Vec<PathBuf>> {
    let mut rng = match cfg.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut paths = Vec::with_capacity(cfg.runs);
    for n in 0..cfg.runs {
        let run_dir = cfg.out_dir.join(format!("run-{n}"));
        let path = run_dir.join(RUN_LOG_NAME);
        let written = write_run(&path, cfg, &mut rng)?;
        log(
            Level::Info,
            Domain::System,
            "run_generated",
            obj(&[
                ("run_id", v_str(&run_dir.to_string_lossy())),
                ("entries", json!(written)),
            ]),
        );
        paths.push(run_dir);
    }
    Ok(paths)
}

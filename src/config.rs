use std::path::PathBuf;

/// What discovery does with a run whose log cannot be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnreadablePolicy {
    /// Keep a placeholder control for the run and carry on.
    Skip,
    /// Fail startup.
    Abort,
}

impl UnreadablePolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "skip" => Some(UnreadablePolicy::Skip),
            "abort" => Some(UnreadablePolicy::Abort),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub runs_pattern: String,
    pub unreadable_policy: UnreadablePolicy,
    pub event_file_prefix: String,
    pub render_width: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            runs_pattern: "./runs/*".to_string(),
            unreadable_policy: UnreadablePolicy::Skip,
            event_file_prefix: "events".to_string(),
            render_width: 60,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            runs_pattern: std::env::var("RUNS_PATTERN").unwrap_or(d.runs_pattern),
            unreadable_policy: std::env::var("UNREADABLE_RUN_POLICY").ok().and_then(|v| UnreadablePolicy::parse(&v)).unwrap_or(d.unreadable_policy),
            event_file_prefix: std::env::var("EVENT_FILE_PREFIX").unwrap_or(d.event_file_prefix),
            render_width: std::env::var("RENDER_WIDTH").ok().and_then(|v| v.parse().ok()).filter(|w| *w > 0).unwrap_or(d.render_width),
        }
    }
}

/// Settings for the synthetic log producer.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub out_dir: PathBuf,
    pub runs: usize,
    pub steps: u64,
    pub tags: Vec<String>,
    pub max_value: u32,
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("./runs"),
            runs: 1,
            steps: 20,
            tags: ["test/val", "test/auc", "train/val", "test/f1", "test/per"]
                .iter()
                .map(|t| t.to_string())
                .collect(),
            max_value: 10,
            seed: None,
        }
    }
}

impl GeneratorConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            out_dir: std::env::var("GEN_RUNS_DIR").map(PathBuf::from).unwrap_or(d.out_dir),
            runs: std::env::var("GEN_RUNS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.runs),
            steps: std::env::var("GEN_STEPS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.steps),
            tags: std::env::var("GEN_TAGS")
                .ok()
                .map(|v| {
                    v.split(',')
                        .map(|t| t.trim().to_string())
                        .filter(|t| !t.is_empty())
                        .collect::<Vec<_>>()
                })
                .filter(|tags| !tags.is_empty())
                .unwrap_or(d.tags),
            max_value: std::env::var("GEN_MAX_VALUE").ok().and_then(|v| v.parse().ok()).filter(|m| *m > 0).unwrap_or(d.max_value),
            seed: std::env::var("GEN_SEED").ok().and_then(|v| v.parse().ok()),
        }
    }
}

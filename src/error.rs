use std::path::PathBuf;
use thiserror::Error;

/// A run's event log could not be opened or read at all.
///
/// Per-entry anomalies never produce this; they are dropped by the decoder.
#[derive(Debug, Error)]
pub enum MalformedLogError {
    #[error("cannot open event log {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("run directory {path} has no event files with prefix '{prefix}'")]
    NoEventFiles { path: PathBuf, prefix: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CanvasError {
    #[error("series key already registered: {0}")]
    DuplicateKey(String),

    #[error("unknown line handle: {0}")]
    UnknownLine(usize),

    #[error("column length mismatch for {key}: {xs} steps vs {ys} values")]
    LengthMismatch { key: String, xs: usize, ys: usize },
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("invalid run pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("aborting discovery: {0}")]
    Unreadable(#[from] MalformedLogError),
}

//! Run/tag comparison dashboard core.
//!
//! ```text
//! event log ──► event_log::decode ──► RunIndex ──► RunRegistry
//!                                                     │
//!            UiEvent ──► controller (plan) ──► DashboardSession ──► Canvas
//! ```

pub mod canvas;
pub mod config;
pub mod controller;
pub mod error;
pub mod event_log;
pub mod logging;
pub mod registry;
pub mod render;
pub mod run_index;
pub mod session;
pub mod summary;
pub mod synth;

//! devloop core library.
//!
//! This crate watches a project's sources, runs a linter with autofix on every
//! change and keeps a development server running only while the code lints
//! clean, without re-triggering on the linter's own fix writes.
//!
//! High-level modules:
//! - `cli`: CLI argument parsing (binary uses this).
//! - `config`: Discovery and effective configuration resolution.
//! - `lint`: Lint/fix collaborator trait, command adapter and the runner.
//! - `suppress`: One-shot suppression of fix-induced change events.
//! - `supervisor`: Server process start/restart/stop.
//! - `orchestrator`: The state machine tying the pieces together.
//! - `watcher`: File change notifications.
//! - `signals`: SIGINT/SIGTERM routing to the shutdown path.
//! - `models`: Lint report and outcome structs.
//! - `output`: Human/JSON printers for reports and status lines.
//! - `error`: Crate error type.
//! - `utils`: Supporting helpers.
pub mod cli;
pub mod config;
pub mod error;
pub mod lint;
pub mod models;
pub mod orchestrator;
pub mod output;
pub mod signals;
pub mod supervisor;
pub mod suppress;
pub mod utils;
pub mod watcher;

pub use error::{Error, Result};

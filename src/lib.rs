//! Election experiment log analysis.
//!
//! Merges the structured logs of every node of a raft cluster into one timeline and
//! derives availability metrics: time without a leader, takeovers, election attempts
//! and the time the cluster needs to recover after a node is stopped.
//!
//! ## Module Organization
//!
//! - `analyzer`: record filtering, per-node cursors, k-way merge, leadership state machine
//! - `source`: line sources (local files, child processes, in-memory fixtures)
//! - `batch`: analysis of every run in an experiment group directory
//! - `report`: text rendering of results
//! - `config`: TOML configuration

pub mod analyzer;
pub mod batch;
pub mod config;
pub mod report;
pub mod source;

pub use analyzer::{AnalysisError, RunOptions, RunReport, analyze_run};
pub use config::AnalyzerConfig;

//! Analyzer module: merges per-node election logs and classifies the timeline.
//!
//! Provides functionality for:
//! - Filtering raw JSON log lines into classified records (`log_parser`)
//! - Pulling legal records from one node's stream (`cursor`)
//! - Merging all node streams by timestamp (`merge`)
//! - Tracking cluster leadership and availability metrics (`state_machine`)
//! - Running one full analysis (`run`)

pub mod cursor;
pub mod error;
pub mod log_parser;
pub mod merge;
pub mod run;
pub mod state_machine;
pub mod types;

pub use error::AnalysisError;
pub use run::{DEFAULT_MEMBERSHIP_FIELD, RunOptions, analyze_run, merge_timeline};
pub use types::{ClusterRunState, EventRecord, EventTag, LeadershipState, Level, RunReport};

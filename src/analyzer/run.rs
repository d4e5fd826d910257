//! Drives one analysis run: cursors, merge, classification, finalization.

use std::collections::BTreeSet;

use super::cursor::Cursor;
use super::error::AnalysisError;
use super::merge::MergeScheduler;
use super::state_machine::{Step, apply, finalize};
use super::types::{ClusterRunState, EventRecord, RunReport};
use crate::source::LineSource;

/// Default field marking a record as emitted by a cluster member.
pub const DEFAULT_MEMBERSHIP_FIELD: &str = "member";

/// Per-run settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Stop at the first leader claim after a service stop and report the time to repair.
    pub kill_mode: bool,
    pub membership_field: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            kill_mode: false,
            membership_field: DEFAULT_MEMBERSHIP_FIELD.to_string(),
        }
    }
}

fn build_scheduler<S: LineSource>(
    sources: Vec<S>,
    options: &RunOptions,
    state: &mut ClusterRunState,
) -> Result<MergeScheduler<S>, AnalysisError> {
    let cursors = sources
        .into_iter()
        .enumerate()
        .map(|(node, source)| Cursor::new(node, source, options.membership_field.as_str()))
        .collect();
    MergeScheduler::new(cursors, &mut state.warnings)
}

/// Analyze one experiment run.
///
/// # Parameters
///
/// * `sources` - One line source per node; the order defines the node index
/// * `options` - Kill mode and membership marker
///
/// # Returns
///
/// The finalized report, or the fatal error naming the unusable node stream. All
/// sources are released before this returns.
pub fn analyze_run<S: LineSource>(
    sources: Vec<S>,
    options: &RunOptions,
) -> Result<RunReport, AnalysisError> {
    log::info!("Analyzing run over {} nodes (kill mode: {})", sources.len(), options.kill_mode);

    let mut state = ClusterRunState::new();
    let mut scheduler = build_scheduler(sources, options, &mut state)?;

    let mut processed = 0u64;
    while let Some(record) = scheduler.next_record(&mut state.warnings)? {
        processed += 1;
        if apply(&mut state, &record, options.kill_mode) == Step::Terminate {
            log::debug!("Run terminated early with {} streams still live", scheduler.live());
            break;
        }
    }
    scheduler.release_all();

    let report = finalize(state);
    log::info!(
        "Run finished after {} records: no-leader ratio {:.4}, {} takeovers, {} warnings",
        processed,
        report.no_leader_ratio,
        report.takeover_count,
        report.warnings.len()
    );
    Ok(report)
}

/// Merge the node streams without classifying them and hand each record to `visit`.
///
/// Returns the warnings raised while filtering (warn-level records, timestamp fallbacks).
pub fn merge_timeline<S, F>(
    sources: Vec<S>,
    options: &RunOptions,
    mut visit: F,
) -> Result<BTreeSet<String>, AnalysisError>
where
    S: LineSource,
    F: FnMut(&EventRecord),
{
    let mut state = ClusterRunState::new();
    let mut scheduler = build_scheduler(sources, options, &mut state)?;

    while let Some(record) = scheduler.next_record(&mut state.warnings)? {
        visit(&record);
    }

    Ok(state.warnings)
}

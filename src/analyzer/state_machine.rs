//! Leadership classifier over the merged timeline.
//!
//! Tracks which node, if any, believes itself leader and accumulates the run's
//! availability metrics:
//!
//! | tag               | effect                                                           |
//! |-------------------|------------------------------------------------------------------|
//! | `ServiceStart`    | first one sets `start_ts` and opens the first no-leader window    |
//! | `ServiceStop`     | sets `stop_ts`, logs the record, steps the leader down if it stops |
//! | `BecomeFollower`  | steps the leader down; ignored for any other node                |
//! | `BecomeLeader`    | takeover from `NoLeader`, overlap warning otherwise              |
//! | `ElectionStarted` | counts an election attempt                                       |
//! | `MockNetworkStats`| logs the record                                                  |

use super::types::{ClusterRunState, EventRecord, EventTag, LeadershipState, RunReport};

/// Whether the merge should keep feeding records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Terminate,
}

/// Apply one merged record to the run state.
///
/// In kill mode the first leader claim after a service stop fixes the time to repair
/// and ends the run.
pub fn apply(state: &mut ClusterRunState, record: &EventRecord, kill_mode: bool) -> Step {
    let ts = record.timestamp;
    let node = record.node;

    match record.tag {
        EventTag::ServiceStart => {
            if state.start_ts.is_none() {
                state.start_ts = Some(ts);
                state.last_stepdown_ts = Some(ts);
            }
        }
        EventTag::ServiceStop => {
            state.stop_ts = Some(ts);
            state.stop_event_log.push_str(&record.to_json_line());
            state.stop_event_log.push('\n');
            step_down(state, node, ts);
        }
        EventTag::BecomeFollower => step_down(state, node, ts),
        EventTag::BecomeLeader => {
            match state.leadership {
                LeadershipState::NoLeader => {
                    state.takeover_count += 1;
                    match state.last_stepdown_ts {
                        Some(stepdown) => add_no_leader_time(state, stepdown, ts),
                        None => {
                            state.warnings.insert(format!(
                                "node {} became leader at ts {} before any service start",
                                node, ts
                            ));
                        }
                    }
                    log::debug!("Node {} took over at {}", node, ts);
                }
                LeadershipState::Leader(current) => {
                    log::warn!(
                        "Node {} claimed leadership while node {} still holds it",
                        node, current
                    );
                    state.warnings.insert(format!(
                        "node {} claimed leadership while node {} still holds it at ts {}",
                        node, current, ts
                    ));
                }
            }
            state.leadership = LeadershipState::Leader(node);

            if kill_mode && state.time_to_repair.is_none() {
                if let Some(stop_ts) = state.stop_ts {
                    let repair = ts.saturating_sub(stop_ts);
                    state.time_to_repair = Some(repair);
                    state.end_ts = Some(ts);
                    log::info!("Cluster repaired by node {} after {}", node, repair);
                    return Step::Terminate;
                }
            }
        }
        EventTag::ElectionStarted => state.election_attempt_count += 1,
        EventTag::MockNetworkStats => {
            state.mock_network_log.push_str(&record.to_json_line());
            state.mock_network_log.push('\n');
        }
        EventTag::Unrecognized => {}
    }

    Step::Continue
}

/// Add a no-leader window, clamped at zero after timestamp fallbacks.
fn add_no_leader_time(state: &mut ClusterRunState, from: i64, to: i64) {
    let gap = to.saturating_sub(from).max(0);
    state.no_leader_duration = state.no_leader_duration.saturating_add(gap);
}

fn step_down(state: &mut ClusterRunState, node: usize, ts: i64) {
    if state.leadership == LeadershipState::Leader(node) {
        log::debug!("Node {} stepped down at {}", node, ts);
        state.leadership = LeadershipState::NoLeader;
        state.last_stepdown_ts = Some(ts);
    }
}

/// Fold the trailing no-leader window into the totals and derive the run's ratios.
pub fn finalize(mut state: ClusterRunState) -> RunReport {
    let terminated_early = state.end_ts.is_some();
    let end_ts = match state.end_ts {
        Some(end) => Some(end),
        None => {
            if let (LeadershipState::NoLeader, Some(stop_ts), Some(stepdown)) =
                (state.leadership, state.stop_ts, state.last_stepdown_ts)
            {
                add_no_leader_time(&mut state, stepdown, stop_ts);
            }
            state.stop_ts
        }
    };

    // A run without a start or an end has no measurable duration.
    let duration = match (state.start_ts, end_ts) {
        (Some(start), Some(end)) => end.saturating_sub(start),
        _ => 0,
    };
    let no_leader_ratio = if duration > 0 {
        (state.no_leader_duration as f64 / duration as f64).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let mean_takeover_gap = if state.takeover_count > 0 {
        state.no_leader_duration as f64 / state.takeover_count as f64
    } else {
        0.0
    };

    RunReport {
        no_leader_ratio,
        duration,
        no_leader_duration: state.no_leader_duration,
        takeover_count: state.takeover_count,
        mean_takeover_gap,
        time_to_repair: state.time_to_repair,
        election_attempt_count: state.election_attempt_count,
        warnings: state.warnings,
        mock_network_log: state.mock_network_log,
        stop_event_log: state.stop_event_log,
        terminated_early,
    }
}

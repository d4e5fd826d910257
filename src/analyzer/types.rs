//! Type definitions specific to the analyzer module.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Log level of a classified record.
///
/// Only `warn` is meaningful to the analysis; every other level is treated as `Info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
}

impl Level {
    pub fn from_field(level: Option<&str>) -> Self {
        match level {
            Some("warn") => Level::Warn,
            _ => Level::Info,
        }
    }
}

/// Recognized message kinds emitted by a raft instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTag {
    ServiceStart,
    ServiceStop,
    BecomeFollower,
    BecomeLeader,
    ElectionStarted,
    MockNetworkStats,
    /// Any other message. Still advances the stream.
    Unrecognized,
}

impl EventTag {
    pub fn from_msg(msg: Option<&str>) -> Self {
        match msg {
            Some("raft instance start service") => EventTag::ServiceStart,
            Some("raft instance stop service") => EventTag::ServiceStop,
            Some("become follower") => EventTag::BecomeFollower,
            Some("become leader") => EventTag::BecomeLeader,
            Some("start a new election") => EventTag::ElectionStarted,
            Some("mock net terminates with packets statistics") => EventTag::MockNetworkStats,
            _ => EventTag::Unrecognized,
        }
    }
}

/// One classified log entry from a single node.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub timestamp: i64,
    pub level: Level,
    pub tag: EventTag,
    /// Origin node, 0-based, in the order the sources were configured.
    pub node: usize,
    /// The fields of the record other than `ts`, kept for diagnostic replay.
    pub payload: Map<String, Value>,
}

impl EventRecord {
    /// Render the record back to a single JSON line.
    pub fn to_json_line(&self) -> String {
        let mut object = Map::with_capacity(self.payload.len() + 1);
        object.insert("ts".to_string(), Value::from(self.timestamp));
        for (key, value) in &self.payload {
            object.insert(key.clone(), value.clone());
        }
        Value::Object(object).to_string()
    }
}

/// Cluster leadership as observed from the merged timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LeadershipState {
    #[default]
    NoLeader,
    Leader(usize),
}

/// The evolving aggregate of one experiment run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterRunState {
    pub leadership: LeadershipState,
    /// Most recent transition into `NoLeader`. Unset until the first service start.
    pub last_stepdown_ts: Option<i64>,
    /// First service start across all nodes.
    pub start_ts: Option<i64>,
    /// Last service stop across all nodes.
    pub stop_ts: Option<i64>,
    pub no_leader_duration: i64,
    pub takeover_count: u64,
    pub election_attempt_count: u64,
    pub time_to_repair: Option<i64>,
    /// Timestamp of the record that ended the run early (kill mode).
    pub end_ts: Option<i64>,
    pub warnings: BTreeSet<String>,
    pub mock_network_log: String,
    pub stop_event_log: String,
}

impl ClusterRunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_leader(&self) -> Option<usize> {
        match self.leadership {
            LeadershipState::NoLeader => None,
            LeadershipState::Leader(node) => Some(node),
        }
    }
}

/// Finalized metrics of one run, handed to the reporting layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub no_leader_ratio: f64,
    pub duration: i64,
    pub no_leader_duration: i64,
    pub takeover_count: u64,
    pub mean_takeover_gap: f64,
    pub time_to_repair: Option<i64>,
    pub election_attempt_count: u64,
    pub warnings: BTreeSet<String>,
    pub mock_network_log: String,
    pub stop_event_log: String,
    pub terminated_early: bool,
}

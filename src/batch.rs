//! Batch analysis over experiment group directories.
//!
//! A group directory holds one subdirectory per experiment run, and each run holds
//! one directory per node:
//!
//! ```text
//! <group>/<run>/1/election.log
//! <group>/<run>/2/election.log
//! ...
//! ```
//!
//! Node `i` of every run is read through peer `i`'s transport; the run list comes
//! from the first peer.

use anyhow::Context;
use serde::Serialize;

use crate::analyzer::{RunReport, analyze_run};
use crate::config::AnalyzerConfig;
use crate::source::LineSource;

/// Result of one run inside a group.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub run: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<RunReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Distribution of one metric across the runs of a group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
}

impl Stats {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let count = sorted.len();
        let median = if count % 2 == 1 {
            sorted[count / 2]
        } else {
            (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
        };

        Some(Self {
            count,
            min: sorted[0],
            max: sorted[count - 1],
            mean: sorted.iter().sum::<f64>() / count as f64,
            median,
        })
    }
}

/// All runs of one group directory.
#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    pub dir: String,
    pub runs: Vec<RunOutcome>,
    pub no_leader_ratio: Option<Stats>,
    pub time_to_repair: Option<Stats>,
}

impl GroupSummary {
    pub fn failed_runs(&self) -> usize {
        self.runs.iter().filter(|outcome| outcome.error.is_some()).count()
    }
}

/// Analyze one run directory, reading node `i` from peer `i`.
pub fn analyze_run_dir(config: &AnalyzerConfig, run_dir: &str) -> anyhow::Result<RunReport> {
    let mut sources: Vec<Box<dyn LineSource>> = Vec::with_capacity(config.peers.len());
    for (index, transport) in config.transports().iter().enumerate() {
        let path = config.node_log_path(run_dir, index);
        let source = transport
            .open(&path)
            .with_context(|| format!("Failed to open node {} log {}", index, path))?;
        sources.push(source);
    }

    let report = analyze_run(sources, &config.run_options())
        .with_context(|| format!("Failed to analyze run {}", run_dir))?;
    Ok(report)
}

/// Analyze every run of a group directory.
///
/// A fatal error in one run is recorded in its outcome and the remaining runs still
/// get analyzed. Listing the group itself must succeed.
pub fn analyze_group(config: &AnalyzerConfig, dir: &str) -> anyhow::Result<GroupSummary> {
    let transports = config.transports();
    let lister = transports.first().context("At least one peer is required")?;
    let runs = lister
        .list_dir(dir)
        .with_context(|| format!("Failed to list experiment runs in {}", dir))?;
    log::info!("Found {} runs in {}", runs.len(), dir);

    let mut outcomes = Vec::with_capacity(runs.len());
    for run in runs {
        let path = std::path::Path::new(dir).join(&run).to_string_lossy().to_string();
        let outcome = match analyze_run_dir(config, &path) {
            Ok(report) => {
                for warning in &report.warnings {
                    log::warn!("{}: {}", path, warning);
                }
                RunOutcome {
                    run,
                    path,
                    report: Some(report),
                    error: None,
                }
            }
            Err(e) => {
                log::error!("{}: {:#}", path, e);
                RunOutcome {
                    run,
                    path,
                    report: None,
                    error: Some(format!("{:#}", e)),
                }
            }
        };
        outcomes.push(outcome);
    }

    let ratios: Vec<f64> = outcomes
        .iter()
        .filter_map(|outcome| outcome.report.as_ref())
        .map(|report| report.no_leader_ratio)
        .collect();
    let repairs: Vec<f64> = outcomes
        .iter()
        .filter_map(|outcome| outcome.report.as_ref())
        .filter_map(|report| report.time_to_repair)
        .map(|ttr| ttr as f64)
        .collect();

    Ok(GroupSummary {
        dir: dir.to_string(),
        runs: outcomes,
        no_leader_ratio: Stats::from_values(&ratios),
        time_to_repair: Stats::from_values(&repairs),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn write_node_log(run: &Path, node: usize, lines: &[String]) {
        let dir = run.join((node + 1).to_string());
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("election.log"), lines.join("\n")).unwrap();
    }

    fn line(ts: i64, member: usize, msg: &str) -> String {
        format!(r#"{{"level":"info","ts":{},"member":"{}","msg":"{}"}}"#, ts, member, msg)
    }

    fn local_config(nodes: usize, kill_mode: bool) -> AnalyzerConfig {
        AnalyzerConfig {
            peers: vec!["local".to_string(); nodes],
            kill_mode,
            ..AnalyzerConfig::default()
        }
    }

    fn write_kill_run(run: &Path, repair_after: i64) {
        write_node_log(
            run,
            0,
            &[
                line(0, 1, "raft instance start service"),
                line(5, 1, "become leader"),
                line(100, 1, "raft instance stop service"),
            ],
        );
        write_node_log(
            run,
            1,
            &[
                line(1, 2, "raft instance start service"),
                line(100 + repair_after, 2, "become leader"),
                line(400, 2, "raft instance stop service"),
            ],
        );
    }

    #[test]
    fn test_stats() {
        assert_eq!(Stats::from_values(&[]), None);

        let stats = Stats::from_values(&[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
        assert_eq!(stats.mean, 2.5);
        assert_eq!(stats.median, 2.5);

        assert_eq!(Stats::from_values(&[3.0, 9.0, 1.0]).unwrap().median, 3.0);
    }

    #[test]
    fn test_analyze_run_dir() {
        let dir = tempfile::tempdir().unwrap();
        write_kill_run(dir.path(), 30);

        let report = analyze_run_dir(&local_config(2, true), dir.path().to_str().unwrap()).unwrap();
        assert_eq!(report.time_to_repair, Some(30));
        assert!(report.terminated_early);
    }

    #[test]
    fn test_analyze_run_dir_missing_node_log() {
        let dir = tempfile::tempdir().unwrap();
        write_kill_run(dir.path(), 30);

        let run_dir = dir.path().to_str().unwrap();
        let err = analyze_run_dir(&local_config(3, false), run_dir).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to open node 2 log"));
    }

    #[test]
    fn test_analyze_group_collects_every_run() {
        let group = tempfile::tempdir().unwrap();
        write_kill_run(&group.path().join("run-1"), 20);
        write_kill_run(&group.path().join("run-2"), 40);
        let broken = group.path().join("run-3");
        write_node_log(&broken, 0, &[line(0, 1, "raft instance start service")]);
        write_node_log(&broken, 1, &[r#"{"ts":0,"msg":"no marker"}"#.to_string()]);

        let group_dir = group.path().to_str().unwrap();
        let summary = analyze_group(&local_config(2, true), group_dir).unwrap();
        assert_eq!(summary.runs.len(), 3);
        assert_eq!(summary.runs[0].run, "run-1");
        assert_eq!(summary.failed_runs(), 1);
        assert!(summary.runs[2].error.as_ref().unwrap().contains("node 1"));

        let ttr = summary.time_to_repair.unwrap();
        assert_eq!(ttr.count, 2);
        assert_eq!(ttr.mean, 30.0);
        assert_eq!(summary.no_leader_ratio.unwrap().count, 2);
    }

    #[test]
    fn test_analyze_group_missing_dir() {
        let err = analyze_group(&local_config(1, false), "/nonexistent/group").unwrap_err();
        assert!(err.to_string().contains("Failed to list experiment runs"));
    }
}

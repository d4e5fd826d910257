//! Text rendering of run and group results.

use std::fmt::Write;

use crate::analyzer::{EventRecord, RunReport};
use crate::batch::{GroupSummary, Stats};

/// Render one run's metrics, warnings and diagnostic logs.
pub fn render_run(label: &str, report: &RunReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "=== {} ===", label);
    let _ = writeln!(
        out,
        "  Duration:          {}\n  No-leader time:    {}\n  No-leader ratio:   {:.4}\n  Takeovers:         {}\n  Mean takeover gap: {:.2}\n  Elections started: {}",
        report.duration,
        report.no_leader_duration,
        report.no_leader_ratio,
        report.takeover_count,
        report.mean_takeover_gap,
        report.election_attempt_count,
    );
    match report.time_to_repair {
        Some(ttr) => {
            let _ = writeln!(out, "  Time to repair:    {}", ttr);
        }
        None => {
            let _ = writeln!(out, "  Time to repair:    -");
        }
    }
    if report.terminated_early {
        let _ = writeln!(out, "  (stopped at the first repair)");
    }

    if !report.warnings.is_empty() {
        let _ = writeln!(out, "\n--- Warnings ({}) ---", report.warnings.len());
        for warning in &report.warnings {
            let _ = writeln!(out, "  warning: {}", warning);
        }
    }
    if !report.stop_event_log.is_empty() {
        let _ = writeln!(out, "\n--- Service Stops ---");
        for line in report.stop_event_log.lines() {
            let _ = writeln!(out, "  {}", line);
        }
    }
    if !report.mock_network_log.is_empty() {
        let _ = writeln!(out, "\n--- Mock Network Statistics ---");
        for line in report.mock_network_log.lines() {
            let _ = writeln!(out, "  {}", line);
        }
    }

    out
}

fn render_stats(out: &mut String, name: &str, stats: Option<&Stats>) {
    match stats {
        Some(s) => {
            let _ = writeln!(
                out,
                "  {:<16} n={} min={:.4} median={:.4} mean={:.4} max={:.4}",
                name, s.count, s.min, s.median, s.mean, s.max
            );
        }
        None => {
            let _ = writeln!(out, "  {:<16} n=0", name);
        }
    }
}

/// Render a group: one line per run, then the distributions.
pub fn render_group(summary: &GroupSummary) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "=== {} ({} runs, {} failed) ===",
        summary.dir,
        summary.runs.len(),
        summary.failed_runs()
    );
    for outcome in &summary.runs {
        match (&outcome.report, &outcome.error) {
            (Some(report), _) => {
                let ttr = report.time_to_repair.map_or_else(|| "-".to_string(), |t| t.to_string());
                let _ = writeln!(
                    out,
                    "  {:<24} ratio={:.4} takeovers={} ttr={} warnings={}",
                    outcome.run,
                    report.no_leader_ratio,
                    report.takeover_count,
                    ttr,
                    report.warnings.len()
                );
            }
            (None, error) => {
                let error = error.as_deref().unwrap_or("unknown error");
                let _ = writeln!(out, "  {:<24} FAILED: {}", outcome.run, error);
            }
        }
    }

    let _ = writeln!(out, "\n--- Distribution ---");
    render_stats(&mut out, "no-leader ratio", summary.no_leader_ratio.as_ref());
    render_stats(&mut out, "time to repair", summary.time_to_repair.as_ref());

    let warned: Vec<_> = summary
        .runs
        .iter()
        .filter_map(|outcome| outcome.report.as_ref().map(|report| (&outcome.path, report)))
        .filter(|(_, report)| !report.warnings.is_empty())
        .collect();
    if !warned.is_empty() {
        let _ = writeln!(out, "\n--- Warnings ---");
        for (path, report) in warned {
            let _ = writeln!(out, "  {}", path);
            for warning in &report.warnings {
                let _ = writeln!(out, "    warning: {}", warning);
            }
        }
    }

    out
}

/// One merged timeline entry: `<ts> [node <i>] <record json>`.
pub fn render_timeline_entry(record: &EventRecord) -> String {
    format!("{} [node {}] {}", record.timestamp, record.node, record.to_json_line())
}

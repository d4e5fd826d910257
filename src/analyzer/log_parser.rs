//! Parse individual log lines and classify them into `EventRecord`s.
//!
//! Each node writes one JSON object per line:
//!
//! ```text
//! {"level":"info","ts":1667211123460,"member":"2","msg":"become leader","term":3}
//! {"level":"warn","ts":1667211123502,"member":"2","msg":"lease renewal is late"}
//! {"ts":1667211123510,"msg":"dialing peer 10.0.0.3"}
//! ```
//!
//! Only lines carrying the membership marker (`member` by default) take part in the
//! analysis. The third line above is skipped.

use serde_json::Value;
use std::collections::BTreeSet;

use super::error::AnalysisError;
use super::types::{EventRecord, EventTag, Level};

/// Outcome of filtering one raw line.
#[derive(Debug, Clone, PartialEq)]
pub enum Filtered {
    Record(EventRecord),
    /// Not a classifiable event; the caller pulls the next line.
    Skip,
}

/// Parse a log line from `node` into a classified record.
///
/// # Parameters
///
/// * `line` - One raw line, without its terminator
/// * `node` - Index of the node the line came from
/// * `last_ts` - Timestamp of the previous legal record of the same node
/// * `membership_field` - Field that marks a record as classifiable
/// * `warnings` - The run's warning set; `warn` records and timestamp fallbacks land here
///
/// # Returns
///
/// `Filtered::Record` for a legal record, `Filtered::Skip` for blank and non-member lines,
/// or an error when the line is not a JSON object with an integer `ts`.
pub fn parse_line(
    line: &str,
    node: usize,
    last_ts: Option<i64>,
    membership_field: &str,
    warnings: &mut BTreeSet<String>,
) -> Result<Filtered, AnalysisError> {
    if line.trim().is_empty() {
        return Ok(Filtered::Skip);
    }

    let value: Value = serde_json::from_str(line).map_err(|source| AnalysisError::Malformed {
        node,
        line: line.to_string(),
        source,
    })?;

    let Value::Object(mut payload) = value else {
        return Err(AnalysisError::InvalidRecord {
            node,
            line: line.to_string(),
            reason: "record is not a JSON object",
        });
    };

    if !payload.contains_key(membership_field) {
        log::trace!("Skipping non-member line from node {}: {}", node, line);
        return Ok(Filtered::Skip);
    }

    let timestamp = match payload.remove("ts").as_ref().and_then(Value::as_i64) {
        Some(ts) => ts,
        None => {
            return Err(AnalysisError::InvalidRecord {
                node,
                line: line.to_string(),
                reason: "missing integer `ts` field",
            });
        }
    };

    let level = Level::from_field(payload.get("level").and_then(Value::as_str));
    let tag = EventTag::from_msg(payload.get("msg").and_then(Value::as_str));
    let record = EventRecord {
        timestamp,
        level,
        tag,
        node,
        payload,
    };

    if level == Level::Warn {
        log::debug!("Node {} logged a warning at {}", node, timestamp);
        warnings.insert(format!("node {} logged warning: {}", node, record.to_json_line()));
    }

    if let Some(last) = last_ts {
        if timestamp < last {
            log::warn!("Node {} timestamp fell back from {} to {}", node, last, timestamp);
            warnings.insert(format!(
                "node {} timestamp fallback from {} to {}: {}",
                node,
                last,
                timestamp,
                record.to_json_line()
            ));
        }
    }

    Ok(Filtered::Record(record))
}

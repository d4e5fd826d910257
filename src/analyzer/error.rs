//! Fatal analysis errors. Anything recoverable goes into the run's warning set instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("no node log sources configured")]
    NoSources,

    #[error("node {node} log contains no member records")]
    EmptyStream { node: usize },

    #[error("node {node} log has a malformed line {line:?}: {source}")]
    Malformed {
        node: usize,
        line: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("node {node} log has an invalid record {line:?}: {reason}")]
    InvalidRecord { node: usize, line: String, reason: &'static str },

    #[error("failed to read node {node} log: {source}")]
    Source {
        node: usize,
        #[source]
        source: std::io::Error,
    },
}

impl AnalysisError {
    /// The node whose stream caused the failure, if any.
    pub fn node(&self) -> Option<usize> {
        match self {
            AnalysisError::NoSources => None,
            AnalysisError::EmptyStream { node }
            | AnalysisError::Malformed { node, .. }
            | AnalysisError::InvalidRecord { node, .. }
            | AnalysisError::Source { node, .. } => Some(*node),
        }
    }
}

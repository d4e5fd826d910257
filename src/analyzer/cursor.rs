//! Per-node cursor: pulls the next legal record out of one node's line source.

use std::collections::BTreeSet;

use super::error::AnalysisError;
use super::log_parser::{Filtered, parse_line};
use super::types::EventRecord;
use crate::source::LineSource;

pub struct Cursor<S: LineSource> {
    node: usize,
    /// `None` once the stream ended or was released.
    source: Option<S>,
    last_ts: Option<i64>,
    membership_field: String,
}

impl<S: LineSource> Cursor<S> {
    pub fn new(node: usize, source: S, membership_field: impl Into<String>) -> Self {
        Self {
            node,
            source: Some(source),
            last_ts: None,
            membership_field: membership_field.into(),
        }
    }

    pub fn node(&self) -> usize {
        self.node
    }

    pub fn is_exhausted(&self) -> bool {
        self.source.is_none()
    }

    /// Pull lines until a legal record appears or the source ends.
    ///
    /// Returns `Ok(None)` at end of stream, after the source has been released.
    pub fn advance(
        &mut self,
        warnings: &mut BTreeSet<String>,
    ) -> Result<Option<EventRecord>, AnalysisError> {
        loop {
            let Some(source) = self.source.as_mut() else {
                return Ok(None);
            };

            let line = match source.next_line() {
                Ok(Some(line)) => line,
                Ok(None) => {
                    log::debug!("Node {} stream exhausted", self.node);
                    self.release();
                    return Ok(None);
                }
                Err(source) => {
                    self.release();
                    return Err(AnalysisError::Source { node: self.node, source });
                }
            };

            match parse_line(&line, self.node, self.last_ts, &self.membership_field, warnings)? {
                Filtered::Record(record) => {
                    self.last_ts = Some(record.timestamp);
                    return Ok(Some(record));
                }
                Filtered::Skip => continue,
            }
        }
    }

    /// Release the underlying source. Later `advance` calls report end of stream.
    pub fn release(&mut self) {
        if let Some(mut source) = self.source.take() {
            source.release();
        }
    }
}

impl<S: LineSource> Drop for Cursor<S> {
    fn drop(&mut self) {
        self.release();
    }
}

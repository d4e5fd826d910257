//! K-way merge of per-node record streams into one timeline.
//!
//! Each live cursor contributes one lookahead record. The scheduler always yields the
//! buffered record with the smallest timestamp, breaking ties by the lowest node index,
//! then refills that node's slot. A retired cursor never competes again.

use std::collections::BTreeSet;

use super::cursor::Cursor;
use super::error::AnalysisError;
use super::types::EventRecord;
use crate::source::LineSource;

pub struct MergeScheduler<S: LineSource> {
    cursors: Vec<Cursor<S>>,
    /// Lookahead per node; `None` once the node is retired.
    heads: Vec<Option<EventRecord>>,
    live: usize,
}

impl<S: LineSource> MergeScheduler<S> {
    /// Prime one lookahead record per cursor.
    ///
    /// Fails with `EmptyStream` if any node has no legal record at all. Every cursor is
    /// released before an error is returned.
    pub fn new(
        mut cursors: Vec<Cursor<S>>,
        warnings: &mut BTreeSet<String>,
    ) -> Result<Self, AnalysisError> {
        if cursors.is_empty() {
            return Err(AnalysisError::NoSources);
        }

        let mut heads = Vec::with_capacity(cursors.len());
        for index in 0..cursors.len() {
            let head = match cursors[index].advance(warnings) {
                Ok(Some(record)) => record,
                Ok(None) => {
                    let node = cursors[index].node();
                    release_all(&mut cursors);
                    return Err(AnalysisError::EmptyStream { node });
                }
                Err(e) => {
                    release_all(&mut cursors);
                    return Err(e);
                }
            };
            heads.push(Some(head));
        }

        let live = heads.len();
        Ok(Self { cursors, heads, live })
    }

    /// Number of nodes whose streams are not yet exhausted.
    pub fn live(&self) -> usize {
        self.live
    }

    /// Index of the buffered record with the smallest timestamp, lowest node first on ties.
    fn earliest(&self) -> Option<usize> {
        let mut best: Option<(i64, usize)> = None;
        for (node, head) in self.heads.iter().enumerate() {
            if let Some(record) = head {
                match best {
                    Some((ts, _)) if ts <= record.timestamp => {}
                    _ => best = Some((record.timestamp, node)),
                }
            }
        }
        best.map(|(_, node)| node)
    }

    /// Yield the next record of the merged timeline, or `None` once every stream ended.
    pub fn next_record(
        &mut self,
        warnings: &mut BTreeSet<String>,
    ) -> Result<Option<EventRecord>, AnalysisError> {
        let Some(node) = self.earliest() else {
            return Ok(None);
        };

        let refill = match self.cursors[node].advance(warnings) {
            Ok(refill) => refill,
            Err(e) => {
                self.release_all();
                return Err(e);
            }
        };
        if refill.is_none() {
            self.live -= 1;
            log::debug!("Node {} retired, {} streams still live", node, self.live);
        }

        Ok(std::mem::replace(&mut self.heads[node], refill))
    }

    /// Release every cursor that still holds a source.
    pub fn release_all(&mut self) {
        release_all(&mut self.cursors);
    }
}

fn release_all<S: LineSource>(cursors: &mut [Cursor<S>]) {
    for cursor in cursors.iter_mut() {
        cursor.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use rand::{Rng, SeedableRng};
    use rand::rngs::StdRng;

    fn member(ts: i64) -> String {
        format!(r#"{{"ts":{},"member":"x","msg":"tick"}}"#, ts)
    }

    fn build(
        streams: Vec<Vec<String>>,
        warnings: &mut BTreeSet<String>,
    ) -> Result<MergeScheduler<MemorySource>, AnalysisError> {
        let cursors = streams
            .into_iter()
            .enumerate()
            .map(|(node, lines)| Cursor::new(node, MemorySource::new(lines), "member"))
            .collect();
        MergeScheduler::new(cursors, warnings)
    }

    fn drain(
        scheduler: &mut MergeScheduler<MemorySource>,
        warnings: &mut BTreeSet<String>,
    ) -> Vec<(i64, usize)> {
        let mut merged = Vec::new();
        while let Some(record) = scheduler.next_record(warnings).unwrap() {
            merged.push((record.timestamp, record.node));
        }
        merged
    }

    #[test]
    fn test_merge_orders_by_timestamp_then_node() {
        let mut warnings = BTreeSet::new();
        let streams = vec![
            vec![member(1), member(5), member(9)],
            vec![member(1), member(4)],
            vec![member(0), member(5)],
        ];
        let mut scheduler = build(streams, &mut warnings).unwrap();
        assert_eq!(scheduler.live(), 3);

        let merged = drain(&mut scheduler, &mut warnings);
        assert_eq!(merged, vec![(0, 2), (1, 0), (1, 1), (4, 1), (5, 0), (5, 2), (9, 0)]);
        assert_eq!(scheduler.live(), 0);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_regression_becomes_next_merge_key() {
        let mut warnings = BTreeSet::new();
        let streams = vec![vec![member(50), member(40)], vec![member(45)]];
        let mut scheduler = build(streams, &mut warnings).unwrap();

        let merged = drain(&mut scheduler, &mut warnings);
        assert_eq!(merged, vec![(45, 1), (50, 0), (40, 0)]);
        assert_eq!(warnings.len(), 1);
        assert!(warnings.iter().next().unwrap().contains("fallback from 50 to 40"));
    }

    #[test]
    fn test_empty_stream_is_fatal() {
        let mut warnings = BTreeSet::new();
        let streams = vec![vec![member(1)], vec![r#"{"ts":2,"msg":"no marker"}"#.to_string()]];
        let err = build(streams, &mut warnings).err().unwrap();
        assert!(matches!(err, AnalysisError::EmptyStream { node: 1 }));

        let streams = vec![vec![member(1)], vec![]];
        let err = build(streams, &mut warnings).err().unwrap();
        assert!(matches!(err, AnalysisError::EmptyStream { node: 1 }));
    }

    #[test]
    fn test_no_sources() {
        let mut warnings = BTreeSet::new();
        let err = build(Vec::new(), &mut warnings).err().unwrap();
        assert!(matches!(err, AnalysisError::NoSources));
    }

    #[test]
    fn test_malformed_line_mid_stream_is_fatal() {
        let mut warnings = BTreeSet::new();
        let streams = vec![vec![member(1), "{broken".to_string()], vec![member(2)]];
        let mut scheduler = build(streams, &mut warnings).unwrap();

        let err = scheduler.next_record(&mut warnings).unwrap_err();
        assert!(matches!(err, AnalysisError::Malformed { node: 0, .. }));
    }

    #[test]
    fn test_randomized_streams_merge_in_order() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let nodes = rng.gen_range(1..6);
            let mut streams = Vec::new();
            let mut total = 0;
            for _ in 0..nodes {
                let len = rng.gen_range(1..20);
                let mut ts = rng.gen_range(0..10);
                let mut lines = Vec::new();
                for _ in 0..len {
                    ts += rng.gen_range(0..4);
                    lines.push(member(ts));
                    if rng.gen_bool(0.2) {
                        lines.push(r#"{"ts":0,"msg":"noise"}"#.to_string());
                    }
                }
                total += len;
                streams.push(lines);
            }

            let mut warnings = BTreeSet::new();
            let mut scheduler = build(streams, &mut warnings).unwrap();
            let merged = drain(&mut scheduler, &mut warnings);

            assert_eq!(merged.len(), total);
            assert!(merged.windows(2).all(|pair| pair[0] <= pair[1]));
            assert!(warnings.is_empty());
        }
    }
}

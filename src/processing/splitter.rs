//! Streaming splitter: turns a chunk stream into one segment per earthquake.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::sample::{Chunk, RawSample};
use crate::data::schema::SchemaValidator;
use crate::data::writer::SegmentSink;
use crate::error::{Result, SplitError};
use crate::processing::boundary::{find_boundary, is_boundary_between, BoundaryRow};
use crate::processing::buffer::SegmentBuffer;
use crate::processing::statistics::{GlobalStats, StatsAggregator};

/// What to do with rows still buffered when the input ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrailingPolicy {
    /// Emit the trailing rows as a final segment.
    #[default]
    Flush,
    /// Drop the trailing rows.
    Discard,
}

/// Lifecycle of one split run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitState {
    AwaitingFirstChunk,
    Validated,
    Streaming,
    Done,
    Aborted,
}

/// Cooperative cancellation, checked between chunks.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Outcome of a completed split.
#[derive(Debug, Clone)]
pub struct SplitReport {
    pub segments: usize,
    pub rows_read: u64,
    pub rows_dropped: u64,
    pub stats: GlobalStats,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Drives boundary detection, buffering, segment output and statistics over
/// a single pass of the input.
pub struct StreamingSplitter<S: SegmentSink> {
    sink: S,
    validator: SchemaValidator,
    boundary_row: BoundaryRow,
    trailing: TrailingPolicy,
    cancel: CancelFlag,
    state: SplitState,
    buffer: SegmentBuffer,
    stats: StatsAggregator,
    next_index: usize,
    rows_read: u64,
    rows_dropped: u64,
}

impl<S: SegmentSink> StreamingSplitter<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            validator: SchemaValidator::default(),
            boundary_row: BoundaryRow::default(),
            trailing: TrailingPolicy::default(),
            cancel: CancelFlag::new(),
            state: SplitState::AwaitingFirstChunk,
            buffer: SegmentBuffer::new(),
            stats: StatsAggregator::new(),
            next_index: 0,
            rows_read: 0,
            rows_dropped: 0,
        }
    }

    pub fn with_boundary_row(mut self, policy: BoundaryRow) -> Self {
        self.boundary_row = policy;
        self
    }

    pub fn with_trailing(mut self, policy: TrailingPolicy) -> Self {
        self.trailing = policy;
        self
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn state(&self) -> SplitState {
        self.state
    }

    /// Consume the whole chunk stream and return the final statistics.
    ///
    /// On any error the sink is asked to roll back what it wrote.
    pub fn run<I>(mut self, chunks: I) -> Result<SplitReport>
    where
        I: IntoIterator<Item = Result<Chunk>>,
    {
        let started_at = Utc::now();

        if let Err(e) = self.process(chunks) {
            self.abort();
            return Err(e);
        }

        let stats = std::mem::take(&mut self.stats).finalize_global()?;
        let finished_at = Utc::now();
        tracing::info!(
            "Split finished: {} segment(s), {} rows read, {} dropped in {} ms",
            self.next_index,
            self.rows_read,
            self.rows_dropped,
            (finished_at - started_at).num_milliseconds()
        );

        Ok(SplitReport {
            segments: self.next_index,
            rows_read: self.rows_read,
            rows_dropped: self.rows_dropped,
            stats,
            started_at,
            finished_at,
        })
    }

    fn process<I>(&mut self, chunks: I) -> Result<()>
    where
        I: IntoIterator<Item = Result<Chunk>>,
    {
        for chunk in chunks {
            if self.cancel.is_cancelled() {
                tracing::warn!("Split cancelled after {} segment(s)", self.next_index);
                return Err(SplitError::Cancelled {
                    segments: self.next_index,
                });
            }
            self.push_chunk(&chunk?)?;
        }

        if self.state == SplitState::AwaitingFirstChunk {
            tracing::error!("Incorrect data format. Abort splitting.");
            return Err(SplitError::Schema("input contains no data rows".to_string()));
        }
        self.finish()
    }

    fn push_chunk(&mut self, chunk: &Chunk) -> Result<()> {
        if self.state == SplitState::AwaitingFirstChunk {
            if !self.validator.validate(chunk) {
                tracing::error!("Incorrect data format. Abort splitting.");
                self.state = SplitState::Aborted;
                return Err(SplitError::Schema(format!(
                    "expected {}, found {} row(s) with columns {:?}",
                    self.validator.describe(),
                    chunk.len(),
                    chunk.columns
                )));
            }
            tracing::info!("Data format correct.");
            self.state = SplitState::Validated;
        } else if self.state == SplitState::Validated {
            // Rows start flowing with the second chunk.
            self.state = SplitState::Streaming;
        }

        let (samples, dropped) = chunk.clean();
        self.rows_read += chunk.len() as u64;
        self.rows_dropped += dropped as u64;
        if dropped > 0 {
            tracing::warn!(
                "Dropped {dropped} invalid row(s) in chunk starting at row {}",
                chunk.first_row
            );
        }

        let mut rest: &[RawSample] = &samples;
        let Some(head) = rest.first() else {
            return Ok(());
        };

        // A repeated TTF across the seam ends the run, as it does mid-chunk.
        let at_seam = self.buffer.last().is_some_and(|tail| {
            is_boundary_between(tail, head) || tail.time_to_failure == head.time_to_failure
        });
        if at_seam {
            tracing::debug!("New earthquake at chunk seam, row {}", head.row);
            self.close_segment()?;
            if self.boundary_row == BoundaryRow::Drop {
                rest = &rest[1..];
            }
        }

        loop {
            let (before, after) = find_boundary(rest, self.boundary_row);
            self.buffer.extend(before);
            match after {
                Some(after) => {
                    self.close_segment()?;
                    rest = after;
                }
                None => break,
            }
        }
        Ok(())
    }

    fn close_segment(&mut self) -> Result<()> {
        let index = self.next_index;
        let Some(segment) = self.buffer.take(index) else {
            return Ok(());
        };

        self.sink.write_segment(&segment)?;
        if let Some(stats) = self.stats.record_segment(&segment, index) {
            tracing::debug!("{}", stats.report(&format!("Earthquake {index}")));
        }
        tracing::info!(
            "Saved earthquake {index} ({} rows, first row {})",
            segment.len(),
            segment.samples[0].row
        );
        self.next_index += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        match self.trailing {
            TrailingPolicy::Flush => self.close_segment()?,
            TrailingPolicy::Discard => {
                if !self.buffer.is_empty() {
                    tracing::info!(
                        "Discarding {} trailing row(s) of an unfinished earthquake",
                        self.buffer.len()
                    );
                    self.buffer.take(self.next_index);
                }
            }
        }
        self.state = SplitState::Done;
        Ok(())
    }

    fn abort(&mut self) {
        self.state = SplitState::Aborted;
        if let Err(e) = self.sink.rollback() {
            tracing::error!("Failed to remove partial output: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::buffer::Segment;

    #[derive(Default)]
    struct MemorySink {
        segments: Vec<Segment>,
        rolled_back: bool,
    }

    impl SegmentSink for MemorySink {
        fn write_segment(&mut self, segment: &Segment) -> Result<()> {
            self.segments.push(segment.clone());
            Ok(())
        }

        fn rollback(&mut self) -> Result<()> {
            self.segments.clear();
            self.rolled_back = true;
            Ok(())
        }
    }

    fn chunk(first_row: u64, ttf: &[f64]) -> Chunk {
        let pairs: Vec<(f64, f64)> = ttf
            .iter()
            .enumerate()
            .map(|(i, &t)| ((first_row as usize + i) as f64, t))
            .collect();
        Chunk::from_samples(first_row, &pairs)
    }

    fn rows(segment: &Segment) -> Vec<u64> {
        segment.rows().collect()
    }

    #[test]
    fn state_moves_from_awaiting_to_done() {
        let mut sink = MemorySink::default();
        let mut splitter = StreamingSplitter::new(&mut sink);
        assert_eq!(splitter.state(), SplitState::AwaitingFirstChunk);

        splitter.push_chunk(&chunk(0, &[3.0, 2.0, 1.0])).unwrap();
        assert_eq!(splitter.state(), SplitState::Validated);

        splitter.push_chunk(&chunk(3, &[0.5, 0.25])).unwrap();
        assert_eq!(splitter.state(), SplitState::Streaming);

        splitter.finish().unwrap();
        assert_eq!(splitter.state(), SplitState::Done);
        assert_eq!(sink.segments.len(), 1);
    }

    #[test]
    fn bad_schema_aborts_before_any_output() {
        let mut sink = MemorySink::default();
        let mut splitter = StreamingSplitter::new(&mut sink);
        let mut bad = chunk(0, &[3.0, 2.0, 9.0]);
        bad.columns = vec!["foo".to_string(), "bar".to_string()];

        let err = splitter.push_chunk(&bad).unwrap_err();
        assert!(matches!(err, SplitError::Schema(_)));
        assert_eq!(splitter.state(), SplitState::Aborted);
        assert!(sink.segments.is_empty());
    }

    #[test]
    fn seam_reset_closes_buffer_before_merging() {
        let mut sink = MemorySink::default();
        let mut splitter = StreamingSplitter::new(&mut sink).with_boundary_row(BoundaryRow::StartNext);

        splitter.push_chunk(&chunk(0, &[5.0, 4.0, 3.0])).unwrap();
        assert_eq!(splitter.buffer.len(), 3);
        splitter.push_chunk(&chunk(3, &[9.0, 8.0])).unwrap();
        assert_eq!(splitter.next_index, 1);
        assert_eq!(splitter.buffer.len(), 2);
        splitter.finish().unwrap();

        assert_eq!(rows(&sink.segments[0]), vec![0, 1, 2]);
        assert_eq!(rows(&sink.segments[1]), vec![3, 4]);
    }

    #[test]
    fn seam_reset_drops_boundary_row_under_drop_policy() {
        let mut sink = MemorySink::default();
        let splitter = StreamingSplitter::new(&mut sink);
        let chunks: Vec<Result<Chunk>> = vec![Ok(chunk(0, &[5.0, 4.0, 3.0])), Ok(chunk(3, &[9.0, 8.0, 7.0]))];
        let report = splitter.run(chunks).unwrap();

        assert_eq!(report.segments, 2);
        assert_eq!(rows(&sink.segments[0]), vec![0, 1, 2]);
        assert_eq!(rows(&sink.segments[1]), vec![4, 5]);
    }

    #[test]
    fn repeated_ttf_at_seam_splits_like_inside_a_chunk() {
        let ttf = [3.0, 2.0, 1.0, 1.0, 0.5];
        for policy in [BoundaryRow::Drop, BoundaryRow::StartNext] {
            let mut whole = MemorySink::default();
            StreamingSplitter::new(&mut whole)
                .with_boundary_row(policy)
                .run(vec![Ok::<_, SplitError>(chunk(0, &ttf))])
                .unwrap();

            let mut chunked = MemorySink::default();
            StreamingSplitter::new(&mut chunked)
                .with_boundary_row(policy)
                .run(vec![Ok::<_, SplitError>(chunk(0, &ttf[..3])), Ok(chunk(3, &ttf[3..]))])
                .unwrap();

            let whole_rows: Vec<Vec<u64>> = whole.segments.iter().map(rows).collect();
            let chunked_rows: Vec<Vec<u64>> = chunked.segments.iter().map(rows).collect();
            assert_eq!(whole_rows, chunked_rows);
            assert_eq!(whole_rows[0], vec![0, 1, 2]);
        }
    }

    #[test]
    fn several_resets_in_one_chunk_each_close_a_segment() {
        let mut sink = MemorySink::default();
        let chunks: Vec<Result<Chunk>> = vec![Ok(chunk(0, &[2.0, 1.0, 6.0, 5.0, 4.0, 8.0, 7.0, 3.0, 2.0]))];
        let report = StreamingSplitter::new(&mut sink).run(chunks).unwrap();

        assert_eq!(report.segments, 3);
        assert_eq!(rows(&sink.segments[0]), vec![0, 1]);
        assert_eq!(rows(&sink.segments[1]), vec![3, 4]);
        assert_eq!(rows(&sink.segments[2]), vec![6, 7, 8]);
    }

    #[test]
    fn discard_drops_trailing_rows() {
        let mut sink = MemorySink::default();
        let report = StreamingSplitter::new(&mut sink)
            .with_trailing(TrailingPolicy::Discard)
            .run(vec![Ok::<_, SplitError>(chunk(0, &[2.0, 1.0, 6.0, 5.0, 4.0]))])
            .unwrap();

        assert_eq!(report.segments, 1);
        assert_eq!(report.stats.global.size, 2);
    }

    #[test]
    fn invalid_rows_are_counted_not_fatal() {
        let mut sink = MemorySink::default();
        let mut bad = chunk(0, &[3.0, 2.0, 1.0]);
        bad.records[1] = csv::StringRecord::from(vec!["x", "2.0"]);
        let report = StreamingSplitter::new(&mut sink)
            .run(vec![Ok::<_, SplitError>(bad)])
            .unwrap();

        assert_eq!(report.rows_read, 3);
        assert_eq!(report.rows_dropped, 1);
        assert_eq!(rows(&sink.segments[0]), vec![0, 2]);
    }

    #[test]
    fn cancellation_rolls_back() {
        let mut sink = MemorySink::default();
        let cancel = CancelFlag::new();
        let trigger = cancel.clone();
        let chunks = (0..4u64).map(move |i| {
            if i == 2 {
                trigger.cancel();
            }
            Ok::<_, SplitError>(chunk(i * 3, &[3.0, 2.0, 1.0]))
        });

        let err = StreamingSplitter::new(&mut sink)
            .with_cancel_flag(cancel)
            .run(chunks)
            .unwrap_err();

        assert!(matches!(err, SplitError::Cancelled { segments: 1 }));
        assert!(sink.rolled_back);
        assert!(sink.segments.is_empty());
    }

    #[test]
    fn read_error_mid_stream_rolls_back() {
        let mut sink = MemorySink::default();
        let chunks: Vec<Result<Chunk>> = vec![
            Ok(chunk(0, &[3.0, 2.0, 9.0, 8.0])),
            Err(SplitError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk"))),
        ];
        let err = StreamingSplitter::new(&mut sink).run(chunks).unwrap_err();
        assert!(matches!(err, SplitError::Io(_)));
        assert!(sink.rolled_back);
    }

    #[test]
    fn empty_stream_is_a_schema_error() {
        let mut sink = MemorySink::default();
        let err = StreamingSplitter::new(&mut sink)
            .run(Vec::<Result<Chunk>>::new())
            .unwrap_err();
        assert!(matches!(err, SplitError::Schema(_)));
    }
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SplitError};
use crate::processing::buffer::Segment;

/// Statistics of the acoustic column of one segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentStats {
    pub size: usize,
    pub max: f64,
    pub min: f64,
    pub mean: f64,
    pub stdev: f64,
    /// Seconds of time-to-failure covered (first TTF minus last TTF).
    pub span: f64,
    pub sum_of_squares: f64,
}

impl SegmentStats {
    /// Compute statistics over a segment. Returns `None` for an empty segment.
    pub fn compute(segment: &Segment) -> Option<Self> {
        let samples = &segment.samples;
        let first = samples.first()?;
        let last = samples.last()?;

        let size = samples.len();
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let mut sum_of_squares = 0.0;
        for s in samples {
            let v = s.acoustic_data;
            min = min.min(v);
            max = max.max(v);
            sum += v;
            sum_of_squares += v * v;
        }
        let mean = sum / size as f64;

        let variance = samples
            .iter()
            .map(|s| (s.acoustic_data - mean).powi(2))
            .sum::<f64>()
            / size as f64;

        Some(SegmentStats {
            size,
            max,
            min,
            mean,
            stdev: variance.sqrt(),
            span: first.time_to_failure - last.time_to_failure,
            sum_of_squares,
        })
    }

    /// Rebuild the sum of squares from size, mean and population stdev.
    pub fn implied_sum_of_squares(size: usize, mean: f64, stdev: f64) -> f64 {
        size as f64 * (stdev * stdev + mean * mean)
    }

    /// Format as a one-line report string.
    pub fn report(&self, label: &str) -> String {
        format!(
            "{}: size={} min={:.3} max={:.3} mean={:.3} stdev={:.3} span={:.3}s",
            label, self.size, self.min, self.max, self.mean, self.stdev, self.span
        )
    }
}

/// Per-segment statistics table built while the stream is processed.
#[derive(Debug, Default)]
pub struct StatsAggregator {
    table: BTreeMap<usize, SegmentStats>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute and store the statistics of `segment` under `index`.
    pub fn record_segment(&mut self, segment: &Segment, index: usize) -> Option<&SegmentStats> {
        let stats = SegmentStats::compute(segment)?;
        self.table.insert(index, stats);
        self.table.get(&index)
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Pool the per-segment rows into the global summary.
    ///
    /// Consumes the aggregator: the global row only exists once the stream
    /// is complete.
    pub fn finalize_global(self) -> Result<GlobalStats> {
        let global = pool(&self.table)?;
        Ok(GlobalStats {
            segments: self.table,
            global,
        })
    }
}

/// Final statistics table: one row per segment plus the pooled global row.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalStats {
    pub segments: BTreeMap<usize, SegmentStats>,
    pub global: SegmentStats,
}

fn pool(table: &BTreeMap<usize, SegmentStats>) -> Result<SegmentStats> {
    if table.is_empty() {
        return Err(SplitError::Finalization(
            "no segment was recorded".to_string(),
        ));
    }

    let size: usize = table.values().map(|s| s.size).sum();
    if size == 0 {
        return Err(SplitError::Finalization(
            "recorded segments contain no rows".to_string(),
        ));
    }
    let n = size as f64;

    let max = table.values().map(|s| s.max).fold(f64::NEG_INFINITY, f64::max);
    let min = table.values().map(|s| s.min).fold(f64::INFINITY, f64::min);
    let mean = table.values().map(|s| s.size as f64 * s.mean).sum::<f64>() / n;
    let sum_of_squares: f64 = table.values().map(|s| s.sum_of_squares).sum();
    // Rounding can push E[x^2] - mean^2 slightly below zero.
    let variance = (sum_of_squares / n - mean * mean).max(0.0);
    let span = table.values().map(|s| s.span).sum::<f64>();

    Ok(SegmentStats {
        size,
        max,
        min,
        mean,
        stdev: variance.sqrt(),
        span,
        sum_of_squares,
    })
}

//! Earthquake boundary detection on the time-to-failure column.
//!
//! Within one cycle TTF strictly decreases. The first row whose TTF is not
//! below its predecessor starts a new cycle.

use serde::{Deserialize, Serialize};

use crate::data::sample::RawSample;

/// What happens to the row at which a reset is detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryRow {
    /// Discard the boundary row. Matches the historical output of the splitter.
    #[default]
    Drop,
    /// Keep the boundary row as the first row of the next segment.
    StartNext,
}

impl BoundaryRow {
    pub fn label(&self) -> &'static str {
        match self {
            BoundaryRow::Drop => "drop",
            BoundaryRow::StartNext => "start_next",
        }
    }
}

/// Index of the first row whose TTF does not decrease, if any.
pub fn boundary_index(data: &[RawSample]) -> Option<usize> {
    let mut prev_time = data.first()?.time_to_failure;
    for (i, sample) in data.iter().enumerate().skip(1) {
        let current_time = sample.time_to_failure;
        if current_time >= prev_time {
            tracing::debug!("New earthquake @ row {}", sample.row);
            if prev_time != 0.0 {
                tracing::debug!("Time artifact. Earthquake is {prev_time}");
            }
            return Some(i);
        }
        prev_time = current_time;
    }
    None
}

/// Split `data` at its first boundary.
///
/// Returns the rows before the boundary and, when a boundary exists, the rows
/// after it. Only the first boundary is considered; later ones stay in the
/// `after` part.
pub fn find_boundary(
    data: &[RawSample],
    policy: BoundaryRow,
) -> (&[RawSample], Option<&[RawSample]>) {
    match boundary_index(data) {
        Some(i) => {
            let after = match policy {
                BoundaryRow::Drop => &data[i + 1..],
                BoundaryRow::StartNext => &data[i..],
            };
            (&data[..i], Some(after))
        }
        None => (data, None),
    }
}

/// True when TTF resets exactly at the seam between a buffer and a new chunk.
pub fn is_boundary_between(buffer_tail: &RawSample, chunk_head: &RawSample) -> bool {
    buffer_tail.time_to_failure < chunk_head.time_to_failure
}

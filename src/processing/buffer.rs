use crate::data::sample::RawSample;

/// One closed earthquake cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub index: usize,
    pub samples: Vec<RawSample>,
}

impl Segment {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Original row indices covered by this segment.
    pub fn rows(&self) -> impl Iterator<Item = u64> + '_ {
        self.samples.iter().map(|s| s.row)
    }
}

/// Rows accumulated since the last closed segment.
#[derive(Debug, Default)]
pub struct SegmentBuffer {
    samples: Vec<RawSample>,
}

impl SegmentBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append rows, keeping arrival order.
    pub fn extend(&mut self, rows: &[RawSample]) {
        self.samples.extend_from_slice(rows);
    }

    pub fn last(&self) -> Option<&RawSample> {
        self.samples.last()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Close the buffer as segment `index` and leave it empty.
    /// Returns `None` if nothing was accumulated.
    pub fn take(&mut self, index: usize) -> Option<Segment> {
        if self.samples.is_empty() {
            return None;
        }
        Some(Segment {
            index,
            samples: std::mem::take(&mut self.samples),
        })
    }
}

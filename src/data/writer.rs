use std::path::{Path, PathBuf};

use crate::data::sample::RawSample;
use crate::error::Result;
use crate::processing::buffer::Segment;

/// Extension used for every data file the splitter reads or writes.
pub const EXPECTED_FILE_EXTENSION: &str = "csv";

/// Destination for closed segments.
pub trait SegmentSink {
    /// Persist one segment. Called once per segment, in index order.
    fn write_segment(&mut self, segment: &Segment) -> Result<()>;

    /// Remove everything written so far. Called when the split fails after
    /// some segments were already emitted.
    fn rollback(&mut self) -> Result<()>;
}

impl<S: SegmentSink + ?Sized> SegmentSink for &mut S {
    fn write_segment(&mut self, segment: &Segment) -> Result<()> {
        (**self).write_segment(segment)
    }

    fn rollback(&mut self) -> Result<()> {
        (**self).rollback()
    }
}

/// Writes each segment to `<prefix><index>.csv`.
#[derive(Debug, Clone)]
pub struct CsvSegmentSink {
    prefix: String,
    written: Vec<PathBuf>,
}

impl CsvSegmentSink {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            written: Vec::new(),
        }
    }

    /// File name for a given segment index.
    pub fn segment_path(&self, index: usize) -> PathBuf {
        PathBuf::from(format!("{}{index}.{EXPECTED_FILE_EXTENSION}", self.prefix))
    }

    /// Paths written so far, in segment order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl SegmentSink for CsvSegmentSink {
    fn write_segment(&mut self, segment: &Segment) -> Result<()> {
        let path = self.segment_path(segment.index);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        // Track before writing so a half-written file is also rolled back.
        self.written.push(path.clone());

        let mut writer = csv::Writer::from_path(&path)?;
        for sample in &segment.samples {
            writer.serialize(sample)?;
        }
        writer.flush()?;
        tracing::debug!(
            "Saved segment {} ({} rows) to {:?}",
            segment.index,
            segment.len(),
            path
        );
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        for path in self.written.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => tracing::debug!("Removed {:?}", path),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

/// Read a segment file written by `CsvSegmentSink`.
///
/// `row` is not stored in segment files and comes back as 0.
pub fn read_segment(path: &Path) -> Result<Vec<RawSample>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut samples = Vec::new();
    for record in reader.deserialize::<RawSample>() {
        samples.push(record?);
    }
    Ok(samples)
}

use crate::config::SplitConfig;
use crate::data::loader::ChunkReader;
use crate::data::writer::{CsvSegmentSink, SegmentSink};
use crate::error::Result;
use crate::metadata;
use crate::processing::splitter::{CancelFlag, SplitReport, StreamingSplitter};
use crate::processing::statistics::GlobalStats;

/// Result of `run`.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// Metadata from an earlier run was found and the input was not read.
    Reused(GlobalStats),
    /// The input was split in this run.
    Split(SplitReport),
}

impl RunOutcome {
    pub fn stats(&self) -> &GlobalStats {
        match self {
            RunOutcome::Reused(stats) => stats,
            RunOutcome::Split(report) => &report.stats,
        }
    }
}

/// Split the configured input and persist segment files plus metadata.
///
/// Either every output file is written or none is left behind.
pub fn split_file(config: &SplitConfig, cancel: CancelFlag) -> Result<SplitReport> {
    let reader = ChunkReader::open(&config.input_path, config.chunk_size)?;
    tracing::info!(
        "Splitting {:?} into {}<n>.csv ({} rows per chunk, boundary row: {})",
        reader.path(),
        config.output_prefix,
        config.chunk_size,
        config.boundary_row.label()
    );

    let mut sink = CsvSegmentSink::new(config.output_prefix.clone());
    let report = StreamingSplitter::new(&mut sink)
        .with_boundary_row(config.boundary_row)
        .with_trailing(config.trailing)
        .with_cancel_flag(cancel)
        .run(reader)?;

    if let Err(e) = metadata::write_metadata(&config.metadata_path, &report.stats) {
        tracing::error!("Failed to write metadata, removing segment files: {e}");
        sink.rollback()?;
        return Err(e);
    }
    Ok(report)
}

/// Reuse existing metadata when present, otherwise split the input.
pub fn run(config: &SplitConfig, cancel: CancelFlag) -> Result<RunOutcome> {
    if let Some(stats) = metadata::try_read_metadata(&config.metadata_path)? {
        tracing::info!("Skipping split: {} segment(s) already on record", stats.segments.len());
        return Ok(RunOutcome::Reused(stats));
    }
    split_file(config, cancel).map(RunOutcome::Split)
}

//! Persisted statistics table: one row per segment plus a `global` row.
//!
//! A later run can load this file instead of splitting the input again.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SplitError};
use crate::processing::statistics::{GlobalStats, SegmentStats};

/// Label of the pooled row in the metadata file.
pub const GLOBAL_ROW: &str = "global";

#[derive(Debug, Serialize, Deserialize)]
struct MetadataRow {
    segment: String,
    size: usize,
    max: f64,
    min: f64,
    mean: f64,
    stdev: f64,
    span: f64,
}

impl MetadataRow {
    fn new(segment: String, stats: &SegmentStats) -> Self {
        Self {
            segment,
            size: stats.size,
            max: stats.max,
            min: stats.min,
            mean: stats.mean,
            stdev: stats.stdev,
            span: stats.span,
        }
    }

    fn into_stats(self) -> SegmentStats {
        SegmentStats {
            size: self.size,
            max: self.max,
            min: self.min,
            mean: self.mean,
            stdev: self.stdev,
            span: self.span,
            sum_of_squares: SegmentStats::implied_sum_of_squares(self.size, self.mean, self.stdev),
        }
    }
}

/// Write the statistics table to `path`.
///
/// The table is written to a sibling `.tmp` file and renamed into place, so
/// `path` only ever holds a complete table. The temporary file is removed on
/// failure.
pub fn write_metadata(path: &Path, stats: &GlobalStats) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("csv.tmp");

    let written = write_table(&tmp_path, stats)
        .and_then(|()| std::fs::rename(&tmp_path, path).map_err(SplitError::from));
    if let Err(e) = written {
        match std::fs::remove_file(&tmp_path) {
            Ok(()) => tracing::debug!("Removed {:?}", tmp_path),
            Err(rm) if rm.kind() == std::io::ErrorKind::NotFound => {}
            Err(rm) => tracing::warn!("Failed to remove {:?}: {rm}", tmp_path),
        }
        return Err(e);
    }
    tracing::info!("Wrote metadata for {} segment(s) to {:?}", stats.segments.len(), path);
    Ok(())
}

fn write_table(path: &Path, stats: &GlobalStats) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for (index, segment) in &stats.segments {
        writer.serialize(MetadataRow::new(index.to_string(), segment))?;
    }
    writer.serialize(MetadataRow::new(GLOBAL_ROW.to_string(), &stats.global))?;
    writer.flush()?;
    Ok(())
}

/// Load a statistics table written by `write_metadata`.
///
/// The `global` row is taken from the file as-is; a file without one is
/// treated as corrupted.
pub fn read_metadata(path: &Path) -> Result<GlobalStats> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut segments = BTreeMap::new();
    let mut global = None;

    for row in reader.deserialize::<MetadataRow>() {
        let row = row?;
        if row.segment == GLOBAL_ROW {
            global = Some(row.into_stats());
            continue;
        }
        let index: usize = row.segment.parse().map_err(|_| {
            SplitError::CorruptedMetadata(format!("unexpected segment label {:?}", row.segment))
        })?;
        if segments.insert(index, row.into_stats()).is_some() {
            return Err(SplitError::CorruptedMetadata(format!("duplicate segment {index}")));
        }
    }

    let global = global.ok_or_else(|| {
        SplitError::CorruptedMetadata(format!("missing {GLOBAL_ROW:?} row"))
    })?;
    Ok(GlobalStats { segments, global })
}

/// Load metadata if `path` exists, otherwise `None`.
pub fn try_read_metadata(path: &Path) -> Result<Option<GlobalStats>> {
    if !path.is_file() {
        tracing::info!("No metadata found. The earthquake splitting might have not been ran yet.");
        return Ok(None);
    }
    tracing::info!("Found metadata file {:?}", path);
    read_metadata(path).map(Some)
}

use std::fs::File;
use std::path::{Path, PathBuf};

use csv::{Reader, StringRecord};

use crate::data::sample::Chunk;
use crate::error::{Result, SplitError};

/// Lazy, single-pass reader yielding fixed-size chunks of a delimited file.
///
/// Each call to `next` reads at most `chunk_size` data rows. Rows that the
/// CSV layer cannot decode are kept as empty records so that row indices stay
/// aligned with the file and `Chunk::clean` counts them as dropped.
pub struct ChunkReader {
    path: PathBuf,
    reader: Reader<File>,
    columns: Vec<String>,
    chunk_size: usize,
    next_row: u64,
    finished: bool,
}

impl ChunkReader {
    /// Open a CSV file with a header row.
    pub fn open(path: &Path, chunk_size: usize) -> Result<Self> {
        if !path.is_file() {
            tracing::warn!("File {:?} not found", path);
            return Err(SplitError::FileNotFound(path.to_path_buf()));
        }
        if chunk_size == 0 {
            return Err(SplitError::InvalidConfig("chunk_size must be positive".to_string()));
        }

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b',')
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_path(path)?;

        let columns: Vec<String> = reader.headers()?.iter().map(|s| s.to_string()).collect();
        tracing::debug!("Opened {:?} with columns {:?}", path, columns);

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            columns,
            chunk_size,
            next_row: 0,
            finished: false,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of data rows handed out so far.
    pub fn rows_read(&self) -> u64 {
        self.next_row
    }

    fn read_chunk(&mut self) -> Result<Option<Chunk>> {
        let first_row = self.next_row;
        let mut records = Vec::with_capacity(self.chunk_size.min(64 * 1024));
        let mut record = StringRecord::new();

        while records.len() < self.chunk_size {
            match self.reader.read_record(&mut record) {
                Ok(true) => records.push(record.clone()),
                Ok(false) => {
                    self.finished = true;
                    break;
                }
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => {
                    tracing::debug!("Undecodable row {}: {e}", self.next_row + records.len() as u64);
                    records.push(StringRecord::new());
                }
            }
        }

        if records.is_empty() {
            return Ok(None);
        }
        self.next_row += records.len() as u64;
        Ok(Some(Chunk::new(self.columns.clone(), first_row, records)))
    }
}

impl Iterator for ChunkReader {
    type Item = Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_chunk() {
            Ok(Some(chunk)) => Some(Ok(chunk)),
            Ok(None) => None,
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

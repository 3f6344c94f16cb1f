use csv::StringRecord;
use serde::{Deserialize, Serialize};

/// Column names expected in the raw input and written to every segment file.
pub const COLUMN_NAMES: [&str; 2] = ["acoustic_data", "time_to_failure"];

/// Position of each column in a raw record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Acoustic = 0,
    Ttf = 1,
}

/// One acoustic reading paired with its time-to-failure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    pub acoustic_data: f64,
    pub time_to_failure: f64,
    /// 0-based data row in the original input. Not persisted in segment files.
    #[serde(skip)]
    pub row: u64,
}

impl RawSample {
    pub fn new(acoustic_data: f64, time_to_failure: f64, row: u64) -> Self {
        Self {
            acoustic_data,
            time_to_failure,
            row,
        }
    }

    /// Parse a raw record. Returns `None` when the record does not have
    /// exactly one field per column or a field is not a finite number.
    pub fn from_record(record: &StringRecord, row: u64) -> Option<Self> {
        if record.len() != COLUMN_NAMES.len() {
            return None;
        }
        let acoustic = parse_field(record.get(Column::Acoustic as usize)?)?;
        let ttf = parse_field(record.get(Column::Ttf as usize)?)?;
        Some(Self::new(acoustic, ttf, row))
    }
}

fn parse_field(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// A bounded slice of input rows, still in their textual form.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub columns: Vec<String>,
    /// Original data-row index of `records[0]`.
    pub first_row: u64,
    pub records: Vec<StringRecord>,
}

impl Chunk {
    pub fn new(columns: Vec<String>, first_row: u64, records: Vec<StringRecord>) -> Self {
        Self {
            columns,
            first_row,
            records,
        }
    }

    /// Build a chunk with the standard column names from in-memory
    /// `(acoustic_data, time_to_failure)` pairs.
    pub fn from_samples(first_row: u64, samples: &[(f64, f64)]) -> Self {
        let columns = COLUMN_NAMES.iter().map(|s| s.to_string()).collect();
        let records = samples
            .iter()
            .map(|(a, t)| StringRecord::from(vec![a.to_string(), t.to_string()]))
            .collect();
        Self::new(columns, first_row, records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Convert the records into samples, dropping rows with a wrong field
    /// count or non-numeric values. Returns the samples and the number of dropped rows.
    pub fn clean(&self) -> (Vec<RawSample>, usize) {
        let mut samples = Vec::with_capacity(self.records.len());
        let mut dropped = 0usize;
        for (offset, record) in self.records.iter().enumerate() {
            let row = self.first_row + offset as u64;
            match RawSample::from_record(record, row) {
                Some(sample) => samples.push(sample),
                None => {
                    dropped += 1;
                    tracing::debug!("Dropping invalid row {row}: {:?}", record);
                }
            }
        }
        (samples, dropped)
    }
}

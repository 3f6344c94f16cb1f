use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::writer::EXPECTED_FILE_EXTENSION;
use crate::error::{Result, SplitError};
use crate::processing::boundary::BoundaryRow;
use crate::processing::splitter::TrailingPolicy;

/// Config file looked up in the working directory by the binary.
pub const DEFAULT_CONFIG_FILE: &str = "quakesplit.json";

pub const DEFAULT_CHUNK_SIZE: usize = 1_000_000;
pub const DEFAULT_INPUT_PATH: &str = "Data/train.csv";
pub const DEFAULT_OUTPUT_PREFIX: &str = "Data/train_eq";
pub const DEFAULT_METADATA_PATH: &str = "Data/eq_meta_data.csv";

/// Settings for one split run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SplitConfig {
    /// Rows per read.
    pub chunk_size: usize,
    pub input_path: PathBuf,
    /// Segment files are written to `<output_prefix><index>.csv`.
    pub output_prefix: String,
    pub metadata_path: PathBuf,
    pub boundary_row: BoundaryRow,
    pub trailing: TrailingPolicy,
    /// Replace paths with a wrong extension by their defaults instead of
    /// failing validation.
    pub fallback_to_defaults: bool,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            input_path: PathBuf::from(DEFAULT_INPUT_PATH),
            output_prefix: DEFAULT_OUTPUT_PREFIX.to_string(),
            metadata_path: PathBuf::from(DEFAULT_METADATA_PATH),
            boundary_row: BoundaryRow::default(),
            trailing: TrailingPolicy::default(),
            fallback_to_defaults: false,
        }
    }
}

impl SplitConfig {
    /// Read a JSON config file and validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: SplitConfig = serde_json::from_str(&json)?;
        tracing::info!("Configuration loaded from {:?}", path);
        config.validate()
    }

    /// Like `load`, but falls back to the validated defaults when `path`
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.is_file() {
            Self::load(path)
        } else {
            tracing::info!("No config file at {:?}, using defaults", path);
            Self::default().validate()
        }
    }

    /// Check the settings and return the config that will be used.
    pub fn validate(mut self) -> Result<Self> {
        if self.chunk_size == 0 {
            return Err(SplitError::InvalidConfig("chunk_size must be positive".to_string()));
        }
        if self.output_prefix.trim().is_empty() {
            return Err(SplitError::InvalidConfig("output_prefix is empty".to_string()));
        }

        let fallback = self.fallback_to_defaults;
        self.input_path = checked_path(self.input_path, DEFAULT_INPUT_PATH, fallback)?;
        self.metadata_path = checked_path(self.metadata_path, DEFAULT_METADATA_PATH, fallback)?;
        Ok(self)
    }
}

/// True if `path` carries the data-file extension.
pub fn extension_is_correct(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(EXPECTED_FILE_EXTENSION))
}

fn checked_path(path: PathBuf, default: &str, fallback: bool) -> Result<PathBuf> {
    if extension_is_correct(&path) {
        return Ok(path);
    }
    if fallback {
        tracing::warn!("Unexpected file extension for {:?}. Registering default {default}", path);
        return Ok(PathBuf::from(default));
    }
    Err(SplitError::InvalidExtension {
        path,
        expected: EXPECTED_FILE_EXTENSION.to_string(),
    })
}

//! Splits a seismic acoustic time series into one file per earthquake cycle
//! and keeps per-cycle and pooled statistics, reading the input once in
//! bounded chunks.

pub mod config;
pub mod data;
pub mod error;
pub mod metadata;
pub mod pipeline;
pub mod processing;

pub use config::SplitConfig;
pub use error::{Result, SplitError};
pub use processing::splitter::{CancelFlag, SplitReport, StreamingSplitter};

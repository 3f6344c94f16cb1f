use crate::data::sample::{Chunk, COLUMN_NAMES};

/// Checks that a chunk has the two-column layout the splitter expects.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    expected: Vec<String>,
}

impl SchemaValidator {
    pub fn new(expected: &[&str]) -> Self {
        Self {
            expected: expected.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Validate shape and column names, stopping at the first failed check.
    pub fn validate(&self, chunk: &Chunk) -> bool {
        if chunk.is_empty() {
            tracing::warn!("Data chunk is empty. Check the input file content.");
            return false;
        }

        if chunk.columns.len() != self.expected.len() {
            tracing::warn!(
                "Number of columns is incorrect. Is {} Expected {}",
                chunk.columns.len(),
                self.expected.len()
            );
            return false;
        }

        for (found, expected) in chunk.columns.iter().zip(self.expected.iter()) {
            if found.trim() != expected {
                tracing::warn!("Unexpected column name: {found:?} Expected: {expected:?}");
                return false;
            }
        }

        tracing::debug!("Correct data format.");
        true
    }

    /// Human-readable description of what `validate` expects.
    pub fn describe(&self) -> String {
        format!("{} columns named {:?}", self.expected.len(), self.expected)
    }
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self::new(&COLUMN_NAMES)
    }
}

use std::path::PathBuf;

use thiserror::Error;

/// Canonical error type for the parse → aggregate → validate pipeline.
///
/// Every variant is fatal to the current run. SLA breaches are not errors;
/// they are reported through [`crate::Verdict`].
#[derive(Debug, Error)]
pub enum CoreError {
    /// The results artifact produced by the traffic generator does not exist.
    #[error("results artifact `{}` was not found", path.display())]
    ArtifactNotFound {
        /// Path that was probed.
        path: PathBuf,
    },

    /// A row (or the header, row 0) of the results artifact is unusable.
    #[error("malformed record at row {row} ({name}): {reason}")]
    MalformedRecord {
        /// 1-based data row number; 0 refers to the header.
        row: usize,
        /// Endpoint name of the row, when it could be read.
        name: String,
        /// Human-readable description of the defect.
        reason: String,
    },

    /// The threshold source does not exist.
    #[error("threshold source `{}` was not found", path.display())]
    ThresholdSourceNotFound {
        /// Path that was probed.
        path: PathBuf,
    },

    /// A threshold entry (or the whole document) is unusable.
    #[error("malformed threshold `{entry}`: {reason}")]
    MalformedThreshold {
        /// Endpoint name of the entry, or `<document>` for document-level defects.
        entry: String,
        /// Human-readable description of the defect.
        reason: String,
    },

    /// I/O error while reading an existing input file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV framing error in the results artifact.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl CoreError {
    /// Creates a `MalformedRecord` variant.
    #[must_use]
    pub fn malformed_record(
        row: usize,
        name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedRecord {
            row,
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `MalformedThreshold` variant.
    #[must_use]
    pub fn malformed_threshold(entry: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedThreshold {
            entry: entry.into(),
            reason: reason.into(),
        }
    }
}

/// Convenient result alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

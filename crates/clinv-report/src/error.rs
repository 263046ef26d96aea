//! Error types for clinv-report

use std::path::PathBuf;

use clinv_inventory::InventoryError;
use thiserror::Error;

/// Errors that can occur while building or writing a report
#[derive(Error, Debug)]
pub enum ReportError {
    /// The inventory refused the query
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    /// An export file could not be written
    #[error("failed to write {path}: {message}")]
    Write {
        /// Destination path
        path: PathBuf,
        /// Underlying error
        message: String,
    },
}

impl ReportError {
    /// Check if the error comes from an invalid search pattern
    #[must_use]
    pub fn is_invalid_pattern(&self) -> bool {
        matches!(self, ReportError::Inventory(InventoryError::InvalidPattern(_)))
    }

    pub(crate) fn write(path: impl Into<PathBuf>, error: impl std::fmt::Display) -> Self {
        ReportError::Write {
            path: path.into(),
            message: error.to_string(),
        }
    }
}

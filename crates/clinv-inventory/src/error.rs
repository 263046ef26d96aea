//! Error types for clinv-inventory

use std::fmt;

use thiserror::Error;

use crate::kind::Kind;

/// Errors that can occur while loading, querying or persisting the inventory
#[derive(Error, Debug, Clone)]
pub enum InventoryError {
    /// The search expression is not a valid regular expression
    #[error("invalid search pattern: {0}")]
    InvalidPattern(String),

    /// A record is missing a required field or carries an unusable value
    #[error("data integrity error in {kind} {id}: {message}")]
    DataIntegrity {
        /// Kind whose load was aborted
        kind: Kind,
        /// Offending resource id
        id: String,
        /// What is wrong with the record
        message: String,
    },

    /// The kind name is not known to the registry
    #[error("unknown resource kind: {0}")]
    UnknownKind(String),

    /// The requested entity does not exist
    #[error("{kind} {id} not found")]
    NotFound {
        /// Kind that was searched
        kind: Kind,
        /// Missing id
        id: String,
    },

    /// Reading or writing the data files failed
    #[error("storage error: {0}")]
    Storage(String),
}

impl InventoryError {
    /// Check if the error makes the process exit with a failure status
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            InventoryError::InvalidPattern(_)
                | InventoryError::DataIntegrity { .. }
                | InventoryError::Storage(_)
        )
    }

    /// Check if the error was raised by a record with missing or broken data
    #[must_use]
    pub fn is_data_integrity(&self) -> bool {
        matches!(self, InventoryError::DataIntegrity { .. })
    }
}

/// A cross-reference that points to an entity that does not exist
///
/// Dangling references are reported but never fatal: the reference is
/// ignored by every computation over the graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReferenceWarning {
    /// Kind of the entity holding the reference
    pub from_kind: Kind,
    /// Id of the entity holding the reference
    pub from_id: String,
    /// Kind the reference should resolve to
    pub to_kind: Kind,
    /// Id that could not be resolved
    pub to_id: String,
}

impl fmt::Display for ReferenceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} references missing {} {}",
            self.from_kind, self.from_id, self.to_kind, self.to_id
        )
    }
}

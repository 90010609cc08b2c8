//! Error types for the data-access layer.

use thiserror::Error;

/// Errors surfaced by storage and query execution.
///
/// "Zero rows found" and "zero rows affected" are never errors; they are
/// represented as `None`, empty vectors, or [`BulkOutcome`] values so a
/// failed write is always distinguishable from an empty result.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

/// Result type alias using StoreError.
pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of a bulk write operation.
///
/// The mapper refuses to run a bulk UPDATE or DELETE whose compiled WHERE
/// clause would be empty, since that would touch every row in the table.
/// The refusal is reported explicitly instead of being silently absorbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkOutcome {
    /// The statement ran; this many rows were affected.
    Affected(u64),

    /// Refused: no usable WHERE condition was compiled from the arguments.
    NoConditions,

    /// Refused: no schema-known column assignments were supplied.
    NoAssignments,
}

impl BulkOutcome {
    /// Number of rows affected, zero for refused operations.
    pub fn rows_affected(&self) -> u64 {
        match self {
            BulkOutcome::Affected(n) => *n,
            _ => 0,
        }
    }

    /// Whether the statement actually executed.
    pub fn executed(&self) -> bool {
        matches!(self, BulkOutcome::Affected(_))
    }
}

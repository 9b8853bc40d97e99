//! Error types for the editing core

use pagecraft_model::{EntityId, EntityKind, ValidationIssue};
use thiserror::Error;

use crate::operations::OperationError;
use crate::persistence::PersistenceError;

#[derive(Error, Debug)]
pub enum EditorError {
    /// An operation addressed an entity the store does not hold. This is a
    /// stale reference between panels and is never silently ignored.
    #[error("unknown entity: {kind} {id}")]
    UnknownEntity { kind: EntityKind, id: EntityId },

    #[error("operation error: {0}")]
    Operation(#[from] OperationError),

    #[error("validation failed: {}", issue_summary(.0))]
    Validation(Vec<ValidationIssue>),

    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("unknown or already-consumed confirmation token")]
    UnknownToken,

    /// The session was torn down with `close`; no further operations are
    /// accepted on it.
    #[error("session is closed")]
    SessionClosed,
}

fn issue_summary(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

//! Domain error taxonomy shared by the desk components.

use crate::storage::StorageError;
use thiserror::Error;

/// Errors surfaced by FAQ, request, registry and routing operations
#[derive(Error, Debug)]
pub enum DeskError {
    /// Storage could not be reached or the query failed
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[from] StorageError),
    /// Referenced request does not exist
    #[error("request #{0} not found")]
    NotFound(i64),
    /// The caller is not allowed to perform this action
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// The request already carries an answer
    #[error("request #{0} is already resolved")]
    AlreadyResolved(i64),
    /// A request-id token could not be parsed
    #[error("malformed input: {0}")]
    MalformedInput(String),
}

impl DeskError {
    /// Whether the failure comes from the persistence layer
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_))
    }
}

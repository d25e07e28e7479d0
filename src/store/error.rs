//! Error types for store operations

use std::fmt;

use uuid::Uuid;

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations
#[derive(Debug)]
pub enum StoreError {
    /// The referenced alert does not exist
    NotFound(Uuid),

    /// Backend-specific write or query failure
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound(id) => write!(f, "alert {} not found", id),
            StoreError::Backend(msg) => write!(f, "store backend error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl StoreError {
    /// Whether this error should surface to the caller as a 4xx-equivalent
    /// rather than being treated as a backend fault.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

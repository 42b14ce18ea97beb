//! Pure functions for mapping repository errors to HTTP status codes.

use super::{PaginationError, RepositoryError};

/// Maps a [`RepositoryError`] to an HTTP status code.
///
/// - `NotFound` -> 404 (Not Found)
/// - `Conflict` -> 409 (Conflict)
/// - `ConnectionFailed` -> 503 (Service Unavailable)
/// - `QueryFailed` -> 500 (Internal Server Error)
/// - `Serialization` -> 500 (Internal Server Error)
/// - `InvalidData` -> 400 (Bad Request)
/// - `Timeout` -> 504 (Gateway Timeout)
/// - `Cancelled` -> 503 (Service Unavailable)
///
/// # Examples
///
/// ```
/// use coderoot_core::storage::{RepositoryError, repository_error_to_status_code};
///
/// let error = RepositoryError::NotFound {
///     entity_type: "User",
///     id: "42".to_string(),
/// };
/// assert_eq!(repository_error_to_status_code(&error), 404);
/// ```
pub fn repository_error_to_status_code(error: &RepositoryError) -> u16 {
    match error {
        RepositoryError::NotFound { .. } => 404,
        RepositoryError::Conflict { .. } => 409,
        RepositoryError::ConnectionFailed(_) => 503,
        RepositoryError::QueryFailed(_) => 500,
        RepositoryError::Serialization(_) => 500,
        RepositoryError::InvalidData(_) => 400,
        RepositoryError::Timeout(_) => 504,
        RepositoryError::Cancelled => 503,
    }
}

/// Maps a [`PaginationError`] to an HTTP status code. Always 400.
pub fn pagination_error_to_status_code(_error: &PaginationError) -> u16 {
    400
}

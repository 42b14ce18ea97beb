use thiserror::Error;

/// Errors that can occur when validating user input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UserError {
    #[error("User ID must be positive, got {0}")]
    InvalidUserId(i64),
    #[error("First name cannot be empty")]
    EmptyFirstName,
    #[error("Language code must be 2 to 10 characters: {0:?}")]
    InvalidLanguage(String),
    #[error("Update must set at least one field")]
    EmptyUpdate,
}

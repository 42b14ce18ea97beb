use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use coderoot_core::storage::{
    pagination_error_to_status_code, repository_error_to_status_code, PaginationError,
    RepositoryError,
};
use coderoot_core::user::UserError;

/// Handler error carrying any failure; domain errors pick their own status.
pub struct AppError(pub anyhow::Error);

impl AppError {
    fn status_code(&self) -> StatusCode {
        let code = if let Some(repo_error) = self.0.downcast_ref::<RepositoryError>() {
            repository_error_to_status_code(repo_error)
        } else if let Some(page_error) = self.0.downcast_ref::<PaginationError>() {
            pagination_error_to_status_code(page_error)
        } else if self.0.downcast_ref::<UserError>().is_some() {
            400
        } else {
            500
        };
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();

        if status_code.is_server_error() {
            tracing::error!(status = %status_code, error = %self.0, "Request failed");
        } else {
            tracing::debug!(status = %status_code, error = %self.0, "Request rejected");
        }

        (status_code, self.0.to_string()).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use crate::utils::response::error as error_response;

/// Request-scoped error taxonomy. Nothing here is fatal to the process;
/// every variant maps to a stable code plus a human-readable reason.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Eligibility error: {0}")]
    Eligibility(String),

    #[error("Inventory error: {0}")]
    Inventory(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Redemption error: {0}")]
    Redemption(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Database error")]
    Database(#[from] sqlx::Error),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Eligibility(_) | AppError::Redemption(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Inventory(_) | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ExternalService(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Eligibility(_) => "ELIGIBILITY_ERROR",
            AppError::Inventory(_) => "INVENTORY_ERROR",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Redemption(_) => "REDEMPTION_ERROR",
            AppError::Auth(_) => "AUTH_ERROR",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
            AppError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    fn log(&self) {
        match self {
            AppError::Database(e) => {
                error!(error = ?e, "Database error");
            }
            other => {
                error!(error = ?other, code = other.code(), "Application error");
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log internal details
        self.log();

        // Only expose the high-level message to the client
        let public_message = match &self {
            AppError::Database(_) => "A database error occurred".to_string(),
            AppError::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        error_response(code, public_message, None, status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_class_maps_to_409() {
        assert_eq!(
            AppError::Inventory("Sold out for 2025-06-01".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Conflict("Booking not pending".into()).status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn internal_detail_is_not_exposed() {
        let err = AppError::Internal("connection pool exhausted".into());
        assert_eq!(err.code(), "INTERNAL_SERVER_ERROR");
        // The public message must not carry the internal string.
        let public = "An internal error occurred";
        assert_ne!(public, err.to_string());
    }
}

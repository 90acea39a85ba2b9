use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Authorization error: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Insufficient stock for product: {0}")]
    InsufficientStock(String),

    #[error("Total price mismatch")]
    TotalMismatch,

    #[error("Invalid status transition: {0}")]
    InvalidTransition(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Password hash error: {0}")]
    PasswordHash(#[from] argon2::password_hash::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Business-rule rejections are expected; everything else indicates a
    /// failure of the service itself and is logged at error level.
    fn status_and_message(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Auth(_) => (StatusCode::UNAUTHORIZED, "Authentication error"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "Authorization error"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "Resource not found"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "Validation error"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "Bad request"),
            AppError::InsufficientStock(_) => (StatusCode::BAD_REQUEST, "Insufficient stock"),
            AppError::TotalMismatch => (StatusCode::BAD_REQUEST, "Total price mismatch"),
            AppError::InvalidTransition(_) => (StatusCode::BAD_REQUEST, "Invalid status transition"),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Database error"),
            AppError::Migrate(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Database error"),
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Configuration error"),
            AppError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO error"),
            AppError::PasswordHash(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = self.status_and_message();

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(json!({
            "error": {
                "message": error_message,
                "details": self.to_string()
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_rejections_map_to_4xx() {
        assert_eq!(
            AppError::NotFound("order".into()).status_and_message().0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Forbidden("not yours".into()).status_and_message().0,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::InsufficientStock("Widget".into()).status_and_message().0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::TotalMismatch.status_and_message().0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::InvalidTransition("delivered".into()).status_and_message().0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Auth("missing token".into()).status_and_message().0,
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn infrastructure_failures_map_to_500() {
        assert_eq!(
            AppError::Internal("boom".into()).status_and_message().0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Database(sqlx::Error::PoolClosed).status_and_message().0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn insufficient_stock_names_the_product() {
        let err = AppError::InsufficientStock("Mechanical Keyboard".into());
        assert!(err.to_string().contains("Mechanical Keyboard"));
    }
}

//! Error types for the catalog server

use axum::{
    http::{header::LOCATION, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Stable numeric codes carried in error bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NoSuchRecord = 4,
    LoginRequired = 5,
    Duplicate = 6,
    BadValue = 7,
    HasDependents = 8,
    NotOnLoan = 9,
    SessionFailure = 10,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Caller has no valid session; carries the redirect target
    #[error("Login required, redirecting to {0}")]
    LoginRequired(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Deletion refused because other records still reference the target
    #[error("Record in use: {0}")]
    HasDependents(String),

    #[error("Business rule violation: {0}")]
    BusinessRule(String),

    #[error("Session store error: {0}")]
    Session(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, ErrorCode) {
        match self {
            AppError::LoginRequired(_) => (StatusCode::FOUND, ErrorCode::LoginRequired),
            AppError::Authentication(_) => (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized),
            AppError::Authorization(_) => (StatusCode::FORBIDDEN, ErrorCode::NotAuthorized),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchRecord),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, ErrorCode::BadValue),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::DbFailure),
            AppError::HasDependents(_) => (StatusCode::CONFLICT, ErrorCode::HasDependents),
            AppError::Conflict(_) => (StatusCode::CONFLICT, ErrorCode::Duplicate),
            AppError::BusinessRule(_) => (StatusCode::UNPROCESSABLE_ENTITY, ErrorCode::NotOnLoan),
            AppError::Session(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::SessionFailure),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::Failure),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match self {
            AppError::LoginRequired(location) => {
                return (status, [(LOCATION, location)]).into_response();
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "Database error".to_string()
            }
            AppError::Session(msg) => {
                tracing::error!("Session store error: {}", msg);
                "Session store error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            AppError::Authentication(msg)
            | AppError::Authorization(msg)
            | AppError::NotFound(msg)
            | AppError::Validation(msg)
            | AppError::Conflict(msg)
            | AppError::HasDependents(msg)
            | AppError::BusinessRule(msg) => msg,
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_required_is_a_redirect() {
        let response = AppError::LoginRequired("/accounts/login/?next=/catalog/".to_string())
            .into_response();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(LOCATION).unwrap(),
            "/accounts/login/?next=/catalog/"
        );
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::Authorization("x".into()), StatusCode::FORBIDDEN),
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::Conflict("x".into()), StatusCode::CONFLICT),
            (AppError::BusinessRule("x".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (AppError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[test]
    fn test_dependents_conflict_code() {
        let error = AppError::HasDependents("Author 3 still has 2 book(s)".into());
        assert_eq!(error.status_and_code().1, ErrorCode::HasDependents);
    }
}

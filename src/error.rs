use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::repository::RepositoryError;

/// Errors a handler answers with; every variant renders as `{ "error": "<message>" }`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// Converts repository failures into responses, naming the operation that failed.
pub trait ResultExt<T> {
    fn context(self, message: &str) -> Result<T, AppError>;
}

impl<T> ResultExt<T> for Result<T, RepositoryError> {
    fn context(self, message: &str) -> Result<T, AppError> {
        self.map_err(|err| match err {
            RepositoryError::Conflict(constraint) => {
                log::warn!("{}: unique constraint {} violated", message, constraint);
                AppError::BadRequest(conflict_message(&constraint).to_string())
            }
            RepositoryError::Constraint(constraint) => {
                log::warn!("{}: constraint {} violated", message, constraint);
                AppError::BadRequest(
                    "Referenced record does not exist or is still in use".to_string(),
                )
            }
            RepositoryError::Database(err) => {
                log::error!("{}: {}", message, err);
                AppError::Internal(message.to_string())
            }
        })
    }
}

fn conflict_message(constraint: &str) -> &'static str {
    match constraint {
        "stores_name_key" => "Store name already exists",
        "users_email_key" => "User already exists",
        _ => "Record already exists",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_variants() {
        assert_eq!(AppError::bad_request("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::unauthorized("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::forbidden("x").status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Internal("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn conflicts_become_bad_requests() {
        let result: Result<(), RepositoryError> =
            Err(RepositoryError::Conflict("stores_name_key".into()));
        match result.context("Failed to create store") {
            Err(AppError::BadRequest(message)) => assert_eq!(message, "Store name already exists"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn database_failures_hide_details() {
        let result: Result<(), RepositoryError> =
            Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        match result.context("Failed to fetch stores") {
            Err(AppError::Internal(message)) => assert_eq!(message, "Failed to fetch stores"),
            other => panic!("unexpected {:?}", other),
        }
    }
}

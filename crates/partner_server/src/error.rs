//! HTTP error mapping.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::error;
use partner_core::db::DbError;
use partner_core::{ServiceError, ServiceErrorKind};
use partner_form::FormError;
use serde::Serialize;
use thiserror::Error;

const INTERNAL_MESSAGE: &str = "Internal server error";

/// Error returned by route handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Form(#[from] FormError),

    #[error("{0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Service(err) => match err.kind() {
                ServiceErrorKind::NotFound => StatusCode::NOT_FOUND,
                ServiceErrorKind::Validation => StatusCode::BAD_REQUEST,
                ServiceErrorKind::Conflict => StatusCode::CONFLICT,
                ServiceErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Form(FormError::ScreenOutOfRange { .. } | FormError::AlreadyCompleted) => {
                StatusCode::BAD_REQUEST
            }
            Self::Form(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("event=http_error module=server status=error error={self}");
            INTERNAL_MESSAGE.to_string()
        } else {
            self.to_string()
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Startup failures of the binary.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("database error: {0}")]
    Db(#[from] DbError),

    #[error("service error: {0}")]
    Service(#[from] ServiceError),

    #[error("renderer setup failed: {0}")]
    Form(#[from] FormError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid seed document: {0}")]
    Seed(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::ApiError;
    use axum::http::StatusCode;
    use partner_core::ServiceError;
    use uuid::Uuid;

    #[test]
    fn service_errors_map_by_kind() {
        let not_found = ApiError::from(ServiceError::ScreenNotFound(Uuid::nil()));
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        let invalid = ApiError::from(ServiceError::MissingConfigId);
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::Internal("boom".to_string()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

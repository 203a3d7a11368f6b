//! Application error taxonomy and HTTP mapping.
//!
//! Handlers return `Result<_, AppError>`. The `IntoResponse` impl maps each
//! kind to its status code and a JSON body of `{error, code, requestId}`
//! (plus field-keyed `details` for validation failures). Internal detail is
//! logged server-side under the same request id, never sent to the client.

use std::collections::HashMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{message}")]
    ValidationDetails {
        message: String,
        details: HashMap<String, String>,
    },

    #[error("Authentication required")]
    Auth,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Permission denied: {0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unprocessable(String),

    #[error("Rate limit exceeded")]
    RateLimited { retry_after_seconds: u64 },

    #[error("Upstream service unavailable: {0}")]
    ExternalUnavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn validation_field(field: &str, problem: &str) -> Self {
        Self::ValidationDetails {
            message: "Validation failed".to_string(),
            details: HashMap::from([(field.to_string(), problem.to_string())]),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::ValidationDetails { .. } => StatusCode::BAD_REQUEST,
            Self::Auth | Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::ExternalUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) | Self::ValidationDetails { .. } => "validation_error",
            Self::Auth => "auth_required",
            Self::InvalidToken => "invalid_token",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Unprocessable(_) => "unprocessable",
            Self::RateLimited { .. } => "rate_limited",
            Self::ExternalUnavailable(_) => "external_unavailable",
            Self::Database(_) | Self::Internal(_) => "internal_error",
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: String,
    code: &'static str,
    request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after_seconds: Option<u64>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let request_id = uuid::Uuid::new_v4().simple().to_string()[..8].to_string();
        let status = self.status();

        // Provider and database detail stays in the server log.
        let message = match &self {
            Self::Database(e) => {
                tracing::error!(request_id = %request_id, error = %e, "database error");
                "Internal server error".to_string()
            }
            Self::Internal(e) => {
                tracing::error!(request_id = %request_id, error = %e, "internal error");
                "Internal server error".to_string()
            }
            Self::ExternalUnavailable(provider) => {
                tracing::warn!(request_id = %request_id, provider = %provider, "upstream unavailable");
                "Upstream service unavailable".to_string()
            }
            other => other.to_string(),
        };

        let details = match &self {
            Self::ValidationDetails { details, .. } => Some(details.clone()),
            _ => None,
        };
        let retry_after_seconds = match &self {
            Self::RateLimited {
                retry_after_seconds,
            } => Some(*retry_after_seconds),
            _ => None,
        };

        let body = ErrorBody {
            error: message,
            code: self.code(),
            request_id,
            details,
            retry_after_seconds,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::validation("bad").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::Auth.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::NotFound("Job").status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::conflict("illegal transition").status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::RateLimited {
                retry_after_seconds: 30
            }
            .status(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn test_not_found_message_names_entity() {
        assert_eq!(AppError::NotFound("Job").to_string(), "Job not found");
    }
}

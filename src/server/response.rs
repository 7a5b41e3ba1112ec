//! Response envelope and HTTP error mapping

use crate::core::error::StoreError;
use crate::identity::AuthError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::error;

/// Envelope used by the versioned API
///
/// ```json
/// {"statusCode": 200, "isSuccess": true, "errorMessages": [], "result": {...}}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub status_code: u16,
    pub is_success: bool,
    #[serde(default)]
    pub error_messages: Vec<String>,
    pub result: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(result: T) -> Self {
        Self::with_status(StatusCode::OK, result)
    }

    pub fn created(result: T) -> Self {
        Self::with_status(StatusCode::CREATED, result)
    }

    fn with_status(status: StatusCode, result: T) -> Self {
        Self {
            status_code: status.as_u16(),
            is_success: true,
            error_messages: Vec::new(),
            result: Some(result),
        }
    }

    pub fn error(status: StatusCode, messages: Vec<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            is_success: false,
            error_messages: messages,
            result: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}

/// Every way a handler can fail
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{}", .0.join("; "))]
    BadRequest(Vec<String>),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(vec![message.into()])
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Store(e) => e.status_code(),
            ApiError::Auth(e) => e.status_code(),
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }

    fn messages(&self) -> Vec<String> {
        match self {
            ApiError::BadRequest(messages) => messages.clone(),
            other => vec![other.to_string()],
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let messages = if status.is_server_error() {
            error!(error = %self, "Request failed");
            vec!["Internal server error".to_string()]
        } else {
            self.messages()
        };
        ApiResponse::<()>::error(status, messages).into_response()
    }
}

/// Flatten `validator` errors into one message per failed rule
pub fn validation_messages(errors: &validator::ValidationErrors) -> Vec<String> {
    let mut messages = Vec::new();
    for (field, field_errors) in errors.field_errors() {
        for error in field_errors {
            messages.push(
                error
                    .message
                    .as_ref()
                    .map(|m| format!("{}: {}", field, m))
                    .unwrap_or_else(|| format!("Validation failed for field '{}'", field)),
            );
        }
    }
    messages.sort();
    messages
}

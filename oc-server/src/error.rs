//! API error envelope
//!
//! Every failure leaves the gateway as `{"code", "status", "message"}`, with
//! `code`/`status` taken from the gRPC status code for the HTTP status.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use oc_lib::types::ErrorResponse;
use oc_lib::AuthError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{status}: {message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_IMPLEMENTED, message)
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new(StatusCode::PAYLOAD_TOO_LARGE, message)
    }

    pub fn to_response_body(&self) -> ErrorResponse {
        let (code, status) = grpc_status(self.status);
        ErrorResponse {
            code,
            status: status.to_string(),
            message: self.message.clone(),
        }
    }
}

/// Maps an HTTP status to a gRPC status code and name.
pub fn grpc_status(status: StatusCode) -> (i32, &'static str) {
    match status {
        StatusCode::OK => (0, "OK"),
        StatusCode::BAD_REQUEST => (3, "InvalidArgument"),
        StatusCode::UNAUTHORIZED => (16, "Unauthenticated"),
        StatusCode::FORBIDDEN => (7, "PermissionDenied"),
        StatusCode::NOT_FOUND => (5, "NotFound"),
        StatusCode::CONFLICT => (6, "AlreadyExists"),
        StatusCode::TOO_MANY_REQUESTS => (8, "ResourceExhausted"),
        StatusCode::NOT_IMPLEMENTED => (12, "Unimplemented"),
        StatusCode::SERVICE_UNAVAILABLE => (14, "Unavailable"),
        StatusCode::GATEWAY_TIMEOUT => (4, "DeadlineExceeded"),
        s if s.is_client_error() => (3, "InvalidArgument"),
        _ => (13, "Internal"),
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let status = match err {
            AuthError::MissingCredential | AuthError::MalformedCredential => {
                StatusCode::BAD_REQUEST
            }
            AuthError::InvalidBearerToken | AuthError::Signature(_) => StatusCode::UNAUTHORIZED,
        };
        Self::new(status, err.public_message())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.to_response_body())).into_response()
    }
}

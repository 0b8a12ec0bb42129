use actix_web::{error, http::StatusCode, HttpRequest, HttpResponse};
use serde::Serialize;

use crate::core::{ResetError, ResetStep};
use crate::services::{AuthError, SessionError, StoreError};

/// JSON error body returned by every handler
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
    #[serde(rename = "nextStep", skip_serializing_if = "Option::is_none")]
    pub next_step: Option<ResetStep>,
}

impl ApiError {
    pub fn new(status: StatusCode, error: &str, message: impl Into<String>) -> Self {
        Self {
            error: error.to_string(),
            message: message.into(),
            status_code: status.as_u16(),
            next_step: None,
        }
    }

    pub fn bad_request(error: &str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "forbidden", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    /// Details stay in the log, the client gets a generic body
    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "Internal server error")
    }

    fn with_step(mut self, step: ResetStep) -> Self {
        self.next_step = Some(step);
        self
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for ApiError {}

impl error::ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => Self::not_found(format!("Not found: {}", what)),
            StoreError::Conflict(message) => Self::new(StatusCode::CONFLICT, "conflict", message),
            other => {
                tracing::error!("Store failure: {}", other);
                Self::internal()
            }
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        tracing::error!("Session failure: {}", err);
        Self::internal()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        tracing::debug!("Rejected bearer token: {}", err);
        Self::unauthorized("Invalid or expired token")
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::bad_request("validation_failed", errors.to_string())
    }
}

impl From<ResetError> for ApiError {
    fn from(err: ResetError) -> Self {
        let step = err.step();
        let (status, code) = match &err {
            ResetError::UserNotFound => (StatusCode::NOT_FOUND, "user_not_found"),
            ResetError::FlowNotStarted => (StatusCode::FORBIDDEN, "flow_not_started"),
            ResetError::NoCodeFound => (StatusCode::NOT_FOUND, "no_code_found"),
            ResetError::CodeExpired => (StatusCode::GONE, "code_expired"),
            ResetError::CodeMismatch => (StatusCode::BAD_REQUEST, "code_mismatch"),
            ResetError::NotVerified => (StatusCode::FORBIDDEN, "not_verified"),
            ResetError::PasswordMismatch => (StatusCode::BAD_REQUEST, "password_mismatch"),
            ResetError::PasswordTooShort(_) => (StatusCode::BAD_REQUEST, "password_too_short"),
            ResetError::Delivery(e) => {
                tracing::error!("Reset code delivery failed: {}", e);
                return Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "delivery_failed",
                    "Could not send the reset code. Please try again.",
                )
                .with_step(step);
            }
            ResetError::Store(e) => {
                tracing::error!("Reset store failure: {}", e);
                return Self::internal();
            }
            ResetError::Session(e) => {
                tracing::error!("Reset session failure: {}", e);
                return Self::internal();
            }
        };

        Self::new(status, code, err.to_string()).with_step(step)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    ApiError::bad_request("invalid_json", format!("Invalid JSON: {}", err)).into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::bad_request("invalid_query", format!("Invalid query: {}", err)).into()
}

/// Handle malformed path segments such as a non-numeric id
pub fn handle_path_error(err: error::PathError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::bad_request("invalid_path", format!("Invalid path: {}", err)).into()
}

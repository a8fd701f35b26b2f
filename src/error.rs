use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::{error, warn};

use crate::api_types::ErrorResponse;

/// Every failure a detection request can end in.
///
/// The variant decides the HTTP status; the message is what the caller sees.
#[derive(Debug, Error)]
pub enum VadError {
    /// Malformed or unsupported input. The caller has to fix the request.
    #[error("{0}")]
    Validation(String),

    /// The scorer could not be initialized. Retriable: the next request
    /// attempts the load again.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// Decode failures and anything unexpected during extraction.
    #[error("audio processing failed: {0}")]
    Processing(String),
}

impl VadError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn processing(message: impl Into<String>) -> Self {
        Self::Processing(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            VadError::Validation(_) => StatusCode::BAD_REQUEST,
            VadError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            VadError::Processing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            VadError::Validation(_) => "validation_error",
            VadError::ModelUnavailable(_) => "model_unavailable",
            VadError::Processing(_) => "processing_error",
        }
    }
}

impl IntoResponse for VadError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            VadError::Validation(_) => warn!(error_type = self.kind(), "Rejected request: {}", self),
            _ => error!(error_type = self.kind(), "Request failed: {}", self),
        }

        let body = ErrorResponse::new(self.kind(), self.to_string());
        (status, Json(body)).into_response()
    }
}

impl From<tokio::task::JoinError> for VadError {
    fn from(err: tokio::task::JoinError) -> Self {
        VadError::Processing(format!("detection worker aborted: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(VadError::validation("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            VadError::ModelUnavailable("x".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            VadError::processing("x").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn validation_message_is_passed_through_verbatim() {
        let err = VadError::validation("audio file is empty");
        assert_eq!(err.to_string(), "audio file is empty");
    }
}

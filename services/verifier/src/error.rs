use axum::{http::StatusCode, response::IntoResponse};
use serde::Serialize;
use world_id_proof_verify::{DispatchError, ErrorCode, VerificationError};

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a VerificationError,
}

/// Error answer of the verifier API: `{"error": {message, code, statusCode, attribute?}}`.
#[derive(Debug, Clone)]
pub struct ErrorResponse {
    status: StatusCode,
    error: VerificationError,
}

impl ErrorResponse {
    #[must_use]
    pub fn internal_server_error() -> Self {
        VerificationError::internal_error().into()
    }

    #[must_use]
    pub fn gateway_timeout() -> Self {
        VerificationError::new(
            ErrorCode::InternalError,
            "The request timed out. Please try again.",
            StatusCode::GATEWAY_TIMEOUT.as_u16(),
        )
        .into()
    }

    #[must_use]
    pub fn validation_error(message: impl Into<String>, attribute: &str) -> Self {
        VerificationError::bad_request(ErrorCode::ValidationError, message)
            .with_attribute(attribute)
            .into()
    }

    #[cfg(test)]
    pub(crate) const fn error(&self) -> &VerificationError {
        &self.error
    }
}

impl From<VerificationError> for ErrorResponse {
    fn from(error: VerificationError) -> Self {
        let status =
            StatusCode::from_u16(error.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self { status, error }
    }
}

impl From<DispatchError> for ErrorResponse {
    fn from(error: DispatchError) -> Self {
        match error {
            DispatchError::Cancelled => VerificationError::cancelled().into(),
            error => {
                tracing::error!(%error, "proof verification failed");
                Self::internal_server_error()
            }
        }
    }
}

impl std::fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for ErrorResponse {}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> axum::response::Response {
        (self.status, axum::Json(ErrorBody { error: &self.error })).into_response()
    }
}

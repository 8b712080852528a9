use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Typed request outcomes surfaced to the transport layer.
///
/// Authentication and authorization failures are values, not panics or bare
/// status tuples, so callers can't accidentally swallow them. Store failures
/// stay distinct from `Forbidden`: an outage must never read as a deny.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Login failed: unknown email, inactive user, or wrong password.
    /// The three causes are indistinguishable from the outside.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Missing, invalid, or expired token on an authenticated-only endpoint.
    #[error("Authentication required")]
    AuthenticationFailed,

    /// The authenticated principal lacks permission for the resolved resource.
    #[error("Access denied")]
    Forbidden,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// Store unreachable or query failed. Fatal to the request.
    #[error(transparent)]
    Infrastructure(#[from] anyhow::Error),
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        Self::Infrastructure(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::InvalidCredentials => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::AuthenticationFailed => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, self.to_string()),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            ApiError::Infrastructure(e) => {
                error!(error = %e, "infrastructure error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infrastructure_hides_details() {
        let err = ApiError::Infrastructure(anyhow::anyhow!("connection refused to 10.0.0.3"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn credential_causes_share_one_message() {
        assert_eq!(
            ApiError::InvalidCredentials.to_string(),
            "Invalid credentials"
        );
    }
}

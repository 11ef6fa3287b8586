use std::io;
use std::time::Duration;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("secret '{0}' not found")]
    NotFound(String),
    #[error("access to secret '{0}' denied")]
    AccessDenied(String),
    #[error("failed to read secret '{name}': {message}")]
    Other { name: String, message: String },
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("upstream request timed out after {0:?}")]
    Timeout(Duration),
    #[error("issue tracker responded with {status}: {body}")]
    UpstreamStatus { status: u16, body: String },
    #[error("failed to decode issue tracker response: {0}")]
    Decode(String),
    #[error(transparent)]
    Secret(#[from] SecretError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let timestamp = Utc::now().to_rfc3339();
        let (status, body) = match &self {
            AppError::Timeout(_) => (
                StatusCode::GATEWAY_TIMEOUT,
                json!({ "error": "JIRA request timeout", "timestamp": timestamp }),
            ),
            AppError::Configuration(_) | AppError::Secret(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "error": "Configuration error",
                    "message": self.to_string(),
                    "timestamp": timestamp,
                }),
            ),
            AppError::UpstreamStatus { status, .. } => (
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
                json!({
                    "error": "JIRA upstream error",
                    "message": self.to_string(),
                    "timestamp": timestamp,
                }),
            ),
            AppError::Transport(_) | AppError::Decode(_) | AppError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "error": "JIRA proxy error",
                    "message": self.to_string(),
                    "timestamp": timestamp,
                }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_maps_to_gateway_timeout() {
        let response = AppError::Timeout(Duration::from_secs(10)).into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn transport_and_configuration_map_to_internal_error() {
        let response = AppError::Transport("connection refused".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = AppError::Configuration("missing token".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn secret_errors_render_the_key_name() {
        let error = AppError::from(SecretError::NotFound("jira_token".to_string()));
        assert_eq!(error.to_string(), "secret 'jira_token' not found");
    }
}

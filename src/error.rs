//! Domain-specific error types for decision-relay

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Main error type for the decision-relay service
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("I/O error: {message}")]
    Io { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl RelayError {
    pub fn invalid(message: impl Into<String>) -> Self {
        RelayError::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        RelayError::Config {
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            RelayError::NotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for RelayError {
    fn from(err: anyhow::Error) -> Self {
        RelayError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for RelayError {
    fn from(err: std::io::Error) -> Self {
        RelayError::Io {
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for RelayError {
    fn from(err: toml::de::Error) -> Self {
        RelayError::Config {
            message: format!("Invalid config file: {}", err),
        }
    }
}

/// Convert RelayError to an HTTP response.
///
/// Client errors carry their message; everything else is reported with a
/// generic body and the detail stays in the server log.
impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            RelayError::InvalidRequest { message } | RelayError::NotFound { message } => {
                message.clone()
            }
            other => {
                tracing::error!(error = %other, "request failed");
                "Internal server error".to_string()
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Result type alias for decision-relay operations
pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_request_maps_to_bad_request() {
        let err = RelayError::invalid("outcomes must be a non-empty list");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.to_string(),
            "Invalid request: outcomes must be a non-empty list"
        );
    }

    #[test]
    fn internal_errors_hide_detail() {
        let err = RelayError::Internal {
            message: "upstream said: quota exceeded for key sk-...".into(),
        };
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn io_and_toml_errors_convert_to_their_variants() {
        let io: RelayError = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert!(matches!(io, RelayError::Io { .. }));
        assert_eq!(io.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bad_toml = toml::from_str::<toml::Value>("= nope").unwrap_err();
        let config: RelayError = bad_toml.into();
        assert!(matches!(config, RelayError::Config { .. }));
        assert!(config.to_string().starts_with("Configuration error: Invalid config file"));
    }
}

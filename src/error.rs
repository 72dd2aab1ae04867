use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::pipeline::PipelineState;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Event queue is closed")]
    QueueClosed,

    #[error("Event queue was already closed")]
    QueueAlreadyClosed,

    #[error("Sink failure: {0}")]
    Sink(String),

    #[error("Producer fault: {0}")]
    ProducerFault(String),

    #[error("Invalid pipeline transition from {from:?} to {to:?}")]
    InvalidTransition { from: PipelineState, to: PipelineState },

    #[error("HMAC validation failed")]
    HmacValidation,

    #[error("Missing signature header")]
    MissingSignature,

    #[error("Invalid signature format")]
    InvalidSignatureFormat,

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Secret not found: {0}")]
    SecretNotFound(String),
}

impl From<::config::ConfigError> for AppError {
    fn from(err: ::config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::HmacValidation => (StatusCode::UNAUTHORIZED, "Invalid signature".to_string()),
            AppError::MissingSignature => (StatusCode::BAD_REQUEST, "Missing signature header".to_string()),
            AppError::InvalidSignatureFormat => (StatusCode::BAD_REQUEST, "Invalid signature format".to_string()),
            AppError::JsonParse(e) => (StatusCode::BAD_REQUEST, format!("Invalid JSON: {}", e)),
            AppError::SecretNotFound(name) => (StatusCode::INTERNAL_SERVER_ERROR, format!("Secret not found: {}", name)),
            AppError::Io(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("IO error: {}", e)),
            other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        };

        (status, message).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Decode error: class index {index} has no label (codec holds {classes} classes)")]
    Decode { index: usize, classes: usize },

    #[error("Unrecognized symptoms: {}", .0.join(", "))]
    UnknownSymptoms(Vec<String>),

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Invalid label codec: {0}")]
    InvalidCodec(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Integrity faults mean the loaded artifacts disagree with each other.
    /// They are never retryable.
    pub fn is_integrity_fault(&self) -> bool {
        matches!(self, AppError::SchemaMismatch(_) | AppError::Decode { .. })
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::InvalidInput(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::UnknownSymptoms(_) => (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()),
            _ if self.is_integrity_fault() => {
                tracing::error!("Artifact integrity fault: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            _ => {
                tracing::error!("Internal server error: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }));

        (status, body).into_response()
    }
}

pub fn validation_error(msg: &str) -> AppError {
    AppError::InvalidInput(msg.to_string())
}

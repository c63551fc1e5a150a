use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Per-request failures of the detection pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Detection service is not ready: model or translations not loaded")]
    EngineUnavailable,

    #[error("Unsupported language '{requested}', expected one of: {supported}")]
    InvalidLanguage { requested: String, supported: String },

    #[error("Confidence threshold must be a number within [0, 1], got '{0}'")]
    InvalidThreshold(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Inference failed: {0:#}")]
    InferenceError(anyhow::Error),

    #[error("Failed to encode annotated image: {0}")]
    Encode(String),

    #[error("Malformed request: {0}")]
    BadRequest(String),

    #[error("Upload too large: {0}")]
    PayloadTooLarge(String),
}

impl PipelineError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EngineUnavailable => "EngineUnavailable",
            Self::InvalidLanguage { .. } => "InvalidLanguage",
            Self::InvalidThreshold(_) => "InvalidThreshold",
            Self::InvalidImage(_) => "InvalidImage",
            Self::InferenceError(_) => "InferenceError",
            Self::Encode(_) => "Encode",
            Self::BadRequest(_) => "BadRequest",
            Self::PayloadTooLarge(_) => "PayloadTooLarge",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidLanguage { .. }
            | Self::InvalidThreshold(_)
            | Self::InvalidImage(_)
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::EngineUnavailable | Self::InferenceError(_) | Self::Encode(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(kind = self.kind(), error = %self, "Detection request failed");
        } else {
            tracing::warn!(kind = self.kind(), error = %self, "Detection request rejected");
        }

        let body = json!({
            "success": false,
            "error": self.kind(),
            "detail": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}

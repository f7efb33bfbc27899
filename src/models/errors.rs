use axum::http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Image decode failed: {message}")]
    DecodeError { message: String },

    #[error("Image transform failed: {message}")]
    TransformError { message: String },

    #[error("Image encode failed: {message}")]
    EncodeError { message: String },

    #[error("File upload error: {message}")]
    FileUploadError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Storage error: {message}")]
    StorageError { message: String },

    #[error("Internal server error: {message}")]
    InternalError { message: String },
}

impl AppError {
    /// HTTP status a handler should answer with for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::DecodeError { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::FileUploadError { .. } | AppError::ValidationError { .. } => {
                StatusCode::BAD_REQUEST
            }
            AppError::TransformError { .. }
            | AppError::EncodeError { .. }
            | AppError::StorageError { .. }
            | AppError::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for JSON error bodies.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::DecodeError { .. } => "DECODE_FAILED",
            AppError::TransformError { .. } => "TRANSFORM_FAILED",
            AppError::EncodeError { .. } => "ENCODE_FAILED",
            AppError::FileUploadError { .. } => "UPLOAD_FAILED",
            AppError::ValidationError { .. } => "VALIDATION_FAILED",
            AppError::StorageError { .. } => "STORAGE_FAILED",
            AppError::InternalError { .. } => "INTERNAL_ERROR",
        }
    }
}

// Convenience functions for creating specific errors
impl AppError {
    pub fn decode_failed(message: impl Into<String>) -> Self {
        AppError::DecodeError { message: message.into() }
    }

    pub fn transform_failed(message: impl Into<String>) -> Self {
        AppError::TransformError { message: message.into() }
    }

    pub fn encode_failed(message: impl Into<String>) -> Self {
        AppError::EncodeError { message: message.into() }
    }

    pub fn file_upload_failed(message: impl Into<String>) -> Self {
        AppError::FileUploadError { message: message.into() }
    }

    pub fn validation_failed(message: impl Into<String>) -> Self {
        AppError::ValidationError { message: message.into() }
    }

    pub fn storage_failed(message: impl Into<String>) -> Self {
        AppError::StorageError { message: message.into() }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        AppError::InternalError { message: message.into() }
    }
}

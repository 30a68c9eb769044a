use crate::db::errors::DbError;
use crate::uploads::IMAGE_FIELD;
use crate::validation::FieldError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use utoipa::ToSchema;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Request body failed schema validation
    #[error("Validation failed: {errors:?}")]
    Validation { errors: Vec<FieldError> },

    /// Path identifier is not a well-formed quote id
    #[error("Invalid ID format: {errors:?}")]
    InvalidId { errors: Vec<FieldError> },

    /// Malformed request that is not a field-level violation
    #[error("{message}")]
    BadRequest { message: String },

    /// Requested resource not found
    #[error("{resource} with ID {id} not found")]
    NotFound { resource: String, id: String },

    /// Uploaded file exceeds the configured ceiling
    #[error("Payload too large: {message}")]
    PayloadTooLarge { message: String },

    /// Uploaded file rejected (wrong type, unexpected field)
    #[error("Upload rejected: {message}")]
    Upload { message: String },

    /// Body is neither multipart nor JSON
    #[error("Unsupported content type {content_type}")]
    UnsupportedMediaType { content_type: String },

    /// Store refused to persist the record
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Store operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// JSON body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub message: String,
    /// Every violated constraint, for validation and upload failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation { .. } | Error::InvalidId { .. } | Error::BadRequest { .. } | Error::Upload { .. } => {
                StatusCode::BAD_REQUEST
            }
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::UnsupportedMediaType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Error::Conflict { .. } => StatusCode::CONFLICT,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::UniqueViolation { .. } => StatusCode::CONFLICT,
                DbError::CheckViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation { .. } => "Validation failed".to_string(),
            Error::InvalidId { .. } => "Invalid ID format".to_string(),
            Error::BadRequest { message } | Error::PayloadTooLarge { message } | Error::Upload { message } => message.clone(),
            Error::NotFound { resource, id } => format!("{resource} with ID {id} not found"),
            Error::UnsupportedMediaType { content_type } => {
                format!("Unsupported content type '{content_type}'. Use multipart/form-data or application/json")
            }
            Error::Conflict { message } => message.clone(),
            Error::Internal { .. } | Error::Other(_) => "Internal server error".to_string(),
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "Resource not found".to_string(),
                DbError::UniqueViolation { .. } => "Resource already exists".to_string(),
                DbError::CheckViolation { .. } => "Invalid data provided".to_string(),
                DbError::Other(_) => "Database error occurred".to_string(),
            },
        }
    }

    /// Field-level detail included in the response body, if any
    pub fn field_errors(&self) -> Option<Vec<FieldError>> {
        match self {
            Error::Validation { errors } | Error::InvalidId { errors } => Some(errors.clone()),
            Error::PayloadTooLarge { message } | Error::Upload { message } => Some(vec![FieldError::body(IMAGE_FIELD, message.clone())]),
            _ => None,
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            message: self.user_message(),
            errors: self.field_errors(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Database(DbError::Other(_)) | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Database(_) | Error::Conflict { .. } => {
                tracing::warn!("Store rejected write: {}", self);
            }
            Error::PayloadTooLarge { .. } | Error::Upload { .. } | Error::UnsupportedMediaType { .. } => {
                tracing::info!("Upload error: {}", self);
            }
            Error::Validation { .. } | Error::InvalidId { .. } | Error::BadRequest { .. } | Error::NotFound { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        (self.status_code(), Json(self.to_body())).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;

use crate::models::ErrorResponse;
use axum::{http::StatusCode, Json};
use thiserror::Error;

/// Failures of tracker operations. None of them leave the table modified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    #[error("habit '{0}' not found")]
    NotFound(String),

    #[error("date '{0}' is not tracked")]
    DateNotFound(String),

    #[error("habit '{0}' already exists")]
    Duplicate(String),

    #[error("week {week} is out of range (1..={weeks})")]
    InvalidView { week: usize, weeks: usize },

    #[error("{0}")]
    InvalidName(String),

    #[error("backing store unavailable: {0}")]
    BackendUnavailable(String),
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: message.into(),
        }
    }

    pub fn internal(err: impl std::error::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl From<TrackerError> for AppError {
    fn from(err: TrackerError) -> Self {
        let message = err.to_string();
        match err {
            TrackerError::NotFound(_) | TrackerError::DateNotFound(_) => Self::not_found(message),
            TrackerError::Duplicate(_) => Self::conflict(message),
            TrackerError::InvalidView { .. } | TrackerError::InvalidName(_) => {
                Self::bad_request(message)
            }
            TrackerError::BackendUnavailable(_) => Self::unavailable(message),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(err)
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = ErrorResponse {
            success: false,
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Application error codes following the pattern E{domain}{sequence}.
///
/// Ranges:
/// - E0xxx: shared/infrastructure errors
/// - E3xxx: matchmaking-domain errors (queue, match lifecycle)
/// - E9xxx: engine/concurrency errors from the matchmaking core's own
///   state machine, distinct from the E3xxx resource-shaped errors a
///   transport layer would surface to a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    NotFound,
    BadRequest,

    // Matching (E3xxx)
    AlreadyInQueue,
    NotInQueue,
    NotInMatch,
    MatchNotFound,
    AlreadyInMatch,

    // Engine/concurrency (E9xxx)
    InvalidTransition,
    LockBusy,
    WindowExpired,
    Conflict,
    Fatal,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InternalError => "E0001",
            Self::ValidationError => "E0002",
            Self::NotFound => "E0003",
            Self::BadRequest => "E0004",

            Self::AlreadyInQueue => "E3001",
            Self::NotInQueue => "E3002",
            Self::NotInMatch => "E3003",
            Self::MatchNotFound => "E3004",
            Self::AlreadyInMatch => "E3005",

            Self::InvalidTransition => "E9001",
            Self::LockBusy => "E9002",
            Self::WindowExpired => "E9003",
            Self::Conflict => "E9004",
            Self::Fatal => "E9005",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError | Self::Fatal => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ValidationError | Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::NotFound | Self::NotInQueue | Self::NotInMatch | Self::MatchNotFound => {
                StatusCode::NOT_FOUND
            }
            Self::AlreadyInQueue | Self::AlreadyInMatch | Self::Conflict => StatusCode::CONFLICT,
            Self::InvalidTransition => StatusCode::UNPROCESSABLE_ENTITY,
            Self::LockBusy => StatusCode::TOO_MANY_REQUESTS,
            Self::WindowExpired => StatusCode::GONE,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known {
        code: ErrorCode,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        code: ErrorCode,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Known { code, .. } => *code,
            Self::Internal(_) => ErrorCode::InternalError,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::Known {
                code,
                message,
                details,
            } => {
                let status = code.status_code();
                let mut resp = ApiErrorResponse::new(code.code(), message);
                if let Some(d) = details {
                    resp = resp.with_details(d.clone());
                }
                (status, resp)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new("E0001", "internal server error"),
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

//! Service-level error taxonomy and the JSON error body handlers return.

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<i64>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            current_status: None,
            retry_after_secs: None,
        }
    }
}

/// Errors surfaced to callers. Per-source fetch failures are consumed inside
/// the source chain and never reach this type; only total exhaustion (with
/// the fallback rate also unavailable) becomes `NoRateAvailable`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("no exchange rate available")]
    NoRateAvailable,

    #[error("no exchange rate recorded at or before the requested time")]
    RateNotFound,

    #[error("{0}")]
    NotFound(String),

    #[error("a rate snapshot already exists for this {entity}")]
    AlreadyPinned { entity: &'static str },

    #[error("maximum 3 verification requests per hour allowed")]
    RateLimited { retry_after_secs: i64 },

    #[error("verification request is already '{current}'")]
    InvalidTransition { current: String },

    #[error("{0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(String),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::NoRateAvailable => StatusCode::SERVICE_UNAVAILABLE,
            Error::RateNotFound => StatusCode::NOT_FOUND,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::AlreadyPinned { .. } => StatusCode::CONFLICT,
            Error::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Error::InvalidTransition { .. } => StatusCode::CONFLICT,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn into_response_parts(self) -> (StatusCode, Json<ErrorResponse>) {
        let status = self.status_code();
        let mut body = ErrorResponse::new(self.to_string());
        match &self {
            Error::InvalidTransition { current } => {
                body.current_status = Some(current.clone());
            }
            Error::RateLimited { retry_after_secs } => {
                body.retry_after_secs = Some(*retry_after_secs);
            }
            _ => {}
        }
        (status, Json(body))
    }
}

impl From<sea_orm::DbErr> for Error {
    fn from(err: sea_orm::DbErr) -> Self {
        Error::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(
            Error::NoRateAvailable.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(Error::RateNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            Error::NotFound("alert 9 not found".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::AlreadyPinned { entity: "order" }.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            Error::RateLimited {
                retry_after_secs: 600
            }
            .status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            Error::InvalidTransition {
                current: "approved".into()
            }
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            Error::Validation("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn transition_error_echoes_terminal_status() {
        let (status, Json(body)) = Error::InvalidTransition {
            current: "rejected".into(),
        }
        .into_response_parts();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.current_status.as_deref(), Some("rejected"));
    }
}

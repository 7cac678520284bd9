//! Unified error handling with Sentry integration.
//!
//! Every per-request failure the pipeline detects is turned into an HTTP
//! response here; nothing propagates as a fault. Bodies are JSON
//! `{"message": ...}`. Server errors are captured to Sentry before the
//! response is built, and their details never reach the client.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::services::{CsrfError, TokenError};

/// Message returned for every authentication failure, whatever the cause.
pub const UNAUTHORIZED_MESSAGE: &str = "User Unauthorized";

/// Message returned when anti-forgery validation fails.
pub const CSRF_MESSAGE: &str = "Invalid CSRF token";

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// No verified identity on a gated route.
    #[error("Unauthorized")]
    Unauthorized,

    /// Anti-forgery validation failed on a state-changing request.
    #[error("CSRF validation failed: {0}")]
    Csrf(#[from] CsrfError),

    /// Session token could not be signed.
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    /// Request body or parameters could not be understood.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// No such route.
    #[error("Not found")]
    NotFound,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Csrf(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Token(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(self, Self::Token(_) | Self::Internal(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Unauthorized => UNAUTHORIZED_MESSAGE.to_string(),
            Self::Csrf(_) => CSRF_MESSAGE.to_string(),
            Self::BadRequest(detail) => detail.clone(),
            Self::NotFound => "Not found".to_string(),
            Self::Token(_) | Self::Internal(_) => "Internal server error".to_string(),
        };

        (self.status(), Json(json!({ "message": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from verified session claims.
pub fn set_sentry_user(subject_id: &str, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(subject_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

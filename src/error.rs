use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::provider::ProviderError;

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{} invalid field(s)", .errors.len())]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Terminal outcomes of a search other than success.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// Cross-field rule broken, e.g. return before departure.
    #[error("{0}")]
    BadRequest(String),

    #[error("{message}")]
    Upstream {
        status: StatusCode,
        message: String,
        source: ProviderError,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("{message}")]
    Unexpected {
        message: String,
        source: anyhow::Error,
    },
}

/// How a provider failure picks the response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamStatus {
    /// Every provider failure answers 502.
    BadGateway,
    /// Provider 400, 401, 403 and 429 are forwarded, anything else is 502.
    ForwardClientErrors,
}

impl UpstreamStatus {
    fn resolve(self, provider_status: Option<u16>) -> StatusCode {
        match (self, provider_status) {
            (UpstreamStatus::ForwardClientErrors, Some(s @ (400 | 401 | 403 | 429))) => {
                StatusCode::from_u16(s).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}

impl SearchError {
    /// Maps a provider failure to a client-safe message for `service`
    /// ("flight provider", ...). The message depends only on the provider
    /// status; the response status follows `policy`.
    pub fn upstream(
        source: ProviderError,
        service: &str,
        fallback: &str,
        policy: UpstreamStatus,
    ) -> Self {
        let status = policy.resolve(source.status);

        let message = match source.status {
            Some(400) => format!("Bad request sent to {service}. Please check your search details."),
            Some(401) | Some(403) => {
                format!("Authentication with {service} failed. Please contact support.")
            }
            Some(429) => format!(
                "Rate limit exceeded with {service}. Please try again after a short while."
            ),
            Some(500..=599) => {
                format!("The {service} is currently unavailable. Please try again shortly.")
            }
            _ => fallback.to_string(),
        };

        SearchError::Upstream {
            status,
            message,
            source,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            SearchError::Validation(_) | SearchError::BadRequest(_) => StatusCode::BAD_REQUEST,
            SearchError::Upstream { status, .. } => *status,
            SearchError::NotFound(_) => StatusCode::NOT_FOUND,
            SearchError::Unexpected { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for SearchError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            SearchError::Validation(errs) => json!({
                "success": false,
                "message": "Invalid request body",
                "errors": errs.errors,
            }),
            SearchError::BadRequest(message) | SearchError::NotFound(message) => json!({
                "success": false,
                "message": message,
            }),
            SearchError::Upstream {
                message, source, ..
            } => {
                tracing::error!(
                    status = ?source.status,
                    code = ?source.code,
                    "provider error: {}",
                    source.detail
                );
                json!({
                    "success": false,
                    "message": message,
                    "error": {
                        "code": source.code,
                        "detail": source.detail,
                    },
                })
            }
            SearchError::Unexpected { message, source } => {
                tracing::error!("Internal Server Error: {:#}", source);
                json!({
                    "success": false,
                    "message": message,
                })
            }
        };

        (status, Json(body)).into_response()
    }
}

//! Client-side API error.
//!
//! Every non-2xx response is translated into one of these variants. The
//! caller decides what to do with it: the auth orchestrator reacts to
//! [`ApiError::Unauthorized`], views render [`ApiError::Validation`]
//! payloads per field, and everything else is surfaced as-is.

use reqwest::StatusCode;

/// Error returned by [`ApiClient`](crate::ApiClient) and every service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never reached the server, or the connection broke.
    #[error("network: {0}")]
    Network(#[from] reqwest::Error),

    /// HTTP 401. The session token is missing, expired or revoked.
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// HTTP 404.
    #[error("not found: {message}")]
    NotFound { message: String },

    /// A 4xx answer with a structured body, e.g.
    /// `{"user_mail": ["already taken"], "detail": "..."}`.
    #[error("HTTP {status}: validation failed: {errors}")]
    Validation { status: u16, errors: serde_json::Value },

    /// Any other non-2xx answer.
    #[error("HTTP {status}: {message}")]
    Server { status: u16, message: String },

    /// A 2xx answer whose body could not be decoded.
    #[error("decode: {0}")]
    Decode(String),
}

impl ApiError {
    /// Translate a non-success status and its raw body.
    pub(crate) fn from_status(status: StatusCode, body: String) -> Self {
        let code = status.as_u16();
        match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized { message: detail_or_body(&body) },
            StatusCode::NOT_FOUND => ApiError::NotFound { message: detail_or_body(&body) },
            s if s.is_client_error() => match serde_json::from_str::<serde_json::Value>(&body) {
                Ok(errors @ serde_json::Value::Object(_)) => ApiError::Validation { status: code, errors },
                _ => ApiError::Server { status: code, message: body },
            },
            _ => ApiError::Server { status: code, message: body },
        }
    }

    /// HTTP status code, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Network(e) => e.status().map(|s| s.as_u16()),
            ApiError::Unauthorized { .. } => Some(401),
            ApiError::NotFound { .. } => Some(404),
            ApiError::Validation { status, .. } | ApiError::Server { status, .. } => Some(*status),
            ApiError::Decode(_) => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }

    /// Flatten a validation payload into `(field, message)` pairs.
    ///
    /// `{"user_mail": ["taken", "invalid"], "detail": "nope"}` yields
    /// `[("detail", "nope"), ("user_mail", "taken"), ("user_mail", "invalid")]`.
    /// Returns an empty list for any other variant.
    pub fn field_errors(&self) -> Vec<(String, String)> {
        let ApiError::Validation { errors: serde_json::Value::Object(map), .. } = self else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for (field, value) in map {
            match value {
                serde_json::Value::String(msg) => out.push((field.clone(), msg.clone())),
                serde_json::Value::Array(items) => {
                    for item in items {
                        let msg = match item {
                            serde_json::Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        out.push((field.clone(), msg));
                    }
                }
                other => out.push((field.clone(), other.to_string())),
            }
        }
        out
    }
}

/// Django-style error bodies carry the message under `detail`.
fn detail_or_body(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

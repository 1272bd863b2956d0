//! API error types

use std::time::Duration;

use super::PostgrestErrorDetail;

/// Errors that can occur during backend calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// HTTP error response from the backend.
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Error message.
        message: String,
        /// PostgREST or Postgres error code (e.g. `PGRST202`, `42703`), if available.
        code: Option<String>,
        /// Detailed error information from PostgREST.
        inner: Option<Box<PostgrestErrorDetail>>,
    },

    /// Network error during the call.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Request timed out.
    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Failed to parse the backend response.
    #[error("Response parse error: {message}")]
    Parse {
        /// Description of the parse error.
        message: String,
        /// Raw response body, if available.
        body: Option<String>,
    },
}

impl ApiError {
    /// Creates a new HTTP error.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
            code: None,
            inner: None,
        }
    }

    /// Creates a new HTTP error carrying PostgREST error details.
    pub fn http_with_detail(status: u16, detail: PostgrestErrorDetail) -> Self {
        Self::Http {
            status,
            message: detail.message.clone(),
            code: detail.code.clone(),
            inner: Some(Box::new(detail)),
        }
    }

    /// Creates a new parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            body: None,
        }
    }

    /// Creates a new parse error with the raw response body.
    pub fn parse_with_body(message: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            body: Some(body.into()),
        }
    }

    /// Returns the HTTP status code if this is an HTTP error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the PostgREST/Postgres error code if available.
    pub fn error_code(&self) -> Option<&str> {
        match self {
            Self::Http { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Returns the PostgREST error detail if available.
    pub fn postgrest_detail(&self) -> Option<&PostgrestErrorDetail> {
        match self {
            Self::Http { inner, .. } => inner.as_deref(),
            _ => None,
        }
    }
}

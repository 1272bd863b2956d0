//! Error types

mod api;
mod config;
mod field;
mod postgrest;

pub use api::*;
pub use config::*;
pub use field::*;
pub use postgrest::*;

/// Top-level error returned by backend calls and grid request handling.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The backend call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Configuration is missing or inconsistent.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A row field could not be read.
    #[error(transparent)]
    Field(#[from] FieldError),

    /// The grid sent a request that cannot be answered.
    #[error("Invalid grid request: {0}")]
    InvalidRequest(String),
}

impl Error {
    /// Creates an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }
}

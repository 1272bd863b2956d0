//! Configuration error types

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("Missing environment variable: {0}")]
    MissingVar(&'static str),

    /// An environment variable holds a value that cannot be used.
    #[error("Invalid value for {name}: {value}")]
    InvalidVar {
        /// Variable name.
        name: &'static str,
        /// The rejected value.
        value: String,
    },

    /// A configuration or fixture file could not be read or parsed.
    #[error("Failed to load {path}: {message}")]
    File {
        /// Path of the file.
        path: String,
        /// Description of the failure.
        message: String,
    },

    /// Two display fields map to the same backend column.
    #[error("Columns '{first}' and '{second}' both map to {column}")]
    DuplicateColumn {
        /// First field name.
        first: String,
        /// Second field name.
        second: String,
        /// The shared backend column identifier.
        column: String,
    },

    /// A grid field has no backend column mapping.
    #[error("No column mapping for field '{0}'")]
    UnmappedField(String),

    /// The backend rejected the mapped columns.
    #[error("Column map does not match table '{table}': {message}")]
    Schema {
        /// Table that was checked.
        table: String,
        /// Backend error message.
        message: String,
    },
}

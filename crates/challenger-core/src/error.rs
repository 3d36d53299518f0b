use thiserror::Error;

/// Core error type shared across Challenger crates.
#[derive(Debug, Error)]
pub enum Error {
    /// Filesystem failure while reading or writing a catalog snapshot.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed JSON input.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// The configuration is not a mapping of category names to rules.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// A template could not be created or decoded.
    #[error("invalid template: {0}")]
    InvalidTemplate(String),
    /// A template with the same name already exists.
    #[error("template '{0}' already exists")]
    DuplicateTemplate(String),
    /// Catch-all error for unexpected failures.
    #[error("other error: {0}")]
    Other(String),
}

/// Convenience alias for results returned by Challenger crates.
pub type Result<T> = std::result::Result<T, Error>;

//! Error types for Gator.

use thiserror::Error;

/// Common error type for Gator.
#[derive(Error, Debug)]
pub enum GatorError {
    /// Database error.
    ///
    /// Wraps errors from any database backend. Errors from sqlx are
    /// converted automatically.
    #[error("database error: {0}")]
    Database(String),

    /// Database connection error.
    #[error("database connection error: {0}")]
    DatabaseConnection(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error (bad interval, unusable settings).
    #[error("configuration error: {0}")]
    Config(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Fetching a feed over the network failed.
    #[error("network error: {0}")]
    Network(String),

    /// The fetched document is not well-formed feed markup.
    #[error("feed parse error: {0}")]
    Parse(String),

    /// An item's publish date does not match the expected layout.
    #[error("date format error: {0}")]
    DateFormat(String),

    /// The operation was interrupted by a shutdown request.
    #[error("operation cancelled")]
    Cancelled,
}

impl GatorError {
    /// Whether the scheduler may keep polling after this error.
    ///
    /// Configuration and I/O errors are raised before polling starts and
    /// stop the process; everything else is reported and retried on a later
    /// tick.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            GatorError::Config(_) | GatorError::Io(_) | GatorError::Cancelled
        )
    }
}

// Conversion from sqlx errors
impl From<sqlx::Error> for GatorError {
    fn from(e: sqlx::Error) -> Self {
        GatorError::Database(e.to_string())
    }
}

/// Result type alias for Gator operations.
pub type Result<T> = std::result::Result<T, GatorError>;

use thiserror::Error;

use crate::config::ConfigError;
use crate::messaging::MessagingError;

/// Centralized error type for startup and CLI paths
///
/// Request handling maps the per-concern errors (`VerificationFailure`,
/// `MalformedResourceKey`, `MetadataError`, ...) to HTTP responses directly;
/// everything that can abort the process funnels through this enum.
///
/// # Example
///
/// ```no_run
/// use seedcore::error::AppError;
///
/// fn handle_error(err: AppError) {
///     eprintln!("Error: {}", err);
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Bot messaging errors
    #[error("Messaging error: {0}")]
    Messaging(#[from] MessagingError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Logger initialization errors
    #[error("Logger error: {0}")]
    Logger(String),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

//! Error types for the chat server.

use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("News error: {0}")]
    News(#[from] NewsError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    #[error("Chat error: {0}")]
    Chat(#[from] ChatError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Response from {provider} was blocked: {reason}")]
    Blocked { provider: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// News provider errors.
#[derive(Debug, thiserror::Error)]
pub enum NewsError {
    #[error("News API key not configured")]
    MissingApiKey,

    #[error("News request failed: {0}")]
    RequestFailed(String),

    #[error("News API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Invalid news response: {0}")]
    InvalidResponse(String),
}

/// Report generation errors.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Summary generation failed: {0}")]
    Summary(#[from] LlmError),

    #[error("PDF rendering failed: {0}")]
    Render(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Authentication errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Not authorized, no token")]
    MissingToken,

    #[error("Not authorized, token failed")]
    InvalidToken,

    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

/// File upload errors.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Upload is empty")]
    Empty,

    #[error("Upload of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Chat service errors.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// The chat does not exist or belongs to another user.
    #[error("Access denied")]
    AccessDenied,

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Upload(#[from] UploadError),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

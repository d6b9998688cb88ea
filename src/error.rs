//! Error types for Refin Bot.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Quote service error: {0}")]
    Quote(#[from] QuoteError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Failures from the Safra quote API, keyed by how the pipeline reacts.
///
/// The variants mirror the partner API's observable failure modes: a
/// missing session token, a rejected one, a server-side fault, and a
/// transport-level failure. An empty response body is *not* an error —
/// the client maps it to an empty-but-successful result.
#[derive(Debug, thiserror::Error)]
pub enum QuoteError {
    #[error("No session token held; call authenticate first")]
    NotAuthenticated,

    #[error("Safra API rejected the session token (401/403)")]
    Auth,

    #[error("Safra API server error (HTTP {status})")]
    Server { status: u16 },

    #[error("Network failure talking to the Safra API: {0}")]
    Network(String),

    #[error("Unparseable response from the Safra API: {0}")]
    InvalidResponse(String),
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;

//! SDK error types.

/// Result alias used throughout the SDK.
pub type Result<T> = std::result::Result<T, GuardialError>;

/// Errors that can occur while configuring or calling Guardial.
///
/// Configuration errors are returned from construction and are meant to stop
/// the host application at startup. Remote-call errors are only surfaced by
/// the `try_*` client methods; the regular analysis methods turn them into
/// fallback results.
#[derive(Debug, thiserror::Error)]
pub enum GuardialError {
    /// No API key was passed explicitly or found in `GUARDIAL_API_KEY`.
    #[error("GUARDIAL_API_KEY environment variable is required or pass api_key explicitly")]
    MissingApiKey,

    /// A resolved setting is present but unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Layered configuration could not be built.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Transport failure, including timeouts.
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("API error: {status} - {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The response body was not the JSON we expected.
    #[error("Failed to parse response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Guardial rejected an outgoing request before it was sent.
    #[error("request blocked by Guardial: {}", .reasons.join(", "))]
    Blocked { reasons: Vec<String> },
}

impl GuardialError {
    /// Whether this error was raised while resolving configuration.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::MissingApiKey | Self::InvalidConfig(_) | Self::Config(_)
        )
    }
}

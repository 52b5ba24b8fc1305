//! Error types for the NextStep domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Provider failures carry a [`FailureKind`] so callers can pick the right
//! user-facing fallback message.

use serde::Serialize;
use thiserror::Error;

/// The top-level error type for all NextStep operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Input validation ---
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // --- Session state ---
    #[error("Conversation is busy: {0}")]
    Busy(String),

    #[error("Structured flow is already complete")]
    AlreadyComplete,

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl Error {
    /// The provider failure kind, if this error came from the model gateway.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Provider(e) => Some(e.kind()),
            _ => None,
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// The two failure classes a caller has to tell apart.
///
/// Both end in the same offline fallback content, but the user is told
/// different things ("quota exhausted" vs "temporarily unavailable").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Network, timeout, or any other provider-side failure.
    Transport,
    /// The provider signalled rate or quota exhaustion.
    Quota,
}

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Provider quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Provider returned an empty response")]
    EmptyResponse,

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    /// Classify this failure as quota or transport.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::RateLimited { .. } | Self::QuotaExhausted(_) => FailureKind::Quota,
            Self::ApiError { status_code: 429, .. } => FailureKind::Quota,
            _ => FailureKind::Transport,
        }
    }
}

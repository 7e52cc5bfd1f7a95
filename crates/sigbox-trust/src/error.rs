//! Error types for the trust-service client and signature tokens.

use std::time::Duration;

/// Trust-service and token errors.
#[derive(Debug, thiserror::Error)]
pub enum TrustError {
    /// Credentials were rejected by the trust service.
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// Rate limit exceeded.
    #[error("rate limited: retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// The trust service refused the request payload.
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// Network error or service unavailable.
    #[error("network error: {message}")]
    Network { message: String },

    /// The signing call did not finish in time.
    #[error("signing timed out after {0:?}")]
    Timeout(Duration),

    /// The service answered, but with something that is not a usable token.
    #[error("invalid response: {message}")]
    InvalidResponse { message: String },

    /// A stored signature artifact could not be decoded.
    #[error("malformed signature token: {reason}")]
    Malformed { reason: String },

    /// Token does not bind the expected document hash.
    #[error("document hash mismatch: token binds {claimed}, payload hashes to {computed}")]
    DocumentHashMismatch { claimed: String, computed: String },

    /// Token was issued by a different key.
    #[error("key_id mismatch: claimed {claimed}, actual {actual}")]
    KeyIdMismatch { claimed: String, actual: String },

    /// Cryptographic signature check failed.
    #[error("signature verification failed")]
    SignatureInvalid,

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl TrustError {
    /// Whether the error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Network { .. })
    }

    /// Whether the error came from decoding a stored artifact.
    pub fn is_decode_failure(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }
}

impl From<reqwest::Error> for TrustError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network {
            message: err.to_string(),
        }
    }
}

/// Result type for trust operations.
pub type TrustResult<T> = Result<T, TrustError>;

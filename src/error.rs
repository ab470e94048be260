//! Error types shared across the crate

use thiserror::Error;

/// Failures of the key-value persistence layer
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage is not available")]
    Unavailable,

    #[error("stored record `{key}` is malformed: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize record `{key}`: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures talking to the remote correction API
#[derive(Error, Debug)]
pub enum CorrectionError {
    #[error("correction API is not configured")]
    NotConfigured,

    #[error("request timed out")]
    Timeout,

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("authentication with the correction API failed")]
    AuthFailure,

    #[error("correction API server error: {0}")]
    ServerError(u16),

    #[error("correction API request failed: {0}")]
    RequestFailed(u16),

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid response from correction API: {0}")]
    InvalidResponse(String),

    #[error("correction API returned no text")]
    EmptyResponse,
}

impl CorrectionError {
    /// Translation key of the user-facing message for this failure
    pub fn message_key(&self) -> &'static str {
        match self {
            CorrectionError::NotConfigured => "corrector.errors.notConfigured",
            CorrectionError::Timeout => "corrector.errors.timeout",
            CorrectionError::RateLimited => "corrector.errors.rateLimited",
            CorrectionError::AuthFailure => "corrector.errors.auth",
            CorrectionError::ServerError(_) => "corrector.errors.server",
            CorrectionError::RequestFailed(_)
            | CorrectionError::Network(_)
            | CorrectionError::InvalidResponse(_)
            | CorrectionError::EmptyResponse => "corrector.errors.unknown",
        }
    }

    /// Map a non-success HTTP status to a failure category
    pub fn from_status(status: u16) -> Self {
        match status {
            429 => CorrectionError::RateLimited,
            401 | 403 => CorrectionError::AuthFailure,
            s if s >= 500 => CorrectionError::ServerError(s),
            s => CorrectionError::RequestFailed(s),
        }
    }
}

/// Reasons a submission is rejected before reaching the correction API
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SubmitError {
    #[error("nothing to correct")]
    EmptyInput,

    #[error("daily limit of {limit} corrections reached")]
    QuotaExceeded { limit: u32 },
}

impl SubmitError {
    pub fn message_key(&self) -> &'static str {
        match self {
            SubmitError::EmptyInput => "corrector.emptyInput",
            SubmitError::QuotaExceeded { .. } => "premium.limitReached",
        }
    }
}

/// Failures loading a translation table from disk
#[derive(Error, Debug)]
pub enum TranslationError {
    #[error("failed to read translation file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse translation file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(CorrectionError::from_status(429), CorrectionError::RateLimited));
        assert!(matches!(CorrectionError::from_status(401), CorrectionError::AuthFailure));
        assert!(matches!(CorrectionError::from_status(403), CorrectionError::AuthFailure));
        assert!(matches!(CorrectionError::from_status(500), CorrectionError::ServerError(500)));
        assert!(matches!(CorrectionError::from_status(503), CorrectionError::ServerError(503)));
        assert!(matches!(CorrectionError::from_status(400), CorrectionError::RequestFailed(400)));
        assert!(matches!(CorrectionError::from_status(404), CorrectionError::RequestFailed(404)));
    }

    #[test]
    fn test_message_keys() {
        assert_eq!(CorrectionError::Timeout.message_key(), "corrector.errors.timeout");
        assert_eq!(CorrectionError::EmptyResponse.message_key(), "corrector.errors.unknown");
        assert_eq!(
            SubmitError::QuotaExceeded { limit: 20 }.message_key(),
            "premium.limitReached"
        );
    }

    #[test]
    fn test_display() {
        let err = SubmitError::QuotaExceeded { limit: 20 };
        assert_eq!(err.to_string(), "daily limit of 20 corrections reached");
    }
}

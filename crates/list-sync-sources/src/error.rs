use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Status and server-provided detail of a failed HTTP call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpFailure {
    pub status: u16,
    /// The `error` field of the response body, when present
    pub code: Option<String>,
    /// The `error_description` field of the response body, when present
    pub description: Option<String>,
    pub retry_after: Option<Duration>,
}

impl HttpFailure {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            code: None,
            description: None,
            retry_after: None,
        }
    }
}

impl fmt::Display for HttpFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.code, &self.description) {
            (Some(code), Some(description)) => {
                write!(f, "status {}: {} - {}", self.status, code, description)
            }
            (Some(code), None) => write!(f, "status {}: {}", self.status, code),
            _ => write!(f, "status {}", self.status),
        }
    }
}

/// Errors surfaced by the Trakt request executor.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("rate limited by Trakt ({0})")]
    RateLimited(HttpFailure),

    #[error("Trakt server error ({0})")]
    Server(HttpFailure),

    #[error("Trakt rejected the request ({0})")]
    Client(HttpFailure),

    #[error("failed to decode Trakt response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),
}

impl ApiError {
    /// Classify a non-success HTTP response.
    pub fn from_failure(failure: HttpFailure) -> Self {
        match failure.status {
            429 => ApiError::RateLimited(failure),
            500..=599 => ApiError::Server(failure),
            _ => ApiError::Client(failure),
        }
    }

    /// Whether the executor may try the same request again.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Network(e) => e.is_timeout() || e.is_connect() || e.is_request() || e.is_body(),
            ApiError::RateLimited(_) | ApiError::Server(_) => true,
            ApiError::Client(_) | ApiError::Decode(_) | ApiError::Encode(_) => false,
        }
    }

    pub fn failure(&self) -> Option<&HttpFailure> {
        match self {
            ApiError::RateLimited(f) | ApiError::Server(f) | ApiError::Client(f) => Some(f),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.failure().map(|f| f.status)
    }

    pub fn code(&self) -> Option<&str> {
        self.failure().and_then(|f| f.code.as_deref())
    }

    pub fn retry_after(&self) -> Option<Duration> {
        self.failure().and_then(|f| f.retry_after)
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Errors from the device authorization and token refresh flows.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authorization was denied")]
    Denied,

    #[error("device code expired before authorization completed")]
    Expired,

    #[error("timed out waiting for authorization after {}s", .0.as_secs())]
    TimedOut(Duration),

    #[error("no refresh token available, run `trakt-sync auth` first")]
    NoRefreshToken,

    #[error(transparent)]
    Api(#[from] ApiError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_by_status() {
        assert!(matches!(ApiError::from_failure(HttpFailure::new(429)), ApiError::RateLimited(_)));
        assert!(matches!(ApiError::from_failure(HttpFailure::new(503)), ApiError::Server(_)));
        assert!(matches!(ApiError::from_failure(HttpFailure::new(404)), ApiError::Client(_)));
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(ApiError::from_failure(HttpFailure::new(429)).is_retryable());
        assert!(ApiError::from_failure(HttpFailure::new(502)).is_retryable());
        assert!(!ApiError::from_failure(HttpFailure::new(401)).is_retryable());
        assert!(!ApiError::from_failure(HttpFailure::new(404)).is_retryable());
    }

    #[test]
    fn test_failure_details_preserved() {
        let err = ApiError::from_failure(HttpFailure {
            status: 400,
            code: Some("invalid_grant".to_string()),
            description: Some("The provided authorization grant is invalid".to_string()),
            retry_after: None,
        });

        assert_eq!(err.status(), Some(400));
        assert_eq!(err.code(), Some("invalid_grant"));
        assert!(err.to_string().contains("invalid_grant - The provided authorization grant"));
        assert!(!err.is_not_found());
    }
}

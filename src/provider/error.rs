use reqwest::StatusCode;
use thiserror::Error;

/// How the engine should react to a failed provider request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Rate limit hit: back off and retry the same request.
    Throttling,
    /// Timeout, transport failure or server error: retry with the current interval.
    Transient,
    /// Retrying the same request cannot succeed.
    Fatal,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider throttled the request to {url} with status {status}")]
    Throttled { url: String, status: StatusCode },

    #[error("Provider at {url} is unavailable (status {status})")]
    Unavailable { url: String, status: StatusCode },

    #[error("Request to {0} timed out")]
    Timeout(String, #[source] reqwest::Error),

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("Provider rejected the request to {url} with status {status}: {reason}")]
    Rejected {
        url: String,
        status: StatusCode,
        reason: String,
    },

    #[error("Failed to parse provider response from {0}")]
    ResponseParse(String, #[source] reqwest::Error),

    #[error("Provider returned {found} results for {expected} coordinates")]
    LengthMismatch { expected: usize, found: usize },
}

impl ProviderError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ProviderError::Throttled { .. } => FailureKind::Throttling,
            ProviderError::Unavailable { .. }
            | ProviderError::Timeout(..)
            | ProviderError::NetworkRequest(..)
            | ProviderError::ResponseParse(..) => FailureKind::Transient,
            ProviderError::Rejected { .. } | ProviderError::LengthMismatch { .. } => {
                FailureKind::Fatal
            }
        }
    }

    /// Maps a non-success HTTP status onto the error taxonomy.
    pub(crate) fn from_status(url: &str, status: StatusCode, reason: String) -> Self {
        let url = url.to_string();
        // Open-Meteo answers 403 once the request rate is too high.
        if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::FORBIDDEN {
            ProviderError::Throttled { url, status }
        } else if status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT {
            ProviderError::Unavailable { url, status }
        } else {
            ProviderError::Rejected {
                url,
                status,
                reason,
            }
        }
    }

    pub(crate) fn from_transport(url: &str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            ProviderError::Timeout(url.to_string(), error)
        } else {
            ProviderError::NetworkRequest(url.to_string(), error)
        }
    }
}

//! Typed errors for calls to the documentation service and the Glean API.

use thiserror::Error;

/// Failure of a single retrieval or upload operation.
///
/// A non-success HTTP response is reported as [`FetchError::Retrieval`]
/// carrying the upstream status text; transport-level failures surface as
/// [`FetchError::Network`]. Neither is retried at this layer.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The upstream service answered with a non-success status.
    #[error("{status_text} (HTTP {status})")]
    Retrieval { status: u16, status_text: String },

    /// The request never completed (connect, timeout, or body read failure).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The credential collaborator failed to mint a service token.
    #[error("failed to acquire service token: {0}")]
    Token(anyhow::Error),
}

impl FetchError {
    /// Builds a [`FetchError::Retrieval`] from a response status.
    pub fn from_status(status: reqwest::StatusCode) -> Self {
        FetchError::Retrieval {
            status: status.as_u16(),
            status_text: status
                .canonical_reason()
                .unwrap_or("unknown status")
                .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retrieval_error_carries_status_text() {
        let err = FetchError::from_status(reqwest::StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Not Found (HTTP 404)");
    }
}

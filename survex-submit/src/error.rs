use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Remote submission is not configured: {0}")]
    NotConfigured(String),

    #[error("No usable credentials in {}; run `survex authorize` once", .0.display())]
    AuthorizationRequired(PathBuf),

    #[error("Token file error: {0}")]
    TokenFile(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Spreadsheet API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("CSV export failed: {0}")]
    Csv(String),
}

impl SubmitError {
    /// True when resubmitting the same row might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SubmitError::Network(_) | SubmitError::Timeout | SubmitError::RateLimited
        ) || matches!(self, SubmitError::Api { status, .. } if *status >= 500)
    }

    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SubmitError::Timeout
        } else {
            SubmitError::Network(e.to_string())
        }
    }
}

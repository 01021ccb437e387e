//! Completion backend errors

use crate::util::retry::RateLimited;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while talking to a completion backend
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// API request failed with the given message
    #[error("API error{}: {message}", .status_code.map(|c| format!(" ({})", c)).unwrap_or_default())]
    ApiError {
        message: String,
        status_code: Option<u16>,
    },

    /// Request timed out after the specified duration (in seconds)
    #[error("Request timed out after {seconds} seconds")]
    TimeoutError { seconds: u64 },

    /// The backend answered with a rate-limit response
    #[error("Rate limited by completion service")]
    RateLimitError { retry_after: Option<Duration> },

    /// Rate limited on every attempt
    #[error("Rate limit exceeded after {attempts} attempts")]
    RateLimitExceeded { attempts: u32 },

    /// Invalid or malformed response from the model
    #[error("Invalid response from completion service: {message}")]
    InvalidResponse { message: String },

    /// Missing API key or invalid settings
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Error: {message}")]
    Other { message: String },
}

impl BackendError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, BackendError::RateLimitError { .. })
    }
}

impl RateLimited for BackendError {
    fn is_rate_limited(&self) -> bool {
        self.is_rate_limit()
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            BackendError::RateLimitError { retry_after } => *retry_after,
            _ => None,
        }
    }

    fn exhausted(attempts: u32) -> Self {
        BackendError::RateLimitExceeded { attempts }
    }
}

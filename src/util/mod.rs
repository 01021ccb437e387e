//! Shared helpers: logging setup and rate-limit retry

pub mod logging;
pub mod retry;

pub use logging::{init_default, init_from_env, init_logging, LoggingConfig};
pub use retry::{RateLimited, RetryPolicy};

//! E-commerce platform collaborator: read-only customer tag lookup.
//!
//! Used by the identity resolver when an order event carries an external
//! customer id but no tags. Calls are bounded by a short timeout and
//! best-effort: a failure means "no tags", never a processing error.

use async_trait::async_trait;
use std::fmt;

pub mod http;
pub mod mock;

pub use http::HttpCommercePlatform;
pub use mock::MockCommercePlatform;

/// Read-only collaborator interface to the e-commerce platform.
#[async_trait]
pub trait CommercePlatform: Send + Sync + fmt::Debug {
    /// Fetch the free-text tags of a platform customer.
    ///
    /// # Returns
    /// The customer's tags, already split and trimmed.
    async fn fetch_customer_tags(
        &self,
        external_customer_id: &str,
    ) -> Result<Vec<String>, PlatformError>;
}

/// Error type for platform collaborator calls.
#[derive(Debug, Clone)]
pub enum PlatformError {
    /// Network error (e.g., connection timeout, DNS failure)
    NetworkError(String),
    /// HTTP error (e.g., 429 rate limit, 5xx server error)
    HttpError { status: u16, message: String },
    /// Parsing error (invalid JSON or malformed response)
    ParseError(String),
    /// Other error
    Other(String),
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            PlatformError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            PlatformError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            PlatformError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for PlatformError {}

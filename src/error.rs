/* src/error.rs */

use thiserror::Error;

/// Result type alias for operations that may fail with `RealIpError`.
pub type Result<T> = std::result::Result<T, RealIpError>;

/// Errors that can occur while classifying a candidate address.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RealIpError {
    /// The candidate is not an IPv4 or IPv6 literal.
    #[error("Invalid IP address format: {0:?}")]
    InvalidIpFormat(String),
}

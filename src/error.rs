//! Error types for rs-product-extract.
//!
//! Every failure that can reach the ingestion boundary is one of these variants.
//! Failures inside a single sub-extractor or a single manual never surface here;
//! they are logged and recorded as diagnostics instead.

use serde::Serialize;

/// Error type for ingestion operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The target URL is missing, malformed, or not http(s).
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The target host resolves to a loopback, link-local or private range,
    /// or is a bare hostname with no public DNS shape.
    #[error("Blocked host: {0}")]
    BlockedHost(String),

    /// Required configuration is not set.
    #[error("Missing configuration: {0}")]
    MissingConfig(&'static str),

    /// Configuration is present but unusable (e.g. a vocabulary pattern does not compile).
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The render service (or a direct fetch) answered with a non-2xx status.
    #[error("Upstream returned HTTP {status} for {url}")]
    Upstream {
        /// HTTP status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// Network-level failure (DNS, connect, TLS, body read).
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// A single attempt exceeded its timeout.
    #[error("Request timed out after {0} ms")]
    Timeout(u128),

    /// The response body exceeded the configured byte cap.
    #[error("Response exceeded {limit} bytes")]
    TooLarge {
        /// Byte cap that was exceeded.
        limit: usize,
    },

    /// No extractable name or description was found in the document.
    #[error("No extractable product name or description found")]
    NoContent,

    /// Unexpected internal failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// HTTP-equivalent status code for the boundary layer.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidUrl(_) | Self::BlockedHost(_) => 400,
            Self::NoContent => 422,
            Self::Upstream { .. } | Self::Http(_) | Self::TooLarge { .. } => 502,
            Self::Timeout(_) => 504,
            Self::MissingConfig(_) | Self::Config(_) | Self::Internal(_) => 500,
        }
    }

    /// Whether the fetch retry policy should try again after this error.
    ///
    /// Input and configuration errors are never retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Upstream { .. } | Self::Http(_) | Self::Timeout(_))
    }

    /// Whether this is a persistent gateway failure (502/503/504) from upstream,
    /// which makes the direct-fetch fallback worth trying.
    #[must_use]
    pub fn is_gateway_failure(&self) -> bool {
        matches!(self, Self::Upstream { status: 502..=504, .. })
    }

    /// Serializable `{error: message}` body.
    #[must_use]
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error: self.to_string(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}

/// Boundary error object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    /// Human-readable message.
    pub error: String,
}

/// Result type alias for ingestion operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(Error::InvalidUrl("x".into()).status_code(), 400);
        assert_eq!(Error::BlockedHost("127.0.0.1".into()).status_code(), 400);
        assert_eq!(Error::NoContent.status_code(), 422);
        assert_eq!(Error::MissingConfig("RENDER_API_URL").status_code(), 500);
        assert_eq!(Error::Timeout(20_000).status_code(), 504);
    }

    #[test]
    fn only_upstream_failures_are_retryable() {
        assert!(Error::Upstream { status: 503, url: "u".into() }.is_retryable());
        assert!(Error::Http("reset".into()).is_retryable());
        assert!(!Error::BlockedHost("10.0.0.1".into()).is_retryable());
        assert!(!Error::TooLarge { limit: 10 }.is_retryable());
    }

    #[test]
    fn gateway_failure_covers_502_to_504() {
        assert!(Error::Upstream { status: 502, url: "u".into() }.is_gateway_failure());
        assert!(Error::Upstream { status: 504, url: "u".into() }.is_gateway_failure());
        assert!(!Error::Upstream { status: 500, url: "u".into() }.is_gateway_failure());
        assert!(!Error::Http("x".into()).is_gateway_failure());
    }

    #[test]
    fn body_serializes_message() {
        let body = Error::NoContent.to_body();
        let json = serde_json::to_string(&body).unwrap_or_default();
        assert_eq!(json, r#"{"error":"No extractable product name or description found"}"#);
    }
}

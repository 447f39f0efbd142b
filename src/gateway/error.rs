//! Error types for the query gateway.

use std::time::Duration;
use thiserror::Error;

/// Additional context from upstream failures for debugging.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// HTTP status code returned by the backend.
    pub http_status: Option<u16>,
    /// Query name the failing call was issued for.
    pub query_name: Option<String>,
    /// Transaction id from the backend (x-transaction-id header).
    pub transaction_id: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    pub fn with_query(mut self, name: impl Into<String>) -> Self {
        self.query_name = Some(name.into());
        self
    }

    pub fn with_transaction_id(mut self, id: impl Into<String>) -> Self {
        self.transaction_id = Some(id.into());
        self
    }
}

/// Errors that can occur when dispatching a remote query.
///
/// Every variant is a transport-level failure from the orchestrator's point of
/// view and is eligible for fallback to another method.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Backend answered 429.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited {
        retry_after: Duration,
        context: Option<ErrorContext>,
    },

    /// Backend answered with a body that is not a JSON document.
    #[error("upstream error: {message}")]
    Upstream {
        message: String,
        context: Option<ErrorContext>,
    },

    /// Body was valid UTF-8 but not parseable as JSON.
    #[error("invalid response body: {0}")]
    InvalidBody(String),

    /// Body exceeded the streaming size cap.
    #[error("response too large: {0} bytes")]
    ResponseTooLarge(usize),

    /// Descriptor or method asked for the elevated path but none is configured.
    #[error("elevated path requested for {0} but no elevated route is configured")]
    ElevatedUnavailable(String),

    /// Dispatch exceeded its time bound.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// External cancellation fired while the dispatch was in flight.
    #[error("dispatch cancelled")]
    Cancelled,

    /// HTTP/network error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration error (bad base URL, bad token, ...).
    #[error("configuration error: {0}")]
    Config(String),
}

impl DispatchError {
    /// Create a rate limited error from a 429 response.
    pub fn rate_limited(retry_after: Duration, context: ErrorContext) -> Self {
        Self::RateLimited {
            retry_after,
            context: Some(context),
        }
    }

    /// Create an upstream error.
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
            context: None,
        }
    }

    /// Create an upstream error with context.
    pub fn upstream_with_context(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::Upstream {
            message: message.into(),
            context: Some(context),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether the failure came from timing out or being cancelled rather than
    /// from anything the backend said.
    pub fn is_interrupted(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Cancelled => true,
            Self::Http(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Get a short error code for logging.
    pub fn code(&self) -> &'static str {
        match self {
            Self::RateLimited { .. } => "rate_limited",
            Self::Upstream { .. } => "upstream_error",
            Self::InvalidBody(_) => "invalid_body",
            Self::ResponseTooLarge(_) => "response_too_large",
            Self::ElevatedUnavailable(_) => "elevated_unavailable",
            Self::Timeout(_) => "timeout",
            Self::Cancelled => "cancelled",
            Self::Http(_) => "http_error",
            Self::Config(_) => "config_error",
        }
    }

    /// Get the error context if available.
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Self::RateLimited { context, .. } => context.as_ref(),
            Self::Upstream { context, .. } => context.as_ref(),
            _ => None,
        }
    }

    /// HTTP status attached to the failure, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => self.context().and_then(|c| c.http_status),
        }
    }
}

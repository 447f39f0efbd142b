//! Usage tracking via the UsageSink trait.
//!
//! The gateway logs every wire call through a UsageSink. This decouples the
//! gateway from any specific storage backend:
//! - CLI uses StderrUsageSink when asked to
//! - Tests use NoopUsageSink or a collecting sink

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Status of a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    Success,
    Error,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Success => "success",
            CallStatus::Error => "error",
        }
    }
}

/// Record of one remote query dispatch.
#[derive(Debug, Clone)]
pub struct DispatchRecord {
    /// Query name, e.g. "TweetDetail".
    pub query_name: String,
    /// Upstream query id.
    pub query_id: String,
    /// Whether the elevated path was used.
    pub elevated: bool,
    /// HTTP status, when a response arrived.
    pub http_status: Option<u16>,
    /// Latency in milliseconds.
    pub latency_ms: i64,
    /// Call status.
    pub status: CallStatus,
    /// Error code if status is Error.
    pub error_code: Option<String>,
    /// Which code path made this call.
    pub caller: &'static str,
    /// Correlation id of the inbound request.
    pub request_id: Option<Uuid>,
    /// When the call was made.
    pub timestamp: DateTime<Utc>,
}

impl DispatchRecord {
    /// Create a new record with required fields, defaulting others.
    pub fn new(
        query_name: impl Into<String>,
        query_id: impl Into<String>,
        caller: &'static str,
    ) -> Self {
        Self {
            query_name: query_name.into(),
            query_id: query_id.into(),
            elevated: false,
            http_status: None,
            latency_ms: 0,
            status: CallStatus::Success,
            error_code: None,
            caller,
            request_id: None,
            timestamp: Utc::now(),
        }
    }

    pub fn elevated(mut self, elevated: bool) -> Self {
        self.elevated = elevated;
        self
    }

    pub fn http_status(mut self, status: Option<u16>) -> Self {
        self.http_status = status;
        self
    }

    pub fn latency(mut self, ms: i64) -> Self {
        self.latency_ms = ms;
        self
    }

    pub fn request(mut self, request_id: Option<Uuid>) -> Self {
        self.request_id = request_id;
        self
    }

    pub fn error(mut self, code: impl Into<String>) -> Self {
        self.status = CallStatus::Error;
        self.error_code = Some(code.into());
        self
    }
}

/// Trait for recording dispatch usage.
#[async_trait]
pub trait UsageSink: Send + Sync {
    /// Record a dispatch. This should be fire-and-forget:
    /// failures should be logged but not propagated.
    async fn record(&self, record: DispatchRecord);
}

/// No-op usage sink that discards all records.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopUsageSink;

#[async_trait]
impl UsageSink for NoopUsageSink {
    async fn record(&self, _record: DispatchRecord) {}
}

/// Usage sink that writes to stderr as JSON lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrUsageSink;

#[async_trait]
impl UsageSink for StderrUsageSink {
    async fn record(&self, record: DispatchRecord) {
        let line = serde_json::json!({
            "query": record.query_name,
            "query_id": record.query_id,
            "elevated": record.elevated,
            "http_status": record.http_status,
            "latency_ms": record.latency_ms,
            "status": record.status.as_str(),
            "error_code": record.error_code,
            "caller": record.caller,
            "request_id": record.request_id.map(|id| id.to_string()),
            "ts": record.timestamp.to_rfc3339(),
        });
        eprintln!("{line}");
    }
}

//! Per-key failure taxonomy for orchestration.

use thiserror::Error;

use crate::gateway::DispatchError;

/// Why one orchestrator key failed.
///
/// These never escape `orchestrate()` as a `Result::Err`; they are stored in
/// the key's outcome for the caller to inspect.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Transport failure of a single-query request.
    #[error("dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),

    /// Single-query request got a response its validator rejected.
    #[error("validation failed for {key} ({query})")]
    ValidationFailed { key: String, query: String },

    /// Every method was disabled or weighted zero; nothing was dispatched.
    #[error("no usable methods for {key}")]
    NoUsableMethod { key: String },

    /// Primary and every fallback failed.
    #[error("all {attempts} methods failed for {key}{}", last_error_suffix(.last_error))]
    AllMethodsFailed {
        key: String,
        attempts: usize,
        /// Last transport error seen, if any attempt failed that way.
        last_error: Option<Box<DispatchError>>,
    },

    /// Request carried an empty method list.
    #[error("request {key} has no query and no methods")]
    EmptyPlan { key: String },
}

fn last_error_suffix(last: &Option<Box<DispatchError>>) -> String {
    match last {
        Some(e) => format!(" (last error: {e})"),
        None => String::new(),
    }
}

impl OrchestratorError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Dispatch(e) => e.code(),
            Self::ValidationFailed { .. } => "validation_failed",
            Self::NoUsableMethod { .. } => "no_usable_method",
            Self::AllMethodsFailed { .. } => "all_methods_failed",
            Self::EmptyPlan { .. } => "empty_plan",
        }
    }

    /// Transport error underneath this failure, if there was one.
    pub fn dispatch_error(&self) -> Option<&DispatchError> {
        match self {
            Self::Dispatch(e) => Some(e),
            Self::AllMethodsFailed { last_error, .. } => last_error.as_deref(),
            _ => None,
        }
    }
}

//! Error types for thread reconstruction.

use thiserror::Error;

use crate::orchestrator::OrchestratorError;

/// Hard failure of a whole reconstruction.
#[derive(Debug, Error)]
pub enum ReconstructError {
    #[error("focal item {0} not found in first page")]
    FocalItemNotFound(String),
}

/// Failure to fetch one more page. Contained to the walk direction that
/// asked for it.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("page request failed: {0}")]
    Orchestration(#[from] OrchestratorError),

    #[error("page request returned no data")]
    Empty,

    #[error("malformed page: {0}")]
    MalformedPage(String),
}

impl FetchError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Orchestration(e) => e.code(),
            Self::Empty => "empty_page",
            Self::MalformedPage(_) => "malformed_page",
        }
    }
}

//! Canonical output shapes and the status-builder seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::item::Item;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub screen_name: Option<String>,
    pub name: Option<String>,
    /// Account-origin details, when the enrichment step found them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub about_account: Option<AboutAccount>,
}

/// Where an account says it is based and how it was created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AboutAccount {
    pub based_in: Option<String>,
    pub location_accurate: Option<bool>,
    pub created_country_accurate: Option<bool>,
    pub source: Option<String>,
    pub username_changes: Option<UsernameChanges>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsernameChanges {
    pub count: u64,
    /// RFC 3339, millisecond precision.
    pub last_changed_at: Option<String>,
}

/// One built status in provider-neutral form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub id: String,
    pub replying_to_status: Option<String>,
    pub conversation_id: Option<String>,
    pub text: String,
    pub created_at: Option<String>,
    pub author: Option<Author>,
}

/// Outcome of converting one item.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildOutcome {
    Built(Status),
    /// The item exists but may not be shown to us (protected account).
    Unauthorized,
    NotFound,
}

impl BuildOutcome {
    pub fn into_status(self) -> Option<Status> {
        match self {
            Self::Built(status) => Some(status),
            _ => None,
        }
    }
}

/// Converts items into canonical statuses.
///
/// Rendering, translation and media handling live behind this trait.
#[async_trait]
pub trait StatusBuilder: Send + Sync {
    async fn build(&self, item: &Item, thread_author: Option<&Author>) -> BuildOutcome;
}

/// Response handed to the HTTP-facing caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub status: Option<Status>,
    pub thread: Option<Vec<Status>>,
    pub author: Option<Author>,
    /// 200, 401 or 404.
    pub code: u16,
}

impl Thread {
    pub fn not_found() -> Self {
        Self::failed(404)
    }

    pub fn unauthorized() -> Self {
        Self::failed(401)
    }

    fn failed(code: u16) -> Self {
        Self {
            status: None,
            thread: None,
            author: None,
            code,
        }
    }

    pub fn single(status: Status) -> Self {
        Self {
            author: status.author.clone(),
            status: Some(status),
            thread: None,
            code: 200,
        }
    }

    pub fn with_thread(status: Status, thread: Vec<Status>) -> Self {
        Self {
            author: status.author.clone(),
            status: Some(status),
            thread: Some(thread),
            code: 200,
        }
    }
}

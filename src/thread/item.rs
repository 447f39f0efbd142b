//! Provider-neutral items and pagination cursors.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One post, reduced to the relationships the walk needs.
///
/// `raw` carries the provider payload untouched for the status builder.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: String,
    /// `None` or equal to `id` marks a root.
    pub parent_id: Option<String>,
    /// Grouping key used to scope thread continuation (the author's id).
    pub author_key: Option<String>,
    pub raw: Value,
}

impl Item {
    pub fn new(id: impl Into<String>, parent_id: Option<&str>, author_key: Option<&str>) -> Self {
        Self {
            id: id.into(),
            parent_id: parent_id.map(str::to_string),
            author_key: author_key.map(str::to_string),
            raw: Value::Null,
        }
    }

    pub fn with_raw(mut self, raw: Value) -> Self {
        self.raw = raw;
        self
    }

    /// No parent, or a parent pointing back at itself.
    pub fn is_root(&self) -> bool {
        match &self.parent_id {
            None => true,
            Some(parent) => parent == &self.id,
        }
    }

    /// Normalize a provider status object into an item.
    ///
    /// Returns `None` when the object carries no id.
    pub fn from_status(status: &Value) -> Option<Self> {
        let legacy = status.get("legacy");
        let id = status
            .get("rest_id")
            .and_then(Value::as_str)
            .or_else(|| legacy.and_then(|l| l.get("id_str")).and_then(Value::as_str))?;
        let parent_id = legacy
            .and_then(|l| l.get("in_reply_to_status_id_str"))
            .and_then(Value::as_str);
        let author_key = status
            .pointer("/core/user_results/result/rest_id")
            .and_then(Value::as_str);

        Some(Self::new(id, parent_id, author_key).with_raw(status.clone()))
    }
}

// =============================================================================
// CURSORS
// =============================================================================

/// Cursor kinds relevant to walking a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CursorDirection {
    Top,
    Bottom,
    ShowMore,
}

impl CursorDirection {
    /// Map an upstream `cursorType`; anything else is not a walk cursor.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "Top" => Some(Self::Top),
            "Bottom" => Some(Self::Bottom),
            "ShowMore" => Some(Self::ShowMore),
            _ => None,
        }
    }

    pub fn as_tag(&self) -> &'static str {
        match self {
            Self::Top => "Top",
            Self::Bottom => "Bottom",
            Self::ShowMore => "ShowMore",
        }
    }
}

/// Opaque pagination token; `value` is forwarded verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub direction: CursorDirection,
    pub value: String,
}

impl Cursor {
    pub fn new(direction: CursorDirection, value: impl Into<String>) -> Self {
        Self {
            direction,
            value: value.into(),
        }
    }
}

/// Which way a walk is going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkDirection {
    /// Replies below the focal item.
    Forward,
    /// Parent chain above the focal item.
    Backward,
}

impl WalkDirection {
    pub fn accepts(&self, cursor: CursorDirection) -> bool {
        matches!(
            (self, cursor),
            (Self::Forward, CursorDirection::Bottom | CursorDirection::ShowMore)
                | (Self::Backward, CursorDirection::Top | CursorDirection::ShowMore)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Backward => "backward",
        }
    }
}

// =============================================================================
// ID ORDERING
// =============================================================================

/// Compare decimal ids as unbounded non-negative integers.
///
/// Ids can exceed both `u64` and the 2^53 float range, so neither lexical nor
/// float comparison is correct. Non-numeric ids sort after numeric ones.
pub fn compare_ids(a: &str, b: &str) -> Ordering {
    match (digits(a), digits(b)) {
        (Some(a), Some(b)) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

fn digits(id: &str) -> Option<&str> {
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let trimmed = id.trim_start_matches('0');
    Some(if trimmed.is_empty() { "0" } else { trimmed })
}

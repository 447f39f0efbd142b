//! Response classification for the single-status and conversation queries.
//!
//! Each query family nests its result differently. The classifiers here map a
//! raw body to a [`ProviderResult`]; `None` means the body is not a shape we
//! recognize, which is what validators reject.

use serde_json::Value;

use crate::orchestrator::{validator, Validator};
use crate::thread::{build_bucket, status_from_result, Item};

/// What a single-status response says about the requested status.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderResult {
    /// A status object, already unwrapped from visibility wrappers.
    Found(Value),
    /// The status exists but is withheld (`Protected`, `NsfwLoggedOut`, ...).
    Unavailable { reason: String },
    NotPresent,
}

impl ProviderResult {
    pub fn is_protected(&self) -> bool {
        matches!(self, Self::Unavailable { reason } if reason == "Protected")
    }
}

/// Where a query family puts its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultShape {
    /// `data.tweetResult.result`
    ByRestId,
    /// `data.tweetResult[0].result`
    ByRestIds,
    /// `data.tweet_results[0].result`
    ByIds,
    /// `data.tweet_result.result`
    ById,
}

impl ResultShape {
    pub const ALL: [ResultShape; 4] = [Self::ByRestId, Self::ByRestIds, Self::ByIds, Self::ById];

    fn container<'a>(&self, response: &'a Value) -> Option<&'a Value> {
        let data = response.get("data")?;
        match self {
            Self::ByRestId | Self::ByRestIds => data.get("tweetResult"),
            Self::ByIds => data.get("tweet_results"),
            Self::ById => data.get("tweet_result"),
        }
    }

    fn result<'a>(&self, container: &'a Value) -> Option<&'a Value> {
        match self {
            Self::ByRestId | Self::ById => container.get("result"),
            Self::ByRestIds | Self::ByIds => container.get(0).and_then(|first| first.get("result")),
        }
    }
}

/// Classify `response` as one query family's shape.
pub fn classify(shape: ResultShape, response: &Value) -> Option<ProviderResult> {
    let container = shape.container(response);
    let result = container.and_then(|c| shape.result(c));

    if let Some(result) = result {
        if let Some(status) = status_from_result(result).filter(|s| Item::from_status(s).is_some()) {
            return Some(ProviderResult::Found(status.clone()));
        }
        if result.get("__typename").and_then(Value::as_str) == Some("TweetUnavailable") {
            let reason = result
                .get("reason")
                .and_then(Value::as_str)
                .unwrap_or("Unavailable")
                .to_string();
            return Some(ProviderResult::Unavailable { reason });
        }
    } else if container.is_some_and(is_empty_container) {
        return Some(ProviderResult::NotPresent);
    }

    has_errors(response).then_some(ProviderResult::NotPresent)
}

/// Classify a response of unknown family by trying every shape in turn.
pub fn classify_any(response: &Value) -> Option<ProviderResult> {
    ResultShape::ALL
        .iter()
        .find_map(|shape| match classify(*shape, response) {
            Some(ProviderResult::NotPresent) => None,
            other => other,
        })
        .or_else(|| {
            ResultShape::ALL
                .iter()
                .any(|shape| classify(*shape, response).is_some())
                .then_some(ProviderResult::NotPresent)
        })
}

fn is_empty_container(container: &Value) -> bool {
    match container {
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

pub fn has_errors(response: &Value) -> bool {
    response.get("errors").is_some_and(Value::is_array)
}

// =============================================================================
// CONVERSATION PAGES
// =============================================================================

/// Timeline instructions of a conversation page, if the body is one.
pub fn detail_instructions(response: &Value) -> Option<&Value> {
    response
        .pointer("/data/threaded_conversation_with_injections_v2/instructions")
        .filter(|v| v.is_array())
}

/// Whether the body is a conversation page at all (any status code).
pub fn is_detail_response(response: &Value) -> bool {
    response
        .pointer("/data/threaded_conversation_with_injections_v2")
        .is_some()
}

// =============================================================================
// VALIDATORS
// =============================================================================

/// Accepts any recognizable single-status answer, including negative ones.
pub fn status_validator(shape: ResultShape) -> Validator {
    validator(move |response| classify(shape, response).is_some())
}

/// Accepts a conversation page that carries timeline instructions.
pub fn page_validator() -> Validator {
    validator(|response| detail_instructions(response).is_some())
}

/// Accepts a first conversation page only if it contains the focal status,
/// or if upstream answered with a GraphQL error list.
pub fn first_page_validator(focal_id: impl Into<String>) -> Validator {
    let focal_id = focal_id.into();
    validator(move |response| {
        let found = detail_instructions(response)
            .map(build_bucket)
            .is_some_and(|bucket| bucket.find(&focal_id).is_some());
        found || has_errors(response)
    })
}

/// Accepts an account lookup that resolved to a user object.
pub fn about_account_validator() -> Validator {
    validator(|response| {
        response
            .pointer("/data/user_result_by_screen_name/result")
            .is_some_and(Value::is_object)
    })
}

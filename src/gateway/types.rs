//! Core types for the query gateway.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// JSON object passed as `variables` / `features` / `fieldToggles`.
pub type Variables = Map<String, Value>;

// =============================================================================
// ATTRIBUTION
// =============================================================================

/// Attribution for usage records and log correlation.
///
/// Every dispatch carries attribution so we know which code path issued it and
/// which inbound request it belongs to.
#[derive(Debug, Clone, Default)]
pub struct Attribution {
    /// Which code path made this call, e.g. "twitter::status".
    pub caller: &'static str,
    /// Correlation id of the inbound request (if any).
    pub request_id: Option<Uuid>,
}

impl Attribution {
    pub fn new(caller: &'static str) -> Self {
        Self {
            caller,
            ..Default::default()
        }
    }

    pub fn with_request(mut self, request_id: Uuid) -> Self {
        self.request_id = Some(request_id);
        self
    }
}

// =============================================================================
// QUERY DESCRIPTOR
// =============================================================================

/// HTTP verb used by a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

/// Immutable description of one remote query variant.
///
/// Descriptors are built once and shared by reference; nothing mutates them
/// after construction. `default_variables`, `features` and `field_toggles`
/// are opaque pass-through data and are serialized exactly as given.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescriptor {
    pub query_id: String,
    pub query_name: String,
    pub http_method: HttpMethod,
    /// Whether the query needs the elevated (pre-authenticated) path by default.
    pub requires_elevated: bool,
    pub default_variables: Variables,
    pub features: Option<Variables>,
    pub field_toggles: Option<Variables>,
}

impl QueryDescriptor {
    pub fn new(query_id: impl Into<String>, query_name: impl Into<String>) -> Self {
        Self {
            query_id: query_id.into(),
            query_name: query_name.into(),
            http_method: HttpMethod::Get,
            requires_elevated: false,
            default_variables: Variables::new(),
            features: None,
            field_toggles: None,
        }
    }

    pub fn elevated(mut self, requires_elevated: bool) -> Self {
        self.requires_elevated = requires_elevated;
        self
    }

    pub fn variables(mut self, variables: Value) -> Self {
        self.default_variables = into_object(variables);
        self
    }

    pub fn features(mut self, features: Value) -> Self {
        self.features = Some(into_object(features));
        self
    }

    pub fn field_toggles(mut self, toggles: Value) -> Self {
        self.field_toggles = Some(into_object(toggles));
        self
    }

    /// Relative request path: `/i/api/graphql/{id}/{name}`.
    pub fn path(&self) -> String {
        format!("/i/api/graphql/{}/{}", self.query_id, self.query_name)
    }

    /// Default variables overlaid with call-supplied ones; call keys win.
    pub fn merged_variables(&self, overrides: &Variables) -> Variables {
        let mut merged = self.default_variables.clone();
        merge_into(&mut merged, overrides);
        merged
    }
}

/// Shallow merge: every key of `overlay` replaces the same key in `base`.
pub fn merge_into(base: &mut Variables, overlay: &Variables) {
    for (k, v) in overlay {
        base.insert(k.clone(), v.clone());
    }
}

fn into_object(value: Value) -> Variables {
    match value {
        Value::Object(map) => map,
        _ => Variables::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn call_variables_win_over_defaults() {
        let desc = QueryDescriptor::new("abc", "TweetDetail")
            .variables(json!({"focalTweetId": 0, "withVoice": false, "cursor": null}));
        let mut call = Variables::new();
        call.insert("focalTweetId".into(), json!("20"));
        call.insert("cursor".into(), json!("c1"));

        let merged = desc.merged_variables(&call);
        assert_eq!(merged["focalTweetId"], json!("20"));
        assert_eq!(merged["cursor"], json!("c1"));
        assert_eq!(merged["withVoice"], json!(false));
        assert_eq!(desc.default_variables["focalTweetId"], json!(0));
    }

    #[test]
    fn path_contains_id_and_name() {
        let desc = QueryDescriptor::new("zAz9764BcLZOJ0JU2wrd1A", "TweetResultByRestId");
        assert_eq!(
            desc.path(),
            "/i/api/graphql/zAz9764BcLZOJ0JU2wrd1A/TweetResultByRestId"
        );
    }
}

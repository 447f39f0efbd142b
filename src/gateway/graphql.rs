//! GraphQL-over-GET adapter for the provider's private query backend.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

use super::error::{DispatchError, ErrorContext};
use super::types::*;
use crate::config::ClientConfig;

// =============================================================================
// TRAIT
// =============================================================================

/// Raw response from one wire call.
#[derive(Debug, Clone)]
pub struct WireResponse {
    pub body: Value,
    pub http_status: u16,
    pub latency: Duration,
}

/// Trait for transports that can put a fully-merged query on the wire.
#[async_trait]
pub trait QueryTransport: Send + Sync {
    async fn send(
        &self,
        descriptor: &QueryDescriptor,
        variables: &Variables,
        elevated: bool,
    ) -> Result<WireResponse, DispatchError>;
}

// =============================================================================
// GRAPHQL ADAPTER
// =============================================================================

/// Maximum allowed response body length (4MB).
const MAX_RESPONSE_LEN: usize = 4 * 1_024 * 1_024;

pub const DEFAULT_BASE_URL: &str = "https://x.com";

#[derive(Debug, Clone)]
struct Route {
    client: reqwest::Client,
    base_url: String,
}

/// Adapter that serializes descriptors into the upstream URL shape.
///
/// Guest dispatches go to `base_url`; elevated dispatches go to the
/// pre-authenticated proxy at `elevated_base_url`. Session acquisition for the
/// proxy happens elsewhere.
#[derive(Debug, Clone)]
pub struct GraphqlAdapter {
    guest: Route,
    elevated: Option<Route>,
}

impl GraphqlAdapter {
    /// Guest-only adapter against the public host.
    pub fn new() -> Result<Self, DispatchError> {
        Self::with_config(DEFAULT_BASE_URL, None, Duration::from_secs(20), None)
    }

    /// Create from environment variables (see [`ClientConfig::from_env`]).
    pub fn from_env() -> Result<Self, DispatchError> {
        ClientConfig::from_env()
            .map_err(|e| DispatchError::config(e.to_string()))?
            .adapter()
    }

    /// Create with custom configuration.
    pub fn with_config(
        base_url: impl Into<String>,
        elevated_base_url: Option<String>,
        timeout: Duration,
        bearer_token: Option<String>,
    ) -> Result<Self, DispatchError> {
        let mut headers = HeaderMap::new();
        if let Some(ref token) = bearer_token {
            let auth_value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| DispatchError::config("Invalid bearer token format"))?;
            headers.insert(AUTHORIZATION, auth_value);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .gzip(true)
            .build()
            .map_err(|e| DispatchError::config(format!("Failed to create HTTP client: {e}")))?;

        let guest = Route {
            client: client.clone(),
            base_url: trim_base(base_url.into()),
        };
        let elevated = elevated_base_url.map(|url| Route {
            client,
            base_url: trim_base(url),
        });

        Ok(Self { guest, elevated })
    }

    /// Whether an elevated route is configured.
    pub fn has_elevated(&self) -> bool {
        self.elevated.is_some()
    }

    fn route(&self, descriptor: &QueryDescriptor, elevated: bool) -> Result<&Route, DispatchError> {
        if !elevated {
            return Ok(&self.guest);
        }
        self.elevated
            .as_ref()
            .ok_or_else(|| DispatchError::ElevatedUnavailable(descriptor.query_name.clone()))
    }

    /// Query-string pairs in wire order: variables, features, fieldToggles.
    pub fn query_params(
        descriptor: &QueryDescriptor,
        variables: &Variables,
    ) -> Result<Vec<(&'static str, String)>, DispatchError> {
        let encode = |v: &Variables| {
            serde_json::to_string(v)
                .map_err(|e| DispatchError::config(format!("Unserializable variables: {e}")))
        };

        let mut params = vec![("variables", encode(variables)?)];
        if let Some(features) = &descriptor.features {
            params.push(("features", encode(features)?));
        }
        if let Some(toggles) = &descriptor.field_toggles {
            params.push(("fieldToggles", encode(toggles)?));
        }
        Ok(params)
    }

    fn extract_transaction_id(headers: &HeaderMap) -> Option<String> {
        headers
            .get("x-transaction-id")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    }
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

// =============================================================================
// TRANSPORT IMPL
// =============================================================================

#[async_trait]
impl QueryTransport for GraphqlAdapter {
    async fn send(
        &self,
        descriptor: &QueryDescriptor,
        variables: &Variables,
        elevated: bool,
    ) -> Result<WireResponse, DispatchError> {
        let route = self.route(descriptor, elevated)?;
        let url = format!("{}{}", route.base_url, descriptor.path());
        let params = Self::query_params(descriptor, variables)?;

        let start = Instant::now();
        let builder = match descriptor.http_method {
            HttpMethod::Get => route.client.get(&url),
            HttpMethod::Post => route.client.post(&url),
        };
        let mut response = builder.query(&params).send().await?;

        let status = response.status();
        let ctx = ErrorContext::new()
            .with_status(status.as_u16())
            .with_query(&descriptor.query_name);
        let ctx = match Self::extract_transaction_id(response.headers()) {
            Some(id) => ctx.with_transaction_id(id),
            None => ctx,
        };

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("x-rate-limit-reset")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<i64>().ok())
                .map(|reset| (reset - chrono::Utc::now().timestamp()).max(0) as u64)
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(60));
            return Err(DispatchError::rate_limited(retry_after, ctx));
        }

        // Stream response to enforce size limit
        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            let new_len = bytes.len() + chunk.len();
            if new_len > MAX_RESPONSE_LEN {
                return Err(DispatchError::ResponseTooLarge(new_len));
            }
            bytes.extend_from_slice(&chunk);
        }

        // Content decides validity, not status: the backend answers 404/403
        // with well-formed error documents that validators understand.
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(body @ Value::Object(_)) => Ok(WireResponse {
                body,
                http_status: status.as_u16(),
                latency: start.elapsed(),
            }),
            Ok(_) => Err(DispatchError::upstream_with_context(
                "Response body is not a JSON object",
                ctx,
            )),
            Err(e) if status.is_success() => Err(DispatchError::InvalidBody(e.to_string())),
            Err(_) => Err(DispatchError::upstream_with_context(
                format!("HTTP {}", status.as_u16()),
                ctx,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn params_omit_absent_features_and_toggles() {
        let desc = QueryDescriptor::new("id", "UserByScreenName");
        let mut vars = Variables::new();
        vars.insert("screen_name".into(), json!("jack"));
        let params = GraphqlAdapter::query_params(&desc, &vars).unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].0, "variables");
        assert_eq!(params[0].1, r#"{"screen_name":"jack"}"#);
    }

    #[test]
    fn params_keep_wire_order() {
        let desc = QueryDescriptor::new("id", "TweetDetail")
            .features(json!({"a": true}))
            .field_toggles(json!({"withArticleRichContentState": true}));
        let params = GraphqlAdapter::query_params(&desc, &Variables::new()).unwrap();
        let names: Vec<_> = params.iter().map(|(k, _)| *k).collect();
        assert_eq!(names, vec!["variables", "features", "fieldToggles"]);
    }

    #[test]
    fn elevated_without_route_is_rejected() {
        let adapter =
            GraphqlAdapter::with_config("http://localhost", None, Duration::from_secs(1), None)
                .unwrap();
        let desc = QueryDescriptor::new("id", "TweetDetail");
        let err = adapter.route(&desc, true).unwrap_err();
        assert!(matches!(err, DispatchError::ElevatedUnavailable(name) if name == "TweetDetail"));
        assert!(adapter.route(&desc, false).is_ok());
    }
}

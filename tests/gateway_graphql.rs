use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use threadweave::gateway::graphql::GraphqlAdapter;
use threadweave::gateway::{
    Attribution, CallStatus, DispatchError, DispatchRecord, GatewayConfig, NoopUsageSink,
    QueryDescriptor, QueryGateway, UsageSink, Variables,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct CollectingSink {
    records: Mutex<Vec<DispatchRecord>>,
}

#[async_trait]
impl UsageSink for CollectingSink {
    async fn record(&self, record: DispatchRecord) {
        self.records.lock().unwrap().push(record);
    }
}

fn descriptor() -> QueryDescriptor {
    QueryDescriptor::new("abc123", "TweetResultByRestId")
        .variables(json!({"withVoice": false, "tweetId": "0"}))
        .features(json!({"articles_preview_enabled": true}))
}

fn vars(value: Value) -> Variables {
    match value {
        Value::Object(map) => map,
        _ => Variables::new(),
    }
}

fn gateway<U: UsageSink>(
    base: String,
    elevated: Option<String>,
    sink: Arc<U>,
) -> QueryGateway<U, GraphqlAdapter> {
    let adapter = GraphqlAdapter::with_config(base, elevated, Duration::from_secs(5), None).unwrap();
    QueryGateway::with_config(adapter, sink, GatewayConfig::default())
}

fn query_json(request: &wiremock::Request, key: &str) -> Option<Value> {
    request
        .url
        .query_pairs()
        .find(|(k, _)| k == key)
        .and_then(|(_, v)| serde_json::from_str(&v).ok())
}

#[tokio::test]
async fn dispatch_builds_graphql_url_and_encodes_params() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/i/api/graphql/abc123/TweetResultByRestId"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"ok": true}})))
        .expect(1)
        .mount(&server)
        .await;

    let gw = gateway(server.uri(), None, Arc::new(NoopUsageSink));
    let body = gw
        .dispatch(
            &descriptor(),
            &vars(json!({"tweetId": "42"})),
            false,
            &Attribution::new("test"),
        )
        .await
        .unwrap();
    assert_eq!(body, json!({"data": {"ok": true}}));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        query_json(&requests[0], "variables"),
        Some(json!({"withVoice": false, "tweetId": "42"}))
    );
    assert_eq!(
        query_json(&requests[0], "features"),
        Some(json!({"articles_preview_enabled": true}))
    );
    assert_eq!(query_json(&requests[0], "fieldToggles"), None);
}

#[tokio::test]
async fn elevated_dispatch_uses_the_proxy_route() {
    let guest = MockServer::start().await;
    let proxy = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/i/api/graphql/abc123/TweetResultByRestId"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"via": "proxy"}})))
        .expect(1)
        .mount(&proxy)
        .await;

    let gw = gateway(guest.uri(), Some(proxy.uri()), Arc::new(NoopUsageSink));
    let body = gw
        .dispatch(&descriptor(), &Variables::new(), true, &Attribution::new("test"))
        .await
        .unwrap();
    assert_eq!(body["data"]["via"], "proxy");
    assert!(guest.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn elevated_without_proxy_fails_before_the_wire() {
    let server = MockServer::start().await;
    let sink = Arc::new(CollectingSink::default());
    let gw = gateway(server.uri(), None, sink.clone());

    let err = gw
        .dispatch(&descriptor(), &Variables::new(), true, &Attribution::new("test"))
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::ElevatedUnavailable(_)));
    assert!(server.received_requests().await.unwrap().is_empty());

    let records = sink.records.lock().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].error_code.as_deref(), Some("elevated_unavailable"));
}

#[tokio::test]
async fn rate_limit_is_an_error_with_reset() {
    let server = MockServer::start().await;
    let reset = chrono::Utc::now().timestamp() + 30;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("x-rate-limit-reset", reset.to_string().as_str())
                .set_body_json(json!({"errors": [{"message": "Rate limit exceeded"}]})),
        )
        .mount(&server)
        .await;

    let gw = gateway(server.uri(), None, Arc::new(NoopUsageSink));
    let err = gw
        .dispatch(&descriptor(), &Variables::new(), false, &Attribution::new("test"))
        .await
        .unwrap_err();
    match err {
        DispatchError::RateLimited { retry_after, .. } => {
            assert!(retry_after <= Duration::from_secs(30));
            assert!(retry_after >= Duration::from_secs(25));
        }
        other => panic!("expected rate limit, got {other:?}"),
    }
}

#[tokio::test]
async fn error_documents_are_returned_for_validators() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({"errors": [{"message": "_Missing: No status found"}]})),
        )
        .mount(&server)
        .await;

    let sink = Arc::new(CollectingSink::default());
    let gw = gateway(server.uri(), None, sink.clone());
    let body = gw
        .dispatch(&descriptor(), &Variables::new(), false, &Attribution::new("test"))
        .await
        .unwrap();
    assert!(body["errors"].is_array());

    let records = sink.records.lock().unwrap();
    assert_eq!(records[0].status, CallStatus::Success);
    assert_eq!(records[0].http_status, Some(404));
    assert_eq!(records[0].query_name, "TweetResultByRestId");
}

#[tokio::test]
async fn non_json_error_pages_are_upstream_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("<html>down</html>"))
        .mount(&server)
        .await;

    let gw = gateway(server.uri(), None, Arc::new(NoopUsageSink));
    let err = gw
        .dispatch(&descriptor(), &Variables::new(), false, &Attribution::new("test"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "upstream_error");
    assert_eq!(err.http_status(), Some(503));
}

#[tokio::test]
async fn dispatch_timeout_bounds_slow_responses() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": {}}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let adapter =
        GraphqlAdapter::with_config(server.uri(), None, Duration::from_secs(5), None).unwrap();
    let gw = QueryGateway::with_config(
        adapter,
        Arc::new(NoopUsageSink),
        GatewayConfig {
            dispatch_timeout: Duration::from_millis(100),
        },
    );
    let err = gw
        .dispatch(&descriptor(), &Variables::new(), false, &Attribution::new("test"))
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::Timeout(_)));
    assert!(err.is_interrupted());
}

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use threadweave::gateway::graphql::GraphqlAdapter;
use threadweave::gateway::{GatewayConfig, NoopUsageSink, QueryGateway};
use threadweave::orchestrator::{RunOptions, WeightPolicy};
use threadweave::{BasicStatusBuilder, TwitterThreads};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const DETAIL_PATH: &str = "/i/api/graphql/_8aYOgEDz35BrBcBal1-_w/TweetDetail";
const BY_REST_ID_PATH: &str = "/i/api/graphql/zAz9764BcLZOJ0JU2wrd1A/TweetResultByRestId";
const BY_ID_PATH: &str = "/i/api/graphql/FwLfaByYlUhvhcLp3nWINQ/TweetResultByIdQuery";
const ABOUT_PATH: &str = "/i/api/graphql/zs_jFPFT78rBpXv9Z3U2YQ/AboutAccountQuery";

type Threads = TwitterThreads<QueryGateway<NoopUsageSink, GraphqlAdapter>, BasicStatusBuilder>;

fn threads(guest: &MockServer, proxy: Option<&MockServer>) -> Threads {
    let adapter = GraphqlAdapter::with_config(
        guest.uri(),
        proxy.map(|p| p.uri()),
        Duration::from_secs(5),
        None,
    )
    .unwrap();
    let gateway = QueryGateway::with_config(adapter, Arc::new(NoopUsageSink), GatewayConfig::default());
    TwitterThreads::new(Arc::new(gateway), Arc::new(BasicStatusBuilder))
        .with_options(RunOptions::new("test").seeded(1))
        .elevated_available(proxy.is_some())
}

fn tweet(id: &str, parent: Option<&str>, author: &str) -> Value {
    json!({
        "__typename": "Tweet",
        "rest_id": id,
        "core": {"user_results": {"result": {
            "rest_id": author,
            "legacy": {"screen_name": format!("user{author}"), "name": "User"}
        }}},
        "legacy": {
            "id_str": id,
            "full_text": format!("text {id}"),
            "conversation_id_str": "100",
            "in_reply_to_status_id_str": parent
        }
    })
}

fn detail_page(tweets: Vec<Value>, cursors: &[(&str, &str)]) -> Value {
    let mut entries: Vec<Value> = tweets
        .into_iter()
        .map(|t| {
            json!({
                "entryId": "tweet",
                "content": {
                    "__typename": "TimelineTimelineItem",
                    "itemContent": {"__typename": "TimelineTweet", "tweet_results": {"result": t}}
                }
            })
        })
        .collect();
    for (kind, value) in cursors {
        entries.push(json!({
            "entryId": "cursor",
            "content": {
                "__typename": "TimelineTimelineItem",
                "itemContent": {
                    "__typename": "TimelineTimelineCursor",
                    "cursorType": kind,
                    "value": value
                }
            }
        }));
    }
    json!({"data": {"threaded_conversation_with_injections_v2": {"instructions": [
        {"type": "TimelineAddEntries", "entries": entries}
    ]}}})
}

fn variables_of(request: &Request) -> Value {
    request
        .url
        .query_pairs()
        .find(|(k, _)| k == "variables")
        .and_then(|(_, v)| serde_json::from_str(&v).ok())
        .unwrap_or(Value::Null)
}

async fn mount_two_status_thread(proxy: &MockServer) {
    Mock::given(method("GET"))
        .and(path(DETAIL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(detail_page(
            vec![tweet("100", None, "1"), tweet("101", Some("100"), "1")],
            &[],
        )))
        .mount(proxy)
        .await;
}

/// Serves conversation pages keyed by the `cursor` variable.
struct PagesByCursor {
    first: Value,
    by_cursor: Vec<(&'static str, Value)>,
}

impl Respond for PagesByCursor {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let variables = variables_of(request);
        let body = match variables.get("cursor").and_then(Value::as_str) {
            None => self.first.clone(),
            Some(cursor) => self
                .by_cursor
                .iter()
                .find(|(c, _)| *c == cursor)
                .map(|(_, page)| page.clone())
                .unwrap_or_else(|| json!({"errors": [{"message": "bad cursor"}]})),
        };
        ResponseTemplate::new(200).set_body_json(body)
    }
}

#[tokio::test]
async fn guest_only_status_uses_rest_id_query() {
    let guest = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(BY_REST_ID_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"tweetResult": {"result": tweet("100", None, "1")}}
        })))
        .expect(1)
        .mount(&guest)
        .await;

    let result = threads(&guest, None)
        .construct_thread("100", false, &CancellationToken::new())
        .await;

    assert_eq!(result.code, 200);
    let status = result.status.unwrap();
    assert_eq!(status.id, "100");
    assert_eq!(status.text, "text 100");
    assert_eq!(result.author.unwrap().screen_name.as_deref(), Some("user1"));
    assert!(result.thread.is_none());
}

#[tokio::test]
async fn protected_status_is_401_and_missing_is_404() {
    let guest = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(BY_REST_ID_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"tweetResult": {"result": {"__typename": "TweetUnavailable", "reason": "Protected"}}}
        })))
        .mount(&guest)
        .await;
    let result = threads(&guest, None)
        .construct_thread("5", false, &CancellationToken::new())
        .await;
    assert_eq!(result.code, 401);
    assert!(result.status.is_none());

    let empty = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(BY_REST_ID_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"tweetResult": {}}})))
        .mount(&empty)
        .await;
    let result = threads(&empty, None)
        .construct_thread("5", false, &CancellationToken::new())
        .await;
    assert_eq!(result.code, 404);
}

#[tokio::test]
async fn upstream_outage_is_404() {
    let guest = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
        .mount(&guest)
        .await;

    let result = threads(&guest, None)
        .construct_thread("5", true, &CancellationToken::new())
        .await;
    assert_eq!(result.code, 404);
    assert!(result.thread.is_none());
}

#[tokio::test]
async fn thread_walks_pages_through_the_proxy() {
    let guest = MockServer::start().await;
    let proxy = MockServer::start().await;

    let first = detail_page(
        vec![
            tweet("100", None, "1"),
            tweet("101", Some("100"), "1"),
            tweet("150", Some("100"), "2"),
        ],
        &[("Bottom", "c1")],
    );
    let second = detail_page(vec![tweet("102", Some("101"), "1")], &[]);
    Mock::given(method("GET"))
        .and(path(DETAIL_PATH))
        .respond_with(PagesByCursor {
            first,
            by_cursor: vec![("c1", second)],
        })
        .mount(&proxy)
        .await;

    let result = threads(&guest, Some(&proxy))
        .construct_thread("100", true, &CancellationToken::new())
        .await;

    assert_eq!(result.code, 200);
    assert_eq!(result.status.as_ref().unwrap().id, "100");
    let thread: Vec<String> = result
        .thread
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(thread, vec!["100", "101", "102"]);
    assert!(guest.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn single_status_escalates_to_conversation_page() {
    let guest = MockServer::start().await;
    let proxy = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(BY_REST_ID_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"tweetResult": {"result": tweet("201", Some("200"), "1")}}
        })))
        .mount(&guest)
        .await;
    Mock::given(method("GET"))
        .and(path(DETAIL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(detail_page(
            vec![tweet("200", None, "1"), tweet("201", Some("200"), "1")],
            &[],
        )))
        .expect(1)
        .mount(&proxy)
        .await;

    let weights = WeightPolicy::new()
        .disable("TweetDetail")
        .with_weight("TweetResultByRestId", 1.0);
    let result = threads(&guest, Some(&proxy))
        .with_weights(weights)
        .construct_thread("201", true, &CancellationToken::new())
        .await;

    assert_eq!(result.code, 200);
    let ids: Vec<String> = result.thread.unwrap().into_iter().map(|s| s.id).collect();
    assert_eq!(ids, vec!["200", "201"]);
}

#[tokio::test]
async fn failed_escalation_returns_the_single_status() {
    let guest = MockServer::start().await;
    let proxy = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(BY_REST_ID_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"tweetResult": {"result": tweet("301", Some("300"), "1")}}
        })))
        .mount(&guest)
        .await;
    Mock::given(method("GET"))
        .and(path(DETAIL_PATH))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&proxy)
        .await;

    let weights = WeightPolicy::new()
        .disable("TweetDetail")
        .with_weight("TweetResultByRestId", 1.0);
    let result = threads(&guest, Some(&proxy))
        .with_weights(weights)
        .construct_thread("301", true, &CancellationToken::new())
        .await;

    assert_eq!(result.code, 200);
    assert_eq!(result.status.unwrap().id, "301");
    assert!(result.thread.is_none());
}

#[tokio::test]
async fn failed_about_account_lookup_keeps_the_thread() {
    let guest = MockServer::start().await;
    let proxy = MockServer::start().await;
    mount_two_status_thread(&proxy).await;
    Mock::given(method("GET"))
        .and(path(ABOUT_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
        .expect(1)
        .mount(&proxy)
        .await;

    let result = threads(&guest, Some(&proxy))
        .construct_thread("100", true, &CancellationToken::new())
        .await;

    assert_eq!(result.code, 200);
    let thread = result.thread.unwrap();
    assert_eq!(thread.len(), 2);
    assert!(thread.iter().all(|s| s.author.as_ref().unwrap().about_account.is_none()));
    assert!(result.author.unwrap().about_account.is_none());
}

#[tokio::test]
async fn about_account_details_reach_every_author() {
    let guest = MockServer::start().await;
    let proxy = MockServer::start().await;
    mount_two_status_thread(&proxy).await;
    Mock::given(method("GET"))
        .and(path(ABOUT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"user_result_by_screen_name": {"result": {"about_profile": {
                "account_based_in": "Norway",
                "source": "Web"
            }}}}
        })))
        .expect(1)
        .mount(&proxy)
        .await;

    let result = threads(&guest, Some(&proxy))
        .construct_thread("100", true, &CancellationToken::new())
        .await;

    assert_eq!(result.code, 200);
    let about = result.author.unwrap().about_account.unwrap();
    assert_eq!(about.based_in.as_deref(), Some("Norway"));
    for status in result.thread.unwrap() {
        let about = status.author.unwrap().about_account.unwrap();
        assert_eq!(about.source.as_deref(), Some("Web"));
    }

    let lookups: Vec<Value> = proxy
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == ABOUT_PATH)
        .map(variables_of)
        .collect();
    assert_eq!(lookups.len(), 1);
    assert_eq!(lookups[0]["screenName"], json!("user1"));
}

#[tokio::test]
async fn about_account_can_be_switched_off() {
    let guest = MockServer::start().await;
    let proxy = MockServer::start().await;
    mount_two_status_thread(&proxy).await;
    Mock::given(method("GET"))
        .and(path(ABOUT_PATH))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&proxy)
        .await;

    let result = threads(&guest, Some(&proxy))
        .about_account(false)
        .construct_thread("100", true, &CancellationToken::new())
        .await;
    assert_eq!(result.code, 200);
}

#[tokio::test]
async fn fetch_by_id_uses_the_app_query_on_the_proxy() {
    let guest = MockServer::start().await;
    let proxy = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(BY_ID_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"tweet_result": {"result": tweet("7", None, "1")}}
        })))
        .expect(1)
        .mount(&proxy)
        .await;

    let body = threads(&guest, Some(&proxy))
        .fetch_by_id("7", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(body.pointer("/data/tweet_result/result/rest_id"), Some(&json!("7")));

    let requests = proxy.received_requests().await.unwrap();
    assert_eq!(variables_of(&requests[0])["rest_id"], json!("7"));
    assert!(guest.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn fetch_by_id_failure_is_none() {
    let guest = MockServer::start().await;
    let proxy = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(BY_ID_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
        .mount(&proxy)
        .await;

    let body = threads(&guest, Some(&proxy))
        .fetch_by_id("7", &CancellationToken::new())
        .await;
    assert!(body.is_none());
}

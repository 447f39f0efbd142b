//! Minimal status builder over raw GraphQL status objects.

use async_trait::async_trait;
use serde_json::Value;

use crate::thread::{Author, BuildOutcome, Item, Status, StatusBuilder};

/// Maps ids, text, timestamps and author straight from the raw payload.
///
/// Media, cards, translation and rendering are out of its scope; richer
/// builders plug in through [`StatusBuilder`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicStatusBuilder;

impl BasicStatusBuilder {
    pub fn build_status(raw: &Value, thread_author: Option<&Author>) -> BuildOutcome {
        if raw.get("__typename").and_then(Value::as_str) == Some("TweetUnavailable") {
            return match raw.get("reason").and_then(Value::as_str) {
                Some("Protected") => BuildOutcome::Unauthorized,
                _ => BuildOutcome::NotFound,
            };
        }
        let Some(item) = Item::from_status(raw) else {
            return BuildOutcome::NotFound;
        };
        let legacy = raw.get("legacy");
        let legacy_str = |field: &str| {
            legacy
                .and_then(|l| l.get(field))
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        // Long posts keep the full body outside `legacy`.
        let text = raw
            .pointer("/note_tweet/note_tweet_results/result/text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| legacy_str("full_text"))
            .unwrap_or_default();

        let author = author_of(raw).map(|author| match thread_author {
            Some(known) if known.id == author.id => known.clone(),
            _ => author,
        });

        BuildOutcome::Built(Status {
            id: item.id,
            replying_to_status: item.parent_id,
            conversation_id: legacy_str("conversation_id_str"),
            text,
            created_at: legacy_str("created_at"),
            author,
        })
    }
}

#[async_trait]
impl StatusBuilder for BasicStatusBuilder {
    async fn build(&self, item: &Item, thread_author: Option<&Author>) -> BuildOutcome {
        Self::build_status(&item.raw, thread_author)
    }
}

fn author_of(raw: &Value) -> Option<Author> {
    let user = raw.pointer("/core/user_results/result")?;
    let id = user.get("rest_id").and_then(Value::as_str)?.to_string();
    let field = |name: &str| {
        user.pointer(&format!("/legacy/{name}"))
            .or_else(|| user.pointer(&format!("/core/{name}")))
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    Some(Author {
        id,
        screen_name: field("screen_name"),
        name: field("name"),
        about_account: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_from_legacy_fields() {
        let raw = json!({
            "__typename": "Tweet",
            "rest_id": "20",
            "core": {"user_results": {"result": {
                "rest_id": "u1",
                "legacy": {"screen_name": "jack", "name": "Jack"}
            }}},
            "legacy": {
                "id_str": "20",
                "full_text": "hello",
                "conversation_id_str": "10",
                "in_reply_to_status_id_str": "10",
                "created_at": "Wed Oct 10 20:19:24 +0000 2018"
            }
        });
        let status = BasicStatusBuilder::build_status(&raw, None).into_status().unwrap();
        assert_eq!(status.id, "20");
        assert_eq!(status.replying_to_status.as_deref(), Some("10"));
        assert_eq!(status.conversation_id.as_deref(), Some("10"));
        assert_eq!(status.text, "hello");
        let author = status.author.unwrap();
        assert_eq!(author.screen_name.as_deref(), Some("jack"));
    }

    #[test]
    fn prefers_note_text_and_thread_author() {
        let raw = json!({
            "rest_id": "1",
            "core": {"user_results": {"result": {"rest_id": "u1", "core": {"screen_name": "new"}}}},
            "note_tweet": {"note_tweet_results": {"result": {"text": "long body"}}},
            "legacy": {"full_text": "short"}
        });
        let known = Author {
            id: "u1".into(),
            screen_name: Some("known".into()),
            name: Some("Known".into()),
            about_account: None,
        };
        let status = BasicStatusBuilder::build_status(&raw, Some(&known))
            .into_status()
            .unwrap();
        assert_eq!(status.text, "long body");
        assert_eq!(status.author, Some(known));
    }

    #[test]
    fn unavailable_statuses_do_not_build() {
        let protected = json!({"__typename": "TweetUnavailable", "reason": "Protected"});
        assert_eq!(
            BasicStatusBuilder::build_status(&protected, None),
            BuildOutcome::Unauthorized
        );
        assert_eq!(
            BasicStatusBuilder::build_status(&json!({"legacy": {}}), None),
            BuildOutcome::NotFound
        );
    }
}

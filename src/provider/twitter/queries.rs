//! Query descriptors for the status and conversation endpoints.
//!
//! Ids and flag sets track what the upstream web client sends; they rotate
//! upstream and are expected to be updated here when they do.

use std::sync::Arc;

use once_cell::sync::Lazy;
use serde_json::{json, Value};

use crate::gateway::QueryDescriptor;

/// Feature flags shared by the guest single-status queries.
fn web_status_features() -> Value {
    json!({
        "creator_subscriptions_tweet_preview_api_enabled": true,
        "premium_content_api_read_enabled": false,
        "communities_web_enable_tweet_community_results_fetch": true,
        "c9s_tweet_anatomy_moderator_badge_enabled": true,
        "responsive_web_grok_analyze_button_fetch_trends_enabled": false,
        "responsive_web_grok_analyze_post_followups_enabled": false,
        "responsive_web_jetfuel_frame": false,
        "responsive_web_grok_share_attachment_enabled": true,
        "articles_preview_enabled": true,
        "responsive_web_edit_tweet_api_enabled": true,
        "graphql_is_translatable_rweb_tweet_is_translatable_enabled": true,
        "view_counts_everywhere_api_enabled": true,
        "longform_notetweets_consumption_enabled": true,
        "responsive_web_twitter_article_tweet_consumption_enabled": true,
        "tweet_awards_web_tipping_enabled": false,
        "responsive_web_grok_show_grok_translated_post": false,
        "responsive_web_grok_analysis_button_from_backend": false,
        "creator_subscriptions_quote_tweet_preview_enabled": false,
        "freedom_of_speech_not_reach_fetch_enabled": true,
        "standardized_nudges_misinfo": true,
        "tweet_with_visibility_results_prefer_gql_limited_actions_policy_enabled": true,
        "longform_notetweets_rich_text_read_enabled": true,
        "longform_notetweets_inline_media_enabled": true,
        "profile_label_improvements_pcf_label_in_post_enabled": true,
        "rweb_tipjar_consumption_enabled": true,
        "verified_phone_label_enabled": false,
        "responsive_web_grok_image_annotation_enabled": true,
        "responsive_web_graphql_skip_user_profile_image_extensions_enabled": false,
        "responsive_web_graphql_timeline_navigation_enabled": true,
        "responsive_web_enhance_cards_enabled": false
    })
}

/// Feature flags for the elevated by-id queries (mobile client shape).
fn app_status_features() -> Value {
    json!({
        "longform_notetweets_inline_media_enabled": true,
        "grok_android_analyze_trend_fetch_enabled": false,
        "super_follow_badge_privacy_enabled": true,
        "longform_notetweets_rich_text_read_enabled": true,
        "super_follow_user_api_enabled": true,
        "super_follow_tweet_api_enabled": true,
        "articles_api_enabled": true,
        "profile_label_improvements_pcf_label_in_profile_enabled": true,
        "premium_content_api_read_enabled": false,
        "android_graphql_skip_api_media_color_palette": true,
        "creator_subscriptions_tweet_preview_api_enabled": true,
        "freedom_of_speech_not_reach_fetch_enabled": true,
        "tweetypie_unmention_optimization_enabled": true,
        "longform_notetweets_consumption_enabled": true,
        "subscriptions_verification_info_enabled": true,
        "blue_business_profile_image_shape_enabled": true,
        "tweet_with_visibility_results_prefer_gql_limited_actions_policy_enabled": true,
        "immersive_video_status_linkable_timestamps": true,
        "profile_label_improvements_pcf_label_in_post_enabled": true,
        "super_follow_exclusive_tweet_notifications_enabled": true
    })
}

fn app_status_variables() -> Value {
    json!({
        "includeTweetImpression": true,
        "includeHasBirdwatchNotes": false,
        "includeEditPerspective": false,
        "includeEditControl": true,
        "includeCommunityTweetRelationship": true,
        "includeTweetVisibilityNudge": true
    })
}

/// Paginated conversation timeline. Elevated only.
pub static TWEET_DETAIL: Lazy<Arc<QueryDescriptor>> = Lazy::new(|| {
    Arc::new(
        QueryDescriptor::new("_8aYOgEDz35BrBcBal1-_w", "TweetDetail")
            .elevated(true)
            .variables(json!({
                "focalTweetId": 0,
                "with_rux_injections": false,
                "rankingMode": "Relevance",
                "includePromotedContent": false,
                "withCommunity": false,
                "withQuickPromoteEligibilityTweetFields": false,
                "withBirdwatchNotes": true,
                "withVoice": false,
                "cursor": null
            }))
            .features(json!({
                "rweb_video_screen_enabled": false,
                "profile_label_improvements_pcf_label_in_post_enabled": true,
                "rweb_tipjar_consumption_enabled": true,
                "verified_phone_label_enabled": false,
                "creator_subscriptions_tweet_preview_api_enabled": true,
                "responsive_web_graphql_timeline_navigation_enabled": true,
                "responsive_web_graphql_skip_user_profile_image_extensions_enabled": false,
                "premium_content_api_read_enabled": false,
                "communities_web_enable_tweet_community_results_fetch": true,
                "c9s_tweet_anatomy_moderator_badge_enabled": true,
                "responsive_web_grok_analyze_button_fetch_trends_enabled": false,
                "responsive_web_grok_analyze_post_followups_enabled": true,
                "responsive_web_jetfuel_frame": false,
                "responsive_web_grok_share_attachment_enabled": true,
                "articles_preview_enabled": true,
                "responsive_web_edit_tweet_api_enabled": true,
                "graphql_is_translatable_rweb_tweet_is_translatable_enabled": true,
                "view_counts_everywhere_api_enabled": true,
                "longform_notetweets_consumption_enabled": true,
                "responsive_web_twitter_article_tweet_consumption_enabled": true,
                "tweet_awards_web_tipping_enabled": false,
                "responsive_web_grok_show_grok_translated_post": false,
                "responsive_web_grok_analysis_button_from_backend": true,
                "creator_subscriptions_quote_tweet_preview_enabled": false,
                "freedom_of_speech_not_reach_fetch_enabled": true,
                "standardized_nudges_misinfo": true,
                "tweet_with_visibility_results_prefer_gql_limited_actions_policy_enabled": true,
                "longform_notetweets_rich_text_read_enabled": true,
                "longform_notetweets_inline_media_enabled": true,
                "responsive_web_grok_image_annotation_enabled": true,
                "responsive_web_enhance_cards_enabled": false
            }))
            .field_toggles(json!({
                "withArticleRichContentState": true,
                "withArticlePlainText": false,
                "withGrokAnalyze": false,
                "withDisallowedReplyControls": false
            })),
    )
});

pub static TWEET_RESULT_BY_REST_ID: Lazy<Arc<QueryDescriptor>> = Lazy::new(|| {
    Arc::new(
        QueryDescriptor::new("zAz9764BcLZOJ0JU2wrd1A", "TweetResultByRestId")
            .variables(json!({
                "withCommunity": false,
                "includePromotedContent": false,
                "withVoice": false
            }))
            .features(web_status_features())
            .field_toggles(json!({"withArticleRichContentState": true})),
    )
});

pub static TWEET_RESULTS_BY_REST_IDS: Lazy<Arc<QueryDescriptor>> = Lazy::new(|| {
    Arc::new(
        QueryDescriptor::new("XM66WIszpd1XC97myrIS0w", "TweetResultsByRestIds")
            .variables(json!({
                "withCommunity": false,
                "includePromotedContent": false,
                "withVoice": false
            }))
            .features(web_status_features())
            .field_toggles(json!({"withArticleRichContentState": true})),
    )
});

pub static TWEET_RESULTS_BY_IDS: Lazy<Arc<QueryDescriptor>> = Lazy::new(|| {
    let mut variables = app_status_variables();
    variables["rest_ids"] = json!([]);
    Arc::new(
        QueryDescriptor::new("vA1jTXbYyuy1QXGa0Xw8hA", "TweetResultsByIdsQuery")
            .elevated(true)
            .variables(variables)
            .features(app_status_features()),
    )
});

pub static TWEET_RESULT_BY_ID: Lazy<Arc<QueryDescriptor>> = Lazy::new(|| {
    Arc::new(
        QueryDescriptor::new("FwLfaByYlUhvhcLp3nWINQ", "TweetResultByIdQuery")
            .elevated(true)
            .variables(app_status_variables())
            .features(app_status_features()),
    )
});

/// Account-origin details for one screen name. Elevated only.
pub static ABOUT_ACCOUNT: Lazy<Arc<QueryDescriptor>> = Lazy::new(|| {
    Arc::new(
        QueryDescriptor::new("zs_jFPFT78rBpXv9Z3U2YQ", "AboutAccountQuery")
            .elevated(true)
            .variables(json!({ "screenName": "" })),
    )
});

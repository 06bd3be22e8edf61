//! YouTube Subscriptions API types.

use crate::youtube_api::types::PageInfo;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Response structure for the `subscriptions.list` API call.
///
/// See: <https://developers.google.com/youtube/v3/docs/subscriptions/list>
#[derive(Debug, Serialize, Deserialize)]
pub struct SubscriptionListResponse {
    /// Identifies the API resource's type.
    ///
    /// The value will be `youtube#subscriptionListResponse`.
    #[serde(default)]
    pub kind: String,
    /// A list of subscriptions that match the request criteria.
    #[serde(default)]
    pub items: VecDeque<Subscription>,
    #[serde(rename = "pageInfo", default)]
    pub page_info: PageInfo,
    /// Token that can be used as the value of the pageToken parameter to retrieve the next page in the result set.
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

/// A `subscription` resource: the relationship between the authenticated user and one channel.
///
/// The resource's own `id` is what `subscriptions.delete` takes, not the channel's id.
///
/// See: <https://developers.google.com/youtube/v3/docs/subscriptions#resource>
#[derive(Debug, Serialize, Deserialize)]
pub struct Subscription {
    /// The ID that YouTube uses to uniquely identify the subscription.
    pub id: String,
    pub snippet: SubscriptionSnippet,
}

/// Basic details about the subscribed-to channel.
///
/// See: <https://developers.google.com/youtube/v3/docs/subscriptions#snippet>
#[derive(Debug, Serialize, Deserialize)]
pub struct SubscriptionSnippet {
    /// The subscribed-to channel's title.
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// The channel the subscription points at.
    #[serde(rename = "resourceId")]
    pub resource_id: ResourceId,
    #[serde(default)]
    pub thumbnails: Thumbnails,
    /// When the subscription was created.
    #[serde(rename = "publishedAt")]
    pub published_at: Option<Timestamp>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResourceId {
    /// `youtube#channel` for channel subscriptions.
    #[serde(default)]
    pub kind: String,
    #[serde(rename = "channelId")]
    pub channel_id: String,
}

/// Channel artwork at the sizes the API offers. Any of them may be missing.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Thumbnails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Thumbnail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medium: Option<Thumbnail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high: Option<Thumbnail>,
}

impl Thumbnails {
    /// The largest image we use for a card: high, falling back to default.
    pub fn best_url(&self) -> Option<&str> {
        self.high
            .as_ref()
            .or(self.default.as_ref())
            .map(|t| t.url.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Thumbnail {
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_list_page() {
        let json = r#"
        {
            "kind": "youtube#subscriptionListResponse",
            "etag": "abc",
            "nextPageToken": "CDIQAA",
            "pageInfo": {"totalResults": 73, "resultsPerPage": 50},
            "items": [
                {
                    "kind": "youtube#subscription",
                    "etag": "def",
                    "id": "sub-1",
                    "snippet": {
                        "publishedAt": "2021-03-14T09:26:53.535Z",
                        "title": "Rust Foundation",
                        "description": "News from the foundation",
                        "resourceId": {"kind": "youtube#channel", "channelId": "UC123"},
                        "channelId": "UCme",
                        "thumbnails": {
                            "default": {"url": "https://yt3.ggpht.com/a=s88"},
                            "high": {"url": "https://yt3.ggpht.com/a=s800"}
                        }
                    },
                    "contentDetails": {"totalItemCount": 120, "newItemCount": 0, "activityType": "all"}
                }
            ]
        }"#;

        let parsed: SubscriptionListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.next_page_token.as_deref(), Some("CDIQAA"));
        assert_eq!(parsed.page_info.total_results, 73);
        assert_eq!(parsed.items.len(), 1);
        let sub = &parsed.items[0];
        assert_eq!(sub.id, "sub-1");
        assert_eq!(sub.snippet.resource_id.channel_id, "UC123");
        assert_eq!(
            sub.snippet.thumbnails.best_url(),
            Some("https://yt3.ggpht.com/a=s800")
        );
    }

    #[test]
    fn last_page_has_no_cursor_and_sparse_snippet() {
        let json = r#"
        {
            "pageInfo": {"totalResults": 1, "resultsPerPage": 50},
            "items": [
                {
                    "id": "sub-9",
                    "snippet": {
                        "title": "No Art",
                        "resourceId": {"channelId": "UC9"}
                    }
                }
            ]
        }"#;

        let parsed: SubscriptionListResponse = serde_json::from_str(json).unwrap();
        assert!(parsed.next_page_token.is_none());
        let sub = &parsed.items[0];
        assert_eq!(sub.snippet.description, "");
        assert!(sub.snippet.published_at.is_none());
        assert_eq!(sub.snippet.thumbnails.best_url(), None);
    }

    #[test]
    fn default_thumbnail_is_fallback() {
        let thumbs = Thumbnails {
            default: Some(Thumbnail {
                url: "small".to_string(),
            }),
            medium: Some(Thumbnail {
                url: "medium".to_string(),
            }),
            high: None,
        };
        assert_eq!(thumbs.best_url(), Some("small"));
    }
}

//! The card shown for each subscribed channel.

use crate::youtube_api::Subscription;
use jiff::Timestamp;

/// Placeholder for details we cannot get without extra per-channel API calls.
pub const UNKNOWN: &str = "Unknown";

/// Category given to every channel that comes from a live session.
pub const LIVE_CATEGORY: &str = "YouTube";

/// One subscribed channel as presented to the user.
///
/// `subscription_id` is `Some` exactly when the channel came from a live session, and is what a
/// delete needs. Demo channels never carry one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: String,
    pub subscription_id: Option<String>,
    pub name: String,
    pub avatar: String,
    pub subscribers: String,
    pub last_upload: String,
    pub last_upload_date: Option<Timestamp>,
    pub description: String,
    pub category: String,
    /// No upload in over a year.
    pub is_inactive: bool,
}

impl Channel {
    /// Whether unsubscribing from this channel can reach the provider.
    pub fn is_deletable(&self) -> bool {
        self.subscription_id.is_some()
    }
}

impl From<Subscription> for Channel {
    /// Subscriber count, last upload and activity would each need a `channels.list` or
    /// `activities.list` call per channel, so they are left as explicit unknowns.
    fn from(subscription: Subscription) -> Self {
        let snippet = subscription.snippet;
        Self {
            avatar: snippet
                .thumbnails
                .best_url()
                .unwrap_or_default()
                .to_string(),
            id: snippet.resource_id.channel_id,
            subscription_id: Some(subscription.id),
            name: snippet.title,
            subscribers: UNKNOWN.to_string(),
            last_upload: UNKNOWN.to_string(),
            last_upload_date: None,
            description: snippet.description,
            category: LIVE_CATEGORY.to_string(),
            is_inactive: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn live_subscription_maps_to_card_with_placeholders() {
        let subscription: Subscription = serde_json::from_value(serde_json::json!({
            "id": "sub-7",
            "snippet": {
                "title": "Jon Gjengset",
                "description": "Rust streams",
                "resourceId": {"kind": "youtube#channel", "channelId": "UC_iD0xppBwwsrM9DegC5cQQ"},
                "thumbnails": {
                    "default": {"url": "https://yt3.ggpht.com/s88"},
                    "high": {"url": "https://yt3.ggpht.com/s800"}
                },
                "publishedAt": "2019-01-01T00:00:00Z"
            }
        }))
        .unwrap();

        assert_eq!(
            Channel::from(subscription),
            Channel {
                id: "UC_iD0xppBwwsrM9DegC5cQQ".to_string(),
                subscription_id: Some("sub-7".to_string()),
                name: "Jon Gjengset".to_string(),
                avatar: "https://yt3.ggpht.com/s800".to_string(),
                subscribers: "Unknown".to_string(),
                last_upload: "Unknown".to_string(),
                last_upload_date: None,
                description: "Rust streams".to_string(),
                category: "YouTube".to_string(),
                is_inactive: false,
            }
        );
    }

    #[test]
    fn missing_artwork_leaves_avatar_empty() {
        let subscription: Subscription = serde_json::from_value(serde_json::json!({
            "id": "sub-8",
            "snippet": {"title": "Bare", "resourceId": {"channelId": "UC8"}}
        }))
        .unwrap();
        let channel = Channel::from(subscription);
        assert_eq!(channel.avatar, "");
        assert!(channel.is_deletable());
    }
}

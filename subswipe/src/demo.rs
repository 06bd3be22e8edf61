//! Fixture channels for demo mode.
//!
//! None of them carry a subscription id, so nothing a demo session does can reach YouTube.

use crate::channel::Channel;
use jiff::{SignedDuration, Timestamp};

/// Days without an upload after which a channel counts as inactive.
pub const INACTIVE_AFTER_DAYS: i64 = 365;

struct Fixture {
    slug: &'static str,
    name: &'static str,
    subscribers: &'static str,
    days_since_upload: i64,
    description: &'static str,
    category: &'static str,
}

const FIXTURES: &[Fixture] = &[
    Fixture {
        slug: "techflow",
        name: "TechFlow Reviews",
        subscribers: "1.2M",
        days_since_upload: 2,
        description: "Honest reviews of the latest gadgets, phones and laptops.",
        category: "Technology",
    },
    Fixture {
        slug: "gourmet-minute",
        name: "Gourmet in a Minute",
        subscribers: "845K",
        days_since_upload: 9,
        description: "Restaurant-quality recipes you can cook in one pan.",
        category: "Food",
    },
    Fixture {
        slug: "retro-pixels",
        name: "Retro Pixels",
        subscribers: "98K",
        days_since_upload: 540,
        description: "Deep dives into forgotten 8-bit and 16-bit games.",
        category: "Gaming",
    },
    Fixture {
        slug: "daily-lift",
        name: "The Daily Lift",
        subscribers: "2.3M",
        days_since_upload: 1,
        description: "Short home workouts, no equipment required.",
        category: "Fitness",
    },
    Fixture {
        slug: "orbit-lab",
        name: "Orbit Lab",
        subscribers: "410K",
        days_since_upload: 34,
        description: "Space science explained with whiteboards and bad puns.",
        category: "Science",
    },
    Fixture {
        slug: "vanlife-diaries",
        name: "Vanlife Diaries",
        subscribers: "57K",
        days_since_upload: 812,
        description: "Two people, one van, and a very patient dog.",
        category: "Travel",
    },
    Fixture {
        slug: "lofi-study",
        name: "Lo-Fi Study Room",
        subscribers: "3.9M",
        days_since_upload: 0,
        description: "24/7 beats to study and relax to.",
        category: "Music",
    },
    Fixture {
        slug: "woodshop-weekly",
        name: "Woodshop Weekly",
        subscribers: "176K",
        days_since_upload: 120,
        description: "Furniture builds from rough lumber to final finish.",
        category: "DIY",
    },
];

/// Builds the demo channel set, dated relative to `now`.
pub fn demo_channels(now: Timestamp) -> Vec<Channel> {
    FIXTURES
        .iter()
        .map(|f| Channel {
            id: format!("demo-{}", f.slug),
            subscription_id: None,
            name: f.name.to_string(),
            avatar: format!("https://picsum.photos/seed/{}/200", f.slug),
            subscribers: f.subscribers.to_string(),
            last_upload: upload_label(f.days_since_upload),
            last_upload_date: Some(now - SignedDuration::from_hours(24 * f.days_since_upload)),
            description: f.description.to_string(),
            category: f.category.to_string(),
            is_inactive: f.days_since_upload > INACTIVE_AFTER_DAYS,
        })
        .collect()
}

/// "today", "3 days ago", "4 months ago", "2 years ago".
fn upload_label(days: i64) -> String {
    let (n, unit) = match days {
        0 => return "today".to_string(),
        1..=29 => (days, "day"),
        30..=364 => ((days / 30).min(11), "month"),
        _ => (days / 365, "year"),
    };
    if n == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{n} {unit}s ago")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn fixture_is_demo_only() {
        let channels = demo_channels(Timestamp::now());
        assert_eq!(channels.len(), FIXTURES.len());
        assert!(channels.iter().all(|c| !c.is_deletable()));

        let ids: HashSet<_> = channels.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids.len(), channels.len(), "channel ids must be unique");
    }

    #[test]
    fn inactivity_follows_last_upload() {
        let now: Timestamp = "2026-01-01T00:00:00Z".parse().unwrap();
        let channels = demo_channels(now);
        let retro = channels.iter().find(|c| c.id == "demo-retro-pixels").unwrap();
        assert!(retro.is_inactive);
        assert_eq!(retro.last_upload, "1 year ago");
        assert_eq!(
            retro.last_upload_date,
            Some("2024-07-10T00:00:00Z".parse().unwrap())
        );

        let lofi = channels.iter().find(|c| c.id == "demo-lofi-study").unwrap();
        assert!(!lofi.is_inactive);
        assert_eq!(lofi.last_upload, "today");
    }

    #[test]
    fn labels() {
        assert_eq!(upload_label(1), "1 day ago");
        assert_eq!(upload_label(9), "9 days ago");
        assert_eq!(upload_label(34), "1 month ago");
        assert_eq!(upload_label(120), "4 months ago");
        assert_eq!(upload_label(359), "11 months ago");
        assert_eq!(upload_label(364), "11 months ago");
        assert_eq!(upload_label(365), "1 year ago");
        assert_eq!(upload_label(812), "2 years ago");
    }
}

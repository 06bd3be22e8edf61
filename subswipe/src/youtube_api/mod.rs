//! YouTube Data API v3 client, limited to the subscription endpoints.
//!
//! A subscription is the relationship record between the authenticated user and one channel. It
//! has its own id, distinct from the channel id, and that id is what `subscriptions.delete`
//! takes.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use subswipe::oauth::{OAuthConfig, OAuthManager};
//! use subswipe::youtube_api::{TimeBoundAccessToken, YouTubeClient};
//! use tokio_stream::StreamExt;
//!
//! # async fn example() -> eyre::Result<()> {
//! let oauth_manager = Arc::new(OAuthManager::new(OAuthConfig::new("1234.apps.googleusercontent.com")));
//! let grant = oauth_manager.authenticate().await?;
//! let client = YouTubeClient::new(TimeBoundAccessToken::new(grant.token), oauth_manager);
//!
//! let mut subscriptions = std::pin::pin!(client.list_my_subscriptions());
//! while let Some(subscription) = subscriptions.next().await {
//!     let subscription = subscription?;
//!     println!("{} ({})", subscription.snippet.title, subscription.id);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod subscriptions;
pub mod types;

pub use client::{DEFAULT_API_BASE, PAGE_SIZE, TimeBoundAccessToken, YouTubeClient};
pub use subscriptions::{Subscription, SubscriptionSnippet, Thumbnails};
pub use types::{Page, PageInfo, PagedStream};

//! The authenticated view of one YouTube account: who we are, whether we may delete, and the
//! two subscription operations a live session needs.

use crate::channel::Channel;
use crate::effects::Unsubscriber;
use crate::error::{ApiError, AuthError};
use crate::oauth::{OAuthConfig, OAuthManager};
use crate::youtube_api::{TimeBoundAccessToken, YouTubeClient};
use std::sync::Arc;
use tokio_stream::StreamExt;
use tracing::instrument;

/// A live, authenticated session against the YouTube Data API.
///
/// Cheap to clone; clones share the same access token.
#[derive(Debug, Clone)]
pub struct ChannelDirectory {
    yt: YouTubeClient,
    write_granted: bool,
}

impl ChannelDirectory {
    /// Runs the interactive consent flow and wraps the resulting token.
    #[instrument(skip_all)]
    pub async fn connect(config: OAuthConfig) -> Result<Self, AuthError> {
        let oauth_manager = Arc::new(OAuthManager::new(config));
        let grant = oauth_manager.authenticate().await?;
        let write_granted = grant.write_granted();
        if !write_granted {
            tracing::warn!(
                scopes = ?grant.granted_scopes,
                "permission to manage subscriptions was not granted; unsubscribing is disabled"
            );
        }
        let yt = YouTubeClient::new(TimeBoundAccessToken::new(grant.token), oauth_manager);
        Ok(Self::from_client(yt, write_granted))
    }

    pub fn from_client(yt: YouTubeClient, write_granted: bool) -> Self {
        Self { yt, write_granted }
    }

    /// Whether the account granted the scope needed to delete subscriptions.
    pub fn can_write(&self) -> bool {
        self.write_granted
    }

    /// Makes one cheap call to prove the token is accepted.
    pub async fn validate(&self) -> bool {
        self.yt.validate_token().await
    }

    /// Every subscription of the account, in the order the API returns them.
    ///
    /// All or nothing: if any page fails, the channels of earlier pages are dropped.
    #[instrument(skip(self))]
    pub async fn list_subscriptions(&self) -> Result<Vec<Channel>, ApiError> {
        let mut channels = Vec::new();
        let mut subscriptions = std::pin::pin!(self.yt.list_my_subscriptions());
        while let Some(subscription) = subscriptions.next().await {
            channels.push(Channel::from(subscription?));
        }
        tracing::info!(count = channels.len(), "fetched subscriptions");
        Ok(channels)
    }

    /// Deletes one subscription. Failures are logged and reported as `false`.
    pub async fn delete_subscription(&self, subscription_id: &str) -> bool {
        match self.yt.delete_subscription(subscription_id).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(subscription_id, status = ?e.status(), "unsubscribe failed: {e}");
                false
            }
        }
    }
}

impl Unsubscriber for ChannelDirectory {
    async fn delete_subscription(&self, subscription_id: &str) -> bool {
        ChannelDirectory::delete_subscription(self, subscription_id).await
    }
}

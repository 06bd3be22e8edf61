//! Core YouTube API client functionality and access token management.

use crate::error::{ApiError, DeleteFailure, provider_message};
use crate::oauth::OAuthManager;
use crate::youtube_api::{
    subscriptions::{Subscription, SubscriptionListResponse},
    types::{Page, PagedStream},
};
use eyre::Context;
use http::Method;
use oauth2::TokenResponse;
use oauth2::basic::BasicTokenResponse;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;
use tokio_stream::Stream;
use tracing::instrument;

/// Where the YouTube Data API v3 lives.
pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Largest page `subscriptions.list` will return.
pub const PAGE_SIZE: u32 = 50;

/// An access token together with the moment we stop trusting it.
#[derive(Debug, Clone)]
pub struct TimeBoundAccessToken {
    token: BasicTokenResponse,
    /// When the current access token expires (with safety buffer)
    expires_at: SystemTime,
}

impl TimeBoundAccessToken {
    /// Wraps a token that is already expired, forcing a refresh before first use.
    pub fn expired(token: BasicTokenResponse) -> Self {
        Self {
            expires_at: SystemTime::UNIX_EPOCH,
            token,
        }
    }

    /// Wraps a freshly issued token.
    ///
    /// The expiry time is the token's `expires_in` minus a 5-minute safety buffer.
    pub fn new(token: BasicTokenResponse) -> Self {
        Self {
            expires_at: Self::calculate_token_expiry(&token),
            token,
        }
    }

    pub fn is_expired(&self) -> bool {
        SystemTime::now() >= self.expires_at
    }

    /// Refreshes this token using the provided OAuth manager, preserving the refresh token.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - Token was successfully refreshed
    /// * `Ok(false)` - Refresh failed (invalid grant, no refresh token, etc.)
    /// * `Err(_)` - Network or other error occurred
    pub async fn refresh(&mut self, oauth_manager: &OAuthManager) -> eyre::Result<bool> {
        tracing::trace!("refreshing token");
        match oauth_manager
            .refresh_token(&self.token)
            .await
            .context("refresh OAuth token")?
        {
            Some(new_token) => {
                let old_token = std::mem::replace(&mut self.token, new_token);

                // Google usually leaves the refresh token out of refresh responses
                if self.token.refresh_token().is_none() {
                    tracing::trace!("new token lacks refresh token, preserving original");
                    self.token
                        .set_refresh_token(old_token.refresh_token().cloned());
                }

                self.expires_at = Self::calculate_token_expiry(&self.token);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Now + `expires_in` - 5 minutes, or 55 minutes if the provider did not say.
    fn calculate_token_expiry(token: &BasicTokenResponse) -> SystemTime {
        let now = SystemTime::now();
        match token.expires_in() {
            Some(expires_in) => now + expires_in.saturating_sub(Duration::from_secs(300)),
            None => now + Duration::from_secs(3300),
        }
    }
}

/// Client for the YouTube Data API v3 subscription endpoints.
///
/// Cheap to clone; clones share the token, so a refresh through one is seen by all. The token is
/// sent as a bearer header and is never part of a URL.
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    token: Arc<Mutex<TimeBoundAccessToken>>,
    /// OAuth manager for refreshing tokens
    oauth_manager: Arc<OAuthManager>,
    client: reqwest::Client,
    api_base: Arc<str>,
}

impl YouTubeClient {
    pub fn new(token: TimeBoundAccessToken, oauth_manager: Arc<OAuthManager>) -> Self {
        Self {
            token: Arc::new(Mutex::new(token)),
            oauth_manager,
            client: reqwest::Client::new(),
            api_base: Arc::from(DEFAULT_API_BASE),
        }
    }

    /// Points the client at a different API root, e.g. a local mock server.
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = Arc::from(api_base.trim_end_matches('/'));
        self
    }

    /// Gets an access token that is valid right now, refreshing it first if it has expired.
    #[instrument(skip(self), level = tracing::Level::TRACE)]
    async fn fresh_access_token(&self) -> Result<String, ApiError> {
        let mut token = self.token.lock().await;

        if token.is_expired() {
            tracing::debug!("access token expired, attempting refresh");

            let refreshed = token
                .refresh(&self.oauth_manager)
                .await
                .map_err(ApiError::Token)?;
            if !refreshed {
                tracing::error!("access token refresh failed, client is unusable");
                return Err(ApiError::Token(eyre::eyre!(
                    "unable to refresh expired access token"
                )));
            }
            tracing::debug!("access token successfully refreshed");
        }

        Ok(token.token.access_token().secret().to_string())
    }

    /// Makes an authenticated request to `{api_base}/{path}` and checks the status.
    ///
    /// Non-2xx responses become [`ApiError::Status`] carrying the provider's error message.
    #[instrument(skip(self), level = tracing::Level::TRACE)]
    async fn make_authenticated_request(
        &self,
        method: Method,
        path: &str,
        query_params: &[(&str, &str)],
    ) -> Result<reqwest::Response, ApiError> {
        let access_token = self.fresh_access_token().await?;
        let url = format!("{}/{}", self.api_base, path);

        let response = self
            .client
            .request(method.clone(), &url)
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .query(query_params)
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                method: method.clone(),
                source,
            })?;

        let status = response.status();
        tracing::trace!(%status, "YouTube API responded");
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(ApiError::Status {
                method,
                status,
                message: provider_message(&body),
            });
        }

        Ok(response)
    }

    /// Checks that the token works by fetching a single subscription.
    #[instrument(skip(self), ret)]
    pub async fn validate_token(&self) -> bool {
        match self.list_subscriptions_internal(1, None).await {
            Ok(_) => {
                tracing::debug!("YouTube API token validation successful");
                true
            }
            Err(e) => {
                tracing::warn!("YouTube API token validation failed: {}", e);
                false
            }
        }
    }

    /// Returns a paginated stream of every subscription of the authenticated user.
    ///
    /// Items come in the order the API returns them. The stream ends after the first failed page.
    ///
    /// # Required Scopes
    ///
    /// * `https://www.googleapis.com/auth/youtube.readonly`
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/subscriptions/list>
    pub fn list_my_subscriptions(
        &self,
    ) -> impl Stream<Item = Result<Subscription, ApiError>> + use<'_> {
        PagedStream::new(|page_token| async {
            let response = self
                .list_subscriptions_internal(PAGE_SIZE, page_token)
                .await?;
            Ok(Page {
                items: response.items,
                next_page_token: response.next_page_token,
            })
        })
    }

    /// Deletes one subscription. Exactly one request; no retries.
    ///
    /// # Required Scopes
    ///
    /// * `https://www.googleapis.com/auth/youtube.force-ssl`
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/subscriptions/delete>
    #[instrument(skip(self))]
    pub async fn delete_subscription(&self, subscription_id: &str) -> Result<(), DeleteFailure> {
        self.make_authenticated_request(Method::DELETE, "subscriptions", &[("id", subscription_id)])
            .await?;
        tracing::debug!(subscription_id, "deleted subscription");
        Ok(())
    }

    async fn list_subscriptions_internal(
        &self,
        max_results: u32,
        page_token: Option<String>,
    ) -> Result<SubscriptionListResponse, ApiError> {
        let max_results_string = max_results.to_string();
        let mut query_params = vec![
            ("part", "snippet,contentDetails"),
            ("mine", "true"),
            ("maxResults", max_results_string.as_str()),
        ];

        if let Some(ref token) = page_token {
            query_params.push(("pageToken", token.as_str()));
        }

        let response = self
            .make_authenticated_request(Method::GET, "subscriptions", &query_params)
            .await?;

        let subscriptions: SubscriptionListResponse =
            response.json().await.map_err(ApiError::Decode)?;

        tracing::debug!(
            total_results = subscriptions.page_info.total_results,
            returned_items = subscriptions.items.len(),
            has_next_page = subscriptions.next_page_token.is_some(),
            "fetched subscriptions"
        );

        Ok(subscriptions)
    }
}

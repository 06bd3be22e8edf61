//! OAuth 2.0 consent and token refresh for the YouTube Data API.
//!
//! The consent flow is the installed-application loopback flow: we open the user's browser on
//! Google's consent page and listen on a random localhost port for the redirect that carries the
//! authorization code. The code is then exchanged (with PKCE) for an access token that is kept in
//! memory only.

use crate::error::AuthError;
use eyre::Context;
use http::StatusCode;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::service::service_fn;
use hyper::{Request, Response, body};
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::{AuthUrl, AuthorizationCode, ClientId, CsrfToken, PkceCodeChallenge, RedirectUrl};
use oauth2::{ClientSecret, RequestTokenError, Scope, TokenResponse, TokenUrl, reqwest};
use std::convert::Infallible;
use std::fmt;
use std::future::Future;

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Google OAuth2 token endpoint URL used for both the code exchange and token refresh
pub const TOKEN_URL: &str = "https://www.googleapis.com/oauth2/v3/token";

/// Read access to the user's subscriptions.
pub const READ_SCOPE: &str = "https://www.googleapis.com/auth/youtube.readonly";

/// Write access, needed to delete subscriptions.
pub const WRITE_SCOPE: &str = "https://www.googleapis.com/auth/youtube.force-ssl";

/// The full YouTube scope also allows deletes.
const FULL_SCOPE: &str = "https://www.googleapis.com/auth/youtube";

const OAUTH_DONE: &str = include_str!("../oauth_success.html");

/// OAuth client credentials entered by the user at runtime.
#[derive(Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    /// Desktop clients on Google Cloud get a secret that is embedded in the app and is not
    /// considered confidential. Web clients used with PKCE may leave it out.
    pub client_secret: Option<String>,
    /// Where codes and refresh tokens are exchanged; [`TOKEN_URL`] unless overridden.
    pub token_url: String,
}

impl OAuthConfig {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            token_url: TOKEN_URL.to_string(),
        }
    }

    pub fn with_client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(client_secret.into());
        self
    }

    /// Points code exchange and refresh at a different token endpoint, e.g. a local mock server.
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }
}

impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("token_url", &self.token_url)
            .finish()
    }
}

/// The outcome of a completed consent flow.
#[derive(Debug, Clone)]
pub struct AuthGrant {
    pub token: BasicTokenResponse,
    /// Scopes the user actually granted; Google lets users untick individual scopes.
    pub granted_scopes: Vec<String>,
}

impl AuthGrant {
    /// Whether the grant allows deleting subscriptions.
    pub fn write_granted(&self) -> bool {
        self.granted_scopes
            .iter()
            .any(|s| s == WRITE_SCOPE || s == FULL_SCOPE)
    }
}

/// What the browser handed back on the redirect URL.
#[derive(Debug)]
pub(crate) struct RedirectCallback {
    pub(crate) code: AuthorizationCode,
    /// Space-separated in the query string; `None` if the provider did not echo them.
    pub(crate) scopes: Option<Vec<String>>,
}

/// Runs OAuth flows for one client id.
#[derive(Debug, Clone)]
pub struct OAuthManager {
    config: OAuthConfig,
}

impl OAuthManager {
    pub fn new(config: OAuthConfig) -> Self {
        Self { config }
    }

    /// Performs the interactive consent flow and returns the resulting grant.
    ///
    /// Opens the user's browser, waits for the redirect on a local listener, and exchanges the
    /// authorization code for a token.
    #[tracing::instrument(skip(self), fields(client_id = %self.config.client_id))]
    pub async fn authenticate(&self) -> Result<AuthGrant, AuthError> {
        let csrf = CsrfToken::new_random();
        let (redirect_url, eventually_callback) = setup_redirect(csrf.clone())
            .await
            .context("set up redirect endpoint")
            .map_err(AuthError::Redirect)?;

        let mut client = BasicClient::new(ClientId::new(self.config.client_id.clone()))
            .set_auth_uri(
                AuthUrl::new(AUTH_URL.to_string())
                    .context("parse authorization endpoint URL")
                    .map_err(AuthError::Redirect)?,
            )
            .set_token_uri(self.token_url().map_err(AuthError::TokenExchange)?)
            .set_redirect_uri(redirect_url);
        if let Some(secret) = &self.config.client_secret {
            client = client.set_client_secret(ClientSecret::new(secret.clone()));
        }

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let (auth_url, _csrf_token) = client
            // We never re-use the CSRF since we only go through the flow exactly once.
            .authorize_url(move || csrf.clone())
            .add_scope(Scope::new(READ_SCOPE.to_string()))
            .add_scope(Scope::new(WRITE_SCOPE.to_string()))
            .add_extra_param("prompt", "consent")
            .add_extra_param("access_type", "offline")
            .set_pkce_challenge(pkce_challenge)
            .url();

        tracing::info!(url = %auth_url, "asking user to follow OAuth flow");
        webbrowser::open(auth_url.as_ref()).map_err(AuthError::BrowserUnavailable)?;
        let callback = eventually_callback.await?;

        let http_client = http_client().map_err(AuthError::TokenExchange)?;
        let token = match client
            .exchange_code(callback.code)
            .set_pkce_verifier(pkce_verifier)
            .request_async(&http_client)
            .await
        {
            Ok(token) => token,
            Err(RequestTokenError::ServerResponse(sr)) => {
                return Err(AuthError::Provider {
                    code: sr.error().to_string(),
                    description: sr.error_description().cloned(),
                });
            }
            Err(e) => {
                return Err(AuthError::TokenExchange(
                    eyre::Report::new(e).wrap_err("exchange authorization code with access token"),
                ));
            }
        };

        let granted_scopes = callback
            .scopes
            .or_else(|| {
                token
                    .scopes()
                    .map(|scopes| scopes.iter().map(|s| s.to_string()).collect())
            })
            .unwrap_or_else(|| vec![READ_SCOPE.to_string(), WRITE_SCOPE.to_string()]);

        let grant = AuthGrant {
            token,
            granted_scopes,
        };
        tracing::debug!(write_granted = grant.write_granted(), "user completed consent");
        Ok(grant)
    }

    /// Attempts to refresh an existing token using its refresh token.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(new_token))` - Refresh succeeded
    /// * `Ok(None)` - No refresh token, or the provider rejected it as an invalid grant
    /// * `Err(_)` - Network or other error occurred during the refresh attempt
    pub async fn refresh_token(
        &self,
        token: &BasicTokenResponse,
    ) -> eyre::Result<Option<BasicTokenResponse>> {
        let Some(refresh_token) = token.refresh_token() else {
            tracing::warn!("no refresh token available, cannot refresh");
            return Ok(None);
        };

        tracing::debug!("attempting to refresh OAuth token");

        let mut client = BasicClient::new(ClientId::new(self.config.client_id.clone()))
            .set_token_uri(self.token_url()?);
        if let Some(secret) = &self.config.client_secret {
            client = client.set_client_secret(ClientSecret::new(secret.clone()));
        }

        let http_client = http_client()?;
        match client
            .exchange_refresh_token(refresh_token)
            .request_async(&http_client)
            .await
        {
            Ok(new_token) => {
                tracing::debug!("successfully refreshed OAuth token");
                Ok(Some(new_token))
            }
            Err(ref e @ RequestTokenError::ServerResponse(ref sr))
                if matches!(
                    sr.error(),
                    oauth2::basic::BasicErrorResponseType::InvalidGrant
                ) =>
            {
                tracing::warn!("OAuth refresh token considered invalid grant: {}", e);
                Ok(None)
            }
            Err(e) => Err(e).context("exchange refresh token"),
        }
    }

    fn token_url(&self) -> eyre::Result<TokenUrl> {
        TokenUrl::new(self.config.token_url.clone()).context("parse token endpoint URL")
    }
}

fn http_client() -> eyre::Result<reqwest::Client> {
    reqwest::ClientBuilder::new()
        // SSRF no thank you.
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .context("build OAuth HTTP client")
}

/// Validates the query string of the OAuth redirect.
///
/// The `state` must match our CSRF token before anything else in the query is trusted.
pub(crate) fn parse_redirect(query: &str, csrf: &CsrfToken) -> Result<RedirectCallback, AuthError> {
    let mut state = None;
    let mut code = None;
    let mut scope = None;
    let mut error = None;
    let mut error_description = None;
    for (k, v) in form_urlencoded::parse(query.as_bytes()) {
        match &*k {
            "state" => state = Some(v),
            "code" => code = Some(v),
            "scope" => scope = Some(v),
            "error" => error = Some(v),
            "error_description" => error_description = Some(v),
            _ => {}
        }
    }

    if state.as_deref() != Some(csrf.secret().as_str()) {
        return Err(AuthError::Redirect(eyre::eyre!("invalid csrf token")));
    }
    if let Some(error) = error {
        if error == "access_denied" {
            return Err(AuthError::Cancelled);
        }
        return Err(AuthError::Provider {
            code: error.into_owned(),
            description: error_description.map(|d| d.into_owned()),
        });
    }
    let Some(code) = code else {
        return Err(AuthError::Redirect(eyre::eyre!(
            "no authorization code found"
        )));
    };

    Ok(RedirectCallback {
        code: AuthorizationCode::new(code.into_owned()),
        scopes: scope.map(|s| s.split_whitespace().map(str::to_string).collect()),
    })
}

/// Sets up a local HTTP server to receive the OAuth redirect.
///
/// Binds a random localhost port and serves exactly one connection. Returns the redirect URL to
/// hand to the provider and a future that resolves once the browser has been redirected back.
async fn setup_redirect(
    csrf: CsrfToken,
) -> eyre::Result<(
    RedirectUrl,
    impl Future<Output = Result<RedirectCallback, AuthError>>,
)> {
    let socket = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .context("bind to localhost")?;
    let addr = socket.local_addr().context("get local address")?;
    let url = RedirectUrl::new(format!("http://{}:{}", addr.ip(), addr.port()))
        .context("construct redirect url")?;
    let (tx, rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        let r = async move {
            let (conn, _) = socket
                .accept()
                .await
                .context("accept")
                .map_err(AuthError::Redirect)?;
            let conn = hyper_util::rt::TokioIo::new(conn);
            let (got, mut gotten) = tokio::sync::mpsc::channel(1);
            let service = service_fn(move |req: Request<body::Incoming>| {
                let csrf = csrf.clone();
                let got = got.clone();
                async move {
                    let outcome = parse_redirect(req.uri().query().unwrap_or(""), &csrf);
                    let response = match &outcome {
                        Ok(_) => Response::new(Full::<Bytes>::from(OAUTH_DONE)),
                        Err(e) => {
                            let mut response = Response::new(Full::<Bytes>::from(format!(
                                "Authorization failed: {e}"
                            )));
                            *response.status_mut() = StatusCode::BAD_REQUEST;
                            response
                        }
                    };
                    // only the first outcome matters; later requests on the connection are
                    // answered but ignored
                    let _ = got.try_send(outcome);
                    Ok::<_, Infallible>(response)
                }
            });
            let mut serve = std::pin::pin!(
                hyper::server::conn::http1::Builder::new().serve_connection(conn, service)
            );

            tokio::select! {
                exit = &mut serve => {
                    let e = match exit {
                        Err(e) => eyre::Report::new(e).wrap_err("redirect server got bad request"),
                        Ok(()) => eyre::eyre!("redirect server exit prematurely"),
                    };
                    Err(AuthError::Redirect(e))
                }
                outcome = gotten.recv() => {
                    serve.as_mut().graceful_shutdown();
                    if let Err(e) = serve.await {
                        tracing::debug!(error = %e, "redirect connection closed uncleanly");
                    }
                    outcome.unwrap_or_else(|| {
                        Err(AuthError::Redirect(eyre::eyre!("redirect handler went away")))
                    })
                }
            }
        };
        let _ = tx.send(r.await);
    });
    Ok((url, async move {
        rx.await
            .context("redirect future dropped prematurely")
            .map_err(AuthError::Redirect)?
    }))
}

//! Errors surfaced to the user.
//!
//! Authentication and listing failures are reported and let the user fall back to the landing
//! choice. Delete failures are never surfaced one by one; see [`DeleteFailure`].

use http::{Method, StatusCode};
use thiserror::Error;

/// Failure to obtain an access token through the interactive consent flow.
///
/// All variants are recoverable by running the connect flow again.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The user declined the consent screen.
    #[error("Login cancelled.")]
    Cancelled,

    /// No browser could be opened to show the consent screen.
    #[error("could not open a browser for the Google consent page")]
    BrowserUnavailable(#[source] std::io::Error),

    /// The identity provider answered with an OAuth error code.
    #[error("identity provider returned error `{code}`{}", suffix(.description))]
    Provider {
        code: String,
        description: Option<String>,
    },

    /// The local redirect endpoint failed or received a request it could not accept.
    #[error("OAuth redirect failed")]
    Redirect(#[source] eyre::Report),

    /// The authorization code could not be exchanged for an access token.
    #[error("could not exchange the authorization code for an access token")]
    TokenExchange(#[source] eyre::Report),
}

fn suffix(description: &Option<String>) -> String {
    description
        .as_deref()
        .map(|d| format!(": {d}"))
        .unwrap_or_default()
}

/// Failure of a YouTube Data API call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The access token had expired and could not be refreshed.
    #[error("no usable access token")]
    Token(#[source] eyre::Report),

    /// The request never produced a response.
    #[error("send {method} request to YouTube API")]
    Transport {
        method: Method,
        #[source]
        source: reqwest::Error,
    },

    /// The API answered with a non-success status.
    #[error("YouTube API {method} request failed with status {status}: {message}")]
    Status {
        method: Method,
        status: StatusCode,
        message: String,
    },

    /// The response body was not the JSON we expected.
    #[error("parse YouTube API response")]
    Decode(#[source] reqwest::Error),
}

impl ApiError {
    /// The HTTP status the API answered with, if it answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A subscription delete that did not go through.
///
/// Only ever logged. Single swipes swallow it and bulk runs count it.
pub type DeleteFailure = ApiError;

/// Extracts the human-readable message from a Google API error body.
///
/// Google wraps errors as `{"error": {"code": 404, "message": "..."}}`; anything else is returned
/// trimmed as-is.
pub(crate) fn provider_message(body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        error: ErrorDetail,
    }
    #[derive(serde::Deserialize)]
    struct ErrorDetail {
        message: String,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.error.message,
        Err(_) if body.trim().is_empty() => "unknown error".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn google_error_body_yields_message() {
        let body = r#"{"error": {"code": 404, "message": "Subscription not found.", "errors": []}}"#;
        assert_eq!(provider_message(body), "Subscription not found.");
    }

    #[test]
    fn plain_body_is_passed_through() {
        assert_eq!(provider_message("  upstream timeout \n"), "upstream timeout");
        assert_eq!(provider_message(""), "unknown error");
    }

    #[test]
    fn provider_error_display_includes_description() {
        let e = AuthError::Provider {
            code: "invalid_client".to_string(),
            description: Some("The OAuth client was not found.".to_string()),
        };
        assert_eq!(
            e.to_string(),
            "identity provider returned error `invalid_client`: The OAuth client was not found."
        );

        let e = AuthError::Provider {
            code: "server_error".to_string(),
            description: None,
        };
        assert_eq!(e.to_string(), "identity provider returned error `server_error`");
    }
}

//! GitHub API error types.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::http::HttpError;
use crate::platform::PlatformError;

/// Errors that can occur when interacting with the GitHub API.
#[derive(Debug, Error)]
pub enum GitHubError {
    /// Transport failure (connect, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    /// Response body did not match the expected shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API returned a non-success status.
    #[error("GitHub API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Primary or secondary rate limit hit.
    #[error("Rate limit exceeded. Resets at {reset_at}")]
    RateLimited { reset_at: DateTime<Utc> },

    /// Token missing, expired or lacking scope.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Repository or user not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid client configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl GitHubError {
    /// Classify a non-success response.
    ///
    /// GitHub reports primary rate limits as 403 with
    /// `x-ratelimit-remaining: 0`, secondary limits as 403/429 with
    /// `retry-after`.
    pub fn from_response(
        status: u16,
        body: &str,
        rate_limit_remaining: Option<&str>,
        reset_epoch: Option<&str>,
        retry_after: Option<&str>,
        resource: &str,
    ) -> Self {
        let reset_at = || {
            retry_after
                .and_then(|s| s.parse::<i64>().ok())
                .map(|secs| Utc::now() + chrono::Duration::seconds(secs))
                .or_else(|| {
                    reset_epoch
                        .and_then(|s| s.parse::<i64>().ok())
                        .and_then(|epoch| DateTime::from_timestamp(epoch, 0))
                })
                .unwrap_or_else(|| Utc::now() + chrono::Duration::minutes(1))
        };

        match status {
            429 => Self::RateLimited {
                reset_at: reset_at(),
            },
            403 if rate_limit_remaining == Some("0") || retry_after.is_some() => {
                Self::RateLimited {
                    reset_at: reset_at(),
                }
            }
            401 | 403 => Self::Auth(format!("{status}: {body}")),
            404 => Self::NotFound(resource.to_string()),
            _ => Self::Api {
                status,
                message: body.to_string(),
            },
        }
    }
}

impl From<GitHubError> for PlatformError {
    fn from(err: GitHubError) -> Self {
        match err {
            GitHubError::Http(e) => PlatformError::network(e.to_string()),
            GitHubError::Json(e) => PlatformError::internal(format!("JSON parse error: {e}")),
            GitHubError::Api { status, message } if status >= 500 => {
                PlatformError::Server { status, message }
            }
            GitHubError::Api { status, message } => {
                PlatformError::api(format!("{status}: {message}"))
            }
            GitHubError::RateLimited { reset_at } => PlatformError::RateLimited { reset_at },
            GitHubError::Auth(_) => PlatformError::AuthRequired,
            GitHubError::NotFound(resource) => PlatformError::not_found(resource),
            GitHubError::Config(msg) => PlatformError::internal(msg),
        }
    }
}

/// Whether a GitHub error is worth retrying.
pub fn is_transient_error(err: &GitHubError) -> bool {
    match err {
        GitHubError::Http(_) | GitHubError::RateLimited { .. } => true,
        GitHubError::Api { status, .. } => *status >= 500,
        _ => false,
    }
}

/// Get a short error message suitable for display.
pub fn short_error_message(err: &GitHubError) -> String {
    match err {
        GitHubError::Http(e) => e.to_string(),
        GitHubError::Json(_) => "JSON parse error".to_string(),
        GitHubError::Api { status, message } => {
            if message.chars().count() > 50 {
                let truncated: String = message.chars().take(47).collect();
                format!("HTTP {status}: {truncated}...")
            } else {
                format!("HTTP {status}: {message}")
            }
        }
        GitHubError::RateLimited { .. } => "Rate limited".to_string(),
        GitHubError::Auth(_) => "Authentication failed".to_string(),
        GitHubError::NotFound(resource) => format!("Not found: {resource}"),
        GitHubError::Config(msg) => format!("Config: {msg}"),
    }
}

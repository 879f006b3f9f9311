//! GitLab API error types.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::http::HttpError;
use crate::platform::PlatformError;

/// Errors that can occur when interacting with the GitLab API.
#[derive(Debug, Error)]
pub enum GitLabError {
    #[error("HTTP request error: {0}")]
    Http(#[from] HttpError),

    #[error("JSON deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),

    #[error("GitLab API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limit exceeded. Resets at {reset_at}")]
    RateLimited { reset_at: DateTime<Utc> },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Group not found: {0}")]
    GroupNotFound(String),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    /// Create rejected because the path or name is taken.
    #[error("Project already exists: {0}")]
    AlreadyExists(String),

    /// Pull mirroring refused or silently ignored (tier, instance settings).
    #[error("Pull mirroring unavailable: {0}")]
    MirrorUnsupported(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl GitLabError {
    /// Create an API error from a status and message.
    pub fn api(status: u16, msg: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: msg.into(),
        }
    }

    /// Classify an HTTP status code and response body into a typed error.
    ///
    /// `resource` names what was being addressed, for not-found messages.
    pub fn from_status(status: u16, body: &str, retry_after: Option<&str>, resource: &str) -> Self {
        match status {
            401 | 403 => Self::Auth(format!("{status}: {body}")),
            404 => Self::ProjectNotFound(resource.to_string()),
            429 => Self::RateLimited {
                reset_at: retry_after
                    .and_then(|s| s.parse::<i64>().ok())
                    .map(|secs| Utc::now() + chrono::Duration::seconds(secs))
                    .unwrap_or_else(|| Utc::now() + chrono::Duration::minutes(1)),
            },
            400 | 409 if body.contains("has already been taken") => {
                Self::AlreadyExists(resource.to_string())
            }
            _ => Self::api(status, body),
        }
    }
}

impl From<GitLabError> for PlatformError {
    fn from(err: GitLabError) -> Self {
        match err {
            GitLabError::Http(e) => PlatformError::network(e.to_string()),
            GitLabError::Deserialize(e) => {
                PlatformError::internal(format!("JSON parse error: {e}"))
            }
            GitLabError::Api { status, message } if status >= 500 => {
                PlatformError::Server { status, message }
            }
            GitLabError::Api { status, message } => {
                PlatformError::api(format!("{status}: {message}"))
            }
            GitLabError::RateLimited { reset_at } => PlatformError::RateLimited { reset_at },
            GitLabError::Auth(_) => PlatformError::AuthRequired,
            GitLabError::GroupNotFound(resource) | GitLabError::ProjectNotFound(resource) => {
                PlatformError::not_found(resource)
            }
            GitLabError::AlreadyExists(resource) => PlatformError::AlreadyExists { resource },
            GitLabError::MirrorUnsupported(message) => PlatformError::Unsupported { message },
            GitLabError::Config(msg) => PlatformError::internal(msg),
        }
    }
}

/// Whether a GitLab error is worth retrying.
pub fn is_transient_error(err: &GitLabError) -> bool {
    match err {
        GitLabError::Http(_) | GitLabError::RateLimited { .. } => true,
        GitLabError::Api { status, .. } => *status >= 500,
        _ => false,
    }
}

/// Check if an error is a rate limit error.
pub fn is_rate_limit_error(err: &GitLabError) -> bool {
    matches!(err, GitLabError::RateLimited { .. })
}

/// Get a short error message suitable for display.
pub fn short_error_message(err: &GitLabError) -> String {
    match err {
        GitLabError::Api { status, message } => {
            if message.chars().count() > 50 {
                let truncated: String = message.chars().take(47).collect();
                format!("HTTP {status}: {truncated}...")
            } else {
                format!("HTTP {status}: {message}")
            }
        }
        GitLabError::RateLimited { .. } => "Rate limited".to_string(),
        GitLabError::Auth(_) => "Authentication failed".to_string(),
        GitLabError::GroupNotFound(g) => format!("Group not found: {g}"),
        GitLabError::ProjectNotFound(p) => format!("Project not found: {p}"),
        GitLabError::AlreadyExists(p) => format!("Already exists: {p}"),
        GitLabError::MirrorUnsupported(_) => "Pull mirroring unavailable".to_string(),
        GitLabError::Http(e) => e.to_string(),
        GitLabError::Deserialize(_) => "JSON parse error".to_string(),
        GitLabError::Config(msg) => format!("Config: {msg}"),
    }
}

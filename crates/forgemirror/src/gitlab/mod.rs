//! GitLab, the destination control plane.
//!
//! # Module Structure
//!
//! - [`error`] - Error types for GitLab API operations
//! - [`types`] - API response and request shapes
//! - [`client`] - Transport-backed client implementing
//!   [`DestinationForge`](crate::platform::DestinationForge)
//! - [`convert`] - Conversion to
//!   [`DestinationProject`](crate::platform::DestinationProject)
//!
//! ```ignore
//! use forgemirror::gitlab::GitLabClient;
//! use forgemirror::platform::DestinationForge;
//!
//! let client = GitLabClient::new("gitlab.com", &token, None)?;
//! let group = client.resolve_group(12345).await?;
//! ```

mod client;
mod convert;
mod error;
mod types;

pub use client::{GITLAB_DEFAULT_HOST, GitLabClient, normalize_host};
pub use convert::{to_destination_group, to_destination_project};
pub use error::{GitLabError, is_rate_limit_error, is_transient_error, short_error_message};
pub use types::{GitLabGroup, GitLabProject};

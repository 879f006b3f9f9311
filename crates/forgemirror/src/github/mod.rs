//! GitHub, the source of truth.
//!
//! # Module Structure
//!
//! - [`error`] - Error types for GitHub API operations
//! - [`types`] - API response shapes
//! - [`client`] - Transport-backed client implementing
//!   [`SourceForge`](crate::platform::SourceForge)
//! - [`convert`] - Conversion to [`RepoRef`](crate::platform::RepoRef)
//!
//! ```ignore
//! use forgemirror::github::GitHubClient;
//! use forgemirror::source::list_source_repos;
//!
//! let client = GitHubClient::new(&token, None)?;
//! let repos = list_source_repos(&client, &["alice".into()], None).await?;
//! ```

mod client;
mod convert;
mod error;
mod types;

pub use client::{GITHUB_API_URL, GitHubClient, LinkPagination, parse_link_header};
pub use convert::to_repo_ref;
pub use error::{GitHubError, is_transient_error, short_error_message};
pub use types::{GitHubOwner, GitHubRepo};

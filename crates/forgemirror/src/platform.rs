//! Forge-agnostic types and the traits the reconciler and pruner drive.
//!
//! [`SourceForge`] is implemented by [`crate::github::GitHubClient`],
//! [`DestinationForge`] by [`crate::gitlab::GitLabClient`]. Everything above
//! this module works against the traits only, which is what lets the
//! integration tests substitute in-memory forges.

mod errors;
mod rate_limit;
mod types;

pub use errors::{PlatformError, Result, short_error_message};
pub use rate_limit::{ApiRateLimiter, rate_limits};
pub use types::{
    CreateProject, DestinationForge, DestinationGroup, DestinationProject, RepoOrigin, RepoRef,
    SourceForge, Visibility, strip_credentials, url_with_credentials,
};

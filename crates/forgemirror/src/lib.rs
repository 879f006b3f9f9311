//! forgemirror - one-way GitHub to GitLab mirroring.
//!
//! Two independent jobs share the same primitives:
//!
//! - [`mirror::run_mirror`] lists the source, lists the destination group
//!   and makes sure every source repository has a pull-mirrored project.
//! - [`prune::run_prune`] deletes destination projects whose source has been
//!   gone for longer than a grace period, tracking "first missing" times in
//!   a small JSON [`ledger`].
//!
//! # Example
//!
//! ```ignore
//! use forgemirror::github::GitHubClient;
//! use forgemirror::gitlab::GitLabClient;
//! use forgemirror::mirror::{MirrorOptions, run_mirror};
//! use forgemirror::transfer::GitCliTransfer;
//!
//! let github = GitHubClient::new(&github_token, None)?;
//! let gitlab = GitLabClient::new("gitlab.com", &gitlab_token, None)?;
//! let options = MirrorOptions::new(vec!["alice".into()], 12345);
//! let report = run_mirror(&github, &gitlab, Some(&GitCliTransfer::new()), &options, &|| false, None).await?;
//! assert!(!report.has_failures());
//! ```

pub mod destination;
pub mod error;
pub mod github;
pub mod gitlab;
pub mod http;
pub mod identity;
pub mod ledger;
pub mod mirror;
pub mod platform;
pub mod progress;
pub mod prune;
pub mod retry;
pub mod source;
pub mod transfer;

pub use error::MirrorError;
pub use identity::{IdentityMapper, ProtectedSet, RepoKey};
pub use ledger::{Ledger, LedgerStore, PruneEntry};
pub use mirror::{MirrorOptions, MirrorOutcome, MirrorReport, MirrorResult, run_mirror};
pub use platform::{
    ApiRateLimiter, DestinationForge, DestinationGroup, DestinationProject, PlatformError,
    RepoRef, SourceForge, rate_limits,
};
pub use progress::{MirrorProgress, ProgressCallback};
pub use prune::{PruneOptions, PruneReport, run_prune};

//! One-shot repository transfer used when pull mirroring is unavailable.
//!
//! [`GitCliTransfer`] mirror-clones the source into a temporary directory and
//! mirror-pushes it to the destination. Credentials travel inside the URLs and
//! are scrubbed from every error message.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;

use crate::platform::strip_credentials;

/// Default limit for each git invocation.
pub const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_secs(600);

/// Errors from the transfer fallback.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("failed to prepare workspace: {0}")]
    Workspace(#[source] std::io::Error),

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("git {step} timed out after {}s", after.as_secs())]
    Timeout { step: &'static str, after: Duration },

    #[error("git {step} exited with {status}: {stderr}")]
    Failed {
        step: &'static str,
        status: String,
        stderr: String,
    },
}

/// Copies all refs from a source URL to a destination URL.
#[async_trait]
pub trait MirrorTransfer: Send + Sync {
    async fn transfer(&self, source_url: &str, destination_url: &str) -> Result<(), TransferError>;
}

/// `git clone --mirror` + `git push --mirror` through the git CLI.
#[derive(Debug, Clone)]
pub struct GitCliTransfer {
    program: PathBuf,
    timeout: Duration,
    work_root: Option<PathBuf>,
}

impl Default for GitCliTransfer {
    fn default() -> Self {
        Self {
            program: PathBuf::from("git"),
            timeout: DEFAULT_TRANSFER_TIMEOUT,
            work_root: None,
        }
    }
}

impl GitCliTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific git executable.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create scratch clones under `root` instead of the system temp dir.
    #[must_use]
    pub fn with_work_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.work_root = Some(root.into());
        self
    }

    async fn run_git(
        &self,
        step: &'static str,
        args: &[&str],
        cwd: &Path,
        secrets: &[&str],
    ) -> Result<(), TransferError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .current_dir(cwd)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|source| TransferError::Spawn {
            program: self.program.display().to_string(),
            source,
        })?;

        let output = match timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|source| TransferError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?,
            Err(_) => {
                return Err(TransferError::Timeout {
                    step,
                    after: self.timeout,
                });
            }
        };

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(TransferError::Failed {
            step,
            status: output.status.to_string(),
            stderr: redact(stderr.trim(), secrets),
        })
    }
}

#[async_trait]
impl MirrorTransfer for GitCliTransfer {
    async fn transfer(&self, source_url: &str, destination_url: &str) -> Result<(), TransferError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("forgemirror-");
        let workspace = match &self.work_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(TransferError::Workspace)?;

        let repo_dir = workspace.path().join("repo.git");
        let repo_arg = repo_dir.to_string_lossy().into_owned();
        let secrets = [source_url, destination_url];

        tracing::debug!(
            source = %strip_credentials(source_url),
            destination = %strip_credentials(destination_url),
            "Starting mirror transfer"
        );

        self.run_git(
            "clone",
            &["clone", "--mirror", "--quiet", source_url, repo_arg.as_str()],
            workspace.path(),
            &secrets,
        )
        .await?;

        self.run_git(
            "push",
            &["push", "--mirror", "--quiet", destination_url],
            &repo_dir,
            &secrets,
        )
        .await?;

        Ok(())
    }
}

/// Replace credential-bearing URLs (and their passwords) in `message`.
pub fn redact(message: &str, urls: &[&str]) -> String {
    let mut out = message.to_string();
    for raw in urls {
        out = out.replace(raw, &strip_credentials(raw));
        if let Ok(url) = url::Url::parse(raw)
            && let Some(password) = url.password()
            && !password.is_empty()
        {
            out = out.replace(password, "*****");
        }
    }
    out
}

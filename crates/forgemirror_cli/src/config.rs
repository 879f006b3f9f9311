//! Configuration file support for forgemirror.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `FORGEMIRROR_`, sections split by
//!    a double underscore, e.g. `FORGEMIRROR_GITLAB__GROUP_ID`)
//! 3. Config file (./forgemirror.toml, then ~/.config/forgemirror/config.toml)
//! 4. Unprefixed environment variables used by the old mirror scripts
//!    (`GITHUB_TOKEN`, `GITLAB_GROUP_ID`, `GRACE_DAYS`, ...)
//! 5. Built-in defaults
//!
//! Example config file:
//! ```toml
//! [github]
//! token = "ghp_..."            # or FORGEMIRROR_GITHUB__TOKEN
//! accounts = ["alice", "alice-archive"]
//!
//! [gitlab]
//! host = "gitlab.com"
//! token = "glpat-..."
//! group_id = 12345
//!
//! [mirror]
//! fallback = true
//! requests_per_second = 1
//!
//! [prune]
//! grace_days = 7
//! protected = ["mirror-scripts"]
//! dry_run = true
//! state_file = "~/.local/state/forgemirror/prune_state.json"
//! ```

use std::path::PathBuf;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use forgemirror::ledger::DEFAULT_LEDGER_FILE;
use forgemirror::prune::DEFAULT_GRACE_DAYS;
use serde::Deserialize;

/// Protected from pruning unless configured otherwise.
const DEFAULT_PROTECTED: &str = "mirror-scripts";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub github: GitHubConfig,
    pub gitlab: GitLabConfig,
    pub mirror: MirrorConfig,
    pub prune: PruneConfig,
}

/// Source forge configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    pub token: Option<String>,
    /// Accounts whose public repositories are mirrored. The first one is the
    /// owner assumed for projects that do not record their upstream.
    pub accounts: Vec<String>,
    /// API base URL, for GitHub Enterprise.
    pub api_url: Option<String>,
}

/// Destination forge configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GitLabConfig {
    /// GitLab host (e.g., "gitlab.com" or "https://gitlab.example.com").
    pub host: Option<String>,
    pub token: Option<String>,
    /// Numeric id of the group holding the mirrors.
    pub group_id: Option<u64>,
}

/// Mirror job options.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Run a one-shot `git push --mirror` when pull mirroring is unavailable.
    pub fallback: bool,
    /// GitLab request rate. GitHub uses its own default.
    pub requests_per_second: Option<u32>,
    /// Disable proactive rate limiting.
    pub no_rate_limit: bool,
    /// Limit for each git command of the fallback transfer.
    pub transfer_timeout_secs: u64,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            fallback: true,
            requests_per_second: None,
            no_rate_limit: false,
            transfer_timeout_secs: 600,
        }
    }
}

/// Prune job options. Unset values fall back to the old script variables,
/// then to the defaults below.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PruneConfig {
    pub grace_days: Option<u32>,
    pub protected: Option<Vec<String>>,
    pub dry_run: Option<bool>,
    pub state_file: Option<PathBuf>,
    pub allow_empty_source: bool,
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(xdg_config) = Self::default_config_path()
            && xdg_config.exists()
        {
            tracing::debug!("Loading config from {:?}", xdg_config);
            builder = builder.add_source(
                File::from(xdg_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let local_config = PathBuf::from("forgemirror.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./forgemirror.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        builder = builder.add_source(
            Environment::with_prefix("FORGEMIRROR")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("github.accounts")
                .with_list_parse_key("prune.protected")
                .try_parsing(true),
        );

        let mut config = match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        };

        config.apply_legacy_env(|name| std::env::var(name).ok());
        config
    }

    /// Fill unset values from the variables the old mirror scripts read.
    pub fn apply_legacy_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if self.github.token.is_none() {
            self.github.token = get("GITHUB_TOKEN");
        }
        if self.github.accounts.is_empty()
            && let Some(users) = get("GITHUB_USER")
        {
            self.github.accounts = split_list(&users);
        }
        if self.gitlab.token.is_none() {
            self.gitlab.token = get("GITLAB_TOKEN");
        }
        if self.gitlab.host.is_none() {
            self.gitlab.host = get("GITLAB_URL");
        }
        if self.gitlab.group_id.is_none() {
            self.gitlab.group_id = get("GITLAB_GROUP_ID").and_then(|v| match v.trim().parse() {
                Ok(id) => Some(id),
                Err(e) => {
                    tracing::warn!(value = %v, error = %e, "Ignoring invalid GITLAB_GROUP_ID");
                    None
                }
            });
        }
        if self.prune.grace_days.is_none() {
            self.prune.grace_days = get("GRACE_DAYS").and_then(|v| match v.trim().parse() {
                Ok(days) => Some(days),
                Err(e) => {
                    tracing::warn!(value = %v, error = %e, "Ignoring invalid GRACE_DAYS");
                    None
                }
            });
        }
        if self.prune.protected.is_none() {
            self.prune.protected = get("PRUNE_EXCLUDE").map(|v| split_list(&v));
        }
        if self.prune.dry_run.is_none() {
            self.prune.dry_run = get("DRY_RUN").map(|v| v.trim().eq_ignore_ascii_case("true"));
        }
    }

    pub fn github_token(&self) -> Option<String> {
        self.github.token.clone()
    }

    pub fn gitlab_token(&self) -> Option<String> {
        self.gitlab.token.clone()
    }

    /// Get the GitLab host.
    pub fn gitlab_host(&self) -> String {
        self.gitlab
            .host
            .clone()
            .unwrap_or_else(|| forgemirror::gitlab::GITLAB_DEFAULT_HOST.to_string())
    }

    pub fn grace_days(&self) -> u32 {
        self.prune.grace_days.unwrap_or(DEFAULT_GRACE_DAYS)
    }

    pub fn protected(&self) -> Vec<String> {
        self.prune
            .protected
            .clone()
            .unwrap_or_else(|| vec![DEFAULT_PROTECTED.to_string()])
    }

    /// Prune simulates unless deletion is explicitly enabled.
    pub fn dry_run(&self) -> bool {
        self.prune.dry_run.unwrap_or(true)
    }

    /// Ledger location, defaulting to the state directory.
    pub fn state_file(&self) -> PathBuf {
        self.prune.state_file.clone().unwrap_or_else(|| {
            Self::default_state_dir()
                .map(|dir| dir.join(DEFAULT_LEDGER_FILE))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LEDGER_FILE))
        })
    }

    /// Get the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "forgemirror").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get the default state directory path.
    ///
    /// On Linux, this is `$XDG_STATE_HOME/forgemirror` or
    /// `~/.local/state/forgemirror`. Elsewhere it falls back to the data
    /// directory.
    pub fn default_state_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "forgemirror").map(|dirs| {
            dirs.state_dir()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| dirs.data_dir().to_path_buf())
        })
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

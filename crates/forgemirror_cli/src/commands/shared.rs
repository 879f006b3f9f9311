use forgemirror::github::{GITHUB_API_URL, GitHubClient};
use forgemirror::gitlab::GitLabClient;
use forgemirror::{ApiRateLimiter, rate_limits};

use crate::config::Config;

pub(crate) type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Source accounts: CLI overrides first, then configuration.
pub(crate) fn accounts(config: &Config, overrides: &[String]) -> CliResult<Vec<String>> {
    let accounts = if overrides.is_empty() {
        config.github.accounts.clone()
    } else {
        overrides.to_vec()
    };
    if accounts.iter().all(|a| a.trim().is_empty()) {
        return Err(
            "No source accounts configured. Pass --account, set github.accounts, or GITHUB_USER."
                .into(),
        );
    }
    Ok(accounts)
}

pub(crate) fn group_id(config: &Config, override_id: Option<u64>) -> CliResult<u64> {
    override_id.or(config.gitlab.group_id).ok_or_else(|| {
        "No GitLab group configured. Pass --group-id, set gitlab.group_id, or GITLAB_GROUP_ID."
            .into()
    })
}

pub(crate) fn github_client(config: &Config) -> CliResult<GitHubClient> {
    let token = config.github_token().ok_or(
        "No GitHub token configured. Set FORGEMIRROR_GITHUB__TOKEN, github.token, or GITHUB_TOKEN.",
    )?;
    let limiter = (!config.mirror.no_rate_limit)
        .then(|| ApiRateLimiter::new(rate_limits::GITHUB_DEFAULT_RPS));
    let api_url = config.github.api_url.as_deref().unwrap_or(GITHUB_API_URL);
    Ok(GitHubClient::with_api_url(api_url, &token, limiter)?)
}

pub(crate) fn gitlab_client(config: &Config) -> CliResult<GitLabClient> {
    let token = config.gitlab_token().ok_or(
        "No GitLab token configured. Set FORGEMIRROR_GITLAB__TOKEN, gitlab.token, or GITLAB_TOKEN.",
    )?;
    let rps = config
        .mirror
        .requests_per_second
        .unwrap_or(rate_limits::GITLAB_DEFAULT_RPS);
    let limiter = (!config.mirror.no_rate_limit).then(|| ApiRateLimiter::new(rps));
    Ok(GitLabClient::new(&config.gitlab_host(), &token, limiter)?)
}

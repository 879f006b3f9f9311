//! GitHub API client for the source listing.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;

use super::convert::to_repo_ref;
use super::error::{GitHubError, is_transient_error, short_error_message};
use super::types::GitHubRepo;
use crate::http::reqwest_transport::ReqwestTransport;
use crate::http::{HttpHeaders, HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use crate::platform::{
    self, ApiRateLimiter, PlatformError, RepoOrigin, RepoRef, SourceForge, url_with_credentials,
};
use crate::progress::{MirrorProgress, ProgressCallback, emit};
use crate::retry::{RetryConfig, with_retry};

/// Default GitHub REST endpoint.
pub const GITHUB_API_URL: &str = "https://api.github.com";

/// Page size for listing requests (GitHub maximum).
const PAGE_SIZE: usize = 100;

/// Hard stop for runaway pagination.
const MAX_PAGES: u32 = 1_000;

/// Username paired with a PAT in authenticated clone URLs.
const CLONE_USERNAME: &str = "oauth2";

/// Pagination information extracted from GitHub's Link header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkPagination {
    /// The last page number (from rel="last" link).
    pub last_page: Option<u32>,
    /// The next page number (from rel="next" link).
    pub next_page: Option<u32>,
}

/// Parse the Link header to extract pagination info.
///
/// GitHub Link headers look like:
/// `<https://api.github.com/user/repos?per_page=100&page=2>; rel="next", <...&page=3>; rel="last"`
pub fn parse_link_header(link_header: &str) -> LinkPagination {
    let mut info = LinkPagination::default();

    for part in link_header.split(',') {
        let mut url = None;
        let mut rel = None;

        for segment in part.trim().split(';') {
            let segment = segment.trim();
            if segment.starts_with('<') && segment.ends_with('>') {
                url = Some(&segment[1..segment.len() - 1]);
            } else if let Some(rel_value) = segment.strip_prefix("rel=") {
                rel = Some(rel_value.trim_matches('"'));
            }
        }

        if let (Some(url), Some(rel_type)) = (url, rel)
            && let Some(page_num) = extract_page_from_url(url)
        {
            match rel_type {
                "last" => info.last_page = Some(page_num),
                "next" => info.next_page = Some(page_num),
                _ => {}
            }
        }
    }

    info
}

/// Extract the page parameter from a URL.
fn extract_page_from_url(url: &str) -> Option<u32> {
    let (_, query) = url.split_once('?')?;
    query
        .split('&')
        .find_map(|param| param.strip_prefix("page="))
        .and_then(|value| value.parse().ok())
}

/// GitHub API client.
///
/// Cheap to clone; clones share the transport and the rate limiter.
#[derive(Clone)]
pub struct GitHubClient {
    transport: Arc<dyn HttpTransport>,
    api_url: String,
    token: String,
    rate_limiter: Option<ApiRateLimiter>,
    retry: RetryConfig,
}

impl GitHubClient {
    /// Create a client for api.github.com with a 30 second request timeout.
    pub fn new(token: &str, rate_limiter: Option<ApiRateLimiter>) -> Result<Self, GitHubError> {
        Self::with_api_url(GITHUB_API_URL, token, rate_limiter)
    }

    /// Create a client for a GitHub Enterprise (or test) endpoint.
    pub fn with_api_url(
        api_url: &str,
        token: &str,
        rate_limiter: Option<ApiRateLimiter>,
    ) -> Result<Self, GitHubError> {
        if token.trim().is_empty() {
            return Err(GitHubError::Config("GitHub token is empty".to_string()));
        }
        let transport = ReqwestTransport::with_timeout(StdDuration::from_secs(30))
            .map_err(|e| GitHubError::Config(e.to_string()))?;
        Ok(Self::new_with_transport(
            api_url,
            token,
            rate_limiter,
            Arc::new(transport),
        ))
    }

    pub fn new_with_transport(
        api_url: &str,
        token: &str,
        rate_limiter: Option<ApiRateLimiter>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            transport,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            rate_limiter,
            retry: RetryConfig::default(),
        }
    }

    /// Override the retry policy.
    #[must_use]
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn headers(&self) -> HttpHeaders {
        vec![
            (
                "Accept".to_string(),
                "application/vnd.github+json".to_string(),
            ),
            ("User-Agent".to_string(), "forgemirror".to_string()),
            ("Authorization".to_string(), format!("Bearer {}", self.token)),
            ("X-GitHub-Api-Version".to_string(), "2022-11-28".to_string()),
        ]
    }

    /// One GET attempt, throttled.
    async fn get_once(&self, url: &str) -> Result<HttpResponse, GitHubError> {
        if let Some(ref limiter) = self.rate_limiter {
            limiter.wait().await;
        }
        let request = HttpRequest::new(HttpMethod::Get, url, self.headers());
        Ok(self.transport.send(request).await?)
    }

    fn error_for(response: &HttpResponse, resource: &str) -> GitHubError {
        GitHubError::from_response(
            response.status,
            &response.text(),
            response.header("x-ratelimit-remaining"),
            response.header("x-ratelimit-reset"),
            response.header("retry-after"),
            resource,
        )
    }

    /// Fetch one listing page, with retries.
    async fn get_page(
        &self,
        url: &str,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<(Vec<GitHubRepo>, Option<LinkPagination>), GitHubError> {
        let attempt = || async {
            let response = self.get_once(url).await?;
            if !response.is_success() {
                return Err(Self::error_for(&response, url));
            }
            let repos: Vec<GitHubRepo> = serde_json::from_slice(&response.body)?;
            let pagination = response.header("link").map(parse_link_header);
            Ok((repos, pagination))
        };

        with_retry(
            attempt,
            &self.retry,
            is_transient_error,
            short_error_message,
            &format!("GET {url}"),
            on_progress,
        )
        .await
    }

    /// Follow a paginated listing to exhaustion.
    ///
    /// Stops on an empty page, on a Link header without `rel="next"`, or on a
    /// short page when the server sends no Link header.
    async fn list_paginated(
        &self,
        namespace: &str,
        route: impl Fn(u32) -> String,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<Vec<GitHubRepo>, GitHubError> {
        emit(
            on_progress,
            MirrorProgress::FetchingRepos {
                namespace: namespace.to_string(),
            },
        );

        let mut all = Vec::new();
        let mut page = 1u32;

        loop {
            if page > MAX_PAGES {
                return Err(GitHubError::Api {
                    status: 0,
                    message: format!("pagination for {namespace} exceeded {MAX_PAGES} pages"),
                });
            }

            let url = format!("{}{}", self.api_url, route(page));
            let (repos, pagination) = self.get_page(&url, on_progress).await?;
            let count = repos.len();
            all.extend(repos);

            tracing::debug!(namespace, page, count, total = all.len(), "Fetched page");
            emit(
                on_progress,
                MirrorProgress::FetchedPage {
                    namespace: namespace.to_string(),
                    page,
                    count,
                    total_so_far: all.len(),
                },
            );

            if count == 0 {
                break;
            }
            match pagination {
                Some(LinkPagination {
                    next_page: Some(next),
                    ..
                }) if next > page => page = next,
                Some(_) => break,
                None if count < PAGE_SIZE => break,
                None => page += 1,
            }
        }

        emit(
            on_progress,
            MirrorProgress::FetchComplete {
                namespace: namespace.to_string(),
                total: all.len(),
            },
        );
        Ok(all)
    }

    /// Repositories owned by or visible to the authenticated user.
    pub async fn list_authenticated_repos(
        &self,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<Vec<GitHubRepo>, GitHubError> {
        self.list_paginated(
            "user",
            |page| format!("/user/repos?type=all&sort=full_name&per_page={PAGE_SIZE}&page={page}"),
            on_progress,
        )
        .await
    }

    /// Public repositories (forks included) of a user or organization.
    pub async fn list_user_repos(
        &self,
        username: &str,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<Vec<GitHubRepo>, GitHubError> {
        self.list_paginated(
            username,
            |page| {
                format!(
                    "/users/{username}/repos?type=all&sort=full_name&per_page={PAGE_SIZE}&page={page}"
                )
            },
            on_progress,
        )
        .await
    }

    /// Fetch one repository. `None` when it does not exist.
    pub async fn get_repo(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<Option<GitHubRepo>, GitHubError> {
        let url = format!("{}/repos/{owner}/{name}", self.api_url);
        let resource = format!("{owner}/{name}");

        let attempt = || async {
            let response = self.get_once(&url).await?;
            match response.status {
                404 => Ok(None),
                s if (200..300).contains(&s) => {
                    Ok(Some(serde_json::from_slice::<GitHubRepo>(&response.body)?))
                }
                _ => Err(Self::error_for(&response, &resource)),
            }
        };

        with_retry(
            attempt,
            &self.retry,
            is_transient_error,
            short_error_message,
            &format!("GET {url}"),
            None,
        )
        .await
    }
}

#[async_trait]
impl SourceForge for GitHubClient {
    async fn list_own_repos(
        &self,
        on_progress: Option<&ProgressCallback>,
    ) -> platform::Result<Vec<RepoRef>> {
        let repos = self
            .list_authenticated_repos(on_progress)
            .await
            .map_err(PlatformError::from)?;
        Ok(repos
            .into_iter()
            .map(|r| to_repo_ref(r, RepoOrigin::Own))
            .collect())
    }

    async fn list_account_repos(
        &self,
        account: &str,
        on_progress: Option<&ProgressCallback>,
    ) -> platform::Result<Vec<RepoRef>> {
        let repos = self
            .list_user_repos(account, on_progress)
            .await
            .map_err(PlatformError::from)?;
        Ok(repos
            .into_iter()
            .map(|r| to_repo_ref(r, RepoOrigin::Account(account.to_string())))
            .collect())
    }

    async fn repo_exists(&self, owner: &str, name: &str) -> platform::Result<bool> {
        let repo = self
            .get_repo(owner, name)
            .await
            .map_err(PlatformError::from)?;
        // A renamed repository answers through a redirect under its new name.
        Ok(repo.is_some_and(|r| r.full_name == format!("{owner}/{name}")))
    }

    fn authenticated_url(&self, clone_url: &str) -> platform::Result<String> {
        url_with_credentials(clone_url, CLONE_USERNAME, &self.token)
    }
}

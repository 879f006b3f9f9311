use std::num::NonZeroU32;
use std::sync::Arc;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

/// Type alias for the governor rate limiter.
type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Default request rates per forge (requests per second).
pub mod rate_limits {
    /// GitHub: 5000 requests/hour for a PAT, listing is cheap.
    pub const GITHUB_DEFAULT_RPS: u32 = 5;
    /// GitLab: project create/mirror calls are heavier, stay conservative.
    pub const GITLAB_DEFAULT_RPS: u32 = 1;
}

/// A shared API throttle.
///
/// One limiter is shared by every call a client makes, so the aggregate
/// request rate stays bounded no matter how many repositories a run touches.
/// Clones share the same quota.
///
/// ```ignore
/// let limiter = ApiRateLimiter::new(1);
/// limiter.wait().await;
/// client.create_project(&group, &request).await?;
/// ```
#[derive(Clone)]
pub struct ApiRateLimiter {
    inner: Arc<GovernorRateLimiter>,
    requests_per_second: u32,
}

impl ApiRateLimiter {
    /// Create a new rate limiter with the specified requests per second.
    ///
    /// A rate of 0 is treated as 1.
    pub fn new(requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        // Burst of one: calls are spaced evenly instead of front-loaded.
        let quota = Quota::per_second(rps).allow_burst(NonZeroU32::MIN);

        Self {
            inner: Arc::new(RateLimiter::direct(quota)),
            requests_per_second: rps.get(),
        }
    }

    /// Configured rate.
    pub fn requests_per_second(&self) -> u32 {
        self.requests_per_second
    }

    /// Wait until a request is allowed by the rate limiter.
    pub async fn wait(&self) {
        self.inner.until_ready().await;
    }
}

impl std::fmt::Debug for ApiRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiRateLimiter")
            .field("requests_per_second", &self.requests_per_second)
            .finish()
    }
}

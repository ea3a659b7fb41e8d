//! Rate limit authority boundary
//!
//! The authority is an external quota service shared by every replica
//! (Redis here). [`LocalRateLimiter`] is the per-process best-effort counter
//! used when the authority cannot be reached.

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::services::error::StoreError;
use crate::services::repository::StoreResult;

/// Rate-limited user action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Interest,
    Pass,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Interest => "interest",
            ActionKind::Pass => "pass",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authority verdict for one action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub retry_after: Option<Duration>,
}

impl RateLimitDecision {
    pub fn allowed(remaining: u32) -> Self {
        Self {
            allowed: true,
            remaining,
            retry_after: None,
        }
    }

    pub fn denied(retry_after: Option<Duration>) -> Self {
        Self {
            allowed: false,
            remaining: 0,
            retry_after,
        }
    }
}

/// Per-action quota over a fixed window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub interest_limit: u32,
    pub pass_limit: u32,
    pub window: Duration,
}

impl RateLimitPolicy {
    pub fn limit_for(&self, action: ActionKind) -> u32 {
        match action {
            ActionKind::Interest => self.interest_limit,
            ActionKind::Pass => self.pass_limit,
        }
    }

    fn window_secs(&self) -> u64 {
        self.window.as_secs().max(1)
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            interest_limit: 100,
            pass_limit: 300,
            window: Duration::from_secs(3600),
        }
    }
}

/// External quota service
#[async_trait]
pub trait RateLimitAuthority: Send + Sync {
    /// Count one `action` for `user_id` and report whether it is allowed
    ///
    /// An `Err` means the authority could not answer, not that the action
    /// was denied.
    async fn check(&self, user_id: &str, action: ActionKind) -> StoreResult<RateLimitDecision>;
}

/// Redis fixed-window rate limiter
///
/// Keys are `ratelimit:{action}:{user}:{window index}`; `INCR` and `EXPIRE`
/// run in one atomic pipeline so every replica sees the same count.
///
/// The connection is opened on first use. While Redis is unreachable every
/// `check` returns an error and callers fall back to [`LocalRateLimiter`].
pub struct RedisRateLimitAuthority {
    client: redis::Client,
    redis: OnceCell<ConnectionManager>,
    policy: RateLimitPolicy,
}

impl RedisRateLimitAuthority {
    /// Parse the URL without connecting
    pub fn new(redis_url: &str, policy: RateLimitPolicy) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            client,
            redis: OnceCell::new(),
            policy,
        })
    }

    /// Open the shared connection if it is not open yet
    pub async fn connect(&self) -> StoreResult<()> {
        self.connection().await.map(|_| ())
    }

    async fn connection(&self) -> StoreResult<ConnectionManager> {
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(1)
            .set_connection_timeout(Duration::from_secs(2));

        let conn = self
            .redis
            .get_or_try_init(|| ConnectionManager::new_with_config(self.client.clone(), config))
            .await?;
        Ok(conn.clone())
    }

    /// Redis key for one user's action count in a given window
    pub fn window_key(action: ActionKind, user_id: &str, window_index: u64) -> String {
        format!("ratelimit:{}:{}:{}", action.as_str(), user_id, window_index)
    }
}

#[async_trait]
impl RateLimitAuthority for RedisRateLimitAuthority {
    async fn check(&self, user_id: &str, action: ActionKind) -> StoreResult<RateLimitDecision> {
        let window_secs = self.policy.window_secs();
        let now_secs = chrono::Utc::now().timestamp().max(0) as u64;
        let window_index = now_secs / window_secs;
        let key = Self::window_key(action, user_id, window_index);

        let mut conn = self.connection().await?;
        let (count,): (u32,) = redis::pipe()
            .atomic()
            .incr(&key, 1)
            .expire(&key, window_secs as i64)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(decide(
            count,
            self.policy.limit_for(action),
            Duration::from_secs((window_index + 1) * window_secs - now_secs),
        ))
    }
}

/// In-process fallback counter
///
/// Counters live in a moka cache whose time-to-live is the policy window, so
/// each (action, user) counter resets one window after its first hit.
pub struct LocalRateLimiter {
    counters: moka::future::Cache<String, Arc<AtomicU32>>,
    policy: RateLimitPolicy,
}

impl LocalRateLimiter {
    pub fn new(policy: RateLimitPolicy, max_tracked_users: u64) -> Self {
        let counters = moka::future::CacheBuilder::new(max_tracked_users)
            .time_to_live(policy.window)
            .build();
        Self { counters, policy }
    }

    /// Count one action locally; never fails
    pub async fn check_local(&self, user_id: &str, action: ActionKind) -> RateLimitDecision {
        let key = format!("{}:{}", action.as_str(), user_id);
        let counter = self
            .counters
            .get_with(key, async { Arc::new(AtomicU32::new(0)) })
            .await;
        let count = counter.fetch_add(1, Ordering::SeqCst).saturating_add(1);

        decide(count, self.policy.limit_for(action), self.policy.window)
    }
}

#[async_trait]
impl RateLimitAuthority for LocalRateLimiter {
    async fn check(&self, user_id: &str, action: ActionKind) -> StoreResult<RateLimitDecision> {
        Ok(self.check_local(user_id, action).await)
    }
}

#[inline]
fn decide(count: u32, limit: u32, retry_after: Duration) -> RateLimitDecision {
    if count > limit {
        RateLimitDecision::denied(Some(retry_after))
    } else {
        RateLimitDecision::allowed(limit - count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(limit: u32) -> RateLimitPolicy {
        RateLimitPolicy {
            interest_limit: limit,
            pass_limit: limit * 2,
            window: Duration::from_secs(60),
        }
    }

    #[tokio::test]
    async fn test_local_limiter_counts_per_user_and_action() {
        let limiter = LocalRateLimiter::new(policy(2), 1000);

        assert_eq!(limiter.check_local("u1", ActionKind::Interest).await, RateLimitDecision::allowed(1));
        assert_eq!(limiter.check_local("u1", ActionKind::Interest).await, RateLimitDecision::allowed(0));

        let denied = limiter.check_local("u1", ActionKind::Interest).await;
        assert!(!denied.allowed);
        assert_eq!(denied.retry_after, Some(Duration::from_secs(60)));

        // Separate budgets
        assert!(limiter.check_local("u2", ActionKind::Interest).await.allowed);
        assert!(limiter.check_local("u1", ActionKind::Pass).await.allowed);
    }

    #[test]
    fn test_window_key() {
        assert_eq!(
            RedisRateLimitAuthority::window_key(ActionKind::Pass, "user123", 42),
            "ratelimit:pass:user123:42"
        );
    }

    #[test]
    fn test_redis_authority_does_not_connect_on_construction() {
        assert!(RedisRateLimitAuthority::new("redis://127.0.0.1:1", policy(1)).is_ok());
        assert!(RedisRateLimitAuthority::new("not a url", policy(1)).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_redis_reports_error_then_local_fallback_allows() {
        let authority = RedisRateLimitAuthority::new("redis://127.0.0.1:1", policy(1)).unwrap();
        let fallback = LocalRateLimiter::new(policy(1), 1000);

        assert!(authority.check("u1", ActionKind::Interest).await.is_err());
        assert!(authority.connect().await.is_err());

        assert!(fallback.check_local("u1", ActionKind::Interest).await.allowed);
    }

    #[tokio::test]
    #[ignore = "Requires Redis"]
    async fn test_redis_authority() {
        let authority = RedisRateLimitAuthority::new("redis://127.0.0.1:6379", policy(1))
            .expect("Invalid Redis URL");
        let user = format!("test_{}", uuid::Uuid::new_v4());

        assert!(authority.check(&user, ActionKind::Interest).await.unwrap().allowed);
        let second = authority.check(&user, ActionKind::Interest).await.unwrap();
        assert!(!second.allowed);
        assert!(second.retry_after.is_some());
    }
}

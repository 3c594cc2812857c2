//! In-memory per-key rate limiter using the governor crate.

use std::num::NonZeroU32;
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use governor::clock::{Clock, DefaultClock};
use governor::middleware::StateInformationMiddleware;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter as GovernorRateLimiter};

use folio_core::ports::{RateLimitError, RateLimitResult, RateLimiter};

type KeyedRateLimiter = GovernorRateLimiter<
    String,
    DefaultKeyedStateStore<String>,
    DefaultClock,
    StateInformationMiddleware,
>;

/// Rate limit window configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: u32,
    /// Window duration.
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(60),
        }
    }
}

/// How often idle client keys are dropped.
pub const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Per-key limiter using the GCRA algorithm.
///
/// Limits are per-process, not shared across instances. Every client key
/// keeps a small state entry until [`InMemoryRateLimiter::prune`] drops the
/// ones whose quota has fully recovered.
pub struct InMemoryRateLimiter {
    limiter: KeyedRateLimiter,
    clock: DefaultClock,
    config: RateLimitConfig,
}

impl InMemoryRateLimiter {
    pub fn new(config: RateLimitConfig) -> Result<Self, RateLimitError> {
        let burst = NonZeroU32::new(config.max_requests)
            .ok_or_else(|| RateLimitError::Backend("max_requests must be non-zero".into()))?;
        let quota = Quota::with_period(config.window / burst.get())
            .ok_or_else(|| RateLimitError::Backend("window must be non-zero".into()))?
            .allow_burst(burst);

        let limiter = GovernorRateLimiter::keyed(quota).with_middleware::<StateInformationMiddleware>();

        Ok(Self {
            limiter,
            clock: DefaultClock::default(),
            config,
        })
    }

    /// Number of client keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.limiter.len()
    }

    /// Forget keys that have been idle long enough to be back at full
    /// quota. Returns how many keys remain.
    pub fn prune(&self) -> usize {
        let before = self.limiter.len();
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        let after = self.limiter.len();
        if before != after {
            tracing::debug!(removed = before - after, remaining = after, "Pruned idle rate limit keys");
        }
        after
    }

    /// Prune on a fixed interval. The task ends once the limiter is dropped.
    pub fn spawn_pruner(self: &Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        let limiter: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // The first tick fires immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match limiter.upgrade() {
                    Some(limiter) => {
                        limiter.prune();
                    }
                    None => break,
                }
            }
        })
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn check(&self, key: &str) -> Result<RateLimitResult, RateLimitError> {
        let key = key.to_string();
        match self.limiter.check_key(&key) {
            Ok(snapshot) => Ok(RateLimitResult::allowed(
                self.config.max_requests,
                snapshot.remaining_burst_capacity(),
                self.config.window,
            )),
            Err(not_until) => Ok(RateLimitResult::denied(
                self.config.max_requests,
                not_until.wait_time_from(self.clock.now()),
            )),
        }
    }
}

use crate::rate_limit::store::{CounterStore, StoreError};
use crate::rate_limit::{Decision, RateLimitConfig, RateLimiter};
use async_trait::async_trait;

/// A reset-on-expiry fixed-window rate limiter.
///
/// Each hit increments `prefix + client`. The first hit of a window arms the key's TTL with
/// the window length; once the TTL lapses the next hit starts over at 1.
///
/// If the TTL cannot be armed after a successful first increment, the hit fails with the
/// store error. The key is left without a TTL and is logged for manual cleanup; it is neither
/// retried nor reverted.
pub struct FixedWindow<S> {
    store: S,
    config: RateLimitConfig,
}

impl<S> FixedWindow<S>
where
    S: CounterStore,
{
    /// Create a new FixedWindow backed by `store`.
    pub fn new(store: S, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Counter key for `client`.
    pub fn key(&self, client: &str) -> String {
        format!("{}{}", self.config.prefix, client)
    }
}

impl<S> std::fmt::Debug for FixedWindow<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedWindow").field("config", &self.config).finish_non_exhaustive()
    }
}

#[async_trait]
impl<S> RateLimiter for FixedWindow<S>
where
    S: CounterStore,
{
    async fn acquire(&self, client: &str) -> Result<Decision, StoreError> {
        let key = self.key(client);
        let count = self.store.incr(&key).await?;

        if count == 1 {
            match self.store.expire(&key, self.config.window).await {
                Ok(true) => {}
                Ok(false) => {
                    // Evicted between INCR and EXPIRE; the next hit starts a fresh window.
                    tracing::debug!(key = %key, "counter vanished before ttl was set");
                }
                Err(e) => {
                    tracing::error!(
                        key = %key,
                        error = %e,
                        "counter incremented but ttl not set; key needs manual cleanup"
                    );
                    return Err(e);
                }
            }
        }

        let limit = i64::from(self.config.limit);
        if count > limit {
            tracing::debug!(key = %key, count, limit, "rate limit exceeded");
            return Ok(Decision::Denied { count, reason: self.config.message.clone() });
        }

        Ok(Decision::Allowed {
            count,
            remaining: u32::try_from(limit - count).unwrap_or(0),
        })
    }
}

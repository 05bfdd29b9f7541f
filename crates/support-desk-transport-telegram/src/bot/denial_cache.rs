//! Registration denial flood protection
//!
//! Users refused by the registration gate get the denial notice at most once
//! per cooldown period; repeated attempts are only counted.

use moka::future::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Tracks when a user last received a registration denial notice
#[derive(Clone)]
pub struct DenialCache {
    /// user_id -> time of the last notice, with automatic TTL
    cache: Cache<i64, Instant>,
    cooldown: Duration,
    silenced_count: Arc<AtomicU64>,
}

impl DenialCache {
    /// Creates a new `DenialCache`
    ///
    /// # Arguments
    ///
    /// * `cooldown_secs` - Seconds between denial notices to the same user
    /// * `ttl_secs` - Time-to-live for cache entries
    /// * `max_capacity` - Maximum number of entries in cache
    #[must_use]
    pub fn new(cooldown_secs: u64, ttl_secs: u64, max_capacity: u64) -> Self {
        // Entries must outlive the cooldown they enforce.
        let ttl = ttl_secs.max(cooldown_secs).max(1);
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(Duration::from_secs(ttl))
            .build();

        Self {
            cache,
            cooldown: Duration::from_secs(cooldown_secs),
            silenced_count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Whether a denial notice should be sent to `user_id` now.
    ///
    /// Only every 100th silenced attempt is logged.
    pub async fn should_send(&self, user_id: i64, user_name: &str) -> bool {
        let recently_sent = self
            .cache
            .get(&user_id)
            .await
            .is_some_and(|sent_at| sent_at.elapsed() < self.cooldown);
        if !recently_sent {
            return true;
        }

        let count = self.silenced_count.fetch_add(1, Ordering::Relaxed) + 1;
        if count.is_multiple_of(100) {
            debug!(
                "⛔️ Silenced {} registration attempts (recent: user {} - {})",
                count, user_id, user_name
            );
        }

        false
    }

    /// Start the cooldown for `user_id` after a notice was delivered
    pub async fn mark_sent(&self, user_id: i64) {
        self.cache.insert(user_id, Instant::now()).await;
    }
}

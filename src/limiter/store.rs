//! Counter store: atomic increment-with-expiry over a shared backend,
//! with an in-process fallback.
//!
//! # Data Flow
//! ```text
//! increment(key, window)
//!     → shared backend (Redis INCR + PEXPIRE via Lua, bounded by timeout)
//!         ok  → Counted
//!         err → in-process DashMap window (per-key entry exclusion)
//! ```
//!
//! # Design Decisions
//! - One store type, two internal variants, one failover rule; callers
//!   never branch on backend availability
//! - The shared handle is established lazily and reused; the connection
//!   manager reconnects on its own, so recovery needs no restart
//! - Failure transitions are logged once per transition, not per request
//! - During an outage the guarantee degrades from global quota to
//!   per-instance quota; accepted trade-off, not a bug

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use redis::aio::ConnectionManager;
use redis::{Client, Script};
use tokio::sync::RwLock;

use crate::config::schema::CounterStoreConfig;
use crate::observability::metrics;

/// Result of one counted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counted {
    /// Count within the current window, including this request.
    pub count: u64,
    /// Time left until the window expires.
    pub window_remaining: Duration,
}

/// Internal failure of the shared backend. Absorbed by failover; never
/// surfaced to a caller of [`CounterStore::increment`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("shared backend unavailable: {0}")]
    Unavailable(#[from] redis::RedisError),

    #[error("shared backend timed out")]
    Timeout,
}

/// First INCR in a window sets the expiry; later increments never reset
/// it. The PTTL guard self-heals a key that lost its expiry.
const INCREMENT_SCRIPT: &str = r#"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
  redis.call('PEXPIRE', KEYS[1], ARGV[1])
end
local remaining = redis.call('PTTL', KEYS[1])
if remaining < 0 then
  redis.call('PEXPIRE', KEYS[1], ARGV[1])
  remaining = tonumber(ARGV[1])
end
return {count, remaining}
"#;

/// Redis-backed counter. The `ConnectionManager` is process-wide: created
/// on first use, shared by clone, reconnecting on its own afterwards.
struct SharedCounter {
    client: Client,
    manager: RwLock<Option<ConnectionManager>>,
    op_timeout: Duration,
    key_prefix: String,
    script: Script,
}

impl SharedCounter {
    fn new(url: &str, key_prefix: String, op_timeout: Duration) -> Result<Self, StoreError> {
        let client = Client::open(url)?;
        Ok(Self {
            client,
            manager: RwLock::new(None),
            op_timeout,
            key_prefix,
            script: Script::new(INCREMENT_SCRIPT),
        })
    }

    /// Reuse the established manager, or establish one without holding
    /// the slot lock across the connect await. Racing establishers both
    /// succeed; last write wins.
    async fn manager(&self) -> Result<ConnectionManager, StoreError> {
        if let Some(manager) = self.manager.read().await.clone() {
            return Ok(manager);
        }

        let manager = tokio::time::timeout(
            self.op_timeout,
            ConnectionManager::new(self.client.clone()),
        )
        .await
        .map_err(|_| StoreError::Timeout)??;

        *self.manager.write().await = Some(manager.clone());
        Ok(manager)
    }

    async fn increment(&self, key: &str, window: Duration) -> Result<Counted, StoreError> {
        let mut conn = self.manager().await?;
        let full_key = format!("{}{}", self.key_prefix, key);
        let window_ms = window.as_millis() as u64;

        let invocation = async {
            self.script
                .key(full_key)
                .arg(window_ms)
                .invoke_async(&mut conn)
                .await
        };
        let (count, remaining_ms): (u64, i64) = tokio::time::timeout(self.op_timeout, invocation)
            .await
            .map_err(|_| StoreError::Timeout)??;

        Ok(Counted {
            count,
            window_remaining: Duration::from_millis(remaining_ms.max(0) as u64),
        })
    }
}

#[derive(Debug)]
struct LocalWindow {
    count: u64,
    window: Duration,
    started: Instant,
}

/// In-process fallback counter. The DashMap entry guard is the per-key
/// mutual exclusion; it is held only for the synchronous
/// increment-and-check, never across an await.
struct LocalCounter {
    windows: DashMap<String, LocalWindow>,
    high_water: usize,
}

impl LocalCounter {
    fn new(high_water: usize) -> Self {
        Self {
            windows: DashMap::new(),
            high_water,
        }
    }

    fn increment(&self, key: &str, window: Duration) -> Counted {
        // Prune before taking the entry guard; retain() under a held
        // guard would deadlock on the same shard.
        if self.windows.len() > self.high_water {
            self.prune();
        }

        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert_with(|| LocalWindow {
                count: 0,
                window,
                started: Instant::now(),
            });

        if entry.started.elapsed() >= window {
            entry.count = 0;
            entry.window = window;
            entry.started = Instant::now();
        }
        entry.count += 1;

        Counted {
            count: entry.count,
            window_remaining: window.saturating_sub(entry.started.elapsed()),
        }
    }

    fn prune(&self) {
        self.windows
            .retain(|_, w| w.started.elapsed() < w.window);
    }
}

/// Distributed counter with an internal failover rule.
pub struct CounterStore {
    shared: Option<SharedCounter>,
    local: LocalCounter,
    degraded: AtomicBool,
}

impl CounterStore {
    /// Build from config. An empty backend URL yields an in-process-only
    /// store. A malformed URL is a startup error.
    pub fn from_config(config: &CounterStoreConfig) -> Result<Self, StoreError> {
        let shared = if config.backend_url.is_empty() {
            None
        } else {
            Some(SharedCounter::new(
                &config.backend_url,
                config.key_prefix.clone(),
                Duration::from_millis(config.op_timeout_ms),
            )?)
        };

        Ok(Self {
            shared,
            local: LocalCounter::new(config.local_high_water),
            degraded: AtomicBool::new(false),
        })
    }

    /// In-process-only store (development and tests).
    pub fn local_only(high_water: usize) -> Self {
        Self {
            shared: None,
            local: LocalCounter::new(high_water),
            degraded: AtomicBool::new(false),
        }
    }

    /// Count one request against `key`'s current window.
    ///
    /// Every call attempts the shared backend first; on error or timeout
    /// it falls back to the in-process store for this call only.
    pub async fn increment(&self, key: &str, window: Duration) -> Counted {
        if let Some(shared) = &self.shared {
            match shared.increment(key, window).await {
                Ok(counted) => {
                    if self.degraded.swap(false, Ordering::Relaxed) {
                        tracing::info!("shared counter backend recovered");
                        metrics::record_store_recovery();
                    }
                    return counted;
                }
                Err(error) => {
                    if !self.degraded.swap(true, Ordering::Relaxed) {
                        tracing::warn!(
                            %error,
                            "shared counter backend unavailable, counting in-process"
                        );
                        metrics::record_store_failover();
                    }
                }
            }
        }

        self.local.increment(key, window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn local_count_is_monotonic_within_window() {
        let local = LocalCounter::new(100);
        let window = Duration::from_secs(60);

        for expected in 1..=5 {
            let counted = local.increment("k", window);
            assert_eq!(counted.count, expected);
            assert!(counted.window_remaining <= window);
        }
    }

    #[test]
    fn local_window_rolls_over() {
        let local = LocalCounter::new(100);
        let window = Duration::from_millis(20);

        assert_eq!(local.increment("k", window).count, 1);
        assert_eq!(local.increment("k", window).count, 2);

        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(local.increment("k", window).count, 1);
    }

    #[test]
    fn keys_do_not_share_windows() {
        let local = LocalCounter::new(100);
        let window = Duration::from_secs(60);

        assert_eq!(local.increment("a", window).count, 1);
        assert_eq!(local.increment("b", window).count, 1);
        assert_eq!(local.increment("a", window).count, 2);
    }

    #[test]
    fn prune_drops_only_expired_windows() {
        let local = LocalCounter::new(0);
        local.increment("stale", Duration::from_millis(5));
        std::thread::sleep(Duration::from_millis(10));
        local.increment("fresh", Duration::from_secs(60));

        local.prune();
        assert!(!local.windows.contains_key("stale"));
        assert!(local.windows.contains_key("fresh"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_increments_are_never_lost() {
        let local = Arc::new(LocalCounter::new(1_000));
        let window = Duration::from_secs(60);

        let mut handles = Vec::new();
        for _ in 0..64 {
            let local = local.clone();
            handles.push(tokio::spawn(async move {
                local.increment("shared-key", window).count
            }));
        }

        let mut counts = Vec::new();
        for handle in handles {
            counts.push(handle.await.unwrap());
        }
        counts.sort_unstable();

        // Linearizable: every pre-increment count observed exactly once.
        let expected: Vec<u64> = (1..=64).collect();
        assert_eq!(counts, expected);
    }

    #[tokio::test]
    async fn unreachable_backend_falls_back_and_still_counts() {
        let config = CounterStoreConfig {
            backend_url: "redis://127.0.0.1:1/".to_string(),
            op_timeout_ms: 100,
            ..CounterStoreConfig::default()
        };
        let store = CounterStore::from_config(&config).unwrap();
        let window = Duration::from_secs(60);

        assert_eq!(store.increment("k", window).await.count, 1);
        assert_eq!(store.increment("k", window).await.count, 2);
        assert!(store.degraded.load(Ordering::Relaxed));
    }

    #[test]
    fn malformed_backend_url_is_a_startup_error() {
        let config = CounterStoreConfig {
            backend_url: "redis://not a url".to_string(),
            ..CounterStoreConfig::default()
        };
        assert!(CounterStore::from_config(&config).is_err());
    }
}

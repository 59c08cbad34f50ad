//! Shared key-value storage for counters and cached records.
//!
//! Provides a store abstraction with two backends:
//! - In-memory (default, single instance)
//! - Redis (shared between gateway replicas)
//!
//! Counter increments attach their expiry in the same atomic step that
//! creates the counter, so concurrent callers never observe a counter
//! without a TTL.

use async_trait::async_trait;
use gateway_core::GatewayError;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};

/// Error types for store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// Connection error
    #[error("Store connection error: {0}")]
    Connection(String),

    /// Command rejected by the backend
    #[error("Store command error: {0}")]
    Command(String),

    /// Value could not be encoded or decoded
    #[error("Store serialization error: {0}")]
    Serialization(String),

    /// Backend not available
    #[error("Store backend not available: {0}")]
    Unavailable(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error() || err.is_connection_refusal() || err.is_connection_dropped() {
            Self::Connection(err.to_string())
        } else {
            Self::Command(err.to_string())
        }
    }
}

impl From<StoreError> for GatewayError {
    fn from(err: StoreError) -> Self {
        Self::store(err.to_string())
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Counter value after an increment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterValue {
    /// Count including this increment
    pub count: u64,
    /// Time until the counter expires
    pub ttl: Duration,
}

/// Store backend trait for polymorphic store implementations
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get a value
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Set a value with TTL, replacing any previous value
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StoreResult<()>;

    /// Delete a key, returning whether it existed
    async fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Atomically increment a counter
    ///
    /// A counter created by this call expires after `window`. An existing
    /// counter keeps its expiry.
    async fn increment(&self, key: &str, window: Duration) -> StoreResult<CounterValue>;

    /// Check if the backend is healthy
    async fn health_check(&self) -> StoreResult<()>;

    /// Get backend name for logs
    fn name(&self) -> &'static str;

    /// Check if backend is shared between processes
    fn is_distributed(&self) -> bool;
}

#[derive(Debug, Clone)]
struct Entry {
    data: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Minimum time between sweeps of expired entries
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct Entries {
    map: HashMap<String, Entry>,
    last_sweep: Instant,
}

impl Default for Entries {
    fn default() -> Self {
        Self {
            map: HashMap::new(),
            last_sweep: Instant::now(),
        }
    }
}

impl Entries {
    fn purge(&mut self, now: Instant) -> usize {
        let before = self.map.len();
        self.map.retain(|_, e| !e.is_expired(now));
        self.last_sweep = now;
        before - self.map.len()
    }

    // Called on every write, so keys that are never touched again still go.
    fn sweep_if_due(&mut self, now: Instant) {
        if now.saturating_duration_since(self.last_sweep) < SWEEP_INTERVAL {
            return;
        }
        let purged = self.purge(now);
        if purged > 0 {
            debug!(purged, remaining = self.map.len(), "Swept expired entries");
        }
    }
}

/// In-memory store for single-instance deployments
///
/// Expired entries are dropped when touched, and swept from the whole map
/// by the first write after each sweep interval.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<Entries>>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .map
            .values()
            .filter(|e| !e.is_expired(now))
            .count()
    }

    /// Whether the store holds no live entries
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop every expired entry
    pub async fn purge_expired(&self) -> usize {
        self.entries.write().await.purge(Instant::now())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        match entries.map.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.map.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.data.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StoreResult<()> {
        let now = Instant::now();
        let expires_at = (!ttl.is_zero()).then(|| now + ttl);
        let mut entries = self.entries.write().await;
        entries.sweep_if_due(now);
        entries.map.insert(
            key.to_string(),
            Entry {
                data: value,
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let now = Instant::now();
        let removed = self.entries.write().await.map.remove(key);
        Ok(removed.is_some_and(|e| !e.is_expired(now)))
    }

    async fn increment(&self, key: &str, window: Duration) -> StoreResult<CounterValue> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.sweep_if_due(now);

        let live = entries.map.get(key).filter(|e| !e.is_expired(now));
        let (count, expires_at) = match live {
            Some(entry) => {
                let current = std::str::from_utf8(&entry.data)
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok())
                    .ok_or_else(|| {
                        StoreError::Command(format!("value at '{key}' is not an integer"))
                    })?;
                // A counter without expiry gets one, as the Redis script does.
                (current + 1, entry.expires_at.unwrap_or(now + window))
            }
            None => (1, now + window),
        };

        entries.map.insert(
            key.to_string(),
            Entry {
                data: count.to_string().into_bytes(),
                expires_at: Some(expires_at),
            },
        );

        Ok(CounterValue {
            count,
            ttl: expires_at.saturating_duration_since(now),
        })
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }

    fn is_distributed(&self) -> bool {
        false
    }
}

// INCR, then attach the window expiry when the counter was just created or
// has somehow lost its TTL. Returns {count, pttl}.
const INCREMENT_SCRIPT: &str = r"
local count = redis.call('INCR', KEYS[1])
local ttl = redis.call('PTTL', KEYS[1])
if count == 1 or ttl < 0 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
    ttl = tonumber(ARGV[1])
end
return {count, ttl}
";

/// Redis-backed store shared between gateway replicas
#[derive(Clone)]
pub struct RedisStore {
    connection: redis::aio::ConnectionManager,
    increment_script: redis::Script,
}

impl RedisStore {
    /// Connect to Redis
    ///
    /// # Errors
    /// Returns `StoreError::Connection` if the URL is invalid or the server
    /// cannot be reached
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let client =
            redis::Client::open(url).map_err(|e| StoreError::Connection(e.to_string()))?;
        let connection = client
            .get_connection_manager()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        info!("Connected to Redis store");

        Ok(Self {
            connection,
            increment_script: redis::Script::new(INCREMENT_SCRIPT),
        })
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let mut conn = self.connection.clone();
        let value: Option<Vec<u8>> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StoreResult<()> {
        let mut conn = self.connection.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if !ttl.is_zero() {
            cmd.arg("PX").arg(millis(ttl));
        }
        let _: () = cmd.query_async(&mut conn).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let mut conn = self.connection.clone();
        let removed: u64 = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
        Ok(removed > 0)
    }

    async fn increment(&self, key: &str, window: Duration) -> StoreResult<CounterValue> {
        let mut conn = self.connection.clone();
        let (count, ttl_ms): (u64, i64) = self
            .increment_script
            .key(key)
            .arg(millis(window))
            .invoke_async(&mut conn)
            .await?;

        debug!(key = %key, count, ttl_ms, "Incremented counter");

        Ok(CounterValue {
            count,
            ttl: Duration::from_millis(u64::try_from(ttl_ms).unwrap_or(0)),
        })
    }

    async fn health_check(&self) -> StoreResult<()> {
        let mut conn = self.connection.clone();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        if pong == "PONG" {
            Ok(())
        } else {
            Err(StoreError::Unavailable(format!("unexpected PING reply: {pong}")))
        }
    }

    fn name(&self) -> &'static str {
        "redis"
    }

    fn is_distributed(&self) -> bool {
        true
    }
}

//! TTL cache layered over an injected [`Storage`] backing.
//!
//! Entries are stored as JSON `{"expiresOn": <epoch ms>, "value": ...}` and
//! are visible only while `now < expiresOn`. Expired entries are purged
//! lazily when read. Any storage or decoding failure is treated as a miss.

mod storage;

pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

/// Longest TTL accepted; longer values are clamped.
pub const MAX_TTL: Duration = Duration::from_millis((1 << 31) - 1);

const PROBE_KEY: &str = "__account_sdk_probe__";

/// Source of the current time, in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EntryRef<'a, T> {
    expires_on: i64,
    value: &'a T,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Entry<T> {
    expires_on: i64,
    value: T,
}

/// Key/value cache with per-entry expiry.
#[derive(Clone)]
pub struct TtlCache {
    storage: Option<Arc<dyn Storage>>,
    clock: Arc<dyn Clock>,
}

impl TtlCache {
    /// Create a cache over `storage`, using the system clock.
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage: Some(storage),
            clock: Arc::new(SystemClock),
        }
    }

    /// A cache with no backing; every read misses.
    #[must_use]
    pub fn detached() -> Self {
        Self {
            storage: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Whether the backing accepts writes.
    #[must_use]
    pub fn is_available(&self) -> bool {
        let Some(storage) = &self.storage else {
            return false;
        };
        storage
            .set_item(PROBE_KEY, PROBE_KEY)
            .and_then(|()| storage.remove_item(PROBE_KEY))
            .is_ok()
    }

    /// Read an unexpired value.
    #[must_use]
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let storage = self.storage.as_ref()?;

        let raw = match storage.get_item(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "Cache read failed");
                return None;
            }
        };

        let entry: Entry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key, error = %e, "Discarding unreadable cache entry");
                self.delete(key);
                return None;
            }
        };

        if self.clock.now_millis() >= entry.expires_on {
            debug!(key, "Cache entry expired");
            self.delete(key);
            return None;
        }

        Some(entry.value)
    }

    /// Store `value` for `ttl`. A zero TTL stores nothing.
    pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let Some(storage) = &self.storage else {
            return;
        };
        if ttl.is_zero() {
            return;
        }

        let ttl_ms = i64::try_from(ttl.min(MAX_TTL).as_millis()).unwrap_or(i64::MAX);
        let entry = EntryRef {
            expires_on: self.clock.now_millis().saturating_add(ttl_ms),
            value,
        };

        let result = serde_json::to_string(&entry)
            .map_err(StorageError::from)
            .and_then(|raw| storage.set_item(key, &raw));
        if let Err(e) = result {
            warn!(key, error = %e, "Cache write failed");
        }
    }

    /// Remove a key unconditionally.
    pub fn delete(&self, key: &str) {
        if let Some(storage) = &self.storage
            && let Err(e) = storage.remove_item(key)
        {
            warn!(key, error = %e, "Cache delete failed");
        }
    }
}

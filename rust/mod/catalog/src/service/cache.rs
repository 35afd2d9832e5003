use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use vidcat_kv::KVStore;

use crate::service::CatalogError;

/// Key prefix for cache entries in the KV store.
pub const CACHE_PREFIX: &str = "classification:cache:";

/// Default staleness window.
pub const DEFAULT_EXPIRATION_DAYS: i64 = 3;

/// When a user's grants were last pulled from the authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub user_id: String,
    pub last_refreshed_at: DateTime<Utc>,
}

/// Persistent per-user refresh timestamps, one KV entry per user.
///
/// The grants themselves live in [`GrantStore`](super::grants::GrantStore);
/// this only decides when they must be fetched again.
pub struct ClassificationCache {
    kv: Arc<dyn KVStore>,
    expiration_days: i64,
}

impl ClassificationCache {
    pub fn new(kv: Arc<dyn KVStore>, expiration_days: i64) -> Self {
        Self {
            kv,
            expiration_days,
        }
    }

    pub fn expiration_days(&self) -> i64 {
        self.expiration_days
    }

    /// Whether the user's grants must be refreshed. See [`Self::is_stale_at`].
    pub fn is_stale(&self, user_id: &str) -> Result<bool, CatalogError> {
        self.is_stale_at(user_id, Utc::now())
    }

    /// Whether the user's grants must be refreshed, as of `now`.
    ///
    /// A missing entry is created and reported stale. An existing entry is
    /// stale when more than `expiration_days` whole days (rounded up) lie
    /// between its timestamp and `now`. Whenever the answer is `true`, the
    /// entry is stamped with `now` before returning.
    pub fn is_stale_at(&self, user_id: &str, now: DateTime<Utc>) -> Result<bool, CatalogError> {
        let stale = match self.entry(user_id)? {
            None => {
                debug!(user_id, "no classification cache entry");
                true
            }
            Some(entry) => {
                let days = elapsed_days(entry.last_refreshed_at, now);
                debug!(user_id, days, "classification cache age");
                days > self.expiration_days
            }
        };
        if stale {
            self.stamp(user_id, now)?;
        }
        Ok(stale)
    }

    /// Read a user's entry. A corrupt entry reads as absent.
    pub fn entry(&self, user_id: &str) -> Result<Option<CacheEntry>, CatalogError> {
        let Some(bytes) = self.kv.get(&cache_key(user_id))? else {
            return Ok(None);
        };
        match serde_json::from_slice(&bytes) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                warn!(user_id, error = %e, "discarding unreadable classification cache entry");
                Ok(None)
            }
        }
    }

    /// Record a refresh at `at`.
    pub fn stamp(&self, user_id: &str, at: DateTime<Utc>) -> Result<(), CatalogError> {
        let entry = CacheEntry {
            user_id: user_id.to_string(),
            last_refreshed_at: at,
        };
        let bytes =
            serde_json::to_vec(&entry).map_err(|e| CatalogError::Internal(e.to_string()))?;
        self.kv.set(&cache_key(user_id), &bytes)?;
        Ok(())
    }

    /// Drop a user's entry so the next check reports stale.
    pub fn invalidate(&self, user_id: &str) -> Result<bool, CatalogError> {
        Ok(self.kv.delete(&cache_key(user_id))?)
    }

    /// Physically remove entries that have outlived the window as of `now`.
    /// Unreadable entries go too. Returns the number removed.
    ///
    /// Staleness never depends on this having run.
    pub fn evict_expired(&self, now: DateTime<Utc>) -> Result<usize, CatalogError> {
        let mut expired = Vec::new();
        for (key, bytes) in self.kv.scan(CACHE_PREFIX)? {
            let keep = serde_json::from_slice::<CacheEntry>(&bytes)
                .map(|entry| elapsed_days(entry.last_refreshed_at, now) <= self.expiration_days)
                .unwrap_or(false);
            if !keep {
                expired.push(key);
            }
        }

        let keys: Vec<&str> = expired.iter().map(String::as_str).collect();
        let removed = self.kv.batch_delete(&keys)?;
        if removed > 0 {
            info!(removed, "evicted expired classification cache entries");
        }
        Ok(removed)
    }
}

fn cache_key(user_id: &str) -> String {
    format!("{}{}", CACHE_PREFIX, user_id)
}

/// Absolute distance between two instants in whole days, rounded up.
/// Any remainder counts, down to the nanosecond.
pub fn elapsed_days(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    let delta = if from <= to { to - from } else { from - to };
    let whole = delta.num_days();
    if delta > Duration::days(whole) {
        whole + 1
    } else {
        whole
    }
}

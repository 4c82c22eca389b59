//! Token replay detection.
//!
//! The pipeline consults an external cache keyed by the raw token
//! string. The in-memory implementation stores xxhash digests instead of
//! full tokens and sweeps expired entries to bound memory growth.

use std::hash::BuildHasherDefault;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use twox_hash::XxHash64;

/// Hash builder for token digests.
static HASHER: Lazy<BuildHasherDefault<XxHash64>> = Lazy::new(BuildHasherDefault::default);

/// External store preventing reuse of a single-use token.
///
/// `try_add` may refuse a token outright when its expiration lies beyond
/// what the cache is able to track; the pipeline reports that as a
/// replay failure rather than silently skipping detection.
pub trait TokenReplayCache: Send + Sync {
    /// Record a token until `expires_at`. Returns false if the cache
    /// cannot or will not track it.
    fn try_add(&self, token: &str, expires_at: DateTime<Utc>) -> bool;

    /// Whether the token has been recorded and has not yet expired.
    fn try_find(&self, token: &str) -> bool;
}

/// In-memory replay cache with a tracked-expiration ceiling.
pub struct InMemoryReplayCache {
    entries: DashMap<u64, DateTime<Utc>, BuildHasherDefault<XxHash64>>,
    max_tracked_lifetime: Duration,
}

impl InMemoryReplayCache {
    /// Create a cache that refuses to track tokens expiring more than
    /// `max_tracked_lifetime` from now.
    pub fn new(max_tracked_lifetime: Duration) -> Self {
        Self {
            entries: DashMap::with_hasher(HASHER.clone()),
            max_tracked_lifetime,
        }
    }

    /// Drop entries whose tokens have expired.
    pub fn purge_expired(&self) {
        let now = Utc::now();
        self.entries.retain(|_, expires_at| *expires_at > now);
    }

    /// Number of tokens currently tracked.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn digest(token: &str) -> u64 {
        use std::hash::{BuildHasher, Hasher};
        let mut hasher = (*HASHER).build_hasher();
        hasher.write(token.as_bytes());
        hasher.finish()
    }
}

impl TokenReplayCache for InMemoryReplayCache {
    fn try_add(&self, token: &str, expires_at: DateTime<Utc>) -> bool {
        if expires_at > Utc::now() + self.max_tracked_lifetime {
            return false;
        }
        self.entries.insert(Self::digest(token), expires_at);
        true
    }

    fn try_find(&self, token: &str) -> bool {
        match self.entries.get(&Self::digest(token)) {
            Some(expires_at) => *expires_at > Utc::now(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_presentation_is_found() {
        let cache = InMemoryReplayCache::new(Duration::hours(2));
        let expires = Utc::now() + Duration::hours(1);

        assert!(!cache.try_find("token-a"));
        assert!(cache.try_add("token-a", expires));
        assert!(cache.try_find("token-a"));
        assert!(!cache.try_find("token-b"));
    }

    #[test]
    fn tokens_beyond_the_ceiling_are_refused() {
        let cache = InMemoryReplayCache::new(Duration::minutes(5));
        assert!(!cache.try_add("long-lived", Utc::now() + Duration::hours(1)));
    }

    #[test]
    fn purge_drops_expired_entries() {
        let cache = InMemoryReplayCache::new(Duration::hours(2));
        assert!(cache.try_add("stale", Utc::now() - Duration::seconds(1)));
        assert!(!cache.try_find("stale"));
        cache.purge_expired();
        assert!(cache.is_empty());
    }
}

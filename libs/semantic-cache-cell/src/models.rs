// libs/semantic-cache-cell/src/models.rs
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Entries older than this that never earned a hit (or went idle, see
/// [`IDLE_DAYS`]) are reclaimed even when their nominal TTL was generous.
pub const RETENTION_DAYS: i64 = 7;
/// An entry whose last hit is older than this counts as idle.
pub const IDLE_DAYS: i64 = 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub cache_key: String,
    pub normalized_query: String,
    pub query_hash: String,
    pub response_text: String,
    pub metadata: Value,
    pub hit_count: i64,
    pub created_at: DateTime<Utc>,
    pub last_hit_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Expired entries may still be physically present; lookups must treat
    /// them as misses.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Dual staleness rule: past the retention age, an entry survives only
    /// if it was hit recently.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        if now - self.created_at <= Duration::days(RETENTION_DAYS) {
            return false;
        }

        match self.last_hit_at {
            None => true,
            Some(last_hit) => now - last_hit > Duration::days(IDLE_DAYS),
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheLookupRequest {
    pub query_text: String,
    pub context_hash: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStoreRequest {
    pub query_text: String,
    pub context_hash: Option<String>,
    pub response_text: String,
    pub metadata: Option<Value>,
    pub ttl_seconds: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheLookupResponse {
    pub response_text: String,
    pub metadata: Value,
    pub hit_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupReport {
    pub expired_removed: u64,
    pub stale_removed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_entries: u64,
    pub expired_entries: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(created_at: DateTime<Utc>, last_hit_at: Option<DateTime<Utc>>, expires_at: DateTime<Utc>) -> CacheEntry {
        CacheEntry {
            cache_key: "semantic_cache:test".to_string(),
            normalized_query: "next opening".to_string(),
            query_hash: "abc".to_string(),
            response_text: "Tuesday at 10:00".to_string(),
            metadata: Value::Null,
            hit_count: 0,
            created_at,
            last_hit_at,
            expires_at,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn fresh_entry_is_neither_expired_nor_stale() {
        let now = now();
        let e = entry(now - Duration::hours(1), Some(now - Duration::minutes(5)), now + Duration::hours(1));

        assert!(!e.is_expired(now));
        assert!(!e.is_stale(now));
    }

    #[test]
    fn entry_past_expiry_is_expired() {
        let now = now();
        let e = entry(now - Duration::hours(2), None, now - Duration::minutes(1));

        assert!(e.is_expired(now));
    }

    #[test]
    fn old_never_hit_entry_is_stale() {
        let now = now();
        let e = entry(now - Duration::days(8), None, now + Duration::days(30));

        assert!(e.is_stale(now));
    }

    #[test]
    fn old_idle_entry_is_stale() {
        let now = now();
        let e = entry(
            now - Duration::days(8),
            Some(now - Duration::days(3)),
            now + Duration::days(30),
        );

        assert!(e.is_stale(now));
    }

    #[test]
    fn old_but_recently_hit_entry_survives() {
        let now = now();
        let e = entry(
            now - Duration::days(8),
            Some(now - Duration::days(1)),
            now + Duration::days(30),
        );

        assert!(!e.is_stale(now));
    }

    #[test]
    fn young_never_hit_entry_is_not_stale() {
        let now = now();
        let e = entry(now - Duration::days(2), None, now + Duration::days(30));

        assert!(!e.is_stale(now));
    }
}

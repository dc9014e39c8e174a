// libs/semantic-cache-cell/src/services/cache.rs
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use deadpool_redis::{Config, Connection, Pool, Runtime};
use redis::AsyncCommands;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_utils::clock::Clock;

use crate::error::CacheError;
use crate::models::{CacheEntry, CacheLookupResponse, CacheStats, CleanupReport};

pub const DEFAULT_TTL_SECONDS: i64 = 3600;

const KEY_PREFIX: &str = "semantic_cache:";

/// Response cache keyed by lexically normalized query text. "Semantic"
/// means two queries differing only in casing or whitespace share an entry;
/// there is no embedding similarity here.
pub struct SemanticCacheService {
    pool: Pool,
    clock: Arc<dyn Clock>,
}

impl SemanticCacheService {
    pub fn new(config: &AppConfig, clock: Arc<dyn Clock>) -> Result<Self, CacheError> {
        let redis_url = config
            .redis_url
            .clone()
            .unwrap_or_else(|| "redis://localhost:6379".to_string());

        let cfg = Config::from_url(redis_url);
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| CacheError::PoolError(e.to_string()))?;

        Ok(Self { pool, clock })
    }

    /// Lowercase, trim, and collapse internal whitespace runs to a single
    /// space.
    pub fn normalize_query(query_text: &str) -> String {
        query_text
            .trim()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Stable cache key for a query: hash of the normalized text, combined
    /// with the caller's context hash when one is supplied.
    pub fn make_key(query_text: &str, context_hash: Option<&str>) -> String {
        let normalized = Self::normalize_query(query_text);

        let mut hasher = Sha256::new();
        hasher.update(normalized.as_bytes());
        if let Some(context) = context_hash {
            hasher.update(b"\x1f");
            hasher.update(context.as_bytes());
        }

        format!("{}{}", KEY_PREFIX, hex_digest(hasher))
    }

    /// Look up a cached response. A hit atomically increments the hit count
    /// and stamps last_hit_at; expired entries read as a miss even while
    /// still physically present.
    pub async fn get(&self, key: &str) -> Result<Option<CacheLookupResponse>, CacheError> {
        let mut conn = self.get_connection().await?;

        let expires_raw: Option<String> = conn.hget(key, "expires_at").await?;
        let Some(expires_raw) = expires_raw else {
            debug!("Cache miss for {}", key);
            return Ok(None);
        };

        let now = self.clock.now();
        let Some(expires_at) = parse_instant(&expires_raw) else {
            warn!("Discarding cache entry {} with unreadable expiry", key);
            let _: () = conn.del(key).await?;
            return Ok(None);
        };

        if expires_at <= now {
            debug!("Cache entry {} expired at {}, treating as miss", key, expires_at);
            return Ok(None);
        }

        // HINCRBY is atomic, so concurrent hits never lose an increment.
        let hit_count: i64 = conn.hincr(key, "hit_count", 1).await?;
        let _: () = conn.hset(key, "last_hit_at", now.to_rfc3339()).await?;

        let response_text: String = conn.hget(key, "response_text").await.unwrap_or_default();
        let metadata_raw: Option<String> = conn.hget(key, "metadata").await?;
        let metadata = metadata_raw
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?
            .unwrap_or(serde_json::Value::Null);

        debug!("Cache hit for {} (hit count {})", key, hit_count);

        Ok(Some(CacheLookupResponse {
            response_text,
            metadata,
            hit_count,
        }))
    }

    /// Insert or overwrite an entry. Overwriting keeps no history of the
    /// prior value; the previous hit trail is dropped with it.
    pub async fn put(
        &self,
        key: &str,
        query_text: &str,
        response_text: &str,
        metadata: serde_json::Value,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<CacheEntry, CacheError> {
        let now = self.clock.now();
        let expires_at =
            expires_at.unwrap_or_else(|| now + Duration::seconds(DEFAULT_TTL_SECONDS));

        if expires_at <= now {
            return Err(CacheError::InvalidExpiry(format!(
                "expiry {} is not after {}",
                expires_at, now
            )));
        }

        let normalized = Self::normalize_query(query_text);
        let mut hasher = Sha256::new();
        hasher.update(normalized.as_bytes());
        let query_hash = hex_digest(hasher);

        let entry = CacheEntry {
            cache_key: key.to_string(),
            normalized_query: normalized,
            query_hash,
            response_text: response_text.to_string(),
            metadata,
            hit_count: 0,
            created_at: now,
            last_hit_at: None,
            expires_at,
        };

        let fields = vec![
            ("normalized_query", entry.normalized_query.clone()),
            ("query_hash", entry.query_hash.clone()),
            ("response_text", entry.response_text.clone()),
            ("metadata", serde_json::to_string(&entry.metadata)?),
            ("hit_count", "0".to_string()),
            ("created_at", entry.created_at.to_rfc3339()),
            ("expires_at", entry.expires_at.to_rfc3339()),
        ];

        let mut conn = self.get_connection().await?;

        // Delete first so a prior entry's last_hit_at cannot leak into the
        // overwritten value.
        let _: () = conn.del(key).await?;
        let _: () = conn.hset_multiple(key, &fields).await?;

        debug!("Cached response under {} until {}", key, entry.expires_at);
        Ok(entry)
    }

    /// Periodic reclamation sweep: drops entries past expiry, plus entries
    /// past the retention age that never earned a hit or went idle.
    /// Idempotent and safe to run alongside normal traffic.
    pub async fn cleanup(&self) -> Result<CleanupReport, CacheError> {
        let mut conn = self.get_connection().await?;
        let keys: Vec<String> = conn.keys(format!("{}*", KEY_PREFIX)).await?;
        let now = self.clock.now();

        let mut expired_removed = 0u64;
        let mut stale_removed = 0u64;

        for key in keys {
            let Some(entry) = read_entry_times(&mut conn, &key).await? else {
                continue;
            };

            if entry.is_expired(now) {
                let _: () = conn.del(&key).await?;
                expired_removed += 1;
            } else if entry.is_stale(now) {
                let _: () = conn.del(&key).await?;
                stale_removed += 1;
            }
        }

        if expired_removed + stale_removed > 0 {
            info!(
                "Cleaned up {} expired and {} stale cache entries",
                expired_removed, stale_removed
            );
        } else {
            debug!("No cache entries eligible for cleanup");
        }

        Ok(CleanupReport {
            expired_removed,
            stale_removed,
        })
    }

    pub async fn stats(&self) -> Result<CacheStats, CacheError> {
        let mut conn = self.get_connection().await?;
        let keys: Vec<String> = conn.keys(format!("{}*", KEY_PREFIX)).await?;
        let now = self.clock.now();

        let mut total_entries = 0u64;
        let mut expired_entries = 0u64;

        for key in keys {
            let Some(entry) = read_entry_times(&mut conn, &key).await? else {
                continue;
            };
            total_entries += 1;
            if entry.is_expired(now) {
                expired_entries += 1;
            }
        }

        Ok(CacheStats {
            total_entries,
            expired_entries,
        })
    }

    pub async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.get_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn get_connection(&self) -> Result<Connection, CacheError> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::PoolError(e.to_string()))
    }
}

fn hex_digest(hasher: Sha256) -> String {
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect()
}

fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Loads just the timestamp fields needed by the sweep predicates. Entries
/// with unreadable timestamps are skipped rather than failing the sweep.
async fn read_entry_times(
    conn: &mut Connection,
    key: &str,
) -> Result<Option<CacheEntry>, CacheError> {
    let created_raw: Option<String> = conn.hget(key, "created_at").await?;
    let expires_raw: Option<String> = conn.hget(key, "expires_at").await?;
    let last_hit_raw: Option<String> = conn.hget(key, "last_hit_at").await?;
    let hit_count: Option<i64> = conn.hget(key, "hit_count").await?;

    let (Some(created_raw), Some(expires_raw)) = (created_raw, expires_raw) else {
        return Ok(None);
    };
    let (Some(created_at), Some(expires_at)) =
        (parse_instant(&created_raw), parse_instant(&expires_raw))
    else {
        warn!("Skipping cache entry {} with unreadable timestamps", key);
        return Ok(None);
    };

    Ok(Some(CacheEntry {
        cache_key: key.to_string(),
        normalized_query: String::new(),
        query_hash: String::new(),
        response_text: String::new(),
        metadata: serde_json::Value::Null,
        hit_count: hit_count.unwrap_or(0),
        created_at,
        last_hit_at: last_hit_raw.as_deref().and_then(parse_instant),
        expires_at,
    }))
}

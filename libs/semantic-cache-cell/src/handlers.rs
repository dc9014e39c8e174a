// libs/semantic-cache-cell/src/handlers.rs
use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::Duration;
use serde_json::{json, Value};
use tracing::warn;

use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_utils::clock::{Clock, SystemClock};

use crate::error::CacheError;
use crate::models::{CacheLookupRequest, CacheStoreRequest};
use crate::services::cache::SemanticCacheService;

/// Cache lookup ahead of the language-understanding step. The cache is a
/// pure optimization, so every cache-layer failure reads as a miss rather
/// than an error.
#[axum::debug_handler]
pub async fn lookup(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<CacheLookupRequest>,
) -> Result<Json<Value>, AppError> {
    let key = SemanticCacheService::make_key(&request.query_text, request.context_hash.as_deref());

    let service = match SemanticCacheService::new(&state, Arc::new(SystemClock)) {
        Ok(service) => service,
        Err(e) => {
            warn!("Cache unavailable, treating lookup as miss: {}", e);
            return Ok(Json(json!({ "hit": false, "cache_key": key })));
        }
    };

    match service.get(&key).await {
        Ok(Some(response)) => Ok(Json(json!({
            "hit": true,
            "cache_key": key,
            "response_text": response.response_text,
            "metadata": response.metadata,
            "hit_count": response.hit_count
        }))),
        Ok(None) => Ok(Json(json!({ "hit": false, "cache_key": key }))),
        Err(e) => {
            warn!("Cache lookup failed, treating as miss: {}", e);
            Ok(Json(json!({ "hit": false, "cache_key": key })))
        }
    }
}

/// Store a response produced by the language-understanding step.
#[axum::debug_handler]
pub async fn store(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<CacheStoreRequest>,
) -> Result<Json<Value>, AppError> {
    if request.query_text.trim().is_empty() {
        return Err(AppError::ValidationError(
            "query_text must not be empty".to_string(),
        ));
    }

    let service = cache_service(&state)?;
    let key = SemanticCacheService::make_key(&request.query_text, request.context_hash.as_deref());

    let expires_at = match request.ttl_seconds {
        Some(ttl) if ttl <= 0 => {
            return Err(AppError::ValidationError(
                "ttl_seconds must be positive".to_string(),
            ));
        }
        Some(ttl) => Some(SystemClock.now() + Duration::seconds(ttl)),
        None => None,
    };

    let entry = service
        .put(
            &key,
            &request.query_text,
            &request.response_text,
            request.metadata.unwrap_or(Value::Null),
            expires_at,
        )
        .await
        .map_err(map_cache_error)?;

    Ok(Json(json!({
        "success": true,
        "cache_key": entry.cache_key,
        "expires_at": entry.expires_at
    })))
}

/// Reclamation sweep over expired and idle entries.
#[axum::debug_handler]
pub async fn cleanup(State(state): State<Arc<AppConfig>>) -> Result<Json<Value>, AppError> {
    let service = cache_service(&state)?;

    let report = service.cleanup().await.map_err(map_cache_error)?;

    Ok(Json(json!({
        "success": true,
        "expired_removed": report.expired_removed,
        "stale_removed": report.stale_removed
    })))
}

#[axum::debug_handler]
pub async fn stats(State(state): State<Arc<AppConfig>>) -> Result<Json<Value>, AppError> {
    let service = cache_service(&state)?;

    let stats = service.stats().await.map_err(map_cache_error)?;

    Ok(Json(json!({
        "success": true,
        "total_entries": stats.total_entries,
        "expired_entries": stats.expired_entries
    })))
}

// ==============================================================================
// PRIVATE HELPERS
// ==============================================================================

fn cache_service(config: &AppConfig) -> Result<SemanticCacheService, AppError> {
    SemanticCacheService::new(config, Arc::new(SystemClock))
        .map_err(|e| AppError::ExternalService(e.to_string()))
}

fn map_cache_error(error: CacheError) -> AppError {
    match error {
        CacheError::InvalidExpiry(msg) => AppError::BadRequest(msg),
        other => AppError::ExternalService(other.to_string()),
    }
}

// libs/scheduling-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_utils::clock::SystemClock;

use crate::models::SchedulingError;
use crate::repository::{SchedulingRepository, SupabaseSchedulingRepository};
use crate::services::alternatives::AlternativeRecommendationService;
use crate::services::conflict::ConflictDetectionService;
use crate::services::slots::SlotScoringService;
use crate::services::workload::WorkloadAnalysisService;
use crate::models::SlotSearchRequest;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct ConflictScanParams {
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub include_resolutions: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct SlotSearchParams {
    pub therapist_id: Uuid,
    pub client_id: Uuid,
    pub duration_minutes: Option<i64>,
    pub window_start: Option<NaiveDate>,
    pub window_days: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct AlternateTimesParams {
    pub therapist_id: Uuid,
    pub client_id: Uuid,
    pub conflict_start: DateTime<Utc>,
    pub duration_minutes: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct AlternateTherapistsParams {
    pub client_id: Uuid,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub exclude_therapist_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct WorkloadParams {
    pub therapist_id: Option<Uuid>,
    pub window_days: Option<i64>,
}

// ==============================================================================
// HANDLERS
// ==============================================================================

/// Scan a date range for double-booked sessions.
#[axum::debug_handler]
pub async fn scan_conflicts(
    State(state): State<Arc<AppConfig>>,
    Query(params): Query<ConflictScanParams>,
) -> Result<Json<Value>, AppError> {
    let service = ConflictDetectionService::new(repository(&state), Arc::new(SystemClock));

    let conflicts = service
        .detect_conflicts(
            params.from_date,
            params.to_date,
            params.include_resolutions.unwrap_or(false),
        )
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "success": true,
        "count": conflicts.len(),
        "conflicts": conflicts
    })))
}

/// Rank open slots for a therapist/client pair.
#[axum::debug_handler]
pub async fn search_slots(
    State(state): State<Arc<AppConfig>>,
    Query(params): Query<SlotSearchParams>,
) -> Result<Json<Value>, AppError> {
    let service = SlotScoringService::new(repository(&state), Arc::new(SystemClock));

    let slots = service
        .find_slots(SlotSearchRequest {
            therapist_id: params.therapist_id,
            client_id: params.client_id,
            duration_minutes: params.duration_minutes,
            window_start: params.window_start,
            window_days: params.window_days,
        })
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "success": true,
        "count": slots.len(),
        "slots": slots
    })))
}

/// Alternate times for the same therapist/client pair after a conflict.
#[axum::debug_handler]
pub async fn alternate_times(
    State(state): State<Arc<AppConfig>>,
    Query(params): Query<AlternateTimesParams>,
) -> Result<Json<Value>, AppError> {
    let service = AlternativeRecommendationService::new(repository(&state), Arc::new(SystemClock));

    let alternatives = service
        .alternate_times(
            params.therapist_id,
            params.client_id,
            params.conflict_start,
            params
                .duration_minutes
                .unwrap_or(crate::services::slots::DEFAULT_DURATION_MINUTES),
        )
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "success": true,
        "count": alternatives.len(),
        "alternatives": alternatives
    })))
}

/// Compatible alternate therapists for a contested window.
#[axum::debug_handler]
pub async fn alternate_therapists(
    State(state): State<Arc<AppConfig>>,
    Query(params): Query<AlternateTherapistsParams>,
) -> Result<Json<Value>, AppError> {
    let service = AlternativeRecommendationService::new(repository(&state), Arc::new(SystemClock));

    let recommendations = service
        .alternate_therapists(
            params.client_id,
            params.window_start,
            params.window_end,
            params.exclude_therapist_id,
        )
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "success": true,
        "count": recommendations.len(),
        "recommendations": recommendations
    })))
}

/// Trailing-window utilization report for one or all active therapists.
#[axum::debug_handler]
pub async fn workload_report(
    State(state): State<Arc<AppConfig>>,
    Query(params): Query<WorkloadParams>,
) -> Result<Json<Value>, AppError> {
    let service = WorkloadAnalysisService::new(repository(&state), Arc::new(SystemClock));

    let reports = service
        .analyze(params.therapist_id, params.window_days)
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "success": true,
        "count": reports.len(),
        "reports": reports
    })))
}

// ==============================================================================
// PRIVATE HELPERS
// ==============================================================================

fn repository(config: &AppConfig) -> Arc<dyn SchedulingRepository> {
    Arc::new(SupabaseSchedulingRepository::new(config))
}

fn map_scheduling_error(error: SchedulingError) -> AppError {
    match error {
        SchedulingError::TherapistNotFound => {
            AppError::NotFound("Therapist not found".to_string())
        }
        SchedulingError::ClientNotFound => AppError::NotFound("Client not found".to_string()),
        SchedulingError::InvalidTimeRange(msg) => AppError::BadRequest(msg),
        SchedulingError::ValidationError(msg) => AppError::ValidationError(msg),
        SchedulingError::DatabaseError(msg) => AppError::Database(msg),
    }
}

// libs/scheduling-cell/src/repository.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    AvailabilityWindow, Client, SchedulingError, Session, SessionStatus,
    Therapist, WorkloadTarget,
};
use crate::services::intervals;

/// Narrow read port over the practice datastore. Scoring and conflict logic
/// only ever sees this trait, so it stays unit-testable without a live
/// database.
#[async_trait]
pub trait SchedulingRepository: Send + Sync {
    /// Sessions with status = scheduled whose start falls in
    /// [range_start, range_end).
    async fn scheduled_sessions_in_range(
        &self,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<Session>, SchedulingError>;

    /// One therapist's sessions in [range_start, range_end), restricted to
    /// the given statuses.
    async fn therapist_sessions(
        &self,
        therapist_id: Uuid,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
        statuses: &[SessionStatus],
    ) -> Result<Vec<Session>, SchedulingError>;

    /// One client's sessions in [range_start, range_end), restricted to the
    /// given statuses.
    async fn client_sessions(
        &self,
        client_id: Uuid,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
        statuses: &[SessionStatus],
    ) -> Result<Vec<Session>, SchedulingError>;

    /// A client's past sessions in any terminal status (completed,
    /// cancelled, no_show), most recent first.
    async fn client_session_history(
        &self,
        client_id: Uuid,
        limit: usize,
    ) -> Result<Vec<Session>, SchedulingError>;

    async fn get_therapist(&self, therapist_id: Uuid) -> Result<Therapist, SchedulingError>;

    async fn get_client(&self, client_id: Uuid) -> Result<Client, SchedulingError>;

    async fn active_therapists(&self) -> Result<Vec<Therapist>, SchedulingError>;

    async fn workload_target(
        &self,
        therapist_id: Uuid,
    ) -> Result<Option<WorkloadTarget>, SchedulingError>;

    /// Declared weekly availability windows for a client or therapist.
    /// Windows with boundaries off the 15-minute grid are rejected, never
    /// silently rounded.
    async fn availability_windows(
        &self,
        owner_id: Uuid,
    ) -> Result<Vec<AvailabilityWindow>, SchedulingError>;
}

pub struct SupabaseSchedulingRepository {
    supabase: SupabaseClient,
}

impl SupabaseSchedulingRepository {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    async fn fetch_sessions(&self, path: &str) -> Result<Vec<Session>, SchedulingError> {
        let result: Vec<Value> = self.supabase.request(Method::GET, path, None)
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        result.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Session>, _>>()
            .map_err(|e| SchedulingError::DatabaseError(format!("Failed to parse sessions: {}", e)))
    }

    fn status_filter(statuses: &[SessionStatus]) -> String {
        let names: Vec<String> = statuses.iter().map(|s| s.to_string()).collect();
        format!("status=in.({})", names.join(","))
    }
}

#[async_trait]
impl SchedulingRepository for SupabaseSchedulingRepository {
    async fn scheduled_sessions_in_range(
        &self,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<Session>, SchedulingError> {
        debug!("Loading scheduled sessions between {} and {}", range_start, range_end);

        let query_parts = vec![
            format!("status=eq.{}", SessionStatus::Scheduled),
            format!("start_time=gte.{}", range_start.to_rfc3339()),
            format!("start_time=lt.{}", range_end.to_rfc3339()),
        ];

        let path = format!("/rest/v1/sessions?{}&order=start_time.asc", query_parts.join("&"));
        self.fetch_sessions(&path).await
    }

    async fn therapist_sessions(
        &self,
        therapist_id: Uuid,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
        statuses: &[SessionStatus],
    ) -> Result<Vec<Session>, SchedulingError> {
        let query_parts = vec![
            format!("therapist_id=eq.{}", therapist_id),
            Self::status_filter(statuses),
            format!("start_time=gte.{}", range_start.to_rfc3339()),
            format!("start_time=lt.{}", range_end.to_rfc3339()),
        ];

        let path = format!("/rest/v1/sessions?{}&order=start_time.asc", query_parts.join("&"));
        self.fetch_sessions(&path).await
    }

    async fn client_sessions(
        &self,
        client_id: Uuid,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
        statuses: &[SessionStatus],
    ) -> Result<Vec<Session>, SchedulingError> {
        let query_parts = vec![
            format!("client_id=eq.{}", client_id),
            Self::status_filter(statuses),
            format!("start_time=gte.{}", range_start.to_rfc3339()),
            format!("start_time=lt.{}", range_end.to_rfc3339()),
        ];

        let path = format!("/rest/v1/sessions?{}&order=start_time.asc", query_parts.join("&"));
        self.fetch_sessions(&path).await
    }

    async fn client_session_history(
        &self,
        client_id: Uuid,
        limit: usize,
    ) -> Result<Vec<Session>, SchedulingError> {
        let query_parts = vec![
            format!("client_id=eq.{}", client_id),
            Self::status_filter(&[
                SessionStatus::Completed,
                SessionStatus::Cancelled,
                SessionStatus::NoShow,
            ]),
        ];

        let path = format!(
            "/rest/v1/sessions?{}&order=start_time.desc&limit={}",
            query_parts.join("&"),
            limit
        );
        self.fetch_sessions(&path).await
    }

    async fn get_therapist(&self, therapist_id: Uuid) -> Result<Therapist, SchedulingError> {
        let path = format!("/rest/v1/therapists?id=eq.{}", therapist_id);

        let result: Vec<Value> = self.supabase.request(Method::GET, &path, None)
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        let row = result.into_iter().next().ok_or(SchedulingError::TherapistNotFound)?;
        serde_json::from_value(row)
            .map_err(|e| SchedulingError::DatabaseError(format!("Failed to parse therapist: {}", e)))
    }

    async fn get_client(&self, client_id: Uuid) -> Result<Client, SchedulingError> {
        let path = format!("/rest/v1/clients?id=eq.{}", client_id);

        let result: Vec<Value> = self.supabase.request(Method::GET, &path, None)
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        let row = result.into_iter().next().ok_or(SchedulingError::ClientNotFound)?;
        serde_json::from_value(row)
            .map_err(|e| SchedulingError::DatabaseError(format!("Failed to parse client: {}", e)))
    }

    async fn active_therapists(&self) -> Result<Vec<Therapist>, SchedulingError> {
        let path = "/rest/v1/therapists?is_active=eq.true&order=last_name.asc";

        let result: Vec<Value> = self.supabase.request(Method::GET, path, None)
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        result.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Therapist>, _>>()
            .map_err(|e| SchedulingError::DatabaseError(format!("Failed to parse therapists: {}", e)))
    }

    async fn workload_target(
        &self,
        therapist_id: Uuid,
    ) -> Result<Option<WorkloadTarget>, SchedulingError> {
        let path = format!("/rest/v1/workload_targets?therapist_id=eq.{}", therapist_id);

        let result: Vec<Value> = self.supabase.request(Method::GET, &path, None)
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        result.into_iter()
            .next()
            .map(|row| {
                serde_json::from_value(row).map_err(|e| {
                    SchedulingError::DatabaseError(format!("Failed to parse workload target: {}", e))
                })
            })
            .transpose()
    }

    async fn availability_windows(
        &self,
        owner_id: Uuid,
    ) -> Result<Vec<AvailabilityWindow>, SchedulingError> {
        let path = format!(
            "/rest/v1/availability_windows?owner_id=eq.{}&order=day_of_week.asc",
            owner_id
        );

        let result: Vec<Value> = self.supabase.request(Method::GET, &path, None)
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        let windows: Vec<AvailabilityWindow> = result.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<AvailabilityWindow>, _>>()
            .map_err(|e| {
                SchedulingError::DatabaseError(format!("Failed to parse availability windows: {}", e))
            })?;

        for window in &windows {
            intervals::validate_window(window.start_time, window.end_time)?;
        }

        Ok(windows)
    }
}

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use scheduling_cell::models::{
    AvailabilityWindow, Client, OwnerKind, SchedulingError, Session, SessionStatus,
    Therapist, WorkloadTarget,
};
use scheduling_cell::repository::SchedulingRepository;

/// Seedable repository standing in for the practice datastore.
#[derive(Default)]
pub struct InMemoryRepository {
    pub sessions: Vec<Session>,
    pub therapists: Vec<Therapist>,
    pub clients: Vec<Client>,
    pub targets: Vec<WorkloadTarget>,
    pub windows: Vec<AvailabilityWindow>,
}

#[async_trait]
impl SchedulingRepository for InMemoryRepository {
    async fn scheduled_sessions_in_range(
        &self,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<Session>, SchedulingError> {
        Ok(self
            .sessions
            .iter()
            .filter(|s| {
                s.status == SessionStatus::Scheduled
                    && s.start_time >= range_start
                    && s.start_time < range_end
            })
            .cloned()
            .collect())
    }

    async fn therapist_sessions(
        &self,
        therapist_id: Uuid,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
        statuses: &[SessionStatus],
    ) -> Result<Vec<Session>, SchedulingError> {
        Ok(self
            .sessions
            .iter()
            .filter(|s| {
                s.therapist_id == therapist_id
                    && statuses.contains(&s.status)
                    && s.start_time >= range_start
                    && s.start_time < range_end
            })
            .cloned()
            .collect())
    }

    async fn client_sessions(
        &self,
        client_id: Uuid,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
        statuses: &[SessionStatus],
    ) -> Result<Vec<Session>, SchedulingError> {
        Ok(self
            .sessions
            .iter()
            .filter(|s| {
                s.client_id == client_id
                    && statuses.contains(&s.status)
                    && s.start_time >= range_start
                    && s.start_time < range_end
            })
            .cloned()
            .collect())
    }

    async fn client_session_history(
        &self,
        client_id: Uuid,
        limit: usize,
    ) -> Result<Vec<Session>, SchedulingError> {
        let mut history: Vec<Session> = self
            .sessions
            .iter()
            .filter(|s| s.client_id == client_id && s.status != SessionStatus::Scheduled)
            .cloned()
            .collect();
        history.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        history.truncate(limit);
        Ok(history)
    }

    async fn get_therapist(&self, therapist_id: Uuid) -> Result<Therapist, SchedulingError> {
        self.therapists
            .iter()
            .find(|t| t.id == therapist_id)
            .cloned()
            .ok_or(SchedulingError::TherapistNotFound)
    }

    async fn get_client(&self, client_id: Uuid) -> Result<Client, SchedulingError> {
        self.clients
            .iter()
            .find(|c| c.id == client_id)
            .cloned()
            .ok_or(SchedulingError::ClientNotFound)
    }

    async fn active_therapists(&self) -> Result<Vec<Therapist>, SchedulingError> {
        Ok(self
            .therapists
            .iter()
            .filter(|t| t.is_active)
            .cloned()
            .collect())
    }

    async fn workload_target(
        &self,
        therapist_id: Uuid,
    ) -> Result<Option<WorkloadTarget>, SchedulingError> {
        Ok(self
            .targets
            .iter()
            .find(|t| t.therapist_id == therapist_id)
            .cloned())
    }

    async fn availability_windows(
        &self,
        owner_id: Uuid,
    ) -> Result<Vec<AvailabilityWindow>, SchedulingError> {
        Ok(self
            .windows
            .iter()
            .filter(|w| w.owner_id == owner_id)
            .cloned()
            .collect())
    }
}

// ==============================================================================
// FIXTURE BUILDERS
// ==============================================================================

pub fn utc(raw: &str) -> DateTime<Utc> {
    raw.parse().expect("valid RFC 3339 timestamp")
}

pub fn scheduled_session(
    therapist_id: Uuid,
    client_id: Uuid,
    start: &str,
    minutes: i64,
) -> Session {
    session_with_status(therapist_id, client_id, start, minutes, SessionStatus::Scheduled)
}

pub fn session_with_status(
    therapist_id: Uuid,
    client_id: Uuid,
    start: &str,
    minutes: i64,
    status: SessionStatus,
) -> Session {
    let start_time = utc(start);
    Session {
        id: Uuid::new_v4(),
        client_id,
        therapist_id,
        start_time,
        end_time: start_time + Duration::minutes(minutes),
        status,
        notes: None,
    }
}

pub fn therapist(first_name: &str, services: &[&str], specialties: &[&str]) -> Therapist {
    Therapist {
        id: Uuid::new_v4(),
        first_name: first_name.to_string(),
        last_name: "Alvarez".to_string(),
        service_types: services.iter().map(|s| s.to_string()).collect(),
        specialties: specialties.iter().map(|s| s.to_string()).collect(),
        is_active: true,
    }
}

pub fn client(first_name: &str, preferred_service: Option<&str>, focus_areas: &[&str]) -> Client {
    Client {
        id: Uuid::new_v4(),
        first_name: first_name.to_string(),
        last_name: "Nguyen".to_string(),
        preferred_service_type: preferred_service.map(|s| s.to_string()),
        focus_areas: focus_areas.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn target(therapist_id: Uuid, min: f64, max: f64) -> WorkloadTarget {
    WorkloadTarget {
        therapist_id,
        weekly_hours_min: min,
        weekly_hours_max: max,
    }
}

pub fn window(owner_id: Uuid, day_of_week: i32, start: &str, end: &str) -> AvailabilityWindow {
    AvailabilityWindow {
        id: Uuid::new_v4(),
        owner_id,
        owner_kind: OwnerKind::Therapist,
        day_of_week,
        start_time: start.parse().expect("valid time of day"),
        end_time: end.parse().expect("valid time of day"),
    }
}

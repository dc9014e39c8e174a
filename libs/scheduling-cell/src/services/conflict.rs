// libs/scheduling-cell/src/services/conflict.rs
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_utils::clock::Clock;

use crate::models::{
    ConflictType, SchedulingError, Session, SessionConflict, SuggestedResolution,
};
use crate::repository::SchedulingRepository;
use crate::services::alternatives::AlternativeRecommendationService;
use crate::services::intervals;

pub struct ConflictDetectionService {
    repository: Arc<dyn SchedulingRepository>,
    recommender: AlternativeRecommendationService,
}

impl ConflictDetectionService {
    pub fn new(repository: Arc<dyn SchedulingRepository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            recommender: AlternativeRecommendationService::new(Arc::clone(&repository), clock),
            repository,
        }
    }

    /// Scan scheduled sessions across an inclusive date range and report
    /// every overlapping pair that shares a therapist or client. Both
    /// symmetric orderings of a pair are emitted, so one double-booking
    /// yields two records.
    pub async fn detect_conflicts(
        &self,
        from_date: NaiveDate,
        to_date: NaiveDate,
        include_resolutions: bool,
    ) -> Result<Vec<SessionConflict>, SchedulingError> {
        if to_date < from_date {
            return Err(SchedulingError::InvalidTimeRange(format!(
                "range end {} is before start {}",
                to_date, from_date
            )));
        }

        let range_start = from_date.and_hms_opt(0, 0, 0).unwrap().and_utc();
        let range_end = (to_date + Duration::days(1))
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc();

        debug!("Scanning for booking conflicts between {} and {}", from_date, to_date);

        let sessions = self
            .repository
            .scheduled_sessions_in_range(range_start, range_end)
            .await?;

        let mut conflicts = Vec::new();

        for a in &sessions {
            for b in &sessions {
                if a.id == b.id {
                    continue;
                }
                if !intervals::overlaps(a.start_time, a.end_time, b.start_time, b.end_time) {
                    continue;
                }

                let conflict_type = if a.therapist_id == b.therapist_id {
                    ConflictType::TherapistDoubleBooking
                } else if a.client_id == b.client_id {
                    ConflictType::ClientDoubleBooking
                } else {
                    // No shared party, no conflict. ResourceConflict stays
                    // reserved for future bookable resources.
                    continue;
                };

                let suggested_resolutions = if include_resolutions {
                    self.suggest_resolutions(a, conflict_type)
                        .await
                        .unwrap_or_default()
                } else {
                    vec![]
                };

                conflicts.push(SessionConflict {
                    conflict_id: Uuid::new_v4(),
                    conflict_type,
                    severity: conflict_type.severity(),
                    affected_sessions: vec![a.id, b.id],
                    suggested_resolutions,
                    // Swapping in another therapist needs no client consent;
                    // moving a client's own time does.
                    auto_resolvable: conflict_type == ConflictType::TherapistDoubleBooking,
                });
            }
        }

        if !conflicts.is_empty() {
            warn!(
                "{} conflicting session record(s) detected between {} and {}",
                conflicts.len(),
                from_date,
                to_date
            );
        }

        Ok(conflicts)
    }

    async fn suggest_resolutions(
        &self,
        session: &Session,
        conflict_type: ConflictType,
    ) -> Result<Vec<SuggestedResolution>, SchedulingError> {
        match conflict_type {
            ConflictType::TherapistDoubleBooking => {
                let recommendations = self
                    .recommender
                    .alternate_therapists(
                        session.client_id,
                        session.start_time,
                        session.end_time,
                        Some(session.therapist_id),
                    )
                    .await?;

                Ok(recommendations
                    .into_iter()
                    .map(|recommendation| SuggestedResolution::AlternateTherapist { recommendation })
                    .collect())
            }
            ConflictType::ClientDoubleBooking => {
                let alternatives = self
                    .recommender
                    .alternate_times(
                        session.therapist_id,
                        session.client_id,
                        session.start_time,
                        session.duration_minutes(),
                    )
                    .await?;

                Ok(alternatives
                    .into_iter()
                    .map(|alternative| SuggestedResolution::AlternateTime { alternative })
                    .collect())
            }
            ConflictType::ResourceConflict => Ok(vec![]),
        }
    }
}

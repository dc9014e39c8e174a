// libs/scheduling-cell/src/services/alternatives.rs
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_utils::clock::Clock;

use crate::models::{
    Client, RankedAlternative, SchedulingError, Session, SessionStatus,
    SlotSearchRequest, Therapist, TherapistRecommendation,
};
use crate::repository::SchedulingRepository;
use crate::services::intervals;
use crate::services::slots::SlotScoringService;

const ALTERNATE_TIME_LIMIT: usize = 5;
const ALTERNATE_TIME_MIN_SCORE: f64 = 0.6;
const ALTERNATE_TIME_WINDOW_DAYS: i64 = 7;
const ATTACHED_SLOT_LIMIT: usize = 3;

const SERVICE_MATCH_WEIGHT: f64 = 0.4;
const SPECIALTY_MATCH_WEIGHT: f64 = 0.3;
const HISTORY_BASE_WEIGHT: f64 = 0.2;
const HISTORY_BONUS_WEIGHT: f64 = 0.1;

/// Turns a detected conflict (or a plain booking request) into ranked
/// resolutions: either new times for the same pair, or compatible
/// alternate therapists for the contested window.
pub struct AlternativeRecommendationService {
    repository: Arc<dyn SchedulingRepository>,
    slot_scorer: SlotScoringService,
}

impl AlternativeRecommendationService {
    pub fn new(repository: Arc<dyn SchedulingRepository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            slot_scorer: SlotScoringService::new(Arc::clone(&repository), clock),
            repository,
        }
    }

    /// Alternate-time mode: same pair, different time. Searches the seven
    /// days following the conflicting session's date and keeps only strong
    /// candidates. An empty list is the expected outcome when nothing
    /// clears the bar.
    pub async fn alternate_times(
        &self,
        therapist_id: Uuid,
        client_id: Uuid,
        conflict_start: DateTime<Utc>,
        duration_minutes: i64,
    ) -> Result<Vec<RankedAlternative>, SchedulingError> {
        debug!(
            "Finding alternate times for therapist {} / client {} after {}",
            therapist_id, client_id, conflict_start
        );

        let window_start = conflict_start.date_naive() + Duration::days(1);
        let slots = self
            .slot_scorer
            .find_slots(SlotSearchRequest {
                therapist_id,
                client_id,
                duration_minutes: Some(duration_minutes),
                window_start: Some(window_start),
                window_days: Some(ALTERNATE_TIME_WINDOW_DAYS),
            })
            .await?;

        Ok(slots
            .into_iter()
            .filter(|slot| slot.score > ALTERNATE_TIME_MIN_SCORE)
            .take(ALTERNATE_TIME_LIMIT)
            .map(RankedAlternative::from)
            .collect())
    }

    /// Alternate-therapist mode: same client, different provider. Filters
    /// the active pool to service-type matches with a free calendar over
    /// the contested window, scores compatibility, and attaches each
    /// candidate's near-term availability.
    pub async fn alternate_therapists(
        &self,
        client_id: Uuid,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        exclude_therapist: Option<Uuid>,
    ) -> Result<Vec<TherapistRecommendation>, SchedulingError> {
        if window_end <= window_start {
            return Err(SchedulingError::InvalidTimeRange(format!(
                "window end {} must be after start {}",
                window_end, window_start
            )));
        }

        let client = self.repository.get_client(client_id).await?;
        let history = self.repository.client_session_history(client_id, 100).await?;
        let pool = self.repository.active_therapists().await?;

        debug!(
            "Evaluating {} active therapist(s) for client {} over contested window {} - {}",
            pool.len(),
            client_id,
            window_start,
            window_end
        );

        let mut recommendations = Vec::new();

        for therapist in pool {
            if Some(therapist.id) == exclude_therapist {
                continue;
            }
            if !service_type_matches(&therapist, &client) {
                continue;
            }

            // Scan back a day so a booking that started before the window
            // but runs into it still counts as a collision.
            let booked = self
                .repository
                .therapist_sessions(
                    therapist.id,
                    window_start - Duration::days(1),
                    window_end,
                    &[SessionStatus::Scheduled],
                )
                .await?;
            let contested = booked.iter().any(|s| {
                intervals::overlaps(s.start_time, s.end_time, window_start, window_end)
            });
            if contested {
                continue;
            }

            let (compatibility_score, match_reasons) =
                compatibility_score(&therapist, &client, &history);

            let duration_minutes = (window_end - window_start).num_minutes();
            let upcoming = self
                .slot_scorer
                .find_slots(SlotSearchRequest {
                    therapist_id: therapist.id,
                    client_id,
                    duration_minutes: Some(duration_minutes),
                    window_start: Some(window_start.date_naive()),
                    window_days: Some(ALTERNATE_TIME_WINDOW_DAYS),
                })
                .await
                .unwrap_or_else(|e| {
                    warn!("Slot lookup failed for candidate therapist {}: {}", therapist.id, e);
                    vec![]
                });

            recommendations.push(TherapistRecommendation {
                therapist_id: therapist.id,
                therapist_name: therapist.full_name(),
                compatibility_score,
                match_reasons,
                upcoming_slots: upcoming
                    .into_iter()
                    .take(ATTACHED_SLOT_LIMIT)
                    .map(RankedAlternative::from)
                    .collect(),
            });
        }

        recommendations.sort_by(|a, b| {
            b.compatibility_score
                .partial_cmp(&a.compatibility_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(recommendations)
    }
}

fn service_type_matches(therapist: &Therapist, client: &Client) -> bool {
    match &client.preferred_service_type {
        Some(preferred) => therapist
            .service_types
            .iter()
            .any(|offered| offered.eq_ignore_ascii_case(preferred)),
        // A client with no preference can see any active therapist.
        None => true,
    }
}

fn compatibility_score(
    therapist: &Therapist,
    client: &Client,
    history: &[Session],
) -> (f64, Vec<String>) {
    let mut score = 0.0;
    let mut reasons = Vec::new();

    match &client.preferred_service_type {
        Some(preferred) => {
            // The pool filter already guaranteed the match.
            score += SERVICE_MATCH_WEIGHT;
            reasons.push(format!("Offers {}", preferred));
        }
        None => {
            score += SERVICE_MATCH_WEIGHT * 0.8;
        }
    }

    if client.focus_areas.is_empty() {
        score += SPECIALTY_MATCH_WEIGHT * 0.5;
    } else {
        let matched: Vec<&String> = client
            .focus_areas
            .iter()
            .filter(|area| {
                therapist
                    .specialties
                    .iter()
                    .any(|s| s.eq_ignore_ascii_case(area))
            })
            .collect();
        score += SPECIALTY_MATCH_WEIGHT * matched.len() as f64 / client.focus_areas.len() as f64;
        if !matched.is_empty() {
            reasons.push(format!(
                "Specializes in {}",
                matched
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }
    }

    let with_therapist: Vec<&Session> = history
        .iter()
        .filter(|s| s.therapist_id == therapist.id)
        .collect();
    let completed = with_therapist
        .iter()
        .filter(|s| s.status == SessionStatus::Completed)
        .count();
    let success_ratio = if with_therapist.is_empty() {
        0.0
    } else {
        completed as f64 / with_therapist.len() as f64
    };
    score += HISTORY_BASE_WEIGHT + HISTORY_BONUS_WEIGHT * success_ratio;
    if completed > 0 {
        reasons.push(format!(
            "{} prior completed session(s) with this client",
            completed
        ));
    }

    (score.min(1.0), reasons)
}

// libs/scheduling-cell/src/services/workload.rs
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;
use uuid::Uuid;

use shared_utils::clock::Clock;

use crate::models::{
    RecommendationPriority, SchedulingError, SessionStatus, Therapist,
    WorkloadAction, WorkloadRecommendation, WorkloadReport,
};
use crate::repository::SchedulingRepository;

pub const DEFAULT_WINDOW_DAYS: i64 = 30;

const UNDER_UTILIZATION_THRESHOLD: f64 = 70.0;
const OVER_UTILIZATION_THRESHOLD: f64 = 120.0;
const SESSION_BASELINE_HOURS: f64 = 1.0;
const SHORT_SESSION_RATIO: f64 = 0.8;

/// Advisory workload analysis: booked hours against the target weekly band
/// over a trailing window. Output feeds reporting UIs; nothing here
/// enforces anything.
pub struct WorkloadAnalysisService {
    repository: Arc<dyn SchedulingRepository>,
    clock: Arc<dyn Clock>,
}

impl WorkloadAnalysisService {
    pub fn new(repository: Arc<dyn SchedulingRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    pub async fn analyze(
        &self,
        therapist_filter: Option<Uuid>,
        window_days: Option<i64>,
    ) -> Result<Vec<WorkloadReport>, SchedulingError> {
        let window_days = window_days.unwrap_or(DEFAULT_WINDOW_DAYS);
        if window_days <= 0 {
            return Err(SchedulingError::ValidationError(
                "Analysis window must cover at least one day".to_string(),
            ));
        }

        let now = self.clock.now();
        let range_start = now - Duration::days(window_days);

        let therapists = match therapist_filter {
            Some(id) => vec![self.repository.get_therapist(id).await?],
            None => self.repository.active_therapists().await?,
        };

        debug!(
            "Analyzing workload for {} therapist(s) over trailing {} day(s)",
            therapists.len(),
            window_days
        );

        let mut reports = Vec::with_capacity(therapists.len());
        for therapist in &therapists {
            reports.push(
                self.analyze_therapist(therapist, range_start, now, window_days)
                    .await?,
            );
        }

        Ok(reports)
    }

    async fn analyze_therapist(
        &self,
        therapist: &Therapist,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
        window_days: i64,
    ) -> Result<WorkloadReport, SchedulingError> {
        // Booked hours count scheduled and completed sessions; cancelled and
        // no-show ones freed the time back up.
        let sessions = self
            .repository
            .therapist_sessions(
                therapist.id,
                range_start,
                range_end,
                &[SessionStatus::Scheduled, SessionStatus::Completed],
            )
            .await?;

        let total_hours: f64 = sessions.iter().map(|s| s.duration_hours()).sum();
        let weekly_equivalent = total_hours * 7.0 / window_days as f64;

        let target = self.repository.workload_target(therapist.id).await?;
        let target_hours = target.as_ref().map(|t| t.midpoint()).unwrap_or(0.0);

        let utilization_rate = if target_hours > 0.0 {
            weekly_equivalent / target_hours * 100.0
        } else {
            0.0
        };

        let average_hours = if sessions.is_empty() {
            0.0
        } else {
            total_hours / sessions.len() as f64
        };
        let efficiency_score = (average_hours / SESSION_BASELINE_HOURS).clamp(0.0, 1.0);

        let mut recommendations = Vec::new();

        if target_hours > 0.0 {
            if utilization_rate < UNDER_UTILIZATION_THRESHOLD {
                let gap = target_hours - weekly_equivalent;
                recommendations.push(WorkloadRecommendation {
                    action: WorkloadAction::IncreaseUtilization,
                    priority: RecommendationPriority::High,
                    message: format!(
                        "Utilization is {:.0}%; about {:.1} more weekly hours would reach the target of {:.1}",
                        utilization_rate, gap, target_hours
                    ),
                });
            }

            if utilization_rate > OVER_UTILIZATION_THRESHOLD {
                let surplus = weekly_equivalent - target_hours;
                recommendations.push(WorkloadRecommendation {
                    action: WorkloadAction::ReduceOverload,
                    priority: RecommendationPriority::Critical,
                    message: format!(
                        "Utilization is {:.0}%; {:.1} weekly hours above the target of {:.1}",
                        utilization_rate, surplus, target_hours
                    ),
                });
            }
        }

        if !sessions.is_empty() && average_hours < SHORT_SESSION_RATIO * SESSION_BASELINE_HOURS {
            recommendations.push(WorkloadRecommendation {
                action: WorkloadAction::OptimizeScheduling,
                priority: RecommendationPriority::Medium,
                message: format!(
                    "Average session runs {:.0} minutes; consider consolidating short sessions",
                    average_hours * 60.0
                ),
            });
        }

        Ok(WorkloadReport {
            therapist_id: therapist.id,
            therapist_name: therapist.full_name(),
            utilization_rate,
            total_hours,
            target_hours,
            efficiency_score,
            recommendations,
        })
    }
}

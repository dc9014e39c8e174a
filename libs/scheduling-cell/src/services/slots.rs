// libs/scheduling-cell/src/services/slots.rs
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc, Weekday};
use tracing::debug;

use shared_utils::clock::Clock;

use crate::models::{
    AvailabilityWindow, SchedulingError, ScoredSlot, Session, SessionStatus,
    SlotContext, SlotSearchRequest, WorkloadTarget,
};
use crate::repository::SchedulingRepository;
use crate::services::intervals::{
    self, BUSINESS_DAY_HARD_END_HOUR, BUSINESS_DAY_LAST_START_HOUR,
    BUSINESS_DAY_START_HOUR, CANDIDATE_GRID_MINUTES, CORE_HOURS_END, CORE_HOURS_START,
};

pub const DEFAULT_DURATION_MINUTES: i64 = 60;
pub const DEFAULT_WINDOW_DAYS: i64 = 7;

const MAX_RESULTS: usize = 10;
const MIN_SCORE: f64 = 0.3;
const MAX_WINDOW_DAYS: i64 = 31;

const WORKLOAD_WEIGHT: f64 = 0.30;
const PREFERENCE_WEIGHT: f64 = 0.20;
const EFFICIENCY_WEIGHT: f64 = 0.15;
const WEEKDAY_BONUS: f64 = 0.2;

pub struct SlotScoringService {
    repository: Arc<dyn SchedulingRepository>,
    clock: Arc<dyn Clock>,
}

impl SlotScoringService {
    pub fn new(repository: Arc<dyn SchedulingRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Enumerate and rank open slots for a therapist/client pair. Candidates
    /// run on a 30-minute grid across business hours; each surviving
    /// candidate carries the reasoning behind its score. An empty result is
    /// a valid outcome, never an error.
    pub async fn find_slots(
        &self,
        request: SlotSearchRequest,
    ) -> Result<Vec<ScoredSlot>, SchedulingError> {
        let duration_minutes = request.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES);
        if duration_minutes <= 0 {
            return Err(SchedulingError::ValidationError(
                "Session duration must be positive".to_string(),
            ));
        }
        let business_day_minutes =
            ((BUSINESS_DAY_HARD_END_HOUR - BUSINESS_DAY_START_HOUR) * 60) as i64;
        if duration_minutes > business_day_minutes {
            return Err(SchedulingError::ValidationError(format!(
                "Session duration cannot exceed {} minutes",
                business_day_minutes
            )));
        }

        let window_days = request.window_days.unwrap_or(DEFAULT_WINDOW_DAYS);
        if window_days <= 0 || window_days > MAX_WINDOW_DAYS {
            return Err(SchedulingError::ValidationError(format!(
                "Search window must cover 1 to {} days",
                MAX_WINDOW_DAYS
            )));
        }

        let therapist = self.repository.get_therapist(request.therapist_id).await?;
        let client = self.repository.get_client(request.client_id).await?;

        let now = self.clock.now();
        let window_start = request.window_start.unwrap_or_else(|| now.date_naive());
        let range_start = window_start.and_hms_opt(0, 0, 0).unwrap().and_utc();
        let range_end = (window_start + Duration::days(window_days))
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc();

        debug!(
            "Scoring slots for therapist {} / client {} over {} day(s) from {}",
            therapist.id, client.id, window_days, window_start
        );

        // The extra trailing week feeds the weekly workload computation for
        // candidate days whose week began before the window.
        let scan_start = range_start - Duration::days(7);
        let therapist_sessions = self
            .repository
            .therapist_sessions(
                therapist.id,
                scan_start,
                range_end,
                &[SessionStatus::Scheduled, SessionStatus::Completed],
            )
            .await?;
        let client_sessions = self
            .repository
            .client_sessions(
                client.id,
                range_start,
                range_end,
                &[SessionStatus::Scheduled],
            )
            .await?;

        let history = self.repository.client_session_history(client.id, 100).await?;
        let target = self.repository.workload_target(therapist.id).await?;
        let windows = self.repository.availability_windows(therapist.id).await?;

        let preference = ClientPreferencePattern::from_history(&history);
        let therapist_scheduled: Vec<&Session> = therapist_sessions
            .iter()
            .filter(|s| s.status == SessionStatus::Scheduled)
            .collect();

        let mut candidates = Vec::new();

        for day_offset in 0..window_days {
            let date = window_start + Duration::days(day_offset);
            // The desirability table only covers Monday through Saturday.
            if date.weekday() == Weekday::Sun {
                continue;
            }

            let day_sessions: Vec<&Session> = therapist_scheduled
                .iter()
                .copied()
                .filter(|s| s.start_time.date_naive() == date)
                .collect();
            let weekly_hours = weekly_booked_hours(&therapist_sessions, date);

            let mut minutes = (BUSINESS_DAY_START_HOUR * 60) as i64;
            let last_start = (BUSINESS_DAY_LAST_START_HOUR * 60) as i64;

            while minutes <= last_start {
                let start = date
                    .and_hms_opt((minutes / 60) as u32, (minutes % 60) as u32, 0)
                    .unwrap()
                    .and_utc();
                let end = start + Duration::minutes(duration_minutes);
                minutes += CANDIDATE_GRID_MINUTES;

                let hard_end = date
                    .and_hms_opt(BUSINESS_DAY_HARD_END_HOUR, 0, 0)
                    .unwrap()
                    .and_utc();
                if end > hard_end {
                    continue;
                }
                if start < now {
                    continue;
                }

                let therapist_busy = therapist_scheduled
                    .iter()
                    .any(|s| intervals::overlaps(start, end, s.start_time, s.end_time));
                let client_busy = client_sessions
                    .iter()
                    .any(|s| intervals::overlaps(start, end, s.start_time, s.end_time));
                if therapist_busy || client_busy {
                    continue;
                }

                let slot = score_candidate(
                    start,
                    end,
                    &day_sessions,
                    weekly_hours,
                    duration_minutes as f64 / 60.0,
                    target.as_ref(),
                    &preference,
                    &windows,
                );

                if slot.score > MIN_SCORE {
                    candidates.push(slot);
                }
            }
        }

        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        candidates.truncate(MAX_RESULTS);

        debug!("{} candidate slot(s) survived scoring", candidates.len());
        Ok(candidates)
    }
}

/// Sum of the therapist's booked hours in the week (Monday-anchored)
/// containing `date`. Cancelled and no-show sessions never reach here.
fn weekly_booked_hours(sessions: &[Session], date: NaiveDate) -> f64 {
    let week_start = date - Duration::days(date.weekday().num_days_from_monday() as i64);
    let week_end = week_start + Duration::days(7);

    sessions
        .iter()
        .filter(|s| {
            let day = s.start_time.date_naive();
            day >= week_start && day < week_end
        })
        .map(Session::duration_hours)
        .sum()
}

#[allow(clippy::too_many_arguments)]
fn score_candidate(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    day_sessions: &[&Session],
    weekly_hours: f64,
    slot_hours: f64,
    target: Option<&WorkloadTarget>,
    preference: &ClientPreferencePattern,
    windows: &[AvailabilityWindow],
) -> ScoredSlot {
    let mut reasons = Vec::new();

    let hour = start.hour();
    let within_core = hour >= CORE_HOURS_START && hour < CORE_HOURS_END;
    let base = if within_core {
        reasons.push("Core business hours".to_string());
        0.8
    } else if hour >= BUSINESS_DAY_START_HOUR && hour < BUSINESS_DAY_HARD_END_HOUR {
        0.6
    } else {
        0.3
    };
    let mut score = base;

    let weekday = start.weekday();
    if weekday != Weekday::Sat {
        score += WEEKDAY_BONUS;
        reasons.push("Weekday slot".to_string());
    }

    let workload_factor = workload_balance_factor(weekly_hours, slot_hours, target);
    score += WORKLOAD_WEIGHT * workload_factor;
    if workload_factor >= 0.75 {
        reasons.push("Moves therapist toward target utilization".to_string());
    } else if workload_factor <= 0.1 {
        reasons.push("Therapist is already over target hours".to_string());
    }

    let preference_factor = preference.match_factor(start);
    score += PREFERENCE_WEIGHT * preference_factor;
    if preference_factor > 0.6 {
        reasons.push("Matches client's past booking pattern".to_string());
    }

    let (efficiency, adjacent) = efficiency_factor(start, end, day_sessions);
    score += EFFICIENCY_WEIGHT * efficiency;
    if adjacent {
        reasons.push("Adjacent to an existing booking".to_string());
    }

    let within_declared_availability = if windows.is_empty() {
        None
    } else {
        Some(windows.iter().any(|w| {
            w.day_of_week == start.weekday().num_days_from_sunday() as i32
                && w.start_time <= start.time()
                && end.time() <= w.end_time
        }))
    };

    ScoredSlot {
        start_time: start,
        end_time: end,
        score: score.min(1.0),
        reasons,
        context: SlotContext {
            sessions_same_day: day_sessions.len() as i32,
            adjacent_to_existing: adjacent,
            within_core_hours: within_core,
            within_declared_availability,
        },
    }
}

/// Favors slots that move the therapist toward the target band midpoint
/// without pushing past the band maximum. Neutral 0.5 without a target.
fn workload_balance_factor(
    weekly_hours: f64,
    slot_hours: f64,
    target: Option<&WorkloadTarget>,
) -> f64 {
    let Some(target) = target else {
        return 0.5;
    };
    let midpoint = target.midpoint();
    if midpoint <= 0.0 {
        return 0.5;
    }

    let projected = weekly_hours + slot_hours;
    if projected <= midpoint {
        (projected / midpoint).clamp(0.0, 1.0)
    } else if projected <= target.weekly_hours_max {
        // Past the midpoint the factor tapers from 1.0 down to 0.5 at the
        // band maximum.
        let span = target.weekly_hours_max - midpoint;
        if span <= 0.0 {
            0.5
        } else {
            1.0 - 0.5 * ((projected - midpoint) / span)
        }
    } else {
        0.1
    }
}

/// Slots butting against (or within one grid step of) an existing same-day
/// booking keep the calendar compact; isolated days score lowest.
fn efficiency_factor(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    day_sessions: &[&Session],
) -> (f64, bool) {
    if day_sessions.is_empty() {
        return (0.2, false);
    }

    let gap = Duration::minutes(CANDIDATE_GRID_MINUTES);
    let adjacent = day_sessions.iter().any(|s| {
        (s.end_time <= start && start - s.end_time <= gap)
            || (end <= s.start_time && s.start_time - end <= gap)
    });

    if adjacent {
        (1.0, true)
    } else {
        (0.5, false)
    }
}

/// Hour-of-day and weekday histogram of a client's completed sessions.
struct ClientPreferencePattern {
    hour_counts: HashMap<u32, usize>,
    weekday_counts: HashMap<Weekday, usize>,
    total: usize,
}

impl ClientPreferencePattern {
    fn from_history(history: &[Session]) -> Self {
        let mut hour_counts: HashMap<u32, usize> = HashMap::new();
        let mut weekday_counts: HashMap<Weekday, usize> = HashMap::new();
        let mut total = 0;

        for session in history.iter().filter(|s| s.status == SessionStatus::Completed) {
            *hour_counts.entry(session.start_time.hour()).or_default() += 1;
            *weekday_counts.entry(session.start_time.weekday()).or_default() += 1;
            total += 1;
        }

        Self { hour_counts, weekday_counts, total }
    }

    /// Popularity of the candidate's hour and weekday relative to the
    /// client's favourites, averaged. Neutral 0.5 with no history.
    fn match_factor(&self, start: DateTime<Utc>) -> f64 {
        if self.total == 0 {
            return 0.5;
        }

        let max_hour = self.hour_counts.values().copied().max().unwrap_or(1) as f64;
        let max_weekday = self.weekday_counts.values().copied().max().unwrap_or(1) as f64;

        let hour_score =
            self.hour_counts.get(&start.hour()).copied().unwrap_or(0) as f64 / max_hour;
        let weekday_score =
            self.weekday_counts.get(&start.weekday()).copied().unwrap_or(0) as f64 / max_weekday;

        0.5 * hour_score + 0.5 * weekday_score
    }
}

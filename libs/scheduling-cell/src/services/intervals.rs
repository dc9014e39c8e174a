// libs/scheduling-cell/src/services/intervals.rs
//
// Pure time-range helpers shared by every scheduling service.

use chrono::{DateTime, NaiveTime, Timelike, Utc};

use crate::models::SchedulingError;

/// First bookable start of the business day.
pub const BUSINESS_DAY_START_HOUR: u32 = 8;
/// Last bookable start of the business day (inclusive).
pub const BUSINESS_DAY_LAST_START_HOUR: u32 = 17;
/// No session may run past this hour.
pub const BUSINESS_DAY_HARD_END_HOUR: u32 = 18;
/// Core hours carry the highest time-of-day desirability.
pub const CORE_HOURS_START: u32 = 9;
pub const CORE_HOURS_END: u32 = 16;
/// Candidate starts are enumerated on this grid.
pub const CANDIDATE_GRID_MINUTES: i64 = 30;
/// Availability window boundaries must sit on this grid.
pub const GRID_MINUTES: u32 = 15;

/// Half-open interval overlap: touching endpoints do not conflict.
pub fn overlaps(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// True when the minute component sits on the 15-minute grid with no
/// trailing seconds.
pub fn is_grid_aligned(time: NaiveTime) -> bool {
    time.minute() % GRID_MINUTES == 0 && time.second() == 0
}

/// Round to the nearest 15-minute mark. Reserved for data-migration and
/// backfill paths; live validation rejects off-grid times instead.
pub fn round_to_grid(time: NaiveTime) -> NaiveTime {
    let total_minutes = time.hour() * 60 + time.minute();
    let rounded = ((total_minutes as f64 / GRID_MINUTES as f64).round() as u32) * GRID_MINUTES;
    let rounded = rounded % (24 * 60);

    NaiveTime::from_hms_opt(rounded / 60, rounded % 60, 0).unwrap()
}

/// Validates an availability window boundary pair: end after start, both on
/// the 15-minute grid.
pub fn validate_window(start: NaiveTime, end: NaiveTime) -> Result<(), SchedulingError> {
    if end <= start {
        return Err(SchedulingError::InvalidTimeRange(format!(
            "window end {} must be after start {}",
            end, start
        )));
    }

    if !is_grid_aligned(start) || !is_grid_aligned(end) {
        return Err(SchedulingError::ValidationError(format!(
            "window boundaries must align to a {}-minute grid",
            GRID_MINUTES
        )));
    }

    Ok(())
}

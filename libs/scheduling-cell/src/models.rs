// libs/scheduling-cell/src/models.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc, NaiveDate, NaiveTime};
use std::fmt;

// ==============================================================================
// CORE SCHEDULING MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub client_id: Uuid,
    pub therapist_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: SessionStatus,
    pub notes: Option<String>,
}

impl Session {
    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }

    pub fn duration_hours(&self) -> f64 {
        self.duration_minutes() as f64 / 60.0
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Scheduled,
    Completed,
    Cancelled,
    NoShow,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Scheduled => write!(f, "scheduled"),
            SessionStatus::Completed => write!(f, "completed"),
            SessionStatus::Cancelled => write!(f, "cancelled"),
            SessionStatus::NoShow => write!(f, "no_show"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OwnerKind {
    Client,
    Therapist,
}

/// Recurring weekly slot during which a client or therapist can be booked.
/// Boundaries must sit on the 15-minute grid; day_of_week runs 0 (Sunday)
/// through 6 (Saturday).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub owner_kind: OwnerKind,
    pub day_of_week: i32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// Target weekly hour band for a therapist. Used for comparison only,
/// never enforcement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadTarget {
    pub therapist_id: Uuid,
    pub weekly_hours_min: f64,
    pub weekly_hours_max: f64,
}

impl WorkloadTarget {
    pub fn midpoint(&self) -> f64 {
        (self.weekly_hours_min + self.weekly_hours_max) / 2.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Therapist {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub service_types: Vec<String>,
    pub specialties: Vec<String>,
    pub is_active: bool,
}

impl Therapist {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub preferred_service_type: Option<String>,
    pub focus_areas: Vec<String>,
}

impl Client {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

// ==============================================================================
// CONFLICT DETECTION MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    TherapistDoubleBooking,
    ClientDoubleBooking,
    /// Reserved for future bookable resources (rooms, equipment). Not
    /// currently produced by the detector.
    ResourceConflict,
}

impl ConflictType {
    /// Higher severity means more urgent to resolve: a therapist conflict
    /// blocks a provider's whole calendar, a client conflict only that
    /// client.
    pub fn severity(&self) -> i32 {
        match self {
            ConflictType::TherapistDoubleBooking => 3,
            ConflictType::ClientDoubleBooking => 2,
            ConflictType::ResourceConflict => 1,
        }
    }
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictType::TherapistDoubleBooking => write!(f, "therapist_double_booking"),
            ConflictType::ClientDoubleBooking => write!(f, "client_double_booking"),
            ConflictType::ResourceConflict => write!(f, "resource_conflict"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConflict {
    pub conflict_id: Uuid,
    pub conflict_type: ConflictType,
    pub severity: i32,
    pub affected_sessions: Vec<Uuid>,
    pub suggested_resolutions: Vec<SuggestedResolution>,
    pub auto_resolvable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "resolution_type", rename_all = "snake_case")]
pub enum SuggestedResolution {
    AlternateTime { alternative: RankedAlternative },
    AlternateTherapist { recommendation: TherapistRecommendation },
}

// ==============================================================================
// SLOT SCORING MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredSlot {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub score: f64,
    pub reasons: Vec<String>,
    pub context: SlotContext,
}

/// Raw availability context behind a scored candidate, returned so calling
/// UIs can explain the ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotContext {
    pub sessions_same_day: i32,
    pub adjacent_to_existing: bool,
    pub within_core_hours: bool,
    /// None when the therapist has no declared availability windows.
    pub within_declared_availability: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedAlternative {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub score: f64,
    pub reason: String,
}

impl From<ScoredSlot> for RankedAlternative {
    fn from(slot: ScoredSlot) -> Self {
        Self {
            start_time: slot.start_time,
            end_time: slot.end_time,
            score: slot.score,
            reason: slot.reasons.join("; "),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotSearchRequest {
    pub therapist_id: Uuid,
    pub client_id: Uuid,
    pub duration_minutes: Option<i64>,
    pub window_start: Option<NaiveDate>,
    pub window_days: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TherapistRecommendation {
    pub therapist_id: Uuid,
    pub therapist_name: String,
    pub compatibility_score: f64,
    pub match_reasons: Vec<String>,
    pub upcoming_slots: Vec<RankedAlternative>,
}

// ==============================================================================
// WORKLOAD ANALYSIS MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadReport {
    pub therapist_id: Uuid,
    pub therapist_name: String,
    pub utilization_rate: f64,
    pub total_hours: f64,
    pub target_hours: f64,
    pub efficiency_score: f64,
    pub recommendations: Vec<WorkloadRecommendation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadRecommendation {
    pub action: WorkloadAction,
    pub priority: RecommendationPriority,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadAction {
    IncreaseUtilization,
    ReduceOverload,
    OptimizeScheduling,
}

impl fmt::Display for WorkloadAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkloadAction::IncreaseUtilization => write!(f, "increase_utilization"),
            WorkloadAction::ReduceOverload => write!(f, "reduce_overload"),
            WorkloadAction::OptimizeScheduling => write!(f, "optimize_scheduling"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationPriority {
    Critical,
    High,
    Medium,
    Low,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum SchedulingError {
    #[error("Therapist not found")]
    TherapistNotFound,

    #[error("Client not found")]
    ClientNotFound,

    #[error("Invalid time range: {0}")]
    InvalidTimeRange(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

pub mod alternatives;
pub mod conflict;
pub mod intervals;
pub mod slots;
pub mod workload;

pub use alternatives::AlternativeRecommendationService;
pub use conflict::ConflictDetectionService;
pub use slots::SlotScoringService;
pub use workload::WorkloadAnalysisService;

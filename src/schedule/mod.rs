pub mod types;
pub mod slot_utils;
pub mod availability;
pub mod scorer;
pub mod budget;
pub mod snapshot;
pub mod move_chain;
pub mod search;
pub mod ranker;
pub mod finder;

#[cfg(test)]
mod fixtures;

pub use availability::AvailabilityIndex;
pub use budget::SearchBudget;
pub use finder::{find_placements, PlacementRequest};
pub use ranker::RecommendationRanker;
pub use scorer::{Compatibility, CompatibilityScorer, ScoreBreakdown, ScoringWeights};
pub use search::{PlacementSearch, SearchOutcome};
pub use snapshot::ScheduleSnapshot;
pub use types::{
    DisplacedStudent, Move, PlacementPlan, PlacementReport, PlacementSummary, PlacementType,
    PlanOperation, Recommendation,
};

use std::time::Instant;

use tracing::{info, warn};

use crate::config::SlotFinderConfig;
use crate::error::SlotFinderResult;
use crate::model::{StudentId, TermId};
use crate::store::ScheduleStore;
use super::budget::SearchBudget;
use super::ranker::RecommendationRanker;
use super::scorer::CompatibilityScorer;
use super::search::PlacementSearch;
use super::snapshot::ScheduleSnapshot;
use super::types::PlacementReport;

#[derive(Debug, Clone)]
pub struct PlacementRequest {
    pub student_id: StudentId,
    pub term_id: TermId,
    pub max_results: usize,
    pub include_displacements: bool,
    /// Stop searching at this instant. Defaults to now + the configured time budget.
    pub deadline: Option<Instant>,
}

impl PlacementRequest {
    pub fn new(student_id: StudentId, term_id: TermId) -> Self {
        Self {
            student_id,
            term_id,
            max_results: 10,
            include_displacements: true,
            deadline: None,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_displacements(mut self, include: bool) -> Self {
        self.include_displacements = include;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Recommend groups for one student.
///
/// Reads a snapshot from `store`, searches it and ranks the result. The store is
/// never written. Running out of time is not an error: the report is marked
/// `truncated` and holds every phase that completed.
pub async fn find_placements<S>(
    store: &S,
    request: &PlacementRequest,
    config: &SlotFinderConfig,
) -> SlotFinderResult<PlacementReport>
where
    S: ScheduleStore + ?Sized,
{
    let started = Instant::now();
    let deadline = request
        .deadline
        .or_else(|| started.checked_add(config.search.time_budget()));

    let snapshot = ScheduleSnapshot::load(store, request.student_id, request.term_id).await?;

    let scorer = CompatibilityScorer::from_config(config);
    let search = PlacementSearch::new(&snapshot, &config.search, &scorer);
    let mut budget = SearchBudget::new(deadline, config.search.max_steps);
    let outcome = search.run(request.include_displacements, &mut budget);

    if outcome.truncated {
        warn!(
            student_id = request.student_id,
            steps = outcome.steps,
            candidates = outcome.candidates.len(),
            "Placement search truncated"
        );
    }

    let ranker = RecommendationRanker::new(scorer.max_total());
    let (recommendations, summary) =
        ranker.rank(&snapshot.target, outcome.candidates, request.max_results);

    info!(
        student_id = request.student_id,
        term_id = request.term_id,
        total = summary.total,
        direct = summary.direct_count,
        displacements = summary.displacement_count,
        truncated = outcome.truncated,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Placement search finished"
    );

    Ok(PlacementReport {
        recommendations,
        summary,
        truncated: outcome.truncated,
    })
}

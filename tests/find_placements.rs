use std::collections::HashSet;
use std::time::Instant;

use async_trait::async_trait;

use slot_finder::demo::generate_seed;
use slot_finder::error::{ErrorKind, StoreResult};
use slot_finder::model::{
    CoachId, Enrollment, Group, SkillLevel, Student, StudentId, TermId, Unavailability,
};
use slot_finder::schedule::PlacementType;
use slot_finder::store::{InMemoryStore, PlanExecutor, ScheduleStore};
use slot_finder::{find_placements, PlacementRequest, SlotFinderConfig, StoreError};

fn demo_store(seed: u64) -> InMemoryStore {
    InMemoryStore::from_seed(generate_seed(seed)).unwrap()
}

/// Delegates to an in-memory store but fails group listing
struct FlakyStore {
    inner: InMemoryStore,
}

#[async_trait]
impl ScheduleStore for FlakyStore {
    async fn get_student(&self, student_id: StudentId) -> StoreResult<Option<Student>> {
        self.inner.get_student(student_id).await
    }

    async fn get_enrollment(
        &self,
        student_id: StudentId,
        term_id: TermId,
    ) -> StoreResult<Option<Enrollment>> {
        self.inner.get_enrollment(student_id, term_id).await
    }

    async fn list_unavailability(&self, student_id: StudentId) -> StoreResult<Vec<Unavailability>> {
        self.inner.list_unavailability(student_id).await
    }

    async fn list_candidate_groups(&self, _term_id: TermId) -> StoreResult<Vec<Group>> {
        Err(StoreError::Unavailable("connection reset".to_string()))
    }

    async fn get_coach_specialization(
        &self,
        coach_id: CoachId,
    ) -> StoreResult<Option<Vec<SkillLevel>>> {
        self.inner.get_coach_specialization(coach_id).await
    }

    async fn active_term(&self) -> StoreResult<Option<TermId>> {
        self.inner.active_term().await
    }
}

#[tokio::test]
async fn test_unknown_student_is_not_found() {
    let store = demo_store(1);
    let err = find_placements(&store, &PlacementRequest::new(9_999, 1), &SlotFinderConfig::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_missing_enrollment_is_precondition_failure() {
    let store = demo_store(1);
    let err = find_placements(&store, &PlacementRequest::new(1, 2), &SlotFinderConfig::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PreconditionFailed);
}

#[tokio::test]
async fn test_store_failure_is_retryable_dependency_error() {
    let store = FlakyStore { inner: demo_store(1) };
    let err = find_placements(&store, &PlacementRequest::new(1, 1), &SlotFinderConfig::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DependencyUnavailable);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_repeated_calls_give_identical_reports() {
    let store = demo_store(11);
    let config = SlotFinderConfig::default();
    let request = PlacementRequest::new(1, 1);

    let first = find_placements(&store, &request, &config).await.unwrap();
    let second = find_placements(&store, &request, &config).await.unwrap();
    assert_eq!(
        serde_json::to_value(&first).unwrap(),
        serde_json::to_value(&second).unwrap()
    );
}

#[tokio::test]
async fn test_reports_hold_their_invariants_across_rosters() {
    let config = SlotFinderConfig::default();
    for seed in 0..15 {
        let store = demo_store(seed);
        let groups = store.list_candidate_groups(1).await.unwrap();

        for student_id in [1, 2, 3, 4, 5] {
            let request = PlacementRequest::new(student_id, 1).with_max_results(50);
            let report = find_placements(&store, &request, &config).await.unwrap();

            assert_eq!(report.summary.total, report.recommendations.len());
            assert_eq!(
                report.summary.direct_count + report.summary.displacement_count,
                report.summary.total
            );
            for rec in &report.recommendations {
                assert!(rec.score > 0 && rec.score <= 370);
                assert!(rec.percentage <= 100);
                assert!(rec.feasibility_score <= 100);
                assert!(rec.displaced_students.len() <= 3);

                let mut pairs = HashSet::new();
                for d in &rec.displaced_students {
                    assert!(pairs.insert((d.student_id, d.from_group_id)));
                    assert!(pairs.insert((d.student_id, d.to_group_id)));
                }

                let group = groups.iter().find(|g| g.id == rec.group_id).unwrap();
                assert!(!group.has_member(student_id));
                if rec.placement_type == PlacementType::Direct {
                    assert!(group.occupancy().has_space());
                    assert!(rec.displaced_students.is_empty());
                } else {
                    assert!(!group.occupancy().has_space());
                    assert!(!rec.displaced_students.is_empty());
                }
            }

            let mut keys = HashSet::new();
            for rec in &report.recommendations {
                assert!(keys.insert((rec.group_id, rec.placement_type)));
            }
        }
    }
}

#[tokio::test]
async fn test_elapsed_deadline_truncates() {
    let store = demo_store(3);
    let request = PlacementRequest::new(1, 1).with_deadline(Instant::now());
    let report = find_placements(&store, &request, &SlotFinderConfig::default())
        .await
        .unwrap();
    assert!(report.truncated);
    assert!(report.recommendations.is_empty());
}

#[tokio::test]
async fn test_unrepresentable_time_budget_runs_without_deadline() {
    let store = demo_store(3);
    let mut config = SlotFinderConfig::default();
    config.search.time_budget_secs = u64::MAX;
    config.search.max_steps = u64::MAX;
    let report = find_placements(&store, &PlacementRequest::new(1, 1), &config)
        .await
        .unwrap();
    assert!(!report.truncated);
}

#[tokio::test]
async fn test_executing_a_plan_places_the_student() {
    let config = SlotFinderConfig::default();
    for seed in 0..15 {
        let store = demo_store(seed);
        let report = find_placements(&store, &PlacementRequest::new(1, 1), &config)
            .await
            .unwrap();
        let Some(best) = report.recommendations.first() else {
            continue;
        };

        store.execute_plan(&best.plan).await.unwrap();
        let groups = store.list_candidate_groups(1).await.unwrap();
        let placed = groups.iter().find(|g| g.id == best.group_id).unwrap();
        assert!(placed.has_member(1));
        for d in &best.displaced_students {
            let destination = groups.iter().find(|g| g.id == d.to_group_id).unwrap();
            assert!(destination.has_member(d.student_id));
        }

        // Replaying the same plan must fail and change nothing
        let before = serde_json::to_value(store.to_seed().unwrap()).unwrap();
        let err = store.execute_plan(&best.plan).await.unwrap_err();
        assert!(matches!(err, StoreError::PlanRejected(_)));
        let after = serde_json::to_value(store.to_seed().unwrap()).unwrap();
        assert_eq!(before, after);
        return;
    }
    panic!("no demo roster produced a recommendation for student 1");
}

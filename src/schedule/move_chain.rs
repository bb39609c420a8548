use crate::model::{Group, GroupId, Member, StudentId};
use super::budget::SearchBudget;
use super::search::PlacementSearch;
use super::types::Move;

/// (student, group) pairs and groups already used by the chain being built.
///
/// Pushed on the way down and rewound on backtrack, so sibling branches never see
/// each other's entries.
#[derive(Debug, Default)]
pub struct ChainPath {
    pairs: Vec<(StudentId, GroupId)>,
    touched: Vec<GroupId>,
}

impl ChainPath {
    pub fn visit(&mut self, student_id: StudentId, group_id: GroupId) {
        self.pairs.push((student_id, group_id));
    }

    pub fn touch(&mut self, group_id: GroupId) {
        self.touched.push(group_id);
    }

    pub fn has_visited(&self, student_id: StudentId, group_id: GroupId) -> bool {
        self.pairs.contains(&(student_id, group_id))
    }

    pub fn is_touched(&self, group_id: GroupId) -> bool {
        self.touched.contains(&group_id)
    }

    pub fn touched(&self) -> &[GroupId] {
        &self.touched
    }

    fn mark(&self) -> (usize, usize) {
        (self.pairs.len(), self.touched.len())
    }

    fn rewind(&mut self, mark: (usize, usize)) {
        self.pairs.truncate(mark.0);
        self.touched.truncate(mark.1);
    }
}

/// Tries to find a chain of moves that gets `mover` out of `vacating`, with depth limit.
///
/// `depth` counts displaced students including `mover`. Returns the moves in chain
/// order (`mover` first); the last mover always lands in a group with space.
pub fn find_move_chain(
    search: &PlacementSearch<'_>,
    mover: &Member,
    vacating: &Group,
    depth: usize,
    max_depth: usize,
    path: &mut ChainPath,
    budget: &mut SearchBudget,
) -> Option<Vec<Move>> {
    if depth > max_depth || !budget.tick() {
        return None;
    }

    // Try a group with space first
    if let Some((destination, _)) = search.best_direct_for(mover, vacating.id, path.touched()) {
        return Some(vec![Move {
            student_id: mover.id(),
            from_group: vacating.id,
            to_group: destination.id,
        }]);
    }

    if depth == max_depth {
        return None;
    }

    // No free seat, try to displace someone from a full group the mover fits in.
    // Best-scoring groups first; the stable sort keeps chronological order on ties.
    let availability = search.availability_of(mover.id())?;
    let mut full_groups: Vec<(&Group, u32)> = search
        .groups()
        .iter()
        .filter(|g| !path.is_touched(g.id) && !path.has_visited(mover.id(), g.id))
        .filter(|g| availability.is_free_after_leaving(g.day, g.time_slot.id, vacating.id))
        .filter(|g| !g.occupancy().has_space())
        .map(|g| (g, search.score(mover, &g.occupancy()).total))
        .collect();
    full_groups.sort_by(|a, b| b.1.cmp(&a.1));

    for (blocking_group, _) in full_groups {
        for blocker in &blocking_group.members {
            if blocker.id() == search.target_id() || path.has_visited(blocker.id(), blocking_group.id) {
                continue;
            }
            let vacated = blocking_group.occupancy_without(blocker.id());
            if !vacated.has_space() || !search.score(mover, &vacated).viable {
                continue;
            }

            let mark = path.mark();
            path.visit(mover.id(), blocking_group.id);
            path.visit(blocker.id(), blocking_group.id);
            path.touch(blocking_group.id);

            if let Some(mut sub_chain) = find_move_chain(
                search,
                blocker,
                blocking_group,
                depth + 1,
                max_depth,
                path,
                budget,
            ) {
                // Found a chain! Prepend our move
                sub_chain.insert(0, Move {
                    student_id: mover.id(),
                    from_group: vacating.id,
                    to_group: blocking_group.id,
                });
                return Some(sub_chain);
            }

            path.rewind(mark);
            if budget.is_exhausted() {
                return None;
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;
    use crate::model::{EnrollmentType, SkillLevel};
    use crate::schedule::fixtures::{blocked, group, member, slot, snapshot};
    use crate::schedule::scorer::CompatibilityScorer;
    use chrono::Weekday;

    /// Target 1 wants Monday (group 10, full with student 2). Student 2 can only go to
    /// Tuesday (group 20, full with student 3); student 3 can go to Wednesday (group 30).
    fn two_step_snapshot() -> crate::schedule::snapshot::ScheduleSnapshot {
        let g = |id, day, members| group(id, day, slot(1, 15), 1, SkillLevel::Beginner, members);
        let m = |id| member(id, EnrollmentType::Group, SkillLevel::Beginner);
        let mut snap = snapshot(
            m(1),
            vec![
                g(10, Weekday::Mon, vec![m(2)]),
                g(20, Weekday::Tue, vec![m(3)]),
                g(30, Weekday::Wed, vec![]),
            ],
        );
        snap.unavailability.insert(1, vec![blocked(Weekday::Wed, 1), blocked(Weekday::Tue, 1)]);
        snap.unavailability.insert(2, vec![blocked(Weekday::Wed, 1)]);
        snap
    }

    #[test]
    fn test_chain_ends_in_free_group() {
        let snap = two_step_snapshot();
        let config = SearchConfig::default();
        let scorer = CompatibilityScorer::default();
        let search = PlacementSearch::new(&snap, &config, &scorer);

        let monday = snap.group(10).unwrap();
        let mover = &monday.members[0];
        let mut path = ChainPath::default();
        path.visit(1, 10);
        path.visit(2, 10);
        path.touch(10);

        let moves = find_move_chain(
            &search,
            mover,
            monday,
            1,
            3,
            &mut path,
            &mut SearchBudget::unlimited(),
        )
        .unwrap();
        assert_eq!(
            moves,
            vec![
                Move { student_id: 2, from_group: 10, to_group: 20 },
                Move { student_id: 3, from_group: 20, to_group: 30 },
            ]
        );
    }

    #[test]
    fn test_depth_limit_stops_chain() {
        let snap = two_step_snapshot();
        let config = SearchConfig::default();
        let scorer = CompatibilityScorer::default();
        let search = PlacementSearch::new(&snap, &config, &scorer);

        let monday = snap.group(10).unwrap();
        let mut path = ChainPath::default();
        path.touch(10);
        let moves = find_move_chain(
            &search,
            &monday.members[0],
            monday,
            1,
            1,
            &mut path,
            &mut SearchBudget::unlimited(),
        );
        assert!(moves.is_none());
    }

    #[test]
    fn test_cycle_back_to_start_is_not_followed() {
        // 2 only reaches Tuesday, 3 only reaches Monday
        let g = |id, day, members| group(id, day, slot(1, 15), 1, SkillLevel::Beginner, members);
        let m = |id| member(id, EnrollmentType::Group, SkillLevel::Beginner);
        let mut snap = snapshot(
            m(1),
            vec![g(10, Weekday::Mon, vec![m(2)]), g(20, Weekday::Tue, vec![m(3)])],
        );
        snap.unavailability.insert(1, vec![blocked(Weekday::Tue, 1)]);
        let config = SearchConfig::default();
        let scorer = CompatibilityScorer::default();
        let search = PlacementSearch::new(&snap, &config, &scorer);

        let monday = snap.group(10).unwrap();
        let mut path = ChainPath::default();
        path.visit(1, 10);
        path.visit(2, 10);
        path.touch(10);
        let mut budget = SearchBudget::unlimited();
        let moves = find_move_chain(&search, &monday.members[0], monday, 1, 3, &mut path, &mut budget);

        assert!(moves.is_none());
        assert!(!budget.is_exhausted());
        // Backtracking leaves only the caller's entries
        assert_eq!(path.touched(), &[10]);
        assert!(!path.has_visited(3, 20));
    }

    #[test]
    fn test_rewind_restores_path() {
        let mut path = ChainPath::default();
        path.visit(1, 10);
        let mark = path.mark();
        path.visit(2, 20);
        path.touch(20);
        path.rewind(mark);
        assert!(path.has_visited(1, 10));
        assert!(!path.has_visited(2, 20));
        assert!(!path.is_touched(20));
    }
}

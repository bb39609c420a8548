//! Three-phase placement search.
//!
//! 1. Direct: groups with a free seat at one of the student's free slots.
//! 2. Single displacement: a full group frees a seat by moving one occupant to a
//!    free seat elsewhere.
//! 3. Chain displacement: the occupant moves into another full group, displacing
//!    someone there, and so on until the last mover lands in a free seat.
//!
//! Every phase walks groups in chronological order, so identical snapshots give
//! identical candidate lists.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::config::SearchConfig;
use crate::model::{Group, GroupId, Member, Occupancy, StudentId};
use super::availability::AvailabilityIndex;
use super::budget::SearchBudget;
use super::move_chain::{find_move_chain, ChainPath};
use super::scorer::{Compatibility, CompatibilityScorer};
use super::slot_utils::{day_name, format_time_slot};
use super::snapshot::ScheduleSnapshot;
use super::types::{Candidate, DisplacedStudent, GroupSummary, Move, PlacementType};

#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    pub candidates: Vec<Candidate>,
    /// A phase ran out of budget; its candidates were dropped and later phases skipped
    pub truncated: bool,
    pub steps: u64,
}

/// A (full group, occupant) pair whose occupant had nowhere to go directly
struct ChainSeed<'a> {
    group: &'a Group,
    occupant: &'a Member,
    compatibility: Compatibility,
}

pub struct PlacementSearch<'a> {
    snapshot: &'a ScheduleSnapshot,
    scorer: &'a CompatibilityScorer,
    config: &'a SearchConfig,
    availability: HashMap<StudentId, AvailabilityIndex>,
}

impl<'a> PlacementSearch<'a> {
    /// Index the availability of the target and of every group member
    pub fn new(
        snapshot: &'a ScheduleSnapshot,
        config: &'a SearchConfig,
        scorer: &'a CompatibilityScorer,
    ) -> Self {
        let mut students: HashSet<StudentId> = snapshot
            .groups
            .iter()
            .flat_map(|g| g.members.iter().map(|m| m.id()))
            .collect();
        students.insert(snapshot.target.id());

        let availability = students
            .into_iter()
            .map(|id| {
                let index =
                    AvailabilityIndex::build(id, snapshot.unavailability_of(id), &snapshot.groups);
                (id, index)
            })
            .collect();

        Self {
            snapshot,
            scorer,
            config,
            availability,
        }
    }

    pub fn run(&self, include_displacements: bool, budget: &mut SearchBudget) -> SearchOutcome {
        let mut outcome = SearchOutcome::default();

        match self.direct_phase(budget) {
            Some(direct) => {
                debug!(candidates = direct.len(), "Direct phase complete");
                outcome.candidates.extend(direct);
            }
            None => return self.truncate(outcome, "direct", budget),
        }

        if !include_displacements {
            outcome.steps = budget.steps();
            return outcome;
        }

        let seeds = match self.single_phase(budget) {
            Some((singles, seeds)) => {
                debug!(
                    candidates = singles.len(),
                    chain_seeds = seeds.len(),
                    "Single displacement phase complete"
                );
                outcome.candidates.extend(singles);
                seeds
            }
            None => return self.truncate(outcome, "single displacement", budget),
        };

        match self.chain_phase(seeds, budget) {
            Some(chains) => {
                debug!(candidates = chains.len(), "Chain displacement phase complete");
                outcome.candidates.extend(chains);
            }
            None => return self.truncate(outcome, "chain displacement", budget),
        }

        outcome.steps = budget.steps();
        outcome
    }

    fn truncate(&self, mut outcome: SearchOutcome, phase: &str, budget: &SearchBudget) -> SearchOutcome {
        debug!(phase, steps = budget.steps(), "Search budget exhausted");
        outcome.truncated = true;
        outcome.steps = budget.steps();
        outcome
    }

    /// Groups with space. `None` if the budget ran out.
    fn direct_phase(&self, budget: &mut SearchBudget) -> Option<Vec<Candidate>> {
        if budget.is_exhausted() {
            return None;
        }
        let target = &self.snapshot.target;
        let availability = self.availability_of(target.id())?;
        let mut candidates = Vec::new();

        for group in &self.snapshot.groups {
            if !budget.tick() {
                return None;
            }
            if !availability.is_free(group.day, group.time_slot.id) {
                continue;
            }
            let occupancy = group.occupancy();
            if !occupancy.has_space() {
                continue;
            }
            let compatibility = self.score(target, &occupancy);
            if !compatibility.viable {
                continue;
            }
            candidates.push(Candidate {
                group: GroupSummary::of(group),
                placement_type: PlacementType::Direct,
                current_size: occupancy.current_size(),
                companions: occupancy.member_names(),
                compatibility,
                moves: Vec::new(),
                displaced: Vec::new(),
                feasibility_score: 100,
            });
        }
        Some(candidates)
    }

    /// Full groups where one occupant can move straight to another group.
    ///
    /// Occupants without a direct alternative are returned as chain seeds.
    fn single_phase(&self, budget: &mut SearchBudget) -> Option<(Vec<Candidate>, Vec<ChainSeed<'a>>)> {
        if budget.is_exhausted() {
            return None;
        }
        let snapshot = self.snapshot;
        let target = &snapshot.target;
        let availability = self.availability_of(target.id())?;
        let mut candidates = Vec::new();
        let mut seeds = Vec::new();

        for group in &snapshot.groups {
            if !budget.tick() {
                return None;
            }
            if !availability.is_free(group.day, group.time_slot.id) || group.occupancy().has_space() {
                continue;
            }

            for occupant in &group.members {
                if !budget.tick() {
                    return None;
                }
                if occupant.id() == target.id() {
                    continue;
                }
                let vacated = group.occupancy_without(occupant.id());
                if !vacated.has_space() {
                    continue;
                }
                let compatibility = self.score(target, &vacated);
                if !compatibility.viable {
                    continue;
                }

                match self.best_direct_for(occupant, group.id, &[group.id]) {
                    Some((destination, _)) => {
                        let moves = vec![Move {
                            student_id: occupant.id(),
                            from_group: group.id,
                            to_group: destination.id,
                        }];
                        if let Some(candidate) = self.displacement_candidate(
                            group,
                            &vacated,
                            compatibility,
                            moves,
                            PlacementType::SingleDisplacement,
                        ) {
                            candidates.push(candidate);
                        }
                    }
                    None => seeds.push(ChainSeed {
                        group,
                        occupant,
                        compatibility,
                    }),
                }
            }
        }
        Some((candidates, seeds))
    }

    fn chain_phase(&self, seeds: Vec<ChainSeed<'a>>, budget: &mut SearchBudget) -> Option<Vec<Candidate>> {
        if budget.is_exhausted() {
            return None;
        }
        let target = &self.snapshot.target;
        let max_depth = self.config.max_chain_depth;
        let mut candidates = Vec::new();

        for seed in seeds {
            if !budget.tick() {
                return None;
            }
            let mut path = ChainPath::default();
            path.visit(target.id(), seed.group.id);
            path.visit(seed.occupant.id(), seed.group.id);
            path.touch(seed.group.id);

            let found = find_move_chain(self, seed.occupant, seed.group, 1, max_depth, &mut path, budget);
            if budget.is_exhausted() {
                return None;
            }
            let Some(moves) = found else {
                continue;
            };
            if !self.is_well_formed(seed.group.id, &moves) {
                debug!(group_id = seed.group.id, "Discarding malformed displacement chain");
                continue;
            }

            let vacated = seed.group.occupancy_without(seed.occupant.id());
            if let Some(candidate) = self.displacement_candidate(
                seed.group,
                &vacated,
                seed.compatibility,
                moves,
                PlacementType::ChainDisplacement,
            ) {
                candidates.push(candidate);
            }
        }
        Some(candidates)
    }

    /// Contiguous, within depth, no (student, group) pair used twice and no group
    /// entered twice
    fn is_well_formed(&self, start: GroupId, moves: &[Move]) -> bool {
        if moves.is_empty() || moves.len() > self.config.max_chain_depth {
            return false;
        }
        let mut expected_from = start;
        let mut pairs = HashSet::new();
        let mut groups = HashSet::from([start]);
        for mv in moves {
            if mv.from_group != expected_from || mv.from_group == mv.to_group {
                return false;
            }
            if !pairs.insert((mv.student_id, mv.from_group)) || !pairs.insert((mv.student_id, mv.to_group)) {
                return false;
            }
            if !groups.insert(mv.to_group) {
                return false;
            }
            expected_from = mv.to_group;
        }
        true
    }

    fn displacement_candidate(
        &self,
        group: &Group,
        vacated: &Occupancy<'_>,
        compatibility: Compatibility,
        moves: Vec<Move>,
        placement_type: PlacementType,
    ) -> Option<Candidate> {
        let mut displaced = Vec::with_capacity(moves.len());
        for (i, mv) in moves.iter().enumerate() {
            // The group a mover joins has lost the next mover, if any
            let next_mover = moves.get(i + 1).map(|next| next.student_id);
            displaced.push(self.displaced_student(mv, next_mover)?);
        }
        let feasibility_score = self.feasibility(&displaced);

        Some(Candidate {
            group: GroupSummary::of(group),
            placement_type,
            current_size: group.occupancy().current_size(),
            companions: vacated.member_names(),
            compatibility,
            moves,
            displaced,
            feasibility_score,
        })
    }

    fn displaced_student(&self, mv: &Move, next_mover: Option<StudentId>) -> Option<DisplacedStudent> {
        let from = self.snapshot.group(mv.from_group)?;
        let to = self.snapshot.group(mv.to_group)?;
        let member = from.members.iter().find(|m| m.id() == mv.student_id)?;

        let score_before = self.score(member, &from.occupancy_without(member.id())).total;
        let destination = match next_mover {
            Some(id) => to.occupancy_without(id),
            None => to.occupancy(),
        };
        let score_after = self.score(member, &destination).total;

        Some(DisplacedStudent {
            student_id: member.id(),
            name: member.student.full_name(),
            enrollment_type: member.enrollment_type(),
            from_group_id: from.id,
            to_group_id: to.id,
            to_group_name: to.name.clone(),
            to_day: day_name(to.day).to_string(),
            to_time_slot: format_time_slot(&to.time_slot),
            score_before,
            score_after,
        })
    }

    /// 100 for a direct placement, minus a fixed penalty per displaced student and a
    /// tenth of the compatibility they lose
    fn feasibility(&self, displaced: &[DisplacedStudent]) -> u32 {
        let penalty = self
            .config
            .displacement_penalty
            .saturating_mul(displaced.len() as u32);
        let lost = displaced
            .iter()
            .map(|d| d.score_before.saturating_sub(d.score_after))
            .fold(0u32, u32::saturating_add);
        100u32.saturating_sub(penalty.saturating_add(lost / 10))
    }

    pub(super) fn groups(&self) -> &'a [Group] {
        &self.snapshot.groups
    }

    pub(super) fn target_id(&self) -> StudentId {
        self.snapshot.target.id()
    }

    pub(super) fn availability_of(&self, student_id: StudentId) -> Option<&AvailabilityIndex> {
        self.availability.get(&student_id)
    }

    pub(super) fn score(&self, member: &Member, occupancy: &Occupancy<'_>) -> Compatibility {
        let specialization = self.snapshot.specialization(occupancy.group.coach_id);
        self.scorer.score(member, occupancy, specialization)
    }

    /// Best viable group with space that `mover` could join after leaving `leaving`.
    ///
    /// Ties go to the chronologically first group.
    pub(super) fn best_direct_for(
        &self,
        mover: &Member,
        leaving: GroupId,
        excluded: &[GroupId],
    ) -> Option<(&'a Group, Compatibility)> {
        let availability = self.availability_of(mover.id())?;
        let mut best: Option<(&'a Group, Compatibility)> = None;

        for group in self.groups() {
            if group.id == leaving || excluded.contains(&group.id) {
                continue;
            }
            if !availability.is_free_after_leaving(group.day, group.time_slot.id, leaving) {
                continue;
            }
            let occupancy = group.occupancy();
            if !occupancy.has_space() {
                continue;
            }
            let compatibility = self.score(mover, &occupancy);
            if !compatibility.viable {
                continue;
            }
            if best.map_or(true, |(_, current)| compatibility.total > current.total) {
                best = Some((group, compatibility));
            }
        }
        best
    }
}

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::model::{EnrollmentType, Group, GroupId, SkillLevel, StudentId, TimeSlot};
use super::scorer::{Compatibility, ScoreBreakdown};

/// How a recommendation gets the student into the group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlacementType {
    /// The group has a free seat; nobody else moves
    Direct,
    /// One occupant moves to a free seat elsewhere
    SingleDisplacement,
    /// Several occupants move in cascade, the last one into a free seat
    ChainDisplacement,
}

impl PlacementType {
    /// Tie-break rank: cheaper placements first
    pub fn rank(self) -> u8 {
        match self {
            PlacementType::Direct => 0,
            PlacementType::SingleDisplacement => 1,
            PlacementType::ChainDisplacement => 2,
        }
    }
}

/// Represents a move in a chain of group reassignments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub student_id: StudentId,
    pub from_group: GroupId,
    pub to_group: GroupId,
}

/// One membership change of a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PlanOperation {
    RemoveMember { group_id: GroupId, student_id: StudentId },
    AddMember { group_id: GroupId, student_id: StudentId },
}

/// Membership changes that must be applied together or not at all.
///
/// Operations are ordered so that every intermediate state respects group capacity:
/// the deepest displacement first, the placed student last.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementPlan {
    pub operations: Vec<PlanOperation>,
}

impl PlacementPlan {
    pub fn build(student_id: StudentId, group_id: GroupId, moves: &[Move]) -> Self {
        let mut operations = Vec::with_capacity(moves.len() * 2 + 1);
        // Reverse order: a later move's from_group is an earlier move's to_group
        for mv in moves.iter().rev() {
            operations.push(PlanOperation::RemoveMember {
                group_id: mv.from_group,
                student_id: mv.student_id,
            });
            operations.push(PlanOperation::AddMember {
                group_id: mv.to_group,
                student_id: mv.student_id,
            });
        }
        operations.push(PlanOperation::AddMember { group_id, student_id });
        Self { operations }
    }
}

/// Display data of a group, copied out of the snapshot so results own their data
#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    pub id: GroupId,
    pub name: String,
    pub coach_name: String,
    pub day: Weekday,
    pub time_slot: TimeSlot,
    pub max_capacity: u32,
    pub target_skill_level: SkillLevel,
}

impl GroupSummary {
    pub fn of(group: &Group) -> Self {
        Self {
            id: group.id,
            name: group.name.clone(),
            coach_name: group.coach_name.clone(),
            day: group.day,
            time_slot: group.time_slot.clone(),
            max_capacity: group.max_capacity,
            target_skill_level: group.target_skill_level,
        }
    }
}

/// A student who has to change group for a recommendation to work
#[derive(Debug, Clone, Serialize)]
pub struct DisplacedStudent {
    pub student_id: StudentId,
    pub name: String,
    pub enrollment_type: EnrollmentType,
    pub from_group_id: GroupId,
    pub to_group_id: GroupId,
    pub to_group_name: String,
    pub to_day: String,
    pub to_time_slot: String,
    /// Fit in the group being left
    pub score_before: u32,
    /// Fit in the group joined
    pub score_after: u32,
}

/// Raw search output, before deduplication and ranking
#[derive(Debug, Clone)]
pub struct Candidate {
    pub group: GroupSummary,
    pub placement_type: PlacementType,
    /// Occupants of the group before anything moves
    pub current_size: u32,
    /// Occupants the student would join (after any displacement)
    pub companions: Vec<String>,
    pub compatibility: Compatibility,
    pub moves: Vec<Move>,
    pub displaced: Vec<DisplacedStudent>,
    pub feasibility_score: u32,
}

/// A ranked, explained placement option
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub group_id: GroupId,
    pub group_name: String,
    pub score: u32,
    pub percentage: u32,
    pub placement_type: PlacementType,
    pub day: String,
    pub time_slot: String,
    pub coach: String,
    pub current_size: u32,
    pub max_capacity: u32,
    pub displaced_students: Vec<DisplacedStudent>,
    pub explanation: String,
    pub feasibility_score: u32,
    pub breakdown: ScoreBreakdown,
    pub plan: PlacementPlan,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlacementSummary {
    pub total: usize,
    pub direct_count: usize,
    pub displacement_count: usize,
    pub single_displacement_count: usize,
    pub chain_displacement_count: usize,
}

/// Result of one `find_placements` call
#[derive(Debug, Clone, Serialize)]
pub struct PlacementReport {
    pub recommendations: Vec<Recommendation>,
    pub summary: PlacementSummary,
    /// The search ran out of budget; later phases were skipped
    pub truncated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_orders_deepest_move_first() {
        let moves = vec![
            Move { student_id: 2, from_group: 10, to_group: 20 },
            Move { student_id: 3, from_group: 20, to_group: 30 },
        ];
        let plan = PlacementPlan::build(1, 10, &moves);
        assert_eq!(
            plan.operations,
            vec![
                PlanOperation::RemoveMember { group_id: 20, student_id: 3 },
                PlanOperation::AddMember { group_id: 30, student_id: 3 },
                PlanOperation::RemoveMember { group_id: 10, student_id: 2 },
                PlanOperation::AddMember { group_id: 20, student_id: 2 },
                PlanOperation::AddMember { group_id: 10, student_id: 1 },
            ]
        );
    }

    #[test]
    fn test_direct_plan_is_single_add() {
        let plan = PlacementPlan::build(7, 4, &[]);
        assert_eq!(
            plan.operations,
            vec![PlanOperation::AddMember { group_id: 4, student_id: 7 }]
        );
    }

    #[test]
    fn test_placement_type_serializes_kebab_case() {
        let json = serde_json::to_string(&PlacementType::ChainDisplacement).unwrap();
        assert_eq!(json, "\"chain-displacement\"");
    }
}

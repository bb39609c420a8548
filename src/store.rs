//! Data access for the placement search.
//!
//! [`ScheduleStore`] is everything the optimizer reads; [`PlanExecutor`] applies an
//! accepted recommendation. [`InMemoryStore`] implements both over a JSON seed and
//! backs the CLI, the HTTP server and the tests.

use std::collections::HashSet;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::model::{
    CoachId, Enrollment, Group, GroupId, Member, SkillLevel, Student, StudentId, TermId, TimeSlot,
    TimeSlotId, Unavailability,
};
use crate::schedule::types::{PlacementPlan, PlanOperation};

/// Read access to students, enrollments, groups and availability.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` so one store can serve concurrent requests.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn get_student(&self, student_id: StudentId) -> StoreResult<Option<Student>>;

    async fn get_enrollment(
        &self,
        student_id: StudentId,
        term_id: TermId,
    ) -> StoreResult<Option<Enrollment>>;

    /// Individual and class-wide unavailability, merged
    async fn list_unavailability(&self, student_id: StudentId) -> StoreResult<Vec<Unavailability>>;

    /// Every group of the term, with members populated
    async fn list_candidate_groups(&self, term_id: TermId) -> StoreResult<Vec<Group>>;

    /// `None` when the coach has not declared any specialization
    async fn get_coach_specialization(&self, coach_id: CoachId)
        -> StoreResult<Option<Vec<SkillLevel>>>;

    async fn active_term(&self) -> StoreResult<Option<TermId>>;
}

/// Applies a placement plan as one transaction.
#[async_trait]
pub trait PlanExecutor: Send + Sync {
    /// Either every operation is applied or none is
    async fn execute_plan(&self, plan: &PlacementPlan) -> StoreResult<()>;
}

/// A store that can both be searched and apply plans
pub trait SlotStore: ScheduleStore + PlanExecutor {}

impl<T: ScheduleStore + PlanExecutor> SlotStore for T {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoachSeed {
    pub id: CoachId,
    pub name: String,
    #[serde(default)]
    pub specializations: Option<Vec<SkillLevel>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSeed {
    pub id: GroupId,
    pub name: String,
    pub coach_id: CoachId,
    pub term_id: TermId,
    pub day: chrono::Weekday,
    pub time_slot_id: TimeSlotId,
    pub max_capacity: u32,
    #[serde(default = "default_preferred_size")]
    pub preferred_size: u32,
    pub target_skill_level: SkillLevel,
    #[serde(default)]
    pub member_ids: Vec<StudentId>,
}

fn default_preferred_size() -> u32 {
    3
}

/// An unavailable (day, slot) for a list of students and/or whole school classes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnavailabilitySeed {
    pub day: chrono::Weekday,
    pub time_slot_id: TimeSlotId,
    #[serde(default)]
    pub student_ids: Vec<StudentId>,
    #[serde(default)]
    pub school_classes: Vec<String>,
}

/// Serialized contents of an [`InMemoryStore`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSeed {
    #[serde(default)]
    pub active_term: Option<TermId>,
    #[serde(default)]
    pub students: Vec<Student>,
    #[serde(default)]
    pub enrollments: Vec<Enrollment>,
    #[serde(default)]
    pub time_slots: Vec<TimeSlot>,
    #[serde(default)]
    pub coaches: Vec<CoachSeed>,
    #[serde(default)]
    pub groups: Vec<GroupSeed>,
    #[serde(default)]
    pub unavailability: Vec<UnavailabilitySeed>,
}

impl StoreSeed {
    fn student(&self, id: StudentId) -> Option<&Student> {
        self.students.iter().find(|s| s.id == id)
    }

    fn enrollment(&self, student_id: StudentId, term_id: TermId) -> Option<&Enrollment> {
        self.enrollments
            .iter()
            .find(|e| e.student_id == student_id && e.term_id == term_id)
    }

    fn coach(&self, id: CoachId) -> Option<&CoachSeed> {
        self.coaches.iter().find(|c| c.id == id)
    }

    /// Resolve a group seed into a fully populated group
    fn build_group(&self, seed: &GroupSeed) -> StoreResult<Group> {
        let time_slot = self
            .time_slots
            .iter()
            .find(|t| t.id == seed.time_slot_id)
            .cloned()
            .ok_or_else(|| {
                StoreError::Inconsistent(format!(
                    "group {} references unknown time slot {}",
                    seed.id, seed.time_slot_id
                ))
            })?;
        let coach = self.coach(seed.coach_id).ok_or_else(|| {
            StoreError::Inconsistent(format!(
                "group {} references unknown coach {}",
                seed.id, seed.coach_id
            ))
        })?;

        let mut members = Vec::with_capacity(seed.member_ids.len());
        for &student_id in &seed.member_ids {
            let student = self.student(student_id).ok_or_else(|| {
                StoreError::Inconsistent(format!(
                    "group {} references unknown student {}",
                    seed.id, student_id
                ))
            })?;
            let enrollment = self.enrollment(student_id, seed.term_id).ok_or_else(|| {
                StoreError::Inconsistent(format!(
                    "student {} in group {} has no enrollment for term {}",
                    student_id, seed.id, seed.term_id
                ))
            })?;
            members.push(Member {
                student: student.clone(),
                enrollment: enrollment.clone(),
            });
        }

        Ok(Group {
            id: seed.id,
            name: seed.name.clone(),
            coach_id: seed.coach_id,
            coach_name: coach.name.clone(),
            term_id: seed.term_id,
            day: seed.day,
            time_slot,
            max_capacity: seed.max_capacity,
            preferred_size: seed.preferred_size,
            target_skill_level: seed.target_skill_level,
            members,
        })
    }
}

/// Membership beyond the configured capacity or the seat limit of the group's type
fn over_capacity(group: &Group) -> bool {
    let occupancy = group.occupancy();
    let size = occupancy.current_size();
    size > group.max_capacity
        || occupancy
            .effective_type()
            .seat_limit()
            .map_or(false, |limit| size > limit)
}

/// Store kept entirely in memory, guarded by a read-write lock
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<StoreSeed>,
}

impl InMemoryStore {
    /// Build a store, checking that every group resolves
    pub fn from_seed(seed: StoreSeed) -> StoreResult<Self> {
        for group in &seed.groups {
            seed.build_group(group)?;
        }
        Ok(Self {
            state: RwLock::new(seed),
        })
    }

    pub fn from_json_str(json: &str) -> StoreResult<Self> {
        let seed: StoreSeed = serde_json::from_str(json)
            .map_err(|e| StoreError::Inconsistent(format!("invalid seed: {}", e)))?;
        Self::from_seed(seed)
    }

    /// Copy of the current contents
    pub fn to_seed(&self) -> StoreResult<StoreSeed> {
        Ok(self.read()?.clone())
    }

    fn read(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, StoreSeed>> {
        self.state
            .read()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, StoreSeed>> {
        self.state
            .write()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }
}

#[async_trait]
impl ScheduleStore for InMemoryStore {
    async fn get_student(&self, student_id: StudentId) -> StoreResult<Option<Student>> {
        Ok(self.read()?.student(student_id).cloned())
    }

    async fn get_enrollment(
        &self,
        student_id: StudentId,
        term_id: TermId,
    ) -> StoreResult<Option<Enrollment>> {
        Ok(self.read()?.enrollment(student_id, term_id).cloned())
    }

    async fn list_unavailability(&self, student_id: StudentId) -> StoreResult<Vec<Unavailability>> {
        let state = self.read()?;
        let school_class = state
            .student(student_id)
            .and_then(|s| s.school_class.clone());

        let mut seen = HashSet::new();
        let records = state
            .unavailability
            .iter()
            .filter(|u| {
                u.student_ids.contains(&student_id)
                    || school_class
                        .as_ref()
                        .map_or(false, |class| u.school_classes.contains(class))
            })
            .filter(|u| seen.insert((u.day, u.time_slot_id)))
            .map(|u| Unavailability {
                day: u.day,
                time_slot_id: u.time_slot_id,
            })
            .collect();
        Ok(records)
    }

    async fn list_candidate_groups(&self, term_id: TermId) -> StoreResult<Vec<Group>> {
        let state = self.read()?;
        state
            .groups
            .iter()
            .filter(|g| g.term_id == term_id)
            .map(|g| state.build_group(g))
            .collect()
    }

    async fn get_coach_specialization(
        &self,
        coach_id: CoachId,
    ) -> StoreResult<Option<Vec<SkillLevel>>> {
        Ok(self
            .read()?
            .coach(coach_id)
            .and_then(|c| c.specializations.clone()))
    }

    async fn active_term(&self) -> StoreResult<Option<TermId>> {
        Ok(self.read()?.active_term)
    }
}

#[async_trait]
impl PlanExecutor for InMemoryStore {
    async fn execute_plan(&self, plan: &PlacementPlan) -> StoreResult<()> {
        let mut state = self.write()?;
        // Work on a copy; the live state is only replaced once every step succeeded
        let mut working = state.clone();

        for (step, operation) in plan.operations.iter().enumerate() {
            match *operation {
                PlanOperation::RemoveMember { group_id, student_id } => {
                    let group = working
                        .groups
                        .iter_mut()
                        .find(|g| g.id == group_id)
                        .ok_or_else(|| reject(step, format!("unknown group {}", group_id)))?;
                    let before = group.member_ids.len();
                    group.member_ids.retain(|&id| id != student_id);
                    if group.member_ids.len() == before {
                        return Err(reject(
                            step,
                            format!("student {} is not in group {}", student_id, group_id),
                        ));
                    }
                }
                PlanOperation::AddMember { group_id, student_id } => {
                    let index = working
                        .groups
                        .iter()
                        .position(|g| g.id == group_id)
                        .ok_or_else(|| reject(step, format!("unknown group {}", group_id)))?;
                    if working.groups[index].member_ids.contains(&student_id) {
                        return Err(reject(
                            step,
                            format!("student {} is already in group {}", student_id, group_id),
                        ));
                    }
                    working.groups[index].member_ids.push(student_id);

                    let group = working
                        .build_group(&working.groups[index])
                        .map_err(|e| reject(step, e.to_string()))?;
                    if over_capacity(&group) {
                        return Err(reject(step, format!("group {} would be over capacity", group_id)));
                    }
                }
            }
        }

        *state = working;
        debug!(operations = plan.operations.len(), "Plan applied");
        Ok(())
    }
}

fn reject(step: usize, reason: String) -> StoreError {
    warn!(step, %reason, "Plan rejected");
    StoreError::PlanRejected(format!("operation {}: {}", step + 1, reason))
}

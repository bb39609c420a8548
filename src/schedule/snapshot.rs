use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::error::{SlotFinderError, SlotFinderResult};
use crate::model::{CoachId, Group, GroupId, Member, SkillLevel, StudentId, TermId, Unavailability};
use crate::store::ScheduleStore;
use super::slot_utils::sort_groups_chronologically;

/// Everything one search reads, loaded up front so the search itself never awaits
#[derive(Debug, Clone)]
pub struct ScheduleSnapshot {
    /// The student being placed, with their enrollment for the term
    pub target: Member,
    /// Candidate groups in chronological order
    pub groups: Vec<Group>,
    pub unavailability: HashMap<StudentId, Vec<Unavailability>>,
    pub coach_specializations: HashMap<CoachId, Vec<SkillLevel>>,
}

impl ScheduleSnapshot {
    pub fn new(
        target: Member,
        mut groups: Vec<Group>,
        unavailability: HashMap<StudentId, Vec<Unavailability>>,
        coach_specializations: HashMap<CoachId, Vec<SkillLevel>>,
    ) -> Self {
        sort_groups_chronologically(&mut groups);
        Self {
            target,
            groups,
            unavailability,
            coach_specializations,
        }
    }

    /// Read the target, the term's groups and the availability of every student involved.
    ///
    /// Store failures surface as `DependencyUnavailable` naming the failed call.
    pub async fn load<S>(store: &S, student_id: StudentId, term_id: TermId) -> SlotFinderResult<Self>
    where
        S: ScheduleStore + ?Sized,
    {
        let student = store
            .get_student(student_id)
            .await
            .map_err(|e| SlotFinderError::dependency("get_student", e))?
            .ok_or_else(|| SlotFinderError::NotFound(format!("student {}", student_id)))?;

        let enrollment = store
            .get_enrollment(student_id, term_id)
            .await
            .map_err(|e| SlotFinderError::dependency("get_enrollment", e))?
            .ok_or_else(|| {
                SlotFinderError::PreconditionFailed(format!(
                    "student {} has no enrollment for term {}",
                    student_id, term_id
                ))
            })?;

        let groups = store
            .list_candidate_groups(term_id)
            .await
            .map_err(|e| SlotFinderError::dependency("list_candidate_groups", e))?;

        let mut students: BTreeSet<StudentId> = groups
            .iter()
            .flat_map(|g| g.members.iter().map(|m| m.id()))
            .collect();
        students.insert(student_id);

        let mut unavailability = HashMap::with_capacity(students.len());
        for id in students {
            let records = store
                .list_unavailability(id)
                .await
                .map_err(|e| SlotFinderError::dependency("list_unavailability", e))?;
            unavailability.insert(id, records);
        }

        let coaches: BTreeSet<CoachId> = groups.iter().map(|g| g.coach_id).collect();
        let mut coach_specializations = HashMap::new();
        for coach_id in coaches {
            if let Some(levels) = store
                .get_coach_specialization(coach_id)
                .await
                .map_err(|e| SlotFinderError::dependency("get_coach_specialization", e))?
            {
                coach_specializations.insert(coach_id, levels);
            }
        }

        debug!(
            student_id,
            term_id,
            groups = groups.len(),
            students = unavailability.len(),
            "Loaded schedule snapshot"
        );

        Ok(Self::new(
            Member { student, enrollment },
            groups,
            unavailability,
            coach_specializations,
        ))
    }

    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn unavailability_of(&self, student_id: StudentId) -> &[Unavailability] {
        self.unavailability
            .get(&student_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn specialization(&self, coach_id: CoachId) -> Option<&[SkillLevel]> {
        self.coach_specializations.get(&coach_id).map(Vec::as_slice)
    }
}
